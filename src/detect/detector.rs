use crate::detect::blob::ForegroundMask;
use crate::detect::circle::min_enclosing_circle;
use crate::detect::result::{BoundingBox, CandidateRegion, DetectionOutcome, Rejection};
use crate::frame::Frame;

pub const DEFAULT_GRAY_THRESHOLD: u8 = 70;
pub const DEFAULT_MIN_AREA: usize = 2000;
pub const DEFAULT_MIN_RADIUS: f64 = 20.0;
pub const DEFAULT_BAND: (f64, f64) = (0.2, 0.8);

/// Tunable detection thresholds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectorSettings {
    /// Foreground is luminance strictly above this cutoff (belt is dark).
    pub gray_threshold: u8,
    /// Components must enclose strictly more than this many pixels.
    pub min_area: usize,
    /// Enclosing circles must be strictly wider than this radius.
    pub min_radius: f64,
    /// Accepted vertical band as fractions of frame height, exclusive.
    pub band: (f64, f64),
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            gray_threshold: DEFAULT_GRAY_THRESHOLD,
            min_area: DEFAULT_MIN_AREA,
            min_radius: DEFAULT_MIN_RADIUS,
            band: DEFAULT_BAND,
        }
    }
}

/// Finds the single best object candidate in a belt-masked frame.
#[derive(Clone, Debug, Default)]
pub struct ObjectDetector {
    settings: DetectorSettings,
}

impl ObjectDetector {
    pub fn new(settings: DetectorSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &DetectorSettings {
        &self.settings
    }

    pub fn detect(&self, frame: &Frame) -> DetectionOutcome {
        let image = frame.image();
        let foreground = ForegroundMask::from_image(image, self.settings.gray_threshold);

        let Some(blob) = foreground.largest_blob() else {
            return DetectionOutcome::Rejected(Rejection::NoForeground);
        };
        if blob.area <= self.settings.min_area {
            return DetectionOutcome::Rejected(Rejection::AreaTooSmall { area: blob.area });
        }

        let Some(circle) = min_enclosing_circle(&blob.boundary) else {
            return DetectionOutcome::Rejected(Rejection::NoForeground);
        };
        if circle.radius <= self.settings.min_radius {
            return DetectionOutcome::Rejected(Rejection::RadiusTooSmall {
                radius: circle.radius,
            });
        }

        let (x, y, r) = (circle.x as i32, circle.y as i32, circle.radius as i32);
        let height = frame.height() as f64;
        let (lo, hi) = self.settings.band;
        if !(height * lo < y as f64 && (y as f64) < height * hi) {
            return DetectionOutcome::Rejected(Rejection::OutsideBand { center_y: y });
        }

        let bounds = BoundingBox {
            x0: clip(x - r, frame.width()),
            y0: clip(y - r, frame.height()),
            x1: clip(x + r, frame.width()),
            y1: clip(y + r, frame.height()),
        };
        if bounds.is_empty() {
            return DetectionOutcome::Rejected(Rejection::EmptyBounds);
        }

        DetectionOutcome::Candidate(CandidateRegion {
            center_x: x,
            center_y: y,
            radius: r,
            bounds,
            area: blob.area,
        })
    }
}

fn clip(value: i32, limit: u32) -> u32 {
    value.clamp(0, limit as i32) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn frame_with_disc(cx: i32, cy: i32, radius: i32) -> Frame {
        let mut image = RgbImage::from_pixel(640, 480, Rgb([25, 25, 25]));
        for y in (cy - radius).max(0)..(cy + radius + 1).min(480) {
            for x in (cx - radius).max(0)..(cx + radius + 1).min(640) {
                if (x - cx).pow(2) + (y - cy).pow(2) <= radius * radius {
                    image.put_pixel(x as u32, y as u32, Rgb([210, 40, 40]));
                }
            }
        }
        Frame::new(image, 1)
    }

    #[test]
    fn accepts_centered_disc() {
        let outcome = ObjectDetector::default().detect(&frame_with_disc(320, 240, 40));
        let candidate = outcome.candidate().expect("candidate");
        assert!((candidate.center_x - 320).abs() <= 1);
        assert!((candidate.center_y - 240).abs() <= 1);
        assert!((candidate.radius - 40).abs() <= 1);
        assert_eq!(candidate.bounds.width(), 2 * candidate.radius as u32);
        assert!(candidate.area > 4800);
    }

    #[test]
    fn ring_passes_the_area_gate() {
        let mut image = RgbImage::from_pixel(640, 480, Rgb([25, 25, 25]));
        for y in 200..281 {
            for x in 280..361 {
                let d2 = (x - 320i32).pow(2) + (y - 240i32).pow(2);
                if d2 <= 35 * 35 && d2 > 28 * 28 {
                    image.put_pixel(x as u32, y as u32, Rgb([210, 190, 40]));
                }
            }
        }
        let outcome = ObjectDetector::default().detect(&Frame::new(image, 1));
        let candidate = outcome.candidate().expect("ring candidate");
        assert!(candidate.area > DEFAULT_MIN_AREA, "area {}", candidate.area);
        assert!((candidate.radius - 35).abs() <= 1);
    }

    #[test]
    fn empty_belt_has_no_foreground() {
        let frame = Frame::new(RgbImage::from_pixel(64, 48, Rgb([30, 30, 30])), 1);
        assert_eq!(
            ObjectDetector::default().detect(&frame),
            DetectionOutcome::Rejected(Rejection::NoForeground)
        );
    }

    #[test]
    fn small_blobs_are_noise() {
        let outcome = ObjectDetector::default().detect(&frame_with_disc(320, 240, 20));
        assert!(matches!(
            outcome,
            DetectionOutcome::Rejected(Rejection::AreaTooSmall { .. })
        ));
    }

    #[test]
    fn thin_blobs_fail_radius_check() {
        // Lowered area threshold so a small disc reaches the radius check.
        let settings = DetectorSettings {
            min_area: 100,
            ..DetectorSettings::default()
        };
        let outcome = ObjectDetector::new(settings).detect(&frame_with_disc(320, 240, 15));
        assert!(matches!(
            outcome,
            DetectionOutcome::Rejected(Rejection::RadiusTooSmall { .. })
        ));
    }

    #[test]
    fn objects_entering_or_leaving_are_ignored() {
        let detector = ObjectDetector::default();
        for cy in [60, 420] {
            let outcome = detector.detect(&frame_with_disc(320, cy, 40));
            assert!(
                matches!(outcome, DetectionOutcome::Rejected(Rejection::OutsideBand { .. })),
                "cy={} gave {:?}",
                cy,
                outcome
            );
        }
    }

    #[test]
    fn bounds_are_clipped_to_frame() {
        let settings = DetectorSettings {
            band: (0.0, 1.0),
            ..DetectorSettings::default()
        };
        let outcome = ObjectDetector::new(settings).detect(&frame_with_disc(20, 240, 40));
        let candidate = outcome.candidate().expect("candidate");
        assert_eq!(candidate.bounds.x0, 0);
        assert!(candidate.bounds.x1 <= 61);
    }
}
