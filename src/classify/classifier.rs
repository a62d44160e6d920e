use image::{imageops, GrayImage, Luma, RgbImage};
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::classify::palette::{Material, Palette};
use crate::color::rgb_to_hsv;
use crate::detect::CandidateRegion;
use crate::frame::Frame;

pub const DEFAULT_MIN_PIXELS: u32 = 800;
pub const DEFAULT_AMBIGUITY_RATIO: f64 = 1.5;
pub const DEFAULT_ROI_MARGIN: u32 = 2;

/// Rejection policy for a region's signature scores.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClassifierSettings {
    /// The best score must reach this many pixels.
    pub min_pixels: u32,
    /// The best score must be at least this multiple of the runner-up.
    pub ambiguity_ratio: f64,
    /// Pixels trimmed from the sampling circle's radius.
    pub roi_margin: u32,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            min_pixels: DEFAULT_MIN_PIXELS,
            ambiguity_ratio: DEFAULT_AMBIGUITY_RATIO,
            roi_margin: DEFAULT_ROI_MARGIN,
        }
    }
}

/// Pixels inside the sampling circle that fall in each signature.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClassificationScore {
    counts: [u32; 4],
}

impl ClassificationScore {
    pub fn from_counts(red: u32, yellow: u32, sand: u32, steel_gray: u32) -> Self {
        Self {
            counts: [red, yellow, sand, steel_gray],
        }
    }

    pub fn get(&self, material: Material) -> u32 {
        self.counts[material.index()]
    }

    fn add(&mut self, material: Material) {
        self.counts[material.index()] += 1;
    }

    /// Highest-scoring material (earlier in `Material::ALL` wins ties) and
    /// the second-highest score.
    pub fn best_and_runner_up(&self) -> (Material, u32, u32) {
        let mut best = Material::ALL[0];
        for material in Material::ALL {
            if self.get(material) > self.get(best) {
                best = material;
            }
        }
        let mut sorted = self.counts;
        sorted.sort_unstable_by(|a, b| b.cmp(a));
        (best, self.get(best), sorted[1])
    }
}

impl Serialize for ClassificationScore {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Material::ALL.len()))?;
        for material in Material::ALL {
            map.serialize_entry(material.name(), &self.get(material))?;
        }
        map.end()
    }
}

/// Raw per-signature range masks over the region, for display only.
#[derive(Clone, Debug)]
pub struct SignatureMasks {
    masks: [GrayImage; 4],
}

impl SignatureMasks {
    pub fn get(&self, material: Material) -> &GrayImage {
        &self.masks[material.index()]
    }

    pub fn set_pixels(&self, material: Material) -> usize {
        self.get(material).pixels().filter(|p| p.0[0] != 0).count()
    }
}

/// Result of classifying one candidate region.
#[derive(Clone, Debug)]
pub struct Classification {
    pub scores: ClassificationScore,
    pub label: Option<Material>,
    pub masks: SignatureMasks,
}

/// Applies the two-part rejection rule to a set of scores.
///
/// No label when the best score is under `min_pixels`, or when it is under
/// `ambiguity_ratio` times the runner-up. Either condition alone rejects.
pub fn decide(scores: &ClassificationScore, settings: &ClassifierSettings) -> Option<Material> {
    let (best, best_score, runner_up) = scores.best_and_runner_up();
    if best_score < settings.min_pixels
        || (best_score as f64) < settings.ambiguity_ratio * runner_up as f64
    {
        return None;
    }
    Some(best)
}

/// Scores a candidate region against the palette. Pure: no state, no I/O.
#[derive(Clone, Debug, Default)]
pub struct ColorClassifier {
    palette: Palette,
    settings: ClassifierSettings,
}

impl ColorClassifier {
    pub fn new(palette: Palette, settings: ClassifierSettings) -> Self {
        Self { palette, settings }
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn settings(&self) -> &ClassifierSettings {
        &self.settings
    }

    /// Classifies the candidate's bounding box within `frame`.
    pub fn classify(&self, frame: &Frame, candidate: &CandidateRegion) -> Classification {
        let bounds = candidate.bounds;
        let roi = imageops::crop_imm(
            frame.image(),
            bounds.x0,
            bounds.y0,
            bounds.width(),
            bounds.height(),
        )
        .to_image();
        self.classify_roi(&roi)
    }

    /// Classifies a cropped region, sampling only a centered circle.
    pub fn classify_roi(&self, roi: &RgbImage) -> Classification {
        let (width, height) = roi.dimensions();
        let (cx, cy) = ((width / 2) as i64, (height / 2) as i64);
        let radius = (width.min(height) / 2) as i64 - self.settings.roi_margin as i64;

        let mut scores = ClassificationScore::default();
        let mut masks: [GrayImage; 4] = std::array::from_fn(|_| GrayImage::new(width, height));

        for (x, y, pixel) in roi.enumerate_pixels() {
            let [r, g, b] = pixel.0;
            let hsv = rgb_to_hsv(r, g, b);
            let (dx, dy) = (x as i64 - cx, y as i64 - cy);
            let sampled = radius >= 0 && dx * dx + dy * dy <= radius * radius;

            for signature in self.palette.signatures() {
                if !signature.matches(hsv) {
                    continue;
                }
                masks[signature.material.index()].put_pixel(x, y, Luma([255]));
                if sampled {
                    scores.add(signature.material);
                }
            }
        }

        Classification {
            label: decide(&scores, &self.settings),
            scores,
            masks: SignatureMasks { masks },
        }
    }
}
