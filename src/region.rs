//! Belt region of interest.
//!
//! The belt quadrilateral is fixed for a session. Its mask is rasterized once
//! from the first frame's resolution and reused unmodified afterwards.

use anyhow::{anyhow, Result};
use image::GrayImage;

pub type Point = (i32, i32);

/// Default belt quadrilateral for a 640x480 camera: top-left, top-right,
/// bottom-right, bottom-left.
pub const DEFAULT_BELT_POINTS: [Point; 4] = [(230, 0), (420, 0), (480, 480), (170, 480)];

const MASK_SET: u8 = 255;

/// Four frame-space points bounding the belt surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BeltRegion {
    points: [Point; 4],
}

impl Default for BeltRegion {
    fn default() -> Self {
        Self::new(DEFAULT_BELT_POINTS)
    }
}

impl BeltRegion {
    pub fn new(points: [Point; 4]) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[Point; 4] {
        &self.points
    }

    /// Parses `x,y;x,y;x,y;x,y`.
    pub fn parse(value: &str) -> Result<Self> {
        let parsed = value
            .split(';')
            .map(|pair| {
                let (x, y) = pair
                    .trim()
                    .split_once(',')
                    .ok_or_else(|| anyhow!("belt point '{}' must be 'x,y'", pair.trim()))?;
                let x: i32 = x
                    .trim()
                    .parse()
                    .map_err(|_| anyhow!("belt point x '{}' is not an integer", x.trim()))?;
                let y: i32 = y
                    .trim()
                    .parse()
                    .map_err(|_| anyhow!("belt point y '{}' is not an integer", y.trim()))?;
                Ok((x, y))
            })
            .collect::<Result<Vec<Point>>>()?;
        let points: [Point; 4] = parsed
            .try_into()
            .map_err(|v: Vec<Point>| anyhow!("belt region needs 4 points, got {}", v.len()))?;
        Ok(Self::new(points))
    }

    /// Rasterizes the quadrilateral into a `width` x `height` mask.
    ///
    /// Pixels on an edge count as inside. Points may lie outside the frame;
    /// the mask is clipped to frame bounds.
    pub fn build_mask(&self, width: u32, height: u32) -> RegionMask {
        let mut data = vec![0u8; width as usize * height as usize];
        for y in 0..height {
            let row = y as usize * width as usize;
            for x in 0..width {
                if self.covers(x as i32, y as i32) {
                    data[row + x as usize] = MASK_SET;
                }
            }
        }
        log::debug!(
            "belt mask built: {}x{}, {} pixels set",
            width,
            height,
            data.iter().filter(|&&v| v == MASK_SET).count()
        );
        RegionMask {
            width,
            height,
            data,
        }
    }

    fn covers(&self, x: i32, y: i32) -> bool {
        let edges = self
            .points
            .iter()
            .zip(self.points.iter().cycle().skip(1))
            .take(self.points.len());

        let mut inside = false;
        for (&(x0, y0), &(x1, y1)) in edges {
            if on_segment((x0, y0), (x1, y1), (x, y)) {
                return true;
            }
            // Even-odd crossing test on a ray towards +x.
            if (y0 > y) != (y1 > y) {
                let (px, py) = (x as i64, y as i64);
                let (x0, y0, x1, y1) = (x0 as i64, y0 as i64, x1 as i64, y1 as i64);
                // px < x0 + (py - y0) * (x1 - x0) / (y1 - y0), without division.
                let lhs = (px - x0) * (y1 - y0);
                let rhs = (py - y0) * (x1 - x0);
                let crosses = if y1 > y0 { lhs < rhs } else { lhs > rhs };
                if crosses {
                    inside = !inside;
                }
            }
        }
        inside
    }
}

fn on_segment(a: Point, b: Point, p: Point) -> bool {
    let cross = (b.0 as i64 - a.0 as i64) * (p.1 as i64 - a.1 as i64)
        - (b.1 as i64 - a.1 as i64) * (p.0 as i64 - a.0 as i64);
    cross == 0
        && p.0 >= a.0.min(b.0)
        && p.0 <= a.0.max(b.0)
        && p.1 >= a.1.min(b.1)
        && p.1 <= a.1.max(b.1)
}

/// Binary mask, one byte per pixel (255 inside, 0 outside).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegionMask {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl RegionMask {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height && self.data[(y * self.width + x) as usize] == MASK_SET
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn area(&self) -> usize {
        self.data.iter().filter(|&&v| v == MASK_SET).count()
    }

    pub fn to_gray_image(&self) -> GrayImage {
        GrayImage::from_raw(self.width, self.height, self.data.clone())
            .unwrap_or_else(|| GrayImage::new(self.width, self.height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_belt_mask_covers_belt_center_only() {
        let mask = BeltRegion::default().build_mask(640, 480);
        assert!(mask.contains(320, 240));
        assert!(mask.contains(230, 0));
        assert!(mask.contains(420, 0));
        assert!(!mask.contains(10, 240));
        assert!(!mask.contains(600, 240));
        assert!(!mask.contains(229, 0));
        assert!(!mask.contains(640, 0));
    }

    #[test]
    fn mask_is_byte_identical_across_builds() {
        let region = BeltRegion::default();
        let first = region.build_mask(640, 480);
        let second = region.build_mask(640, 480);
        assert_eq!(first.as_bytes(), second.as_bytes());
        assert_eq!(first.as_bytes().len(), 640 * 480);
    }

    #[test]
    fn gray_image_matches_mask_bytes() {
        let mask = BeltRegion::new([(2, 2), (5, 2), (5, 5), (2, 5)]).build_mask(8, 8);
        let image = mask.to_gray_image();
        assert_eq!(image.dimensions(), (8, 8));
        assert_eq!(image.as_raw().as_slice(), mask.as_bytes());
        assert_eq!(image.get_pixel(3, 3).0[0], MASK_SET);
        assert_eq!(image.get_pixel(0, 0).0[0], 0);
    }

    #[test]
    fn axis_aligned_square_includes_its_edges() {
        let mask = BeltRegion::new([(2, 2), (5, 2), (5, 5), (2, 5)]).build_mask(8, 8);
        assert_eq!(mask.area(), 16);
        assert!(mask.contains(2, 2));
        assert!(mask.contains(5, 5));
        assert!(!mask.contains(6, 5));
        assert!(!mask.contains(1, 2));
    }

    #[test]
    fn points_outside_frame_are_clipped() {
        let mask = BeltRegion::new([(-10, -10), (20, -10), (20, 20), (-10, 20)]).build_mask(4, 3);
        assert_eq!(mask.area(), 12);
    }

    #[test]
    fn parses_point_list() -> Result<()> {
        let region = BeltRegion::parse("230,0; 420,0; 480,480; 170,480")?;
        assert_eq!(region, BeltRegion::default());
        assert!(BeltRegion::parse("1,2;3,4;5,6").is_err());
        assert!(BeltRegion::parse("1,2;3,4;5,6;x,8").is_err());
        Ok(())
    }
}
