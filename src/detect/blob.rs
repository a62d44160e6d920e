//! Foreground segmentation and connected components.

use image::RgbImage;

use crate::color::luminance;

/// A connected foreground component.
#[derive(Clone, Debug, PartialEq)]
pub struct Blob {
    /// Pixels enclosed by the component's outer boundary, holes included.
    pub area: usize,
    /// Number of foreground pixels in the component.
    pub pixel_count: usize,
    /// Pixels with at least one 4-neighbour outside the component.
    pub boundary: Vec<(u32, u32)>,
}

/// Binary foreground map: pixel luminance strictly above `threshold`.
pub struct ForegroundMask {
    width: u32,
    height: u32,
    data: Vec<bool>,
}

impl ForegroundMask {
    pub fn from_image(image: &RgbImage, threshold: u8) -> Self {
        let data = image
            .pixels()
            .map(|p| luminance(p.0[0], p.0[1], p.0[2]) > threshold)
            .collect();
        Self {
            width: image.width(),
            height: image.height(),
            data,
        }
    }

    pub fn is_set(&self, x: i64, y: i64) -> bool {
        x >= 0
            && y >= 0
            && x < self.width as i64
            && y < self.height as i64
            && self.data[(y as usize) * self.width as usize + x as usize]
    }

    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }

    /// Returns the component with the largest enclosed area, if any pixel is
    /// set.
    ///
    /// Components are 8-connected. Holes count towards the area, so a ring
    /// weighs as much as the disc it outlines. On equal areas the first
    /// component in row-major scan order wins.
    pub fn largest_blob(&self) -> Option<Blob> {
        let width = self.width as usize;
        let mut visited = vec![false; self.data.len()];
        let mut best: Option<(usize, usize, usize)> = None; // (area, pixels, seed)

        for seed in 0..self.data.len() {
            if !self.data[seed] || visited[seed] {
                continue;
            }
            let mut pixels = Vec::new();
            self.flood(seed, &mut visited, |index| pixels.push(index));
            let area = self.enclosed_area(&pixels);
            if best.map_or(true, |(best_area, _, _)| area > best_area) {
                best = Some((area, pixels.len(), seed));
            }
        }

        let (area, pixel_count, seed) = best?;
        let mut boundary = Vec::new();
        let mut revisit = vec![false; self.data.len()];
        self.flood(seed, &mut revisit, |index| {
            let (x, y) = ((index % width) as i64, (index / width) as i64);
            let interior = [(0, 1), (0, -1), (1, 0), (-1, 0)]
                .iter()
                .all(|(dx, dy)| self.is_set(x + dx, y + dy));
            if !interior {
                boundary.push((x as u32, y as u32));
            }
        });

        Some(Blob {
            area,
            pixel_count,
            boundary,
        })
    }

    /// Component pixels plus every pixel the outside cannot reach.
    ///
    /// Works on the component's bounding box padded by one pixel, so the
    /// padding ring is always outside. The background is 4-connected, the
    /// dual of the 8-connected foreground.
    fn enclosed_area(&self, pixels: &[usize]) -> usize {
        if pixels.is_empty() {
            return 0;
        }
        let width = self.width as usize;
        let (mut x0, mut y0, mut x1, mut y1) = (usize::MAX, usize::MAX, 0, 0);
        for &index in pixels {
            let (x, y) = (index % width, index / width);
            x0 = x0.min(x);
            y0 = y0.min(y);
            x1 = x1.max(x);
            y1 = y1.max(y);
        }

        let (box_w, box_h) = (x1 - x0 + 3, y1 - y0 + 3);
        let mut blocked = vec![false; box_w * box_h];
        for &index in pixels {
            let (x, y) = (index % width - x0 + 1, index / width - y0 + 1);
            blocked[y * box_w + x] = true;
        }

        let mut outside = 0;
        let mut stack = vec![0];
        blocked[0] = true;
        while let Some(cell) = stack.pop() {
            outside += 1;
            let (x, y) = (cell % box_w, cell / box_w);
            let neighbours = [
                (x > 0).then(|| cell - 1),
                (x + 1 < box_w).then(|| cell + 1),
                (y > 0).then(|| cell - box_w),
                (y + 1 < box_h).then(|| cell + box_w),
            ];
            for next in neighbours.into_iter().flatten() {
                if !blocked[next] {
                    blocked[next] = true;
                    stack.push(next);
                }
            }
        }
        box_w * box_h - outside
    }

    /// Depth-first fill from `seed`, calling `visit` for each component pixel.
    fn flood(&self, seed: usize, visited: &mut [bool], mut visit: impl FnMut(usize)) -> usize {
        let width = self.width as usize;
        let mut stack = vec![seed];
        visited[seed] = true;
        let mut area = 0;

        while let Some(index) = stack.pop() {
            area += 1;
            visit(index);
            let (x, y) = ((index % width) as i64, (index / width) as i64);
            for dy in -1..=1 {
                for dx in -1..=1 {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    let (nx, ny) = (x + dx, y + dy);
                    if !self.is_set(nx, ny) {
                        continue;
                    }
                    let neighbour = ny as usize * width + nx as usize;
                    if !visited[neighbour] {
                        visited[neighbour] = true;
                        stack.push(neighbour);
                    }
                }
            }
        }
        area
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn image_with_rects(width: u32, height: u32, rects: &[(u32, u32, u32, u32)]) -> RgbImage {
        let mut image = RgbImage::from_pixel(width, height, Rgb([20, 20, 20]));
        for &(x0, y0, x1, y1) in rects {
            for y in y0..y1 {
                for x in x0..x1 {
                    image.put_pixel(x, y, Rgb([200, 200, 200]));
                }
            }
        }
        image
    }

    #[test]
    fn threshold_is_strict() {
        let image = RgbImage::from_pixel(2, 2, Rgb([70, 70, 70]));
        assert_eq!(ForegroundMask::from_image(&image, 70).count(), 0);
        assert_eq!(ForegroundMask::from_image(&image, 69).count(), 4);
    }

    #[test]
    fn largest_blob_wins() {
        let image = image_with_rects(40, 40, &[(1, 1, 4, 4), (10, 10, 20, 15)]);
        let blob = ForegroundMask::from_image(&image, 70)
            .largest_blob()
            .expect("blob");
        assert_eq!(blob.area, 50);
        assert_eq!(blob.pixel_count, 50);
        // 10x5 rectangle: perimeter pixels only.
        assert_eq!(blob.boundary.len(), 26);
        assert!(blob.boundary.contains(&(10, 10)));
        assert!(!blob.boundary.contains(&(12, 12)));
    }

    #[test]
    fn diagonal_pixels_join_one_component() {
        let mut image = RgbImage::from_pixel(5, 5, Rgb([0, 0, 0]));
        for i in 0..5 {
            image.put_pixel(i, i, Rgb([255, 255, 255]));
        }
        let blob = ForegroundMask::from_image(&image, 70)
            .largest_blob()
            .expect("blob");
        assert_eq!(blob.pixel_count, 5);
        // The diagonal's corners let the outside through; nothing is enclosed.
        assert_eq!(blob.area, 5);
    }

    #[test]
    fn ring_area_includes_its_hole() {
        let image = RgbImage::from_fn(200, 200, |x, y| {
            let d2 = (x as i64 - 100).pow(2) + (y as i64 - 100).pow(2);
            if d2 <= 35 * 35 && d2 > 28 * 28 {
                Rgb([220, 200, 40])
            } else {
                Rgb([25, 25, 25])
            }
        });
        let blob = ForegroundMask::from_image(&image, 70)
            .largest_blob()
            .expect("blob");
        assert!(blob.pixel_count < 1500, "pixels {}", blob.pixel_count);
        assert!(blob.area > 3700, "area {}", blob.area);
        assert!(!blob.boundary.contains(&(100, 100)));
    }

    #[test]
    fn filled_outline_outweighs_a_larger_solid_blob() {
        // Hollow 40x40 square (enclosing 1600) against a solid 30x30 (900 pixels).
        let mut image = image_with_rects(120, 60, &[(70, 10, 100, 40)]);
        for i in 0..40 {
            for (x, y) in [(5 + i, 5), (5 + i, 44), (5, 5 + i), (44, 5 + i)] {
                image.put_pixel(x, y, Rgb([200, 200, 200]));
            }
        }
        let blob = ForegroundMask::from_image(&image, 70)
            .largest_blob()
            .expect("blob");
        assert_eq!(blob.pixel_count, 156);
        assert_eq!(blob.area, 1600);
    }

    #[test]
    fn empty_mask_has_no_blob() {
        let image = RgbImage::from_pixel(8, 8, Rgb([10, 10, 10]));
        assert!(ForegroundMask::from_image(&image, 70).largest_blob().is_none());
    }
}
