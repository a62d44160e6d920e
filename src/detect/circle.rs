//! Minimum enclosing circle (randomized incremental construction).

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

const SHUFFLE_SEED: u64 = 0x5eed_be17;
const EPSILON: f64 = 1e-7;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Circle {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
}

impl Circle {
    fn contains(&self, p: (f64, f64)) -> bool {
        let (dx, dy) = (p.0 - self.x, p.1 - self.y);
        (dx * dx + dy * dy).sqrt() <= self.radius * (1.0 + EPSILON) + EPSILON
    }

    fn from_two(a: (f64, f64), b: (f64, f64)) -> Self {
        let (x, y) = ((a.0 + b.0) / 2.0, (a.1 + b.1) / 2.0);
        let radius = ((a.0 - x).powi(2) + (a.1 - y).powi(2)).sqrt();
        Self { x, y, radius }
    }

    fn from_three(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> Self {
        let (bx, by) = (b.0 - a.0, b.1 - a.1);
        let (cx, cy) = (c.0 - a.0, c.1 - a.1);
        let d = 2.0 * (bx * cy - by * cx);
        if d.abs() < EPSILON {
            // Collinear: the widest pair spans the circle.
            return [Self::from_two(a, b), Self::from_two(a, c), Self::from_two(b, c)]
                .into_iter()
                .fold(Self::from_two(a, b), |widest, candidate| {
                    if candidate.radius > widest.radius {
                        candidate
                    } else {
                        widest
                    }
                });
        }
        let b2 = bx * bx + by * by;
        let c2 = cx * cx + cy * cy;
        let ux = (cy * b2 - by * c2) / d;
        let uy = (bx * c2 - cx * b2) / d;
        Self {
            x: a.0 + ux,
            y: a.1 + uy,
            radius: (ux * ux + uy * uy).sqrt(),
        }
    }
}

/// Smallest circle containing every point, or `None` for an empty set.
///
/// Point order is shuffled with a fixed seed, so the result is reproducible.
pub fn min_enclosing_circle(points: &[(u32, u32)]) -> Option<Circle> {
    let mut pts: Vec<(f64, f64)> = points.iter().map(|&(x, y)| (x as f64, y as f64)).collect();
    let first = *pts.first()?;
    pts.shuffle(&mut StdRng::seed_from_u64(SHUFFLE_SEED));

    let mut circle = Circle {
        x: first.0,
        y: first.1,
        radius: 0.0,
    };
    for i in 0..pts.len() {
        if circle.contains(pts[i]) {
            continue;
        }
        circle = Circle {
            x: pts[i].0,
            y: pts[i].1,
            radius: 0.0,
        };
        for j in 0..i {
            if circle.contains(pts[j]) {
                continue;
            }
            circle = Circle::from_two(pts[i], pts[j]);
            for k in 0..j {
                if !circle.contains(pts[k]) {
                    circle = Circle::from_three(pts[i], pts[j], pts[k]);
                }
            }
        }
    }
    Some(circle)
}
