//! Synthetic belt source (`stub://`).
//!
//! Renders a dark belt on a brighter floor with colored discs fed down the
//! belt center one at a time, separated by empty-belt gaps. Output is fully
//! determined by the configuration and seed.
//!
//! URI query parameters (all optional):
//! - `materials=RYST` material codes to feed, cycled
//! - `frames=N` end-of-stream after N frames
//! - `seed=N` noise seed
//! - `speed=N` pixels per frame
//! - `radius=N` disc radius

use anyhow::{anyhow, Result};
use image::{Rgb, RgbImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{FrameSource, SourceStats};
use crate::classify::Material;
use crate::color::{hsv_to_rgb, Hsv};
use crate::frame::Frame;
use crate::region::BeltRegion;

const FLOOR_LEVEL: u8 = 120;
const BELT_LEVEL: u8 = 35;
const BELT_NOISE: i16 = 6;
const OBJECT_NOISE: i16 = 3;

/// Configuration for the synthetic belt.
#[derive(Clone, Debug, PartialEq)]
pub struct SyntheticConfig {
    pub uri: String,
    pub width: u32,
    pub height: u32,
    pub materials: Vec<Material>,
    pub max_frames: Option<u64>,
    pub seed: u64,
    /// Downward object speed in pixels per frame.
    pub speed: u32,
    pub radius: u32,
    /// Empty-belt frames between objects.
    pub gap_frames: u32,
    pub belt: BeltRegion,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            uri: "stub://belt".to_string(),
            width: 640,
            height: 480,
            materials: Material::ALL.to_vec(),
            max_frames: None,
            seed: 7,
            speed: 8,
            radius: 40,
            gap_frames: 12,
            belt: BeltRegion::default(),
        }
    }
}

impl SyntheticConfig {
    pub fn from_uri(uri: &str, width: u32, height: u32) -> Result<Self> {
        let mut config = Self {
            uri: uri.to_string(),
            width,
            height,
            ..Self::default()
        };
        let Some((_, query)) = uri.split_once('?') else {
            return Ok(config);
        };
        for param in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = param
                .split_once('=')
                .ok_or_else(|| anyhow!("stub source parameter '{}' must be key=value", param))?;
            match key {
                "materials" => config.materials = parse_materials(value)?,
                "frames" => config.max_frames = Some(parse_number(key, value)?),
                "seed" => config.seed = parse_number(key, value)?,
                "speed" => config.speed = parse_number(key, value)?,
                "radius" => config.radius = parse_number(key, value)?,
                "gap" => config.gap_frames = parse_number(key, value)?,
                other => return Err(anyhow!("unknown stub source parameter '{}'", other)),
            }
        }
        if config.speed == 0 {
            return Err(anyhow!("stub source speed must be > 0"));
        }
        Ok(config)
    }

    /// Frames one object occupies, from first entering to fully leaving.
    pub fn frames_per_object(&self) -> u64 {
        let travel = self.height as u64 + 2 * self.radius as u64;
        travel.div_ceil(self.speed as u64) + self.gap_frames as u64
    }
}

fn parse_materials(value: &str) -> Result<Vec<Material>> {
    let materials = value
        .chars()
        .map(|code| {
            Material::ALL
                .into_iter()
                .find(|m| m.code() == code.to_ascii_uppercase())
                .ok_or_else(|| anyhow!("unknown material code '{}'", code))
        })
        .collect::<Result<Vec<_>>>()?;
    if materials.is_empty() {
        return Err(anyhow!("stub source needs at least one material"));
    }
    Ok(materials)
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| anyhow!("stub source parameter {}='{}' is not a number", key, value))
}

/// Representative color for each material, inside its palette signature.
pub fn material_color(material: Material) -> Rgb<u8> {
    let hsv = match material {
        Material::Red => Hsv::new(3, 200, 200),
        Material::Yellow => Hsv::new(27, 220, 230),
        Material::Sand => Hsv::new(17, 120, 170),
        Material::SteelGray => Hsv::new(110, 80, 180),
    };
    Rgb(hsv_to_rgb(hsv))
}

pub struct SyntheticBeltSource {
    config: SyntheticConfig,
    belt_mask: crate::region::RegionMask,
    rng: StdRng,
    frame_count: u64,
}

impl SyntheticBeltSource {
    pub fn new(config: SyntheticConfig) -> Self {
        let belt_mask = config.belt.build_mask(config.width, config.height);
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            config,
            belt_mask,
            rng,
            frame_count: 0,
        }
    }

    /// Material and disc center for the object visible at `frame_index`.
    fn object_at(&self, frame_index: u64) -> Option<(Material, i64, i64)> {
        let period = self.config.frames_per_object();
        let slot = frame_index / period;
        let step = frame_index % period;
        let material = self.config.materials[(slot % self.config.materials.len() as u64) as usize];

        let radius = self.config.radius as i64;
        let y = -radius + step as i64 * self.config.speed as i64;
        if y > self.config.height as i64 + radius {
            return None;
        }
        Some((material, self.config.width as i64 / 2, y))
    }

    fn render(&mut self, frame_index: u64) -> RgbImage {
        let (width, height) = (self.config.width, self.config.height);
        let mut image = RgbImage::new(width, height);
        for (x, y, pixel) in image.enumerate_pixels_mut() {
            let level = if self.belt_mask.contains(x, y) {
                BELT_LEVEL
            } else {
                FLOOR_LEVEL
            };
            let noisy = jitter(&mut self.rng, level, BELT_NOISE);
            *pixel = Rgb([noisy, noisy, noisy]);
        }

        if let Some((material, cx, cy)) = self.object_at(frame_index) {
            let color = material_color(material);
            let radius = self.config.radius as i64;
            for y in (cy - radius).max(0)..(cy + radius + 1).min(height as i64) {
                for x in (cx - radius).max(0)..(cx + radius + 1).min(width as i64) {
                    if (x - cx).pow(2) + (y - cy).pow(2) > radius * radius {
                        continue;
                    }
                    let pixel = Rgb(color.0.map(|c| jitter(&mut self.rng, c, OBJECT_NOISE)));
                    image.put_pixel(x as u32, y as u32, pixel);
                }
            }
        }
        image
    }
}

fn jitter(rng: &mut StdRng, value: u8, amount: i16) -> u8 {
    (value as i16 + rng.gen_range(-amount..=amount)).clamp(0, 255) as u8
}

impl FrameSource for SyntheticBeltSource {
    fn describe(&self) -> String {
        format!("{} (synthetic)", self.config.uri)
    }

    fn connect(&mut self) -> Result<()> {
        log::info!(
            "SyntheticBeltSource: connected to {} ({}x{}, materials {})",
            self.config.uri,
            self.config.width,
            self.config.height,
            self.config
                .materials
                .iter()
                .map(|m| m.code())
                .collect::<String>()
        );
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self
            .config
            .max_frames
            .is_some_and(|limit| self.frame_count >= limit)
        {
            return Ok(None);
        }
        let image = self.render(self.frame_count);
        self.frame_count += 1;
        Ok(Some(Frame::new(image, self.frame_count)))
    }

    fn is_healthy(&self) -> bool {
        true
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            source: self.config.uri.clone(),
        }
    }
}
