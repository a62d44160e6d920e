use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::color::Hsv;

/// Materials the sorter can recognize, in tie-break priority order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Material {
    Red,
    Yellow,
    Sand,
    SteelGray,
}

impl Material {
    /// Every material, highest tie-break priority first.
    pub const ALL: [Material; 4] = [
        Material::Red,
        Material::Yellow,
        Material::Sand,
        Material::SteelGray,
    ];

    pub fn code(self) -> char {
        match self {
            Material::Red => 'R',
            Material::Yellow => 'Y',
            Material::Sand => 'S',
            Material::SteelGray => 'T',
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Material::Red => "red",
            Material::Yellow => "yellow",
            Material::Sand => "sand",
            Material::SteelGray => "steel_gray",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Material::Red => 0,
            Material::Yellow => 1,
            Material::Sand => 2,
            Material::SteelGray => 3,
        }
    }
}

/// Closed HSV box: every channel within `low..=high`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HsvRange {
    pub low: Hsv,
    pub high: Hsv,
}

impl HsvRange {
    pub const fn new(low: [u8; 3], high: [u8; 3]) -> Self {
        Self {
            low: Hsv::new(low[0], low[1], low[2]),
            high: Hsv::new(high[0], high[1], high[2]),
        }
    }

    pub fn contains(&self, hsv: Hsv) -> bool {
        (self.low.h..=self.high.h).contains(&hsv.h)
            && (self.low.s..=self.high.s).contains(&hsv.s)
            && (self.low.v..=self.high.v).contains(&hsv.v)
    }

    fn validate(&self, material: Material) -> Result<()> {
        if self.high.h > 180 {
            return Err(anyhow!(
                "{} hue upper bound {} exceeds 180",
                material.name(),
                self.high.h
            ));
        }
        if self.low.h > self.high.h || self.low.s > self.high.s || self.low.v > self.high.v {
            return Err(anyhow!(
                "{} range low {:?} exceeds high {:?}",
                material.name(),
                self.low,
                self.high
            ));
        }
        Ok(())
    }
}

/// A material's color signature: one range, or two to straddle hue wrap.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColorSignature {
    pub material: Material,
    ranges: Vec<HsvRange>,
}

impl ColorSignature {
    pub fn new(material: Material, ranges: Vec<HsvRange>) -> Result<Self> {
        if ranges.is_empty() || ranges.len() > 2 {
            return Err(anyhow!(
                "{} signature needs one or two ranges, got {}",
                material.name(),
                ranges.len()
            ));
        }
        for range in &ranges {
            range.validate(material)?;
        }
        Ok(Self { material, ranges })
    }

    pub fn ranges(&self) -> &[HsvRange] {
        &self.ranges
    }

    pub fn matches(&self, hsv: Hsv) -> bool {
        self.ranges.iter().any(|range| range.contains(hsv))
    }
}

pub const RED_LOW_RANGE: HsvRange = HsvRange::new([0, 120, 80], [10, 255, 255]);
pub const RED_HIGH_RANGE: HsvRange = HsvRange::new([170, 120, 80], [180, 255, 255]);
pub const YELLOW_RANGE: HsvRange = HsvRange::new([20, 150, 120], [35, 255, 255]);
pub const SAND_RANGE: HsvRange = HsvRange::new([10, 40, 80], [25, 200, 220]);
pub const STEEL_GRAY_RANGE: HsvRange = HsvRange::new([90, 30, 80], [130, 140, 255]);

/// The fixed four-signature palette, indexed by `Material`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Palette {
    signatures: [ColorSignature; 4],
}

impl Default for Palette {
    fn default() -> Self {
        let signature = |material, ranges: &[HsvRange]| ColorSignature {
            material,
            ranges: ranges.to_vec(),
        };
        Self {
            signatures: [
                signature(Material::Red, &[RED_LOW_RANGE, RED_HIGH_RANGE]),
                signature(Material::Yellow, &[YELLOW_RANGE]),
                signature(Material::Sand, &[SAND_RANGE]),
                signature(Material::SteelGray, &[STEEL_GRAY_RANGE]),
            ],
        }
    }
}

impl Palette {
    pub fn signature(&self, material: Material) -> &ColorSignature {
        &self.signatures[material.index()]
    }

    /// Replaces one material's signature.
    pub fn with_signature(mut self, signature: ColorSignature) -> Self {
        let index = signature.material.index();
        self.signatures[index] = signature;
        self
    }

    pub fn signatures(&self) -> impl Iterator<Item = &ColorSignature> {
        self.signatures.iter()
    }
}
