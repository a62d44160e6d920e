use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::actuator::SerialConfig;
use crate::classify::{ColorSignature, HsvRange, Material};
use crate::ingest::SourceSettings;
use crate::pipeline::PipelineSettings;
use crate::region::{BeltRegion, Point};

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct SorterConfigFile {
    source: Option<SourceConfigFile>,
    serial: Option<SerialConfigFile>,
    belt: Option<BeltConfigFile>,
    detector: Option<DetectorConfigFile>,
    classifier: Option<ClassifierConfigFile>,
    palette: Option<HashMap<String, Vec<RangeConfigFile>>>,
    debounce: Option<DebounceConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct SourceConfigFile {
    uri: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    target_fps: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct SerialConfigFile {
    port: Option<String>,
    baud_rate: Option<u32>,
    write_timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct BeltConfigFile {
    points: Option<Vec<Point>>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct DetectorConfigFile {
    gray_threshold: Option<u8>,
    min_area: Option<usize>,
    min_radius: Option<f64>,
    band: Option<(f64, f64)>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ClassifierConfigFile {
    min_pixels: Option<u32>,
    ambiguity_ratio: Option<f64>,
    roi_margin: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RangeConfigFile {
    low: [u8; 3],
    high: [u8; 3],
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct DebounceConfigFile {
    label_cooldown: Option<u32>,
    departure_cooldown: Option<u32>,
}

/// Effective sorter configuration: file, then environment, then validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SorterConfig {
    pub source: SourceSettings,
    pub serial: SerialConfig,
    pub pipeline: PipelineSettings,
}

impl SorterConfig {
    /// Loads from `SORTER_CONFIG` (if set), applies `SORTER_*` overrides and
    /// validates.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("SORTER_CONFIG").ok();
        Self::load_from(config_path.as_deref().map(Path::new))
    }

    /// Like `load`, with an explicit config file path instead of
    /// `SORTER_CONFIG`.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => Some(read_config_file(path)?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: SorterConfigFile) -> Result<Self> {
        let mut cfg = Self::default();

        if let Some(source) = file.source {
            let settings = &mut cfg.source;
            settings.uri = source.uri.unwrap_or(settings.uri.clone());
            settings.width = source.width.unwrap_or(settings.width);
            settings.height = source.height.unwrap_or(settings.height);
            settings.target_fps = source.target_fps.unwrap_or(settings.target_fps);
        }

        if let Some(serial) = file.serial {
            let settings = &mut cfg.serial;
            settings.port = serial.port.unwrap_or(settings.port.clone());
            settings.baud_rate = serial.baud_rate.unwrap_or(settings.baud_rate);
            settings.write_timeout = serial
                .write_timeout_ms
                .map(Duration::from_millis)
                .or(settings.write_timeout);
        }

        let pipeline = &mut cfg.pipeline;
        if let Some(points) = file.belt.and_then(|belt| belt.points) {
            let points: [Point; 4] = points
                .try_into()
                .map_err(|v: Vec<Point>| anyhow!("belt.points needs 4 points, got {}", v.len()))?;
            pipeline.belt = BeltRegion::new(points);
        }

        if let Some(detector) = file.detector {
            let settings = &mut pipeline.detector;
            settings.gray_threshold = detector.gray_threshold.unwrap_or(settings.gray_threshold);
            settings.min_area = detector.min_area.unwrap_or(settings.min_area);
            settings.min_radius = detector.min_radius.unwrap_or(settings.min_radius);
            settings.band = detector.band.unwrap_or(settings.band);
        }

        if let Some(classifier) = file.classifier {
            let settings = &mut pipeline.classifier;
            settings.min_pixels = classifier.min_pixels.unwrap_or(settings.min_pixels);
            settings.ambiguity_ratio = classifier
                .ambiguity_ratio
                .unwrap_or(settings.ambiguity_ratio);
            settings.roi_margin = classifier.roi_margin.unwrap_or(settings.roi_margin);
        }

        for (name, ranges) in file.palette.unwrap_or_default() {
            let material = Material::ALL
                .into_iter()
                .find(|m| m.name() == name)
                .ok_or_else(|| anyhow!("palette has unknown material '{}'", name))?;
            let ranges = ranges
                .into_iter()
                .map(|range| HsvRange::new(range.low, range.high))
                .collect();
            let signature = ColorSignature::new(material, ranges)?;
            pipeline.palette = std::mem::take(&mut pipeline.palette).with_signature(signature);
        }

        if let Some(debounce) = file.debounce {
            let settings = &mut pipeline.debounce;
            settings.label_cooldown = debounce.label_cooldown.unwrap_or(settings.label_cooldown);
            settings.departure_cooldown = debounce
                .departure_cooldown
                .unwrap_or(settings.departure_cooldown);
        }

        Ok(cfg)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(uri) = std::env::var("SORTER_SOURCE") {
            if !uri.trim().is_empty() {
                self.source.uri = uri.trim().to_string();
            }
        }
        if let Ok(port) = std::env::var("SORTER_SERIAL_PORT") {
            if !port.trim().is_empty() {
                self.serial.port = port.trim().to_string();
            }
        }
        if let Ok(baud) = std::env::var("SORTER_SERIAL_BAUD") {
            self.serial.baud_rate = baud
                .trim()
                .parse()
                .map_err(|_| anyhow!("SORTER_SERIAL_BAUD must be an integer baud rate"))?;
        }
        if let Ok(points) = std::env::var("SORTER_BELT_POINTS") {
            if !points.trim().is_empty() {
                self.pipeline.belt = BeltRegion::parse(&points)
                    .map_err(|e| anyhow!("SORTER_BELT_POINTS: {}", e))?;
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.source.uri.trim().is_empty() {
            return Err(anyhow!("source uri must not be empty"));
        }
        if self.source.width == 0 || self.source.height == 0 {
            return Err(anyhow!(
                "source dimensions must be positive, got {}x{}",
                self.source.width,
                self.source.height
            ));
        }
        if self.serial.baud_rate == 0 {
            return Err(anyhow!("serial baud rate must be greater than zero"));
        }

        let (lo, hi) = self.pipeline.detector.band;
        if !(0.0..=1.0).contains(&lo) || !(0.0..=1.0).contains(&hi) || lo >= hi {
            return Err(anyhow!(
                "detector band must satisfy 0 <= low < high <= 1, got ({}, {})",
                lo,
                hi
            ));
        }
        if !self.pipeline.detector.min_radius.is_finite() || self.pipeline.detector.min_radius < 0.0
        {
            return Err(anyhow!("detector min_radius must be a non-negative number"));
        }

        let ratio = self.pipeline.classifier.ambiguity_ratio;
        if !ratio.is_finite() || ratio < 1.0 {
            return Err(anyhow!(
                "classifier ambiguity_ratio must be at least 1.0, got {}",
                ratio
            ));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<SorterConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_json(json: &str) -> Result<SorterConfig> {
        let file: SorterConfigFile = serde_json::from_str(json)?;
        let cfg = SorterConfig::from_file(file)?;
        cfg.validate()?;
        Ok(cfg)
    }

    #[test]
    fn empty_file_yields_defaults() -> Result<()> {
        assert_eq!(parse_json("{}")?, SorterConfig::default());
        Ok(())
    }

    #[test]
    fn palette_override_replaces_one_signature() -> Result<()> {
        let cfg = parse_json(
            r#"{ "palette": { "sand": [ { "low": [8, 30, 70], "high": [26, 210, 230] } ] } }"#,
        )?;
        let sand = cfg.pipeline.palette.signature(Material::Sand);
        assert_eq!(sand.ranges(), &[HsvRange::new([8, 30, 70], [26, 210, 230])]);
        assert_eq!(
            cfg.pipeline.palette.signature(Material::Red).ranges().len(),
            2
        );
        Ok(())
    }

    #[test]
    fn invalid_palette_ranges_are_rejected() {
        let hue_over = r#"{ "palette": { "red": [ { "low": [0, 0, 0], "high": [200, 255, 255] } ] } }"#;
        assert!(parse_json(hue_over).is_err());
        let inverted = r#"{ "palette": { "yellow": [ { "low": [30, 0, 0], "high": [20, 255, 255] } ] } }"#;
        assert!(parse_json(inverted).is_err());
        assert!(parse_json(r#"{ "palette": { "yellow": [] } }"#).is_err());
        let unknown = r#"{ "palette": { "blue": [ { "low": [100, 0, 0], "high": [120, 255, 255] } ] } }"#;
        assert!(parse_json(unknown).is_err());
    }

    #[test]
    fn invalid_thresholds_are_rejected() {
        assert!(parse_json(r#"{ "detector": { "band": [0.8, 0.2] } }"#).is_err());
        assert!(parse_json(r#"{ "detector": { "band": [0.0, 1.5] } }"#).is_err());
        assert!(parse_json(r#"{ "classifier": { "ambiguity_ratio": 0.5 } }"#).is_err());
        assert!(parse_json(r#"{ "serial": { "baud_rate": 0 } }"#).is_err());
        assert!(parse_json(r#"{ "source": { "width": 0 } }"#).is_err());
        assert!(parse_json(r#"{ "belt": { "points": [[0, 0], [1, 1]] } }"#).is_err());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(parse_json(r#"{ "camera": {} }"#).is_err());
        assert!(parse_json(r#"{ "debounce": { "cooldown": 3 } }"#).is_err());
    }
}
