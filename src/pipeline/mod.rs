//! Per-frame sorting pipeline and the run loop around it.
//!
//! `SortingPipeline::process` is pure apart from the debouncer state it owns:
//! mask, detect, classify, debounce. All I/O lives in `Sorter::run`.

mod run;

use anyhow::Result;

use crate::classify::{ClassifierSettings, ColorClassifier, Palette};
use crate::debounce::{CommandDebouncer, DebounceSettings};
use crate::detect::{DetectionOutcome, DetectorSettings, ObjectDetector};
use crate::frame::Frame;
use crate::observer::FrameReport;
use crate::region::{BeltRegion, RegionMask};

pub use run::{RunOptions, RunSummary, Sorter, StopReason, HEALTH_LOG_INTERVAL};

/// Tunables for every pipeline stage.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PipelineSettings {
    pub belt: BeltRegion,
    pub detector: DetectorSettings,
    pub classifier: ClassifierSettings,
    pub palette: Palette,
    pub debounce: DebounceSettings,
}

pub struct SortingPipeline {
    mask: RegionMask,
    detector: ObjectDetector,
    classifier: ColorClassifier,
    debouncer: CommandDebouncer,
}

impl SortingPipeline {
    /// Builds the pipeline for frames of `width` x `height`. The belt mask is
    /// rasterized here once and never rebuilt.
    pub fn new(settings: &PipelineSettings, width: u32, height: u32) -> Self {
        Self {
            mask: settings.belt.build_mask(width, height),
            detector: ObjectDetector::new(settings.detector),
            classifier: ColorClassifier::new(settings.palette.clone(), settings.classifier),
            debouncer: CommandDebouncer::new(settings.debounce),
        }
    }

    pub fn mask(&self) -> &RegionMask {
        &self.mask
    }

    /// Runs one frame through every stage. Fails only when the frame does not
    /// match the mask's resolution.
    pub fn process(&mut self, frame: &Frame) -> Result<FrameReport> {
        let belt_only = frame.masked(&self.mask)?;
        let detection = self.detector.detect(&belt_only);
        let classification = match &detection {
            DetectionOutcome::Candidate(candidate) => {
                Some(self.classifier.classify(&belt_only, candidate))
            }
            DetectionOutcome::Rejected(_) => None,
        };
        let label = classification.as_ref().and_then(|c| c.label);
        let command = self.debouncer.step(label);

        Ok(FrameReport {
            sequence: frame.sequence,
            detection,
            classification,
            label,
            command,
            state: *self.debouncer.state(),
        })
    }
}
