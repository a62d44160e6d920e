//! Diagnostic hooks over the per-frame pipeline.
//!
//! The pipeline never draws or persists anything itself; it hands each
//! frame's intermediate artifacts to a `PipelineObserver`.

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;

use crate::classify::{Classification, ClassificationScore, Material};
use crate::command::Command;
use crate::debounce::DebounceState;
use crate::detect::DetectionOutcome;
use crate::region::RegionMask;

/// Everything the pipeline derived from one frame.
#[derive(Clone, Debug)]
pub struct FrameReport {
    pub sequence: u64,
    pub detection: DetectionOutcome,
    /// Present only when a candidate was detected.
    pub classification: Option<Classification>,
    pub label: Option<Material>,
    pub command: Option<Command>,
    /// Debouncer state after this frame.
    pub state: DebounceState,
}

pub trait PipelineObserver {
    /// Called once with the belt mask built from the first frame.
    fn on_mask(&mut self, _mask: &RegionMask) {}

    fn on_frame(&mut self, report: &FrameReport);
}

/// Discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullObserver;

impl PipelineObserver for NullObserver {
    fn on_frame(&mut self, _report: &FrameReport) {}
}

/// Logs every frame at debug level and every command at info level.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogObserver;

impl PipelineObserver for LogObserver {
    fn on_mask(&mut self, mask: &RegionMask) {
        log::info!(
            "belt mask built: {}x{}, {} pixels inside",
            mask.width(),
            mask.height(),
            mask.area()
        );
    }

    fn on_frame(&mut self, report: &FrameReport) {
        match (&report.detection, &report.classification) {
            (DetectionOutcome::Candidate(candidate), Some(classification)) => log::debug!(
                "frame {}: candidate at ({}, {}) r={} scores={:?} label={:?}",
                report.sequence,
                candidate.center_x,
                candidate.center_y,
                candidate.radius,
                classification.scores,
                report.label
            ),
            (DetectionOutcome::Rejected(rejection), _) => {
                log::debug!("frame {}: no candidate ({:?})", report.sequence, rejection)
            }
            (DetectionOutcome::Candidate(_), None) => {
                log::debug!("frame {}: candidate not classified", report.sequence)
            }
        }
        if let Some(command) = report.command {
            log::info!(
                "frame {}: sent {} (label {:?}, steel confirmations {})",
                report.sequence,
                command,
                report.label,
                report.state.steel_confirmations
            );
        }
    }
}

/// One JSON line per frame. Signature masks are reduced to pixel totals.
#[derive(Debug, Serialize)]
pub struct FrameRecord<'a> {
    pub sequence: u64,
    pub detection: &'a DetectionOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scores: Option<&'a ClassificationScore>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mask_pixels: Option<BTreeMap<&'static str, usize>>,
    pub label: Option<Material>,
    pub command: Option<Command>,
    pub state: &'a DebounceState,
}

impl<'a> From<&'a FrameReport> for FrameRecord<'a> {
    fn from(report: &'a FrameReport) -> Self {
        let mask_pixels = report.classification.as_ref().map(|classification| {
            Material::ALL
                .into_iter()
                .map(|m| (m.name(), classification.masks.set_pixels(m)))
                .collect()
        });
        Self {
            sequence: report.sequence,
            detection: &report.detection,
            scores: report.classification.as_ref().map(|c| &c.scores),
            mask_pixels,
            label: report.label,
            command: report.command,
            state: &report.state,
        }
    }
}

/// Writes a `FrameRecord` per frame as JSON lines.
///
/// Diagnostics must never stop sorting: the first write failure is logged
/// and the observer goes quiet.
pub struct JsonlObserver<W: Write> {
    writer: W,
    records_written: u64,
    failed: bool,
}

impl<W: Write> JsonlObserver<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            records_written: 0,
            failed: false,
        }
    }

    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_record(&mut self, report: &FrameReport) -> Result<()> {
        serde_json::to_writer(&mut self.writer, &FrameRecord::from(report))
            .context("serialize frame record")?;
        self.writer.write_all(b"\n").context("write frame record")?;
        self.writer.flush().context("flush frame record")?;
        Ok(())
    }
}

impl<W: Write> PipelineObserver for JsonlObserver<W> {
    fn on_frame(&mut self, report: &FrameReport) {
        if self.failed {
            return;
        }
        match self.write_record(report) {
            Ok(()) => self.records_written += 1,
            Err(err) => {
                log::warn!("diagnostics disabled after write failure: {:#}", err);
                self.failed = true;
            }
        }
    }
}

/// Fans each event out to several observers in order.
#[derive(Default)]
pub struct ObserverChain<'a> {
    observers: Vec<&'a mut dyn PipelineObserver>,
}

impl<'a> ObserverChain<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, observer: &'a mut dyn PipelineObserver) -> Self {
        self.observers.push(observer);
        self
    }
}

impl PipelineObserver for ObserverChain<'_> {
    fn on_mask(&mut self, mask: &RegionMask) {
        for observer in self.observers.iter_mut() {
            observer.on_mask(mask);
        }
    }

    fn on_frame(&mut self, report: &FrameReport) {
        for observer in self.observers.iter_mut() {
            observer.on_frame(report);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::Rejection;

    fn absent_report(sequence: u64, command: Option<Command>) -> FrameReport {
        FrameReport {
            sequence,
            detection: DetectionOutcome::Rejected(Rejection::NoForeground),
            classification: None,
            label: None,
            command,
            state: DebounceState::default(),
        }
    }

    #[test]
    fn jsonl_writes_one_line_per_frame() -> Result<()> {
        let mut observer = JsonlObserver::new(Vec::new());
        observer.on_frame(&absent_report(1, Some(Command::Nothing)));
        observer.on_frame(&absent_report(2, None));
        assert_eq!(observer.records_written(), 2);

        let output = String::from_utf8(observer.into_inner())?;
        let lines: Vec<serde_json::Value> = output
            .lines()
            .map(serde_json::from_str)
            .collect::<Result<_, _>>()?;
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["sequence"], 1);
        assert_eq!(lines[0]["command"], "N");
        assert_eq!(lines[0]["detection"]["outcome"], "rejected");
        assert_eq!(lines[0]["detection"]["detail"]["reason"], "no_foreground");
        assert!(lines[1]["command"].is_null());
        assert!(lines[1].get("scores").is_none());
        Ok(())
    }

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("disk full"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn jsonl_goes_quiet_after_write_failure() {
        let mut observer = JsonlObserver::new(FailingWriter);
        observer.on_frame(&absent_report(1, None));
        observer.on_frame(&absent_report(2, None));
        assert_eq!(observer.records_written(), 0);
        assert!(observer.failed);
    }

    #[derive(Default)]
    struct Counting(u64);

    impl PipelineObserver for Counting {
        fn on_frame(&mut self, _report: &FrameReport) {
            self.0 += 1;
        }
    }

    #[test]
    fn chain_notifies_every_observer() {
        let (mut a, mut b) = (Counting::default(), Counting::default());
        {
            let mut chain = ObserverChain::new().with(&mut a).with(&mut b);
            chain.on_frame(&absent_report(1, None));
            chain.on_frame(&absent_report(2, None));
        }
        assert_eq!((a.0, b.0), (2, 2));
    }
}
