use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use super::{PipelineSettings, SortingPipeline};
use crate::actuator::ActuatorLink;
use crate::ingest::FrameSource;
use crate::observer::PipelineObserver;

pub const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Stop after this many processed frames (the mask frame excluded).
    pub max_frames: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum StopReason {
    /// The stop flag was raised.
    Cancelled,
    /// The source reported end-of-stream.
    EndOfStream,
    /// A mid-run read failed; treated as end-of-stream.
    SourceError(String),
    FrameLimit,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub frames_processed: u64,
    /// Commands written to the link, by wire code.
    pub commands: BTreeMap<char, u64>,
    pub stop_reason: StopReason,
}

impl RunSummary {
    pub fn commands_sent(&self) -> u64 {
        self.commands.values().sum()
    }
}

/// Drives a source through the pipeline into an actuator link.
pub struct Sorter {
    settings: PipelineSettings,
    options: RunOptions,
}

impl Sorter {
    pub fn new(settings: PipelineSettings, options: RunOptions) -> Self {
        Self { settings, options }
    }

    /// Runs until the stop flag is raised, the source ends, or the frame limit
    /// is reached.
    ///
    /// The first frame only fixes the resolution of the belt mask; a source
    /// that cannot deliver it is fatal. A failed command write is fatal. The
    /// link is closed on every exit path.
    pub fn run(
        &self,
        source: &mut dyn FrameSource,
        link: &mut dyn ActuatorLink,
        observer: &mut dyn PipelineObserver,
        stop: &AtomicBool,
    ) -> Result<RunSummary> {
        let result = self.run_inner(source, link, observer, stop);
        let closed = link
            .close()
            .with_context(|| format!("close actuator link {}", link.describe()));
        match (result, closed) {
            (Ok(summary), Ok(())) => Ok(summary),
            (Ok(_), Err(err)) => Err(err),
            (Err(err), closed) => {
                if let Err(close_err) = closed {
                    log::warn!("{:#}", close_err);
                }
                Err(err)
            }
        }
    }

    fn run_inner(
        &self,
        source: &mut dyn FrameSource,
        link: &mut dyn ActuatorLink,
        observer: &mut dyn PipelineObserver,
        stop: &AtomicBool,
    ) -> Result<RunSummary> {
        source
            .connect()
            .with_context(|| format!("camera not available: {}", source.describe()))?;
        let first = source
            .next_frame()
            .with_context(|| format!("camera not available: {}", source.describe()))?
            .ok_or_else(|| anyhow!("camera not available: {} produced no frame", source.describe()))?;

        let mut pipeline = SortingPipeline::new(&self.settings, first.width(), first.height());
        observer.on_mask(pipeline.mask());
        drop(first);

        log::info!(
            "sorter running: source={} link={}",
            source.describe(),
            link.describe()
        );

        let mut summary = RunSummary {
            frames_processed: 0,
            commands: BTreeMap::new(),
            stop_reason: StopReason::EndOfStream,
        };
        let mut last_health_log = Instant::now();

        summary.stop_reason = loop {
            if stop.load(Ordering::SeqCst) {
                break StopReason::Cancelled;
            }
            if self
                .options
                .max_frames
                .is_some_and(|limit| summary.frames_processed >= limit)
            {
                break StopReason::FrameLimit;
            }

            let frame = match source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break StopReason::EndOfStream,
                Err(err) => {
                    log::warn!("frame read failed, ending run: {:#}", err);
                    break StopReason::SourceError(format!("{:#}", err));
                }
            };

            let report = pipeline.process(&frame)?;
            summary.frames_processed += 1;
            if let Some(command) = report.command {
                link.send(command)?;
                *summary.commands.entry(command.code()).or_insert(0) += 1;
            }
            observer.on_frame(&report);

            if last_health_log.elapsed() >= HEALTH_LOG_INTERVAL {
                let stats = source.stats();
                log::info!(
                    "source health={} frames={} processed={} commands={} source={}",
                    source.is_healthy(),
                    stats.frames_captured,
                    summary.frames_processed,
                    summary.commands_sent(),
                    stats.source
                );
                last_health_log = Instant::now();
            }
        };

        log::info!(
            "sorter stopped ({:?}) after {} frames, {} commands",
            summary.stop_reason,
            summary.frames_processed,
            summary.commands_sent()
        );
        Ok(summary)
    }
}
