//! Belt Sorter
//!
//! Perception-and-control loop for a conveyor-belt material sorter. A camera
//! watches a fixed region of the belt; each object's material is classified by
//! color signature and a single-character command is sent over a serial link
//! to the actuator controller that diverts it.
//!
//! # Architecture
//!
//! Per frame, strictly in order:
//!
//! 1. **Belt mask**: pixels outside the belt quadrilateral are blacked out.
//!    The mask is built once from the first frame's resolution.
//! 2. **Detection**: the largest bright component becomes at most one
//!    candidate circle, gated by area, radius and vertical band.
//! 3. **Classification**: pixels inside the candidate's sampling circle are
//!    counted per palette signature; weak or ambiguous scores yield no label.
//! 4. **Debouncing**: labels become an edge-triggered, cooldown-limited
//!    command stream (`R`, `Y`, `S`, `T`, `U`, `N`).
//! 5. **Actuation**: each command is written to the link, blocking.
//!
//! # Module Structure
//!
//! - `region`: belt quadrilateral and its mask
//! - `detect`: foreground components, enclosing circle, candidate gating
//! - `classify`: palette signatures and the two-part rejection rule
//! - `debounce`: command state machine
//! - `command`, `actuator`: wire protocol and links (serial, any writer)
//! - `ingest`: frame sources (synthetic, image directories, V4L2, video files)
//! - `observer`: diagnostic hooks (log, JSON lines)
//! - `pipeline`: per-frame composition and the run loop
//! - `config`: file + environment configuration

pub mod actuator;
pub mod classify;
pub mod color;
pub mod command;
pub mod config;
pub mod debounce;
pub mod detect;
pub mod frame;
pub mod ingest;
pub mod observer;
pub mod pipeline;
pub mod region;

pub use actuator::{ActuatorLink, SerialConfig, SerialLink, WriterLink, DEFAULT_BAUD_RATE};
pub use classify::{
    Classification, ClassificationScore, ClassifierSettings, ColorClassifier, ColorSignature,
    HsvRange, Material, Palette,
};
pub use command::Command;
pub use config::SorterConfig;
pub use debounce::{CommandDebouncer, DebounceSettings, DebounceState};
pub use detect::{CandidateRegion, DetectionOutcome, DetectorSettings, ObjectDetector, Rejection};
pub use frame::Frame;
pub use ingest::{open_source, FrameSource, SourceSettings, SourceStats};
pub use observer::{
    FrameReport, JsonlObserver, LogObserver, NullObserver, ObserverChain, PipelineObserver,
};
pub use pipeline::{PipelineSettings, RunOptions, RunSummary, Sorter, SortingPipeline, StopReason};
pub use region::{BeltRegion, RegionMask};
