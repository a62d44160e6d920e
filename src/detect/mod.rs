//! Object detection on the belt-masked frame.
//!
//! One candidate per frame at most: the largest bright component, reduced to
//! its enclosing circle and gated by area, radius and vertical position.

mod blob;
mod circle;
mod detector;
mod result;

pub use blob::{Blob, ForegroundMask};
pub use circle::{min_enclosing_circle, Circle};
pub use detector::{
    DetectorSettings, ObjectDetector, DEFAULT_BAND, DEFAULT_GRAY_THRESHOLD, DEFAULT_MIN_AREA,
    DEFAULT_MIN_RADIUS,
};
pub use result::{BoundingBox, CandidateRegion, DetectionOutcome, Rejection};
