//! Frame sources.
//!
//! - `stub://belt` synthetic belt with objects fed one at a time (testing, demos)
//! - `dir://<path>` or a plain directory: still images in filename order
//! - `/dev/video*` V4L2 cameras (feature: ingest-v4l2)
//! - video files (feature: ingest-file-ffmpeg)
//!
//! Sources hand each frame to the caller and keep no copy. `Ok(None)` from
//! `next_frame` is end-of-stream.

#[cfg(feature = "ingest-file-ffmpeg")]
mod file_ffmpeg;
pub mod images;
pub mod synthetic;
#[cfg(feature = "ingest-v4l2")]
pub mod v4l2;

use anyhow::{anyhow, Result};
use std::path::Path;

use crate::frame::Frame;

#[cfg(feature = "ingest-file-ffmpeg")]
pub use file_ffmpeg::FfmpegFileSource;
pub use images::ImageDirSource;
pub use synthetic::{SyntheticBeltSource, SyntheticConfig};
#[cfg(feature = "ingest-v4l2")]
pub use v4l2::{V4l2Config, V4l2Source};

pub const DEFAULT_SOURCE_URI: &str = "stub://belt";
pub const DEFAULT_WIDTH: u32 = 640;
pub const DEFAULT_HEIGHT: u32 = 480;
pub const DEFAULT_TARGET_FPS: u32 = 30;

/// A producer of frames.
pub trait FrameSource {
    fn describe(&self) -> String;

    fn connect(&mut self) -> Result<()>;

    /// Captures the next frame, or `None` at end-of-stream.
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    fn is_healthy(&self) -> bool;

    fn stats(&self) -> SourceStats;
}

/// Statistics for a frame source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceStats {
    pub frames_captured: u64,
    pub source: String,
}

/// Where frames come from and the capture geometry to request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceSettings {
    pub uri: String,
    /// Requested width. Cameras may negotiate another size.
    pub width: u32,
    /// Requested height. Cameras may negotiate another size.
    pub height: u32,
    pub target_fps: u32,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            uri: DEFAULT_SOURCE_URI.to_string(),
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            target_fps: DEFAULT_TARGET_FPS,
        }
    }
}

/// Opens the backend selected by the settings' URI.
pub fn open_source(settings: &SourceSettings) -> Result<Box<dyn FrameSource>> {
    let uri = settings.uri.trim();
    if uri.is_empty() {
        return Err(anyhow!("frame source URI must not be empty"));
    }

    if uri.starts_with("stub://") {
        let config = SyntheticConfig::from_uri(uri, settings.width, settings.height)?;
        return Ok(Box::new(SyntheticBeltSource::new(config)));
    }

    if let Some(dir) = uri.strip_prefix("dir://") {
        return Ok(Box::new(ImageDirSource::new(dir)?));
    }

    if uri.contains("://") {
        return Err(anyhow!("unsupported frame source scheme in '{}'", uri));
    }

    let path = Path::new(uri);
    if path.is_dir() {
        return Ok(Box::new(ImageDirSource::new(uri)?));
    }

    if uri.starts_with("/dev/video") {
        #[cfg(feature = "ingest-v4l2")]
        {
            let config = V4l2Config {
                device: uri.to_string(),
                target_fps: settings.target_fps,
                width: settings.width,
                height: settings.height,
            };
            return Ok(Box::new(V4l2Source::new(config)));
        }
        #[cfg(not(feature = "ingest-v4l2"))]
        {
            return Err(anyhow!(
                "camera capture from {} requires the ingest-v4l2 feature",
                uri
            ));
        }
    }

    #[cfg(feature = "ingest-file-ffmpeg")]
    {
        Ok(Box::new(FfmpegFileSource::new(uri)?))
    }
    #[cfg(not(feature = "ingest-file-ffmpeg"))]
    {
        Err(anyhow!(
            "video file ingestion from {} requires the ingest-file-ffmpeg feature",
            uri
        ))
    }
}
