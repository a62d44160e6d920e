//! Still-image directory source.
//!
//! Replays PNG/JPEG/BMP files from one directory in lexical filename order,
//! then reports end-of-stream. Useful for replaying captured belt footage.

use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};

use super::{FrameSource, SourceStats};
use crate::frame::Frame;

const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

pub struct ImageDirSource {
    dir: PathBuf,
    files: Vec<PathBuf>,
    next_index: usize,
    frame_count: u64,
    healthy: bool,
}

impl ImageDirSource {
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        let files = list_images(&dir)?;
        Ok(Self {
            dir,
            files,
            next_index: 0,
            frame_count: 0,
            healthy: true,
        })
    }

    /// Image files that will be replayed, in order.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }
}

/// Lists the decodable images directly inside `dir`, sorted by filename.
pub fn list_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("read image directory {}", dir.display()))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry
            .with_context(|| format!("list image directory {}", dir.display()))?
            .path();
        if path.is_file() && has_image_extension(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

impl FrameSource for ImageDirSource {
    fn describe(&self) -> String {
        format!("dir://{}", self.dir.display())
    }

    fn connect(&mut self) -> Result<()> {
        if self.files.is_empty() {
            return Err(anyhow!("no images found in {}", self.dir.display()));
        }
        log::info!(
            "ImageDirSource: connected to {} ({} images)",
            self.dir.display(),
            self.files.len()
        );
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let Some(path) = self.files.get(self.next_index) else {
            return Ok(None);
        };
        self.next_index += 1;
        let image = match image::open(path) {
            Ok(image) => image.to_rgb8(),
            Err(err) => {
                self.healthy = false;
                return Err(err).with_context(|| format!("decode image {}", path.display()));
            }
        };
        self.frame_count += 1;
        Ok(Some(Frame::new(image, self.frame_count)))
    }

    fn is_healthy(&self) -> bool {
        self.healthy
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            source: self.describe(),
        }
    }
}
