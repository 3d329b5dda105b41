//! Frame sources

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

use crate::{CameraConfig, CameraError, VideoFrame};

/// A video feed the pipeline pulls frames from.
///
/// `Ok(None)` marks end-of-stream, which callers treat as a normal shutdown.
pub trait FrameSource {
    /// Source identifier
    fn name(&self) -> &str;

    /// Pull the next frame
    fn next_frame(&mut self) -> Result<Option<VideoFrame>, CameraError>;
}

fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

/// Emits blank frames of a fixed size
pub struct SyntheticSource {
    width: u32,
    height: u32,
    limit: Option<u64>,
    sequence: u64,
}

impl SyntheticSource {
    /// Create a source producing `limit` frames (or forever with `None`)
    pub fn new(config: &CameraConfig, limit: Option<u64>) -> Self {
        info!(
            "Synthetic source {}x{} (limit: {:?})",
            config.width, config.height, limit
        );
        Self {
            width: config.width,
            height: config.height,
            limit,
            sequence: 0,
        }
    }
}

impl FrameSource for SyntheticSource {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn next_frame(&mut self) -> Result<Option<VideoFrame>, CameraError> {
        if let Some(limit) = self.limit {
            if self.sequence >= limit {
                return Ok(None);
            }
        }
        self.sequence += 1;
        Ok(Some(VideoFrame::blank(
            self.width,
            self.height,
            now_ns(),
            self.sequence,
        )))
    }
}

/// Replays a directory of still images (sorted by file name) as a feed
pub struct ImageSequenceSource {
    files: Vec<PathBuf>,
    position: usize,
    label: String,
}

impl ImageSequenceSource {
    /// Open a directory of `.jpg`/`.jpeg`/`.png` files
    pub fn open(dir: &Path) -> Result<Self, CameraError> {
        let entries = std::fs::read_dir(dir)
            .map_err(|e| CameraError::Open(format!("{}: {}", dir.display(), e)))?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| matches!(ext.to_ascii_lowercase().as_str(), "jpg" | "jpeg" | "png"))
                    .unwrap_or(false)
            })
            .collect();
        files.sort();

        if files.is_empty() {
            return Err(CameraError::Open(format!(
                "no images found in {}",
                dir.display()
            )));
        }

        info!("Image sequence source: {} frames from {}", files.len(), dir.display());
        Ok(Self {
            files,
            position: 0,
            label: dir.display().to_string(),
        })
    }
}

impl FrameSource for ImageSequenceSource {
    fn name(&self) -> &str {
        &self.label
    }

    fn next_frame(&mut self) -> Result<Option<VideoFrame>, CameraError> {
        let Some(path) = self.files.get(self.position) else {
            return Ok(None);
        };
        self.position += 1;

        debug!("Decoding {}", path.display());
        let img = image::open(path)
            .map_err(|e| CameraError::Decode(format!("{}: {}", path.display(), e)))?
            .to_rgb8();

        Ok(Some(VideoFrame::from_rgb_image(
            img,
            now_ns(),
            self.position as u64,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_source_ends_at_limit() {
        let config = CameraConfig { width: 4, height: 2, fps: 0 };
        let mut source = SyntheticSource::new(&config, Some(3));

        let mut sequences = Vec::new();
        while let Some(frame) = source.next_frame().unwrap() {
            assert_eq!(frame.data.len(), 4 * 2 * 3);
            sequences.push(frame.sequence);
        }
        assert_eq!(sequences, vec![1, 2, 3]);
    }

    #[test]
    fn test_image_sequence_source() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.png", "a.png"] {
            image::RgbImage::new(5, 3).save(dir.path().join(name)).unwrap();
        }
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut source = ImageSequenceSource::open(dir.path()).unwrap();
        let first = source.next_frame().unwrap().unwrap();
        assert_eq!((first.width, first.height, first.sequence), (5, 3, 1));
        assert!(source.next_frame().unwrap().is_some());
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_image_sequence_source_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            ImageSequenceSource::open(dir.path()),
            Err(CameraError::Open(_))
        ));
    }
}
