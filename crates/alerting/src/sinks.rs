//! Alert side-effect collaborators: evidence storage and audio

use camera_capture::VideoFrame;
use image::ImageFormat;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

use crate::AlertError;

/// Persists evidence frames
pub trait SnapshotStore: Send + Sync {
    /// Write `frame` under `name`, replacing any existing file of that name
    fn write_snapshot(&self, name: &str, frame: &VideoFrame) -> Result<PathBuf, AlertError>;
}

/// Plays the audible alarm cue
pub trait AlarmPlayer: Send + Sync {
    fn play_alarm(&self) -> Result<(), AlertError>;
}

/// Writes JPEG snapshots into a directory
#[derive(Debug, Clone)]
pub struct FsSnapshotStore {
    dir: PathBuf,
}

impl FsSnapshotStore {
    /// Use `dir` for evidence, creating it if needed
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, AlertError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .map_err(|e| AlertError::Snapshot(format!("{}: {}", dir.display(), e)))?;
        info!("Evidence directory: {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl SnapshotStore for FsSnapshotStore {
    fn write_snapshot(&self, name: &str, frame: &VideoFrame) -> Result<PathBuf, AlertError> {
        let path = self.dir.join(name);
        let img = frame
            .to_rgb_image()
            .map_err(|e| AlertError::Snapshot(e.to_string()))?;
        img.save_with_format(&path, ImageFormat::Jpeg)
            .map_err(|e| AlertError::Snapshot(format!("{}: {}", path.display(), e)))?;
        debug!("Snapshot written to {}", path.display());
        Ok(path)
    }
}

/// Plays the alarm through an external command, or rings the terminal bell
#[derive(Debug, Clone)]
pub struct SystemAlarm {
    command: Option<Vec<String>>,
}

impl SystemAlarm {
    /// Use `command` (program followed by arguments); `None` picks the
    /// platform default
    pub fn new(command: Option<Vec<String>>) -> Self {
        let command = command
            .filter(|c| !c.is_empty())
            .or_else(Self::platform_default);
        info!("Alarm command: {:?}", command);
        Self { command }
    }

    fn platform_default() -> Option<Vec<String>> {
        if cfg!(target_os = "macos") {
            Some(vec![
                "afplay".to_string(),
                "/System/Library/Sounds/Glass.aiff".to_string(),
            ])
        } else {
            None
        }
    }
}

impl AlarmPlayer for SystemAlarm {
    fn play_alarm(&self) -> Result<(), AlertError> {
        match self.command.as_deref() {
            Some([program, args @ ..]) => {
                let status = Command::new(program)
                    .args(args)
                    .status()
                    .map_err(|e| AlertError::Alarm(format!("{}: {}", program, e)))?;
                if status.success() {
                    Ok(())
                } else {
                    Err(AlertError::Alarm(format!("{} exited with {}", program, status)))
                }
            }
            _ => {
                let mut stderr = std::io::stderr();
                stderr
                    .write_all(b"\x07")
                    .and_then(|_| stderr.flush())
                    .map_err(|e| AlertError::Alarm(e.to_string()))
            }
        }
    }
}

/// Alarm that does nothing (audio disabled)
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentAlarm;

impl AlarmPlayer for SilentAlarm {
    fn play_alarm(&self) -> Result<(), AlertError> {
        debug!("Audio alarm disabled, skipping");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fs_store_writes_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsSnapshotStore::new(dir.path().join("evidence")).unwrap();
        let frame = VideoFrame::blank(16, 8, 0, 1);

        let path = store.write_snapshot("threat_1.jpg", &frame).unwrap();
        assert!(path.exists());
        let again = store.write_snapshot("threat_1.jpg", &frame).unwrap();
        assert_eq!(path, again);

        let decoded = image::open(&path).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 8));
    }

    #[test]
    fn test_fs_store_reports_bad_frame() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsSnapshotStore::new(dir.path()).unwrap();
        let mut frame = VideoFrame::blank(16, 8, 0, 1);
        frame.data.truncate(10);

        assert!(matches!(
            store.write_snapshot("bad.jpg", &frame),
            Err(AlertError::Snapshot(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_alarm_command_status() {
        let ok = SystemAlarm::new(Some(vec!["true".to_string()]));
        assert!(ok.play_alarm().is_ok());

        let failing = SystemAlarm::new(Some(vec!["false".to_string()]));
        assert!(matches!(failing.play_alarm(), Err(AlertError::Alarm(_))));

        let missing = SystemAlarm::new(Some(vec!["/nonexistent/alarm-player".to_string()]));
        assert!(matches!(missing.play_alarm(), Err(AlertError::Alarm(_))));
    }
}
