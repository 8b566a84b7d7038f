//! Opening finished transcripts with the system viewer.
//!
//! A fire-and-forget side effect outside the pipeline's correctness
//! contract: failures are logged to stderr and otherwise ignored.

use crate::defaults;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

/// Schedules a transcript to be opened for the user.
pub trait TranscriptViewer: Send + Sync {
    /// Schedule opening `path` once the settling delay has elapsed.
    fn open_later(&self, path: &Path);
}

/// Opens transcripts with the desktop's default handler after a short
/// delay, giving the engine's output file time to land on disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct DesktopViewer;

impl DesktopViewer {
    pub fn new() -> Self {
        Self
    }
}

impl TranscriptViewer for DesktopViewer {
    fn open_later(&self, path: &Path) {
        let path = path.to_path_buf();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(defaults::VIEWER_DELAY_MS)).await;
            if let Err(e) = open::that_detached(&path) {
                eprintln!(
                    "whisperq: failed to open transcript {}: {e}",
                    path.display()
                );
            }
        });
    }
}

/// Viewer that records requested paths instead of opening anything, for tests.
#[derive(Debug, Default)]
pub struct RecordingViewer {
    paths: Mutex<Vec<PathBuf>>,
}

impl RecordingViewer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every path scheduled so far, in order.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.paths.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

impl TranscriptViewer for RecordingViewer {
    fn open_later(&self, path: &Path) {
        if let Ok(mut paths) = self.paths.lock() {
            paths.push(path.to_path_buf());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_viewer_captures_paths_in_order() {
        let viewer = RecordingViewer::new();
        viewer.open_later(Path::new("a.mp3.txt"));
        viewer.open_later(Path::new("b.mp3.txt"));
        assert_eq!(
            viewer.paths(),
            vec![PathBuf::from("a.mp3.txt"), PathBuf::from("b.mp3.txt")]
        );
    }
}
