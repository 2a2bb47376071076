//! Playlist watcher — maintains a sorted snapshot of supported media files in one
//! directory (non-recursive) and fires a callback whenever the directory's membership
//! changes.
//!
//! Grounded on the debounced-watcher shape in the `notify`/`notify-debouncer-full`
//! ecosystem: a single local-filesystem debouncer per watched directory, rescanning on
//! any event rather than trying to interpret individual `notify::Event` payloads
//! (§4.2 explicitly allows this — "implementations MAY fire on every event").

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use notify_debouncer_full::{new_debouncer, DebounceEventResult, Debouncer, NoCache};
use thiserror::Error;
use tracing::{debug, warn};

use crate::classifier::is_supported;
use crate::constants::watcher::DEBOUNCE_WINDOW;

/// Errors that can occur constructing or running a [`PlaylistWatcher`].
#[derive(Debug, Error)]
pub enum WatcherError {
    #[error("failed to create filesystem watch handle: {0}")]
    WatchHandle(#[from] notify::Error),
    #[error("IO error scanning directory: {0}")]
    Io(#[from] std::io::Error),
}

/// A defensive, immutable snapshot of the supported files in a watched directory,
/// sorted lexicographically by absolute path.
pub type Snapshot = Vec<PathBuf>;

type ChangeCallback = Box<dyn Fn(Snapshot) + Send + Sync + 'static>;

/// Watches one directory (non-recursive) for changes to its set of supported media files.
pub struct PlaylistWatcher {
    dir: PathBuf,
    snapshot: Arc<Mutex<Snapshot>>,
    callback: Option<Arc<ChangeCallback>>,
    debouncer: Mutex<Option<Debouncer<RecommendedWatcher, NoCache>>>,
}

impl PlaylistWatcher {
    /// Construct a watcher for `dir`, performing the initial synchronous scan so that
    /// `files()` is valid immediately, before any background observation has started.
    pub fn new(dir: PathBuf, callback: Option<ChangeCallback>) -> Result<Self, WatcherError> {
        let initial = scan(&dir);
        Ok(Self {
            dir,
            snapshot: Arc::new(Mutex::new(initial)),
            callback: callback.map(Arc::new),
            debouncer: Mutex::new(None),
        })
    }

    /// The current defensive snapshot copy.
    pub fn files(&self) -> Snapshot {
        self.snapshot.lock().expect("snapshot lock poisoned").clone()
    }

    /// Begin background observation of the directory. Idempotent: calling `start` a
    /// second time while already running is a no-op.
    pub fn start(&self) -> Result<(), WatcherError> {
        let mut guard = self.debouncer.lock().expect("debouncer lock poisoned");
        if guard.is_some() {
            return Ok(());
        }

        let dir = self.dir.clone();
        let snapshot = Arc::clone(&self.snapshot);
        let callback = self.callback.clone();

        let mut debouncer = new_debouncer(
            DEBOUNCE_WINDOW,
            None,
            move |result: DebounceEventResult| match result {
                Ok(events) => {
                    if events.is_empty() {
                        return;
                    }
                    debug!(dir = %dir.display(), count = events.len(), "rescanning after filesystem events");
                    let rescanned = scan(&dir);
                    *snapshot.lock().expect("snapshot lock poisoned") = rescanned.clone();
                    if let Some(cb) = &callback {
                        cb(rescanned);
                    }
                }
                Err(errors) => {
                    for e in errors {
                        warn!(dir = %dir.display(), error = %e, "filesystem watch error");
                    }
                }
            },
        )?;

        debouncer.watch(&self.dir, RecursiveMode::NonRecursive)?;
        *guard = Some(debouncer);
        Ok(())
    }

    /// Stop background observation, releasing the OS-level watch handle. Idempotent.
    pub fn stop(&self) {
        let mut guard = self.debouncer.lock().expect("debouncer lock poisoned");
        guard.take();
    }
}

/// Read `dir`'s entries, keep only non-directory entries whose name is a supported
/// media file, and sort the resulting absolute paths lexicographically.
///
/// Errors reading the directory are logged and yield an empty snapshot for this tick —
/// a transient filesystem error must not terminate observation.
fn scan(dir: &Path) -> Snapshot {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "failed to read playlist directory");
            return Vec::new();
        }
    };

    let mut files: Vec<PathBuf> = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "failed to read directory entry");
                continue;
            }
        };

        let path = entry.path();
        if path.is_dir() {
            continue;
        }

        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !is_supported(name) {
            continue;
        }

        files.push(path);
    }

    files.sort();
    files
}

impl Drop for PlaylistWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_scan_and_sort() {
        let temp = TempDir::new().expect("failed to create temp dir");
        for name in [
            "charlie.mp4",
            "alpha.mkv",
            "bravo.avi",
            "notes.txt",
            "readme.md",
            "delta.hevc",
            "echo.webm",
            "foxtrot.jpg",
            "golf.png",
        ] {
            fs::write(temp.path().join(name), b"x").expect("failed to write fixture file");
        }

        let watcher =
            PlaylistWatcher::new(temp.path().to_path_buf(), None).expect("failed to construct watcher");
        let files = watcher.files();

        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();

        assert_eq!(
            names,
            vec![
                "alpha.mkv",
                "bravo.avi",
                "charlie.mp4",
                "delta.hevc",
                "echo.webm",
                "foxtrot.jpg",
                "golf.png",
            ]
        );
    }

    #[test]
    fn test_subdirectories_are_ignored() {
        let temp = TempDir::new().expect("failed to create temp dir");
        fs::create_dir(temp.path().join("subdir")).expect("failed to create subdir");
        fs::write(temp.path().join("video.mp4"), b"x").expect("failed to write fixture file");

        let watcher =
            PlaylistWatcher::new(temp.path().to_path_buf(), None).expect("failed to construct watcher");

        assert_eq!(watcher.files().len(), 1);
    }

    #[test]
    fn test_empty_directory_yields_empty_snapshot() {
        let temp = TempDir::new().expect("failed to create temp dir");
        let watcher =
            PlaylistWatcher::new(temp.path().to_path_buf(), None).expect("failed to construct watcher");
        assert!(watcher.files().is_empty());
    }

    #[test]
    fn test_rescan_without_changes_is_identical() {
        let temp = TempDir::new().expect("failed to create temp dir");
        fs::write(temp.path().join("a.mp4"), b"x").expect("failed to write fixture file");

        let first = scan(temp.path());
        let second = scan(temp.path());
        assert_eq!(first, second);
    }

    #[test]
    fn test_add_during_watch_fires_callback() {
        let temp = TempDir::new().expect("failed to create temp dir");
        let (tx, rx) = mpsc::channel::<Snapshot>();

        let watcher = PlaylistWatcher::new(
            temp.path().to_path_buf(),
            Some(Box::new(move |snapshot| {
                let _ = tx.send(snapshot);
            })),
        )
        .expect("failed to construct watcher");
        watcher.start().expect("failed to start watcher");

        fs::write(temp.path().join("new_video.mp4"), b"x").expect("failed to write fixture file");

        let snapshot = rx
            .recv_timeout(Duration::from_secs(3))
            .expect("callback did not fire within timeout");
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot[0].ends_with("new_video.mp4"));
    }

    #[test]
    fn test_remove_during_watch_fires_callback_with_empty_snapshot() {
        let temp = TempDir::new().expect("failed to create temp dir");
        let existing = temp.path().join("existing.mp4");
        fs::write(&existing, b"x").expect("failed to write fixture file");

        let (tx, rx) = mpsc::channel::<Snapshot>();
        let watcher = PlaylistWatcher::new(
            temp.path().to_path_buf(),
            Some(Box::new(move |snapshot| {
                let _ = tx.send(snapshot);
            })),
        )
        .expect("failed to construct watcher");
        watcher.start().expect("failed to start watcher");

        fs::remove_file(&existing).expect("failed to remove fixture file");

        let snapshot = rx
            .recv_timeout(Duration::from_secs(3))
            .expect("callback did not fire within timeout");
        assert!(snapshot.is_empty());
    }

    #[test]
    fn test_stop_is_idempotent() {
        let temp = TempDir::new().expect("failed to create temp dir");
        let watcher =
            PlaylistWatcher::new(temp.path().to_path_buf(), None).expect("failed to construct watcher");
        watcher.start().expect("failed to start watcher");
        watcher.stop();
        watcher.stop();
    }
}
