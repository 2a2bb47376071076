//! Application-wide constants
//!
//! This module centralizes magic numbers and configuration defaults used throughout
//! the application, making them easier to maintain and understand.

use std::time::Duration;

/// Media classification constants
pub mod media {
    /// File extensions classified as video, matched case-insensitively.
    pub const VIDEO_EXTENSIONS: &[&str] = &[
        "mp4", "mkv", "avi", "mov", "webm", "ts", "m4v", "hevc", "flv", "wmv",
    ];

    /// File extensions classified as still images, matched case-insensitively.
    pub const IMAGE_EXTENSIONS: &[&str] =
        &["jpg", "jpeg", "png", "bmp", "gif", "webp", "tiff", "svg"];

    /// How long a still image is displayed within a playing list, in seconds.
    pub const DEFAULT_IMAGE_DURATION_SECONDS: u64 = 10;
}

/// File system-related constants
pub mod filesystem {
    /// Maximum filename length (cross-platform safe)
    pub const MAX_FILENAME_LENGTH: usize = 255;
}

/// Playlist watcher constants
pub mod watcher {
    use super::*;

    /// Debounce window for coalescing bursts of filesystem events before rescanning.
    pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(300);
}

/// Zone loop timing constants
pub mod engine {
    use super::*;

    /// How long the loop waits (racing shutdown/restart) when a zone's playlist is empty.
    pub const EMPTY_PLAYLIST_WAIT: Duration = Duration::from_secs(2);

    /// Backoff after a backend returns on its own (neither shutdown nor restart observed),
    /// to avoid a tight crash-loop if the underlying media toolkit is misbehaving.
    pub const SELF_EXIT_BACKOFF: Duration = Duration::from_millis(500);
}
