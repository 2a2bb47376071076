//! Media classifier — a pure, stateless mapping from file name to media kind.
//!
//! Classification looks only at the file name's extension (case-insensitive); it performs
//! no I/O and has no failure modes.

use std::path::Path;

use crate::constants::media::{IMAGE_EXTENSIONS, VIDEO_EXTENSIONS};

pub use crate::constants::media::DEFAULT_IMAGE_DURATION_SECONDS;

/// The classification of a media file by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Image,
    Unsupported,
}

/// Classify a file name by its extension.
///
/// Only the extension is inspected; it is lower-cased before matching, so
/// `"CLIP.MP4"` and `"clip.mp4"` classify identically.
pub fn classify<P: AsRef<Path>>(name: P) -> MediaKind {
    let extension = match name.as_ref().extension().and_then(|ext| ext.to_str()) {
        Some(ext) => ext.to_lowercase(),
        None => return MediaKind::Unsupported,
    };

    if VIDEO_EXTENSIONS.contains(&extension.as_str()) {
        MediaKind::Video
    } else if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
        MediaKind::Image
    } else {
        MediaKind::Unsupported
    }
}

/// True iff `classify` would not return `Unsupported` for this name.
pub fn is_supported<P: AsRef<Path>>(name: P) -> bool {
    classify(name) != MediaKind::Unsupported
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classifies_known_video_extensions() {
        for ext in ["mp4", "mkv", "avi", "mov", "webm", "ts", "m4v", "hevc", "flv", "wmv"] {
            let name = format!("clip.{ext}");
            assert_eq!(classify(&name), MediaKind::Video, "extension {ext}");
        }
    }

    #[test]
    fn test_classifies_known_image_extensions() {
        for ext in ["jpg", "jpeg", "png", "bmp", "gif", "webp", "tiff", "svg"] {
            let name = format!("banner.{ext}");
            assert_eq!(classify(&name), MediaKind::Image, "extension {ext}");
        }
    }

    #[test]
    fn test_classify_is_case_insensitive() {
        assert_eq!(classify("CLIP.MP4"), MediaKind::Video);
        assert_eq!(classify("Banner.PNG"), MediaKind::Image);
        assert_eq!(classify("clip.Mp4"), MediaKind::Video);
    }

    #[test]
    fn test_unsupported_extension() {
        assert_eq!(classify("notes.txt"), MediaKind::Unsupported);
        assert_eq!(classify("readme.md"), MediaKind::Unsupported);
    }

    #[test]
    fn test_no_extension_is_unsupported() {
        assert_eq!(classify("no_extension"), MediaKind::Unsupported);
    }

    #[test]
    fn test_is_supported_predicate() {
        assert!(is_supported("clip.mp4"));
        assert!(is_supported("banner.png"));
        assert!(!is_supported("notes.txt"));
        assert!(!is_supported("no_extension"));
    }

    #[test]
    fn test_classify_depends_only_on_extension_not_path() {
        assert_eq!(
            classify("/var/signage/zone-a/01_clip.MP4"),
            MediaKind::Video
        );
    }
}
