//! Playback backend — the capability the Zone Engine drives to render a playlist.
//!
//! A backend may be a library embedding or an external process driver; the contract
//! (§4.3) is identical either way. Every method takes `&self`: unlike the teacher's
//! `AudioManager`-owned `&mut dyn PlaybackBackend` (safe because a single command
//! loop is the only caller), this backend's `stop()` must be callable from any thread
//! *while* `play_all` is blocked on another thread (§4.3: "Safe to call from any
//! thread"). Implementations hold their mutable process/handle state behind their own
//! internal mutex, acquired only to mutate it, never held across the blocking call —
//! the no-lock-while-blocked rule in §5.

pub mod embedded;
pub mod subprocess;

use std::path::PathBuf;

use thiserror::Error;

use crate::engine::signals::ShutdownSignal;
use crate::template::Zone;

/// Errors a backend can report.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("media toolkit unavailable: {0}")]
    ToolkitUnavailable(String),
    #[error("failed to initialize backend: {0}")]
    InitFailed(String),
    #[error("playback failed: {0}")]
    PlaybackFailed(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Pixel geometry for a zone's output window, computed from percentage units at the
/// backend boundary (§9: "Keep the zone rectangle in percent units inside the data
/// model; convert to pixels only at the backend boundary").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub fullscreen: bool,
}

impl Geometry {
    pub fn compute(zone: &Zone, screen_w: u32, screen_h: u32) -> Self {
        Self {
            x: zone.x * screen_w / 100,
            y: zone.y * screen_h / 100,
            width: zone.width * screen_w / 100,
            height: zone.height * screen_h / 100,
            fullscreen: zone.is_full_screen(),
        }
    }
}

/// A polymorphic capability with four operations, driving an underlying media
/// toolkit for exactly one zone. State machine: Fresh -> Initialized ->
/// (Playing <-> Idle)* -> Released.
pub trait PlaybackBackend: Send + Sync {
    /// One-time preparation for this zone. Fails if no media toolkit is available.
    fn init(&self, zone: &Zone, screen_w: u32, screen_h: u32) -> Result<(), BackendError>;

    /// Blocks, playing `files` on an indefinite gapless loop. Returns when `stop()`
    /// is called on this backend, when `stop_signal` becomes observable, or when an
    /// unrecoverable underlying error occurs (the only case that returns `Err`).
    /// Must not hold any internal lock while blocked.
    fn play_all(&self, files: &[PathBuf], stop_signal: &ShutdownSignal) -> Result<(), BackendError>;

    /// Signals the current `play_all` to return. Idempotent, non-blocking, safe from
    /// any thread, safe when not playing.
    fn stop(&self);

    /// Frees all backend resources. Implies `stop()`. Idempotent.
    fn release(&self);
}

/// Which reference backend implementation to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Library-embedded backend (production target, hardware-accelerated).
    Embedded,
    /// Subprocess backend (portable/development use).
    Subprocess,
}

/// Construct a backend of the requested kind.
///
/// Grounded on the teacher's `create_backend` fallback-chain idiom
/// (`src/audio/manager.rs`): an explicit choice is honored as requested; callers
/// that want a fallback chain (embedded preferred, subprocess otherwise) should
/// call `create_backend(Embedded, ...)` and fall back to `Subprocess` on error,
/// exactly as the teacher falls back from `RodioBackend` to `ExternalPlayerBackend`.
pub fn create_backend(
    kind: BackendKind,
    player_command: Option<String>,
) -> Result<Box<dyn PlaybackBackend>, BackendError> {
    match kind {
        BackendKind::Embedded => Ok(Box::new(embedded::EmbeddedBackend::new()?)),
        BackendKind::Subprocess => Ok(Box::new(subprocess::SubprocessBackend::new(
            player_command,
        )?)),
    }
}
