//! Library-embedded playback backend — the production target (§4.3): direct,
//! hardware-accelerated rendering via GStreamer's `playbin` element, with no
//! subprocess in between.
//!
//! Grounded on the `playbin` + bus-watcher shape in
//! `other_examples/Mjoyufull-Kaleidux__kaleidux-daemon-src-video.rs.rs`: one
//! `playbin` element per zone, a bus poll loop reacting to EOS/error/state-changed
//! messages, and `set_state(Null)` as the prompt, thread-safe way to unblock that
//! loop from `stop()`. What changes here: the upstream file streams decoded RGBA
//! frames out over a channel for custom compositing; this backend instead points
//! `playbin` straight at a video sink (direct-to-display, §4.3 "library-embedded...
//! direct-to-display rendering") and advances through a looping file list itself
//! rather than rendering a single streamed asset.
//!
//! Toolkit initialization (`gst::init`) happens at most once per process, per the
//! "once-only library initialization" note in §9, using `std::sync::OnceLock`
//! rather than a new dependency.

use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};
use std::time::{Duration, Instant};

use gstreamer as gst;
use gstreamer::prelude::*;
use gstreamer_video as gst_video;
use tracing::{debug, error, warn};

use super::{BackendError, Geometry, PlaybackBackend};
use crate::classifier::{self, MediaKind};
use crate::constants::media::DEFAULT_IMAGE_DURATION_SECONDS;
use crate::engine::signals::ShutdownSignal;
use crate::template::Zone;

/// How often the bus is polled for a message while waiting on a playing item.
const BUS_POLL_INTERVAL: Duration = Duration::from_millis(100);

static GST_INIT: OnceLock<Result<(), String>> = OnceLock::new();

fn ensure_gst_initialized() -> Result<(), BackendError> {
    GST_INIT
        .get_or_init(|| gst::init().map_err(|e| e.to_string()))
        .clone()
        .map_err(BackendError::ToolkitUnavailable)
}

/// A persistent `playbin`-backed player for one zone.
pub struct EmbeddedBackend {
    zone_id: Mutex<String>,
    geometry: Mutex<Option<Geometry>>,
    pipeline: Mutex<Option<gst::Element>>,
    stop_requested: Mutex<bool>,
}

impl EmbeddedBackend {
    pub fn new() -> Result<Self, BackendError> {
        ensure_gst_initialized()?;
        Ok(Self {
            zone_id: Mutex::new(String::new()),
            geometry: Mutex::new(None),
            pipeline: Mutex::new(None),
            stop_requested: Mutex::new(false),
        })
    }

    fn build_pipeline(&self, geometry: Option<Geometry>) -> Result<gst::Element, BackendError> {
        let playbin = gst::ElementFactory::make("playbin")
            .name(format!("zone-{}", self.zone_id.lock().expect("zone_id lock poisoned")))
            .build()
            .map_err(|e| BackendError::InitFailed(format!("failed to create playbin: {e}")))?;

        let sink = gst::ElementFactory::make("autovideosink")
            .build()
            .map_err(|e| BackendError::InitFailed(format!("failed to create video sink: {e}")))?;

        if let Some(geo) = geometry {
            apply_geometry(&sink, geo);
        }

        playbin.set_property("video-sink", &sink);
        Ok(playbin)
    }

    fn uri_for(path: &PathBuf) -> Result<String, BackendError> {
        let abs = if path.is_absolute() {
            path.clone()
        } else {
            std::env::current_dir()
                .map_err(BackendError::Io)?
                .join(path)
        };
        Ok(format!("file://{}", abs.display()))
    }

    fn local_stop_requested(&self) -> bool {
        *self.stop_requested.lock().expect("stop_requested lock poisoned")
    }
}

impl PlaybackBackend for EmbeddedBackend {
    fn init(&self, zone: &Zone, screen_w: u32, screen_h: u32) -> Result<(), BackendError> {
        *self.zone_id.lock().expect("zone_id lock poisoned") = zone.id.clone();
        *self.geometry.lock().expect("geometry lock poisoned") =
            Some(Geometry::compute(zone, screen_w, screen_h));
        Ok(())
    }

    fn play_all(&self, files: &[PathBuf], stop_signal: &ShutdownSignal) -> Result<(), BackendError> {
        if files.is_empty() {
            return Ok(());
        }

        *self.stop_requested.lock().expect("stop_requested lock poisoned") = false;
        let geometry = *self.geometry.lock().expect("geometry lock poisoned");
        let pipeline = self.build_pipeline(geometry)?;
        *self.pipeline.lock().expect("pipeline lock poisoned") = Some(pipeline.clone());

        let result = (|| {
            let mut index = 0usize;
            loop {
                if stop_signal.is_closed() || self.local_stop_requested() {
                    return Ok(());
                }

                let file = &files[index % files.len()];
                let kind = classifier::classify(file);
                if kind == MediaKind::Unsupported {
                    warn!(path = %file.display(), "skipping unsupported file handed to embedded backend");
                    index += 1;
                    continue;
                }

                let uri = Self::uri_for(file)?;
                debug!(uri = %uri, zone = %self.zone_id.lock().expect("zone_id lock poisoned"), "advancing embedded playbin");
                pipeline.set_property("uri", &uri);
                pipeline
                    .set_state(gst::State::Playing)
                    .map_err(|e| BackendError::PlaybackFailed(format!("failed to start playback: {e}")))?;

                let deadline = if kind == MediaKind::Image {
                    Some(Instant::now() + Duration::from_secs(DEFAULT_IMAGE_DURATION_SECONDS))
                } else {
                    None
                };

                if !self.wait_for_item_end(&pipeline, stop_signal, deadline)? {
                    return Ok(());
                }

                index += 1;
            }
        })();

        pipeline.set_state(gst::State::Null).ok();
        *self.pipeline.lock().expect("pipeline lock poisoned") = None;
        result
    }

    fn stop(&self) {
        *self.stop_requested.lock().expect("stop_requested lock poisoned") = true;
        if let Some(pipeline) = self.pipeline.lock().expect("pipeline lock poisoned").as_ref() {
            let _ = pipeline.set_state(gst::State::Null);
        }
    }

    fn release(&self) {
        self.stop();
    }
}

impl EmbeddedBackend {
    /// Poll the pipeline's bus until the current item ends (EOS, image deadline), an
    /// unrecoverable error occurs, or a stop becomes observable. Returns `Ok(true)` to
    /// continue to the next item, `Ok(false)` to return from `play_all` entirely.
    fn wait_for_item_end(
        &self,
        pipeline: &gst::Element,
        stop_signal: &ShutdownSignal,
        deadline: Option<Instant>,
    ) -> Result<bool, BackendError> {
        let bus = pipeline
            .bus()
            .ok_or_else(|| BackendError::InitFailed("pipeline has no bus".to_string()))?;

        loop {
            if stop_signal.is_closed() || self.local_stop_requested() {
                return Ok(false);
            }
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    return Ok(true);
                }
            }

            let timeout = gst::ClockTime::from_mseconds(BUS_POLL_INTERVAL.as_millis() as u64);
            let Some(msg) = bus.timed_pop(timeout) else {
                continue;
            };

            use gst::MessageView;
            match msg.view() {
                MessageView::Eos(..) => return Ok(true),
                MessageView::Error(err) => {
                    error!(
                        source = ?err.src().map(|s| s.path_string()),
                        error = %err.error(),
                        "gstreamer pipeline error"
                    );
                    return Err(BackendError::PlaybackFailed(err.error().to_string()));
                }
                _ => {}
            }
        }
    }
}

fn apply_geometry(sink: &gst::Element, geo: Geometry) {
    let Ok(overlay) = sink.clone().dynamic_cast::<gst_video::VideoOverlay>() else {
        return;
    };
    if geo.fullscreen {
        return;
    }
    overlay.set_render_rectangle(geo.x as i32, geo.y as i32, geo.width as i32, geo.height as i32);
}

impl Drop for EmbeddedBackend {
    fn drop(&mut self) {
        self.stop();
    }
}
