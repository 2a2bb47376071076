//! Application orchestration: wires [`Config`], [`Template`], the [`Engine`], and one
//! [`PlaylistWatcher`] per zone together, matching the teacher's `App::new`/`App::run`
//! separation of concerns (construction does I/O-fallible setup; `run` drives the
//! event loop to completion).

use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info};

use crate::config::Config;
use crate::engine::Engine;
use crate::template::Template;
use crate::utils::fs::ensure_dir;
use crate::watcher::PlaylistWatcher;

/// Main application state and orchestration.
pub struct App {
    engine: Arc<Engine>,
    watchers: Vec<PlaylistWatcher>,
}

impl App {
    /// Construct the engine (one backend per zone) and one playlist watcher per
    /// zone, wired so that filesystem changes route straight into the engine.
    ///
    /// Each zone's playlist directory is created if missing — an operator may have
    /// listed a zone in the template before ever dropping content into it, and the
    /// watcher's `new` would otherwise fail to install its OS-level watch handle.
    pub async fn new(config: Config, template: Template) -> Result<Self> {
        let backend_kind = config.backend.kind.into();
        let engine = Arc::new(Engine::new(
            &template,
            config.display.screen_width,
            config.display.screen_height,
            backend_kind,
            config.backend.player_command.clone(),
        )?);

        let mut watchers = Vec::with_capacity(template.zones.len());
        for zone in &template.zones {
            ensure_dir(&zone.playlist_dir).await?;

            let zone_id = zone.id.clone();
            let engine_for_callback = Arc::clone(&engine);
            let watcher = PlaylistWatcher::new(
                zone.playlist_dir.clone(),
                Some(Box::new(move |snapshot| {
                    engine_for_callback.set_playlist(&zone_id, snapshot);
                })),
            )?;

            // Seed the zone with whatever the initial scan found before the
            // background watcher has had a chance to run.
            engine.set_playlist(&zone.id, watcher.files());
            watchers.push(watcher);
        }

        Ok(Self { engine, watchers })
    }

    /// Start background playlist observation, start every zone's loop, and run until
    /// a shutdown signal is received or every zone terminates on its own.
    pub async fn run(&mut self) -> Result<()> {
        for watcher in &self.watchers {
            watcher.start()?;
        }

        let mut results = self.engine.play();

        info!(zones = ?self.engine.zones(), "signage engine running");

        tokio::select! {
            _ = wait_for_shutdown_signal() => {
                info!("shutdown signal received");
                self.engine.stop();
            }
            _ = drain_zone_results(&mut results) => {
                info!("all zones terminated on their own");
            }
        }

        self.engine.release();
        for watcher in &self.watchers {
            watcher.stop();
        }

        Ok(())
    }
}

async fn drain_zone_results(results: &mut tokio::sync::mpsc::UnboundedReceiver<crate::engine::ZoneResult>) {
    while let Some(result) = results.recv().await {
        if let Err(e) = result.result {
            error!(zone = result.zone_id, error = %e, "zone terminated with an error");
        } else {
            info!(zone = result.zone_id, "zone terminated");
        }
    }
}

/// Waits for `Ctrl+C`, and on unix also `SIGTERM`, matching §6's "process-level
/// interrupt/terminate signals map to engine `stop()` followed by `release()`".
async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(signal) => signal,
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
