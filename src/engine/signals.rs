//! Per-zone signals (§3, §9 "Signal discipline").
//!
//! Two distinct signal types rather than one multipurpose flag:
//! - [`ShutdownSignal`]: one-shot, idempotent close. Once closed, stays closed forever.
//! - [`RestartSignal`]: edge-triggered, at most one pending edge (coalescing — setting
//!   it while already pending is a no-op; the consumer's `take` clears it).
//!
//! A [`ShutdownSignal`]/[`RestartSignal`] pair constructed together
//! ([`zone_signals`]) share a single `Condvar`, so a `ZonePlayer` can wait for
//! "shutdown, or restart, or a timeout" (§4.4 step 3) with one call regardless of
//! which signal actually fires. Everything here is built on `std::sync` rather than
//! `tokio::sync`: backends run their blocking `play_all` on a dedicated OS thread
//! (grounded in the teacher's `std::thread::Builder::new().spawn(run_loop)` idiom in
//! `src/audio/manager.rs`), and these signals must be observable from that thread.

use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

struct Shared {
    shutdown: Mutex<bool>,
    restart_pending: Mutex<bool>,
    cv: Condvar,
}

/// One-shot, idempotent shutdown indicator. Cloning shares the same underlying state.
#[derive(Clone)]
pub struct ShutdownSignal {
    shared: Arc<Shared>,
}

/// Edge-triggered, single-slot restart indicator. Cloning shares the same underlying
/// state.
#[derive(Clone)]
pub struct RestartSignal {
    shared: Arc<Shared>,
}

/// Construct a linked shutdown/restart signal pair for one zone.
pub fn zone_signals() -> (ShutdownSignal, RestartSignal) {
    let shared = Arc::new(Shared {
        shutdown: Mutex::new(false),
        restart_pending: Mutex::new(false),
        cv: Condvar::new(),
    });
    (
        ShutdownSignal {
            shared: shared.clone(),
        },
        RestartSignal { shared },
    )
}

impl ShutdownSignal {
    /// Close the signal. Idempotent: closing an already-closed signal is a no-op.
    pub fn close(&self) {
        let mut closed = self.shared.shutdown.lock().expect("shutdown lock poisoned");
        if !*closed {
            *closed = true;
            self.shared.cv.notify_all();
        }
    }

    /// True iff the signal has been closed.
    pub fn is_closed(&self) -> bool {
        *self.shared.shutdown.lock().expect("shutdown lock poisoned")
    }

    /// Wait until shutdown is observable, restart becomes pending, or `timeout`
    /// elapses — whichever comes first. Used for the empty-playlist wait (§4.4 step
    /// 3), which races all three.
    pub fn wait_shutdown_or_restart_or_timeout(&self, restart: &RestartSignal, timeout: Duration) {
        let guard = self.shared.shutdown.lock().expect("shutdown lock poisoned");
        let _ = self
            .shared
            .cv
            .wait_timeout_while(guard, timeout, |closed| {
                !*closed && !restart.is_pending()
            });
    }

    /// Wait up to `timeout` for the signal to become closed. Returns whether it was
    /// observed closed. Used by backends polling a running child/toolkit handle
    /// between liveness checks (§5: never hold an internal lock across this wait).
    pub fn wait_closed_timeout(&self, timeout: Duration) -> bool {
        let guard = self.shared.shutdown.lock().expect("shutdown lock poisoned");
        let (guard, _) = self
            .shared
            .cv
            .wait_timeout_while(guard, timeout, |closed| !*closed)
            .expect("condvar wait poisoned");
        *guard
    }
}

impl RestartSignal {
    /// Deliver a non-blocking edge. Coalescing: if a restart is already pending, this
    /// call is dropped.
    pub fn set(&self) {
        let mut pending = self
            .shared
            .restart_pending
            .lock()
            .expect("restart lock poisoned");
        if !*pending {
            *pending = true;
            self.shared.cv.notify_all();
        }
    }

    /// True iff a restart is currently pending.
    pub fn is_pending(&self) -> bool {
        *self
            .shared
            .restart_pending
            .lock()
            .expect("restart lock poisoned")
    }

    /// Test-and-clear: returns whether a restart was pending, and clears it either way.
    pub fn take(&self) -> bool {
        let mut pending = self
            .shared
            .restart_pending
            .lock()
            .expect("restart lock poisoned");
        std::mem::replace(&mut *pending, false)
    }
}
