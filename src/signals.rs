//! Stop and reload requests
//!
//! [`RunState`] carries two flags shared between OS signal handlers and the
//! chain controller. Handlers only set a boolean (through
//! `signal_hook::flag::register`); all cleanup happens in normal control flow
//! once the controller or walker polls the flag at a checkpoint.
//!
//! Checkpoints are coarse: between roots, and between top-level entries of
//! the root being walked. A deep descent in progress finishes its current
//! top-level subtree before the request is observed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::warn;

/// Shared stop/reload flags for one run
#[derive(Debug, Clone, Default)]
pub struct RunState {
    stop_flag: Arc<AtomicBool>,
    reload_flag: Arc<AtomicBool>,
}

impl RunState {
    /// Create flags that no signal is wired to
    pub fn new() -> Self {
        Self::default()
    }

    /// Create flags and register OS signal hooks
    ///
    /// SIGINT/SIGTERM request a stop; on Unix, SIGHUP requests a reload.
    /// Registration failures are logged and otherwise ignored.
    pub fn install() -> Self {
        let state = Self::new();
        state.register_signals();
        state
    }

    /// Whether a stop has been requested
    pub fn should_stop(&self) -> bool {
        self.stop_flag.load(Ordering::Relaxed)
    }

    /// Check and clear a pending reload request
    pub fn take_reload(&self) -> bool {
        self.reload_flag.swap(false, Ordering::Relaxed)
    }

    /// Request a stop at the next checkpoint
    pub fn request_stop(&self) {
        self.stop_flag.store(true, Ordering::Relaxed);
    }

    /// Request a reload at the next checkpoint
    pub fn request_reload(&self) {
        self.reload_flag.store(true, Ordering::Relaxed);
    }

    fn register_signals(&self) {
        use signal_hook::consts::{SIGINT, SIGTERM};

        if let Err(e) = signal_hook::flag::register(SIGTERM, Arc::clone(&self.stop_flag)) {
            warn!("Failed to register SIGTERM handler: {}", e);
        }
        if let Err(e) = signal_hook::flag::register(SIGINT, Arc::clone(&self.stop_flag)) {
            warn!("Failed to register SIGINT handler: {}", e);
        }

        #[cfg(unix)]
        {
            use signal_hook::consts::SIGHUP;
            if let Err(e) = signal_hook::flag::register(SIGHUP, Arc::clone(&self.reload_flag)) {
                warn!("Failed to register SIGHUP handler: {}", e);
            }
        }
    }
}
