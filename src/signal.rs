//! Ctrl+C handling for cooperative cancellation.
//!
//! The pipeline never blocks a signal: it polls a shared flag after every
//! step. [`install_handler`] hooks Ctrl+C (and SIGTERM) to that flag, and the
//! progress callback answers `terminating()` from it.
//!
//! ```rust,no_run
//! use dupwalk::signal::install_handler;
//!
//! let handler = install_handler().expect("Failed to install signal handler");
//! if handler.is_shutdown_requested() {
//!     return;
//! }
//! ```

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

/// Shared termination flag.
///
/// Clones share one flag.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandler {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandler {
    /// Create a handler with no shutdown requested.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if shutdown has been requested.
    #[must_use]
    pub fn is_shutdown_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Request a shutdown, as Ctrl+C would.
    pub fn request_shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Clear the flag.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Error type for signal handler installation.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    /// Failed to install the Ctrl+C handler.
    #[error("Failed to install signal handler: {0}")]
    InstallFailed(#[from] ctrlc::Error),
}

static GLOBAL_HANDLER: OnceLock<ShutdownHandler> = OnceLock::new();
static INSTALL_LOCK: Mutex<()> = Mutex::new(());

/// Install the Ctrl+C handler, or reuse the one installed earlier.
///
/// `ctrlc` allows one handler per process; repeated calls (tests driving
/// `run_app` several times) get the installed handler back with its flag
/// cleared.
///
/// # Errors
///
/// Returns [`SignalError::InstallFailed`] if another handler owns the signal.
pub fn install_handler() -> Result<ShutdownHandler, SignalError> {
    let _guard = INSTALL_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(handler) = GLOBAL_HANDLER.get() {
        handler.reset();
        return Ok(handler.clone());
    }

    let handler = ShutdownHandler::new();
    let flag = Arc::clone(&handler.flag);
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
        let _ = writeln!(
            std::io::stderr(),
            "\nInterrupted. Finishing the current file..."
        );
        log::info!("Shutdown signal received");
    })?;

    Ok(GLOBAL_HANDLER.get_or_init(|| handler).clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_and_reset() {
        let handler = ShutdownHandler::new();
        assert!(!handler.is_shutdown_requested());

        handler.request_shutdown();
        assert!(handler.is_shutdown_requested());

        handler.reset();
        assert!(!handler.is_shutdown_requested());
    }

    #[test]
    fn test_clone_shares_flag() {
        let handler = ShutdownHandler::new();
        let cloned = handler.clone();

        handler.request_shutdown();
        assert!(cloned.is_shutdown_requested());
    }

    #[test]
    fn test_install_twice_reuses_handler() {
        let first = install_handler().unwrap();
        first.request_shutdown();
        let second = install_handler().unwrap();
        assert!(!second.is_shutdown_requested());
        assert!(!first.is_shutdown_requested());
    }

    #[test]
    fn test_shutdown_handler_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ShutdownHandler>();
    }
}
