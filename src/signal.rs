//! Signal handling infrastructure for graceful shutdown.
//!
//! This module provides a thread-safe mechanism for handling SIGINT (Ctrl+C)
//! signals, allowing the sampling loop to check for shutdown requests without
//! blocking. The live chart also requests shutdown through the same flag when
//! the user presses `q`, so every stop path funnels into one check.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{ProcwatchError, Result};

/// Handles SIGINT signals for graceful shutdown.
///
/// `SignalHandler` registers a handler for SIGINT that sets an internal flag
/// when triggered. The main loop can check this flag using `is_shutdown_requested()`
/// without blocking.
///
/// # Thread Safety
///
/// `SignalHandler` is thread-safe and can be cloned to share across threads.
/// The underlying shutdown flag uses atomic operations.
///
/// # Example
///
/// ```ignore
/// let handler = SignalHandler::new()?;
///
/// loop {
///     if handler.is_shutdown_requested() {
///         break;
///     }
///     // take a sample
/// }
/// ```
#[derive(Clone)]
pub struct SignalHandler {
    shutdown_flag: Arc<AtomicBool>,
}

impl SignalHandler {
    /// Creates a new `SignalHandler` and registers the SIGINT handler.
    ///
    /// # Errors
    ///
    /// Returns an error if the signal handler cannot be registered. `ctrlc`
    /// only allows one registration per process.
    pub fn new() -> Result<Self> {
        let handler = Self::detached();
        let flag_clone = Arc::clone(&handler.shutdown_flag);

        ctrlc::set_handler(move || {
            flag_clone.store(true, Ordering::SeqCst);
        })
        .map_err(|e| ProcwatchError::SignalHandler(e.to_string()))?;

        Ok(handler)
    }

    /// Creates a handler that is not wired to any OS signal.
    ///
    /// Shutdown can still be requested with [`request_shutdown`](Self::request_shutdown).
    pub fn detached() -> Self {
        Self {
            shutdown_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Checks if a shutdown has been requested (non-blocking).
    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag.load(Ordering::SeqCst)
    }

    /// Requests shutdown as if SIGINT had been received.
    pub fn request_shutdown(&self) {
        self.shutdown_flag.store(true, Ordering::SeqCst);
    }

    /// Resets the shutdown flag to false.
    #[cfg(test)]
    pub fn reset(&self) {
        self.shutdown_flag.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_shutdown_requested_returns_false_initially() {
        let handler = SignalHandler::detached();
        assert!(!handler.is_shutdown_requested());
    }

    #[test]
    fn test_is_shutdown_requested_returns_true_when_flag_set() {
        let shutdown_flag = Arc::new(AtomicBool::new(false));
        let handler = SignalHandler {
            shutdown_flag: shutdown_flag.clone(),
        };

        // Simulate signal being received
        shutdown_flag.store(true, Ordering::SeqCst);

        assert!(handler.is_shutdown_requested());
    }

    #[test]
    fn test_request_shutdown_sets_flag() {
        let handler = SignalHandler::detached();
        handler.request_shutdown();
        assert!(handler.is_shutdown_requested());
    }

    #[test]
    fn test_handler_clone_shares_state() {
        let handler1 = SignalHandler::detached();
        let handler2 = handler1.clone();

        assert!(!handler1.is_shutdown_requested());
        assert!(!handler2.is_shutdown_requested());

        handler2.request_shutdown();

        assert!(handler1.is_shutdown_requested());
        assert!(handler2.is_shutdown_requested());
    }

    #[test]
    fn test_handler_is_thread_safe() {
        let handler = SignalHandler::detached();
        let handler_clone = handler.clone();

        std::thread::spawn(move || handler_clone.request_shutdown())
            .join()
            .unwrap();

        assert!(handler.is_shutdown_requested());
    }

    #[test]
    fn test_reset_clears_shutdown_flag() {
        let handler = SignalHandler::detached();
        handler.request_shutdown();
        assert!(handler.is_shutdown_requested());

        handler.reset();

        assert!(!handler.is_shutdown_requested());
    }
}
