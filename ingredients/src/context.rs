//! Session authentication context.
//!
//! A shared flag created at startup and torn down at shutdown. Nothing reads
//! it to gate requests; it only feeds the view.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared authentication flag
#[derive(Clone, Debug, Default)]
pub struct AuthContext {
    authenticated: Arc<AtomicBool>,
}

impl AuthContext {
    /// Creates an unauthenticated context
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the session as authenticated
    pub fn login(&self) {
        if !self.authenticated.swap(true, Ordering::SeqCst) {
            tracing::info!("Session authenticated");
        }
    }

    /// Whether `login` has been called since the last teardown
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::SeqCst)
    }

    /// Reset the session
    pub fn teardown(&self) {
        self.authenticated.store(false, Ordering::SeqCst);
    }
}
