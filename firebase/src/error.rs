//! Error types for the Firebase client

use thiserror::Error;

/// Errors that can occur while constructing a [`FirebaseStore`](crate::FirebaseStore)
#[derive(Debug, Error)]
pub enum FirebaseError {
    /// Base URL is not an absolute http(s) URL
    #[error("Invalid database URL: {0}")]
    InvalidBaseUrl(String),

    /// The underlying HTTP client could not be built
    #[error("HTTP client construction failed: {0}")]
    ClientBuild(String),
}
