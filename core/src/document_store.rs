//! Document store trait and related types.
//!
//! A document store is a remote JSON tree addressed by slash-separated paths
//! (for example Firebase Realtime Database over REST). Reducers never talk to
//! it directly: they return an [`Effect::DocumentStore`](crate::effect::Effect)
//! carrying a [`DocumentRequest`], and the runtime performs the call.
//!
//! # Implementations
//!
//! - `FirebaseStore` (in `pantry-firebase`): Production implementation over HTTPS
//! - `InMemoryDocumentStore` (in `pantry-testing`): Deterministic testing
//!
//! # Example
//!
//! ```no_run
//! use pantry_core::document_store::{DocumentRequest, DocumentStore, DocumentStoreError};
//!
//! async fn list_all<S: DocumentStore>(store: &S) -> Result<serde_json::Value, DocumentStoreError> {
//!     store.execute(DocumentRequest::get("ingredients")).await
//! }
//! ```

use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors that can occur during a document store call.
///
/// Both variants collapse into a single human-readable message once they reach
/// the request state of a reducer; the distinction only exists for logging.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentStoreError {
    /// The request could not be sent or the connection failed.
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// The response body was not valid JSON.
    #[error("Response parsing failed: {0}")]
    ResponseParseFailed(String),
}

/// HTTP verb used for a document request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
    /// Read documents
    Get,
    /// Create a document under a generated key
    Post,
    /// Remove a document
    Delete,
}

impl Method {
    /// Upper-case verb as sent on the wire
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exact-match filter on a child field (`orderBy=<field>&equalTo=<value>`).
#[derive(Clone, Debug, PartialEq)]
pub struct EqualityFilter {
    /// Child field the documents are ordered by
    pub field: String,
    /// Value the field must equal
    pub value: Value,
}

/// A single request against a document store.
#[derive(Clone, Debug, PartialEq)]
pub struct DocumentRequest {
    /// HTTP verb
    pub method: Method,
    /// Slash-separated path without extension, e.g. `ingredients/-Nabc`
    ///
    /// Every segment must satisfy [`is_valid_key`]; stores reject the request
    /// otherwise.
    pub path: String,
    /// Optional exact-match filter (GET only)
    pub filter: Option<EqualityFilter>,
    /// Optional JSON body
    pub body: Option<Value>,
}

impl DocumentRequest {
    /// `GET` the documents at `path`
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            filter: None,
            body: None,
        }
    }

    /// `POST` `body` as a new child of `path`
    #[must_use]
    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            filter: None,
            body: Some(body),
        }
    }

    /// `DELETE` the document at `path`
    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            method: Method::Delete,
            path: path.into(),
            filter: None,
            body: None,
        }
    }

    /// Restrict a `GET` to children whose `field` equals `value`
    #[must_use]
    pub fn filter_equal(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter = Some(EqualityFilter {
            field: field.into(),
            value: value.into(),
        });
        self
    }
}

/// Whether `key` can name a single child of the document tree.
///
/// Keys are non-empty and contain none of `.` `$` `#` `[` `]` `/` or ASCII
/// control characters, matching the Firebase key rules.
#[must_use]
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && !key
            .chars()
            .any(|c| matches!(c, '.' | '$' | '#' | '[' | ']' | '/') || c.is_ascii_control())
}

/// Document store abstraction.
///
/// Resolves with the parsed JSON body of the response. Implementations do not
/// inspect status codes: transport failures and non-JSON bodies are the only
/// failure modes.
///
/// This trait uses explicit `Pin<Box<dyn Future>>` returns instead of `async fn`
/// to enable trait object usage (`Arc<dyn DocumentStore>`), which effects capture.
pub trait DocumentStore: Send + Sync {
    /// Issue `request` exactly once.
    ///
    /// # Errors
    ///
    /// - `RequestFailed`: the request could not be delivered
    /// - `ResponseParseFailed`: the body was not JSON
    fn execute(
        &self,
        request: DocumentRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Value, DocumentStoreError>> + Send + '_>>;
}
