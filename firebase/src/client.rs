//! Firebase Realtime Database REST client

use crate::error::FirebaseError;
use pantry_core::document_store::{
    DocumentRequest, DocumentStore, DocumentStoreError, Method, is_valid_key,
};
use reqwest::{Client, Url};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Connection settings for a Firebase Realtime Database
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FirebaseConfig {
    /// Database root, e.g. `https://<project>-default-rtdb.firebaseio.com`
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl FirebaseConfig {
    /// Create a config with the default 10 second timeout
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Set the per-request timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Document store over the Firebase REST API
///
/// Each [`DocumentRequest`] becomes exactly one HTTP call to
/// `{base_url}/{path}.json`, with every path segment percent-encoded. Paths
/// containing a segment that is not a valid key are refused before any I/O.
/// Status codes are not interpreted: Firebase reports most problems as a JSON
/// body, which is handed back unchanged.
#[derive(Clone, Debug)]
pub struct FirebaseStore {
    client: Client,
    root: Url,
}

impl FirebaseStore {
    /// Create a store for the database at `config.base_url`
    ///
    /// # Errors
    ///
    /// - `InvalidBaseUrl` if the URL is not an absolute http(s) URL
    /// - `ClientBuild` if the HTTP client cannot be constructed
    pub fn new(config: FirebaseConfig) -> Result<Self, FirebaseError> {
        let root = Url::parse(&config.base_url)
            .ok()
            .filter(|url| matches!(url.scheme(), "http" | "https") && !url.cannot_be_a_base())
            .ok_or_else(|| FirebaseError::InvalidBaseUrl(config.base_url.clone()))?;

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| FirebaseError::ClientBuild(e.to_string()))?;

        Ok(Self { client, root })
    }

    /// Database root this store talks to
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.root.as_str().trim_end_matches('/')
    }

    fn url_for(&self, path: &str) -> Result<Url, DocumentStoreError> {
        let keys: Vec<&str> = path.trim_matches('/').split('/').collect();
        if let Some(key) = keys.iter().find(|key| !is_valid_key(key)) {
            return Err(DocumentStoreError::RequestFailed(format!(
                "invalid document key `{key}` in path `{path}`"
            )));
        }

        let mut url = self.root.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|()| {
                DocumentStoreError::RequestFailed(format!("cannot address `{path}`"))
            })?;
            segments.pop_if_empty();
            if let Some((last, parents)) = keys.split_last() {
                segments.extend(parents);
                segments.push(&format!("{last}.json"));
            }
        }
        Ok(url)
    }

    fn build(
        &self,
        request: &DocumentRequest,
    ) -> Result<reqwest::RequestBuilder, DocumentStoreError> {
        let url = self.url_for(&request.path)?;
        let mut builder = match request.method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
            Method::Delete => self.client.delete(url),
        }
        .header("Content-Type", "application/json");

        if let Some(filter) = &request.filter {
            // Firebase expects both parameters as JSON literals
            let order_by = Value::String(filter.field.clone()).to_string();
            let equal_to = filter.value.to_string();
            builder = builder.query(&[("orderBy", order_by), ("equalTo", equal_to)]);
        }

        if let Some(body) = &request.body {
            builder = builder.body(body.to_string());
        }

        Ok(builder)
    }
}

impl DocumentStore for FirebaseStore {
    fn execute(
        &self,
        request: DocumentRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Value, DocumentStoreError>> + Send + '_>> {
        Box::pin(async move {
            let response = self
                .build(&request)?
                .send()
                .await
                .map_err(|e| DocumentStoreError::RequestFailed(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                tracing::warn!(
                    method = %request.method,
                    path = %request.path,
                    status = status.as_u16(),
                    "Document store returned a non-success status"
                );
            }

            response
                .json::<Value>()
                .await
                .map_err(|e| DocumentStoreError::ResponseParseFailed(e.to_string()))
        })
    }
}
