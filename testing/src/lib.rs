//! # Pantry Testing
//!
//! Testing utilities and helpers for the Pantry reducer architecture.
//!
//! This crate provides:
//! - [`InMemoryDocumentStore`]: a deterministic stand-in for the remote document store
//! - [`ReducerTest`]: Given-When-Then harness for reducers
//! - Assertion helpers for effects
//!
//! ## Example
//!
//! ```ignore
//! use pantry_testing::InMemoryDocumentStore;
//! use pantry_runtime::Store;
//!
//! #[tokio::test]
//! async fn add_ingredient() {
//!     let documents = Arc::new(InMemoryDocumentStore::new());
//!     let store = Store::new(PantryState::default(), PantryReducer, env(&documents));
//!
//!     store.send(PantryAction::AddIngredient(salt())).await?;
//!
//!     assert_eq!(documents.collection_len("ingredients"), 1);
//! }
//! ```

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Lock poisoning only follows a panicking test


pub use reducer_test::{ReducerTest, assertions};

/// Mock implementations of environment traits
pub mod mocks {
    use pantry_core::document_store::{
        DocumentRequest, DocumentStore, DocumentStoreError, EqualityFilter, Method, is_valid_key,
    };
    use serde_json::{Map, Value, json};
    use std::collections::{BTreeMap, HashMap, VecDeque};
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Arc, Mutex, RwLock};
    use std::time::Duration;

    type Collection = BTreeMap<String, Value>;

    /// In-memory document store for fast, deterministic testing.
    ///
    /// Models the subset of a Firebase-style JSON tree the app uses:
    /// - `POST <collection>` stores the body under a generated key and returns `{"name": key}`
    /// - `GET <collection>` returns every child, or `null` when the collection is empty
    /// - `GET <collection>` with an equality filter returns the matching children (`{}` if none)
    /// - `DELETE <collection>/<key>` removes the child and returns `null`
    /// - a path with an invalid key fails with `RequestFailed` and changes nothing
    ///
    /// Responses can be scripted ahead of time with [`respond_with`](Self::respond_with)
    /// and [`fail_next`](Self::fail_next), and individual requests can be held back with
    /// [`delay_next`](Self::delay_next) to reproduce out-of-order completions.
    ///
    /// # Example
    ///
    /// ```
    /// use pantry_core::document_store::{DocumentRequest, DocumentStore};
    /// use pantry_testing::InMemoryDocumentStore;
    /// use serde_json::json;
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let store = InMemoryDocumentStore::new();
    ///
    /// let created = store
    ///     .execute(DocumentRequest::post("ingredients", json!({"title": "Salt", "amount": "2"})))
    ///     .await?;
    /// assert!(created["name"].is_string());
    ///
    /// let listed = store.execute(DocumentRequest::get("ingredients")).await?;
    /// assert_eq!(listed.as_object().map(|m| m.len()), Some(1));
    /// # Ok(())
    /// # }
    /// ```
    #[derive(Clone, Debug, Default)]
    pub struct InMemoryDocumentStore {
        collections: Arc<RwLock<HashMap<String, Collection>>>,
        requests: Arc<Mutex<Vec<DocumentRequest>>>,
        scripted: Arc<Mutex<VecDeque<Result<Value, DocumentStoreError>>>>,
        delays: Arc<Mutex<VecDeque<Duration>>>,
        next_key: Arc<AtomicU64>,
    }

    impl InMemoryDocumentStore {
        /// Create a new empty store
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Insert a document under a known key
        pub fn insert(&self, collection: &str, key: &str, document: Value) {
            self.collections
                .write()
                .unwrap()
                .entry(collection.to_string())
                .or_default()
                .insert(key.to_string(), document);
        }

        /// Number of documents stored in `collection`
        #[must_use]
        pub fn collection_len(&self, collection: &str) -> usize {
            self.collections
                .read()
                .unwrap()
                .get(collection)
                .map_or(0, BTreeMap::len)
        }

        /// Look up a stored document
        #[must_use]
        pub fn document(&self, collection: &str, key: &str) -> Option<Value> {
            self.collections
                .read()
                .unwrap()
                .get(collection)
                .and_then(|docs| docs.get(key).cloned())
        }

        /// Every request received so far, in arrival order
        #[must_use]
        pub fn requests(&self) -> Vec<DocumentRequest> {
            self.requests.lock().unwrap().clone()
        }

        /// Requests received so far with the given method
        #[must_use]
        pub fn requests_with_method(&self, method: Method) -> Vec<DocumentRequest> {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .filter(|request| request.method == method)
                .cloned()
                .collect()
        }

        /// Answer the next request with `response` instead of touching the tree
        pub fn respond_with(&self, response: Result<Value, DocumentStoreError>) {
            self.scripted.lock().unwrap().push_back(response);
        }

        /// Fail the next request with a transport error
        pub fn fail_next(&self, message: &str) {
            self.respond_with(Err(DocumentStoreError::RequestFailed(message.to_string())));
        }

        /// Hold the next request back for `delay` before answering
        ///
        /// Delays are consumed in arrival order, one per request. The answer is
        /// computed after the delay elapses.
        pub fn delay_next(&self, delay: Duration) {
            self.delays.lock().unwrap().push_back(delay);
        }

        fn generate_key(&self) -> String {
            let n = self.next_key.fetch_add(1, Ordering::SeqCst);
            format!("-Pantry{n:08}")
        }

        fn apply(&self, request: &DocumentRequest) -> Value {
            let (collection, key) = match request.path.split_once('/') {
                Some((collection, key)) => (collection, Some(key)),
                None => (request.path.as_str(), None),
            };

            match (request.method, key) {
                (Method::Post, _) => {
                    let key = self.generate_key();
                    let body = request.body.clone().unwrap_or(Value::Null);
                    self.insert(collection, &key, body);
                    json!({ "name": key })
                },
                (Method::Delete, Some(key)) => {
                    if let Some(docs) = self.collections.write().unwrap().get_mut(collection) {
                        docs.remove(key);
                    }
                    Value::Null
                },
                (Method::Delete, None) => {
                    self.collections.write().unwrap().remove(collection);
                    Value::Null
                },
                (Method::Get, Some(key)) => {
                    self.document(collection, key).unwrap_or(Value::Null)
                },
                (Method::Get, None) => {
                    let collections = self.collections.read().unwrap();
                    let docs = collections.get(collection);
                    match &request.filter {
                        Some(filter) => Value::Object(matching(docs, filter)),
                        None => match docs {
                            Some(docs) if !docs.is_empty() => Value::Object(
                                docs.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
                            ),
                            _ => Value::Null,
                        },
                    }
                },
            }
        }
    }

    fn matching(docs: Option<&Collection>, filter: &EqualityFilter) -> Map<String, Value> {
        docs.into_iter()
            .flatten()
            .filter(|(_, doc)| doc.get(&filter.field) == Some(&filter.value))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    impl DocumentStore for InMemoryDocumentStore {
        fn execute(
            &self,
            request: DocumentRequest,
        ) -> Pin<Box<dyn Future<Output = Result<Value, DocumentStoreError>> + Send + '_>> {
            Box::pin(async move {
                self.requests.lock().unwrap().push(request.clone());

                if let Some(key) = request.path.split('/').find(|key| !is_valid_key(key)) {
                    return Err(DocumentStoreError::RequestFailed(format!(
                        "invalid document key `{key}` in path `{}`",
                        request.path
                    )));
                }

                let delay = self.delays.lock().unwrap().pop_front();
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }

                let scripted = self.scripted.lock().unwrap().pop_front();
                match scripted {
                    Some(response) => response,
                    None => Ok(self.apply(&request)),
                }
            })
        }
    }
}

// Re-export commonly used items
pub use mocks::InMemoryDocumentStore;
