//! # Firebase Document Store
//!
//! [`DocumentStore`](pantry_core::document_store::DocumentStore) implementation
//! backed by the Firebase Realtime Database REST API.
//!
//! ## Example
//!
//! ```no_run
//! use pantry_core::document_store::{DocumentRequest, DocumentStore};
//! use pantry_firebase::{FirebaseConfig, FirebaseStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = FirebaseStore::new(FirebaseConfig::new("https://example.firebaseio.com"))?;
//!
//!     let salt = store
//!         .execute(DocumentRequest::get("ingredients").filter_equal("title", "Salt"))
//!         .await?;
//!
//!     println!("{salt}");
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod error;

pub use client::{FirebaseConfig, FirebaseStore};
pub use error::FirebaseError;
