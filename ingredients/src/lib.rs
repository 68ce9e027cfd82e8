//! Ingredient pantry: a form, a debounced search and a list backed by a
//! Firebase document store.
//!
//! # Architecture
//!
//! 1. **Collection** ([`CollectionReducer`]): ordered list mutated by SET, ADD and DELETE
//! 2. **Request** ([`RequestReducer`]): lifecycle of one document store call with a correlation tag
//! 3. **Search** ([`SearchReducer`]): debounced filter issuing exact-title GETs
//! 4. **Pantry** ([`PantryReducer`]): composes the three and turns responses into collection changes
//!
//! # Example Usage
//!
//! ```no_run
//! use pantry_ingredients::{AuthContext, NewIngredient, PantryAction, PantryEnvironment, PantryReducer, PantryState};
//! use pantry_firebase::{FirebaseConfig, FirebaseStore};
//! use pantry_runtime::Store;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let documents = FirebaseStore::new(FirebaseConfig::new("https://example.firebaseio.com"))?;
//! let env = PantryEnvironment::new(Arc::new(documents), AuthContext::new(), Duration::from_millis(500));
//!
//! let store = Store::new(PantryState::default(), PantryReducer::new(), env);
//!
//! let mut handle = store
//!     .send(PantryAction::AddIngredient(NewIngredient::new("Salt", "1")))
//!     .await?;
//! handle.wait().await;
//!
//! let count = store.state(|s| s.ingredients.len()).await;
//! # Ok(())
//! # }
//! ```

pub mod collection;
pub mod command;
pub mod config;
pub mod context;
pub mod reducer;
pub mod request;
pub mod search;
pub mod types;
pub mod view;

// Re-export commonly used types
pub use collection::{CollectionAction, CollectionReducer};
pub use command::Command;
pub use config::{ConfigError, PantryConfig};
pub use context::AuthContext;
pub use reducer::{PantryEnvironment, PantryReducer};
pub use request::{Phase, RequestAction, RequestReducer, RequestState};
pub use search::{SEARCH_DEBOUNCE, SearchAction, SearchEnvironment, SearchReducer, SearchState};
pub use types::{
    Amount, Ingredient, IngredientCollection, IngredientId, IngredientRequest, NewIngredient,
    PantryAction, PantryState,
};
