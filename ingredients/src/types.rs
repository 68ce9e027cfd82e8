//! Core domain types for the ingredient pantry.
//!
//! Ingredients live in the remote document store under [`INGREDIENTS_PATH`],
//! keyed by a server-generated id. Locally they are kept as an ordered list
//! that is only ever replaced, appended to, or filtered by id.

use crate::collection::CollectionAction;
use crate::request::{RequestAction, RequestState};
use crate::search::{SearchAction, SearchState};
use pantry_core::document_store::DocumentStoreError;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;

/// Document store path holding every ingredient
pub const INGREDIENTS_PATH: &str = "ingredients";

/// Identifier assigned by the document store
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IngredientId(String);

impl IngredientId {
    /// Creates a new `IngredientId` from a string
    #[must_use]
    pub const fn new(id: String) -> Self {
        Self(id)
    }

    /// Returns the inner string value
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Document path of this ingredient
    #[must_use]
    pub fn document_path(&self) -> String {
        format!("{INGREDIENTS_PATH}/{}", self.0)
    }
}

impl fmt::Display for IngredientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for IngredientId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Quantity of an ingredient
///
/// The form submits text, but documents written by other clients may hold a
/// JSON number. Both shapes are kept as-is.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Amount {
    /// Amount as entered, e.g. `"2"`
    Text(String),
    /// Numeric amount
    Number(serde_json::Number),
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Number(number) => write!(f, "{number}"),
        }
    }
}

impl From<&str> for Amount {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

/// Form payload, and the document body stored remotely
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewIngredient {
    /// Display name, also the field exact-match search runs against
    pub title: String,
    /// Quantity
    pub amount: Amount,
}

impl NewIngredient {
    /// Creates a new form payload
    #[must_use]
    pub fn new(title: impl Into<String>, amount: impl Into<Amount>) -> Self {
        Self {
            title: title.into(),
            amount: amount.into(),
        }
    }

    /// JSON body sent to the document store
    #[must_use]
    pub fn to_document(&self) -> Value {
        json!({ "title": self.title, "amount": self.amount })
    }

    /// Attach the id the document store generated for this payload
    #[must_use]
    pub fn with_id(self, id: IngredientId) -> Ingredient {
        Ingredient {
            id,
            title: self.title,
            amount: self.amount,
        }
    }
}

/// A stored ingredient
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    /// Server-assigned id, immutable
    pub id: IngredientId,
    /// Display name
    pub title: String,
    /// Quantity
    pub amount: Amount,
}

/// Ordered list of ingredients shown to the user
pub type IngredientCollection = Vec<Ingredient>;

/// Convert a `{key: {title, amount}}` document map into ingredients
///
/// `null` (an empty collection) yields an empty list. Entries that do not
/// decode are skipped and logged.
///
/// # Errors
///
/// Returns `ResponseParseFailed` if `payload` is neither an object nor `null`.
pub fn decode_ingredients(payload: &Value) -> Result<IngredientCollection, DocumentStoreError> {
    let documents = match payload {
        Value::Null => return Ok(Vec::new()),
        Value::Object(documents) => documents,
        other => {
            return Err(DocumentStoreError::ResponseParseFailed(format!(
                "expected an object of ingredients, got {other}"
            )));
        },
    };

    Ok(documents
        .iter()
        .filter_map(|(key, document)| {
            match serde_json::from_value::<NewIngredient>(document.clone()) {
                Ok(ingredient) => Some(ingredient.with_id(IngredientId::from(key.as_str()))),
                Err(error) => {
                    tracing::warn!(key = %key, error = %error, "Skipping undecodable ingredient");
                    None
                },
            }
        })
        .collect())
}

/// Which logical operation the form/list request belongs to
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IngredientRequest {
    /// Creating the carried ingredient
    Add(NewIngredient),
    /// Deleting the ingredient with this id
    Remove(IngredientId),
}

/// Application state
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PantryState {
    /// Ingredients currently listed
    pub ingredients: IngredientCollection,
    /// Add/remove request driven by the form and the list
    pub request: RequestState<IngredientRequest>,
    /// Filter input and its search request
    pub search: SearchState,
}

/// Application actions
#[derive(Clone, Debug)]
pub enum PantryAction {
    /// Form submitted
    AddIngredient(NewIngredient),
    /// List item clicked
    RemoveIngredient(IngredientId),
    /// Error modal of the form/list closed
    DismissError,
    /// Outcome of the add/remove request
    Request(RequestAction<IngredientRequest>),
    /// Filter input and search lifecycle
    Search(SearchAction),
    /// Direct collection update
    Collection(CollectionAction),
    /// Mark the session as authenticated
    Login,
}
