//! Pantry reducer composing the form/list request, the filter controller and
//! the ingredient collection.
//!
//! The form and the list share one request consumer. Its correlation tag
//! decides what a successful response means:
//!
//! - `Add(ingredient)`: the body is `{name: <id>}`, and the ingredient is
//!   appended with that id
//! - `Remove(id)`: the ingredient with that id is deleted
//!
//! The filter owns a second, independent consumer whose results replace the
//! whole collection.

use crate::collection::{CollectionAction, CollectionReducer};
use crate::context::AuthContext;
use crate::request::{Phase, RequestAction, RequestReducer};
use crate::search::{SearchAction, SearchEnvironment, SearchReducer};
use crate::types::{
    INGREDIENTS_PATH, IngredientId, IngredientRequest, PantryAction, PantryState,
};
use pantry_core::async_effect;
use pantry_core::document_store::{DocumentRequest, DocumentStore};
use pantry_core::effect::Effect;
use pantry_core::reducer::Reducer;
use pantry_core::{SmallVec, smallvec};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Environment for the pantry containing dependencies
#[derive(Clone)]
pub struct PantryEnvironment {
    /// Store the form and list write to
    pub store: Arc<dyn DocumentStore>,
    /// Dependencies of the filter controller
    pub search: SearchEnvironment,
    /// Session context
    pub auth: AuthContext,
}

impl PantryEnvironment {
    /// Creates a new pantry environment
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, auth: AuthContext, debounce: Duration) -> Self {
        Self {
            search: SearchEnvironment::new(Arc::clone(&store), debounce),
            store,
            auth,
        }
    }
}

/// Reducer for the whole application
#[derive(Clone, Debug, Default)]
pub struct PantryReducer {
    request: RequestReducer<IngredientRequest>,
    search: SearchReducer,
    collection: CollectionReducer,
}

impl PantryReducer {
    /// Creates a new pantry reducer
    #[must_use]
    pub const fn new() -> Self {
        Self {
            request: RequestReducer::new(),
            search: SearchReducer::new(),
            collection: CollectionReducer::new(),
        }
    }

    fn send_request(
        &self,
        state: &mut PantryState,
        request: DocumentRequest,
        correlation: IngredientRequest,
        env: &PantryEnvironment,
    ) -> SmallVec<[Effect<PantryAction>; 4]> {
        self.delegate_request(
            state,
            RequestAction::Send {
                request,
                correlation,
            },
            env,
        )
    }

    fn delegate_request(
        &self,
        state: &mut PantryState,
        action: RequestAction<IngredientRequest>,
        env: &PantryEnvironment,
    ) -> SmallVec<[Effect<PantryAction>; 4]> {
        self.request
            .reduce(&mut state.request, action, &env.store)
            .into_iter()
            .map(|effect| effect.map(PantryAction::Request))
            .collect()
    }

    fn apply(&self, state: &mut PantryState, action: CollectionAction) {
        let _ = self.collection.reduce(&mut state.ingredients, action, &());
    }

    /// Collection change implied by a successful add/remove response
    fn completed(state: &PantryState) -> Option<CollectionAction> {
        match state.request.correlation.as_ref()? {
            IngredientRequest::Add(ingredient) => {
                let id = state
                    .request
                    .payload
                    .as_ref()
                    .and_then(|payload| payload.get("name"))
                    .and_then(Value::as_str);
                match id {
                    Some(id) => Some(CollectionAction::Add(
                        ingredient.clone().with_id(IngredientId::from(id)),
                    )),
                    None => {
                        tracing::warn!(
                            payload = ?state.request.payload,
                            "Add response carried no generated id"
                        );
                        None
                    },
                }
            },
            IngredientRequest::Remove(id) => Some(CollectionAction::Delete(id.clone())),
        }
    }
}

impl Reducer for PantryReducer {
    type State = PantryState;
    type Action = PantryAction;
    type Environment = PantryEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            PantryAction::AddIngredient(ingredient) => {
                let request = DocumentRequest::post(INGREDIENTS_PATH, ingredient.to_document());
                self.send_request(state, request, IngredientRequest::Add(ingredient), env)
            },
            PantryAction::RemoveIngredient(id) => {
                let request = DocumentRequest::delete(id.document_path());
                self.send_request(state, request, IngredientRequest::Remove(id), env)
            },
            PantryAction::DismissError => self.delegate_request(state, RequestAction::Clear, env),
            PantryAction::Request(action) => {
                let applies = matches!(
                    &action,
                    RequestAction::Responded { generation, .. }
                        if state.request.is_current(*generation)
                );

                let effects = self.delegate_request(state, action, env);

                if applies && state.request.phase == Phase::Responded {
                    if let Some(change) = Self::completed(state) {
                        self.apply(state, change);
                    }
                }
                effects
            },
            PantryAction::Search(SearchAction::ResultsLoaded(ingredients)) => {
                tracing::debug!(count = ingredients.len(), "Search results loaded");
                self.apply(state, CollectionAction::Set(ingredients));
                smallvec![Effect::None]
            },
            PantryAction::Search(action) => self
                .search
                .reduce(&mut state.search, action, &env.search)
                .into_iter()
                .map(|effect| effect.map(PantryAction::Search))
                .collect(),
            PantryAction::Collection(action) => {
                self.apply(state, action);
                smallvec![Effect::None]
            },
            PantryAction::Login => {
                let auth = env.auth.clone();
                smallvec![async_effect! {
                    auth.login();
                    None::<PantryAction>
                }]
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Ingredient, NewIngredient};
    use pantry_core::document_store::Method;
    use pantry_testing::{InMemoryDocumentStore, ReducerTest, assertions};
    use serde_json::json;

    fn env() -> PantryEnvironment {
        PantryEnvironment::new(
            Arc::new(InMemoryDocumentStore::new()),
            AuthContext::new(),
            Duration::from_millis(500),
        )
    }

    fn salt() -> NewIngredient {
        NewIngredient::new("Salt", "1")
    }

    fn listed(id: &str, title: &str) -> Ingredient {
        NewIngredient::new(title, "1").with_id(IngredientId::from(id))
    }

    /// State right after `action` was sent, with the request generation it was sent under
    fn after(action: PantryAction, given: PantryState) -> (PantryState, u64) {
        let mut state = given;
        let _ = PantryReducer::new().reduce(&mut state, action, &env());
        let generation = state.request.generation();
        (state, generation)
    }

    #[test]
    fn add_ingredient_posts_the_form() {
        ReducerTest::new(PantryReducer::new())
            .with_env(env())
            .given_state(PantryState::default())
            .when_action(PantryAction::AddIngredient(salt()))
            .then_state(|state| {
                assert!(state.request.is_loading());
                assert_eq!(state.request.correlation, Some(IngredientRequest::Add(salt())));
                assert!(state.ingredients.is_empty());
            })
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assertions::assert_has_document_request(effects, Method::Post, INGREDIENTS_PATH);
            })
            .run();
    }

    #[test]
    fn remove_ingredient_deletes_document() {
        ReducerTest::new(PantryReducer::new())
            .with_env(env())
            .given_state(PantryState::default())
            .when_action(PantryAction::RemoveIngredient(IngredientId::from("-Na")))
            .then_effects(|effects| {
                assertions::assert_has_document_request(effects, Method::Delete, "ingredients/-Na");
            })
            .run();
    }

    #[test]
    fn add_response_appends_with_generated_id() {
        let (given, generation) = after(PantryAction::AddIngredient(salt()), PantryState::default());

        ReducerTest::new(PantryReducer::new())
            .with_env(env())
            .given_state(given)
            .when_action(PantryAction::Request(RequestAction::Responded {
                generation,
                payload: json!({"name": "-Nsalt"}),
            }))
            .then_state(|state| {
                assert_eq!(state.request.phase, Phase::Responded);
                assert_eq!(state.ingredients, vec![listed("-Nsalt", "Salt")]);
            })
            .run();
    }

    #[test]
    fn remove_response_deletes_correlated_id() {
        let given = PantryState {
            ingredients: vec![listed("-Na", "Salt"), listed("-Nb", "Pepper")],
            ..PantryState::default()
        };
        let (given, generation) =
            after(PantryAction::RemoveIngredient(IngredientId::from("-Na")), given);

        ReducerTest::new(PantryReducer::new())
            .with_env(env())
            .given_state(given)
            .when_action(PantryAction::Request(RequestAction::Responded {
                generation,
                payload: Value::Null,
            }))
            .then_state(|state| {
                assert_eq!(state.ingredients, vec![listed("-Nb", "Pepper")]);
            })
            .run();
    }

    #[test]
    fn stale_add_response_is_not_applied() {
        let (given, first) = after(PantryAction::AddIngredient(salt()), PantryState::default());
        let (given, _) = after(
            PantryAction::RemoveIngredient(IngredientId::from("-Nz")),
            given,
        );

        ReducerTest::new(PantryReducer::new())
            .with_env(env())
            .given_state(given)
            .when_action(PantryAction::Request(RequestAction::Responded {
                generation: first,
                payload: json!({"name": "-Nsalt"}),
            }))
            .then_state(|state| {
                assert!(state.request.is_loading());
                assert!(state.ingredients.is_empty());
            })
            .run();
    }

    #[test]
    fn failed_request_surfaces_error_and_dismiss_clears_it() {
        let (given, generation) = after(PantryAction::AddIngredient(salt()), PantryState::default());
        let (failed, _) = after(
            PantryAction::Request(RequestAction::Failed {
                generation,
                message: "Request failed: offline".to_string(),
            }),
            given,
        );
        assert_eq!(failed.request.error.as_deref(), Some("Request failed: offline"));
        assert_eq!(failed.request.correlation, None);

        ReducerTest::new(PantryReducer::new())
            .with_env(env())
            .given_state(failed)
            .when_action(PantryAction::DismissError)
            .then_state(|state| {
                assert_eq!(state.request.phase, Phase::Idle);
                assert_eq!(state.request.error, None);
            })
            .run();
    }

    #[test]
    fn search_results_replace_collection() {
        ReducerTest::new(PantryReducer::new())
            .with_env(env())
            .given_state(PantryState {
                ingredients: vec![listed("-Na", "Salt")],
                ..PantryState::default()
            })
            .when_action(PantryAction::Search(SearchAction::ResultsLoaded(vec![listed(
                "-Nb", "Pepper",
            )])))
            .then_state(|state| {
                assert_eq!(state.ingredients, vec![listed("-Nb", "Pepper")]);
            })
            .run();
    }

    #[test]
    fn login_is_a_future_effect() {
        ReducerTest::new(PantryReducer::new())
            .with_env(env())
            .given_state(PantryState::default())
            .when_action(PantryAction::Login)
            .then_effects(|effects| assertions::assert_has_future_effect(effects))
            .run();
    }
}
