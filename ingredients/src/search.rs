//! Debounced filter controller.
//!
//! Each edit of the filter text restarts a quiet-period timer registered
//! under [`SEARCH_DEBOUNCE`]. Only when the timer elapses, and the text it
//! carries is still the current text of the current edit, is a GET issued.
//! A successful GET is decoded once into a list of ingredients and reported
//! as [`SearchAction::ResultsLoaded`].

use crate::request::{Phase, RequestAction, RequestReducer, RequestState};
use crate::types::{INGREDIENTS_PATH, IngredientCollection, decode_ingredients};
use pantry_core::document_store::{DocumentRequest, DocumentStore};
use pantry_core::effect::{Effect, EffectId};
use pantry_core::reducer::Reducer;
use pantry_core::{SmallVec, async_effect, delay, smallvec};
use std::sync::Arc;
use std::time::Duration;

/// Id of the pending debounce timer
pub const SEARCH_DEBOUNCE: EffectId = EffectId::new("search-debounce");

/// Quiet period used when none is configured
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Correlation tag of a search request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchQuery {
    /// Filter text the request was issued for
    pub filter: String,
}

impl SearchQuery {
    /// Document request for this filter
    ///
    /// Empty text lists everything; anything else is an exact match on `title`.
    #[must_use]
    pub fn to_request(&self) -> DocumentRequest {
        let request = DocumentRequest::get(INGREDIENTS_PATH);
        if self.filter.is_empty() {
            request
        } else {
            request.filter_equal("title", self.filter.as_str())
        }
    }
}

/// Filter input and its request
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SearchState {
    /// Live content of the filter input
    pub filter: String,
    /// Bumped on every edit
    pub generation: u64,
    /// Search request lifecycle
    pub request: RequestState<SearchQuery>,
}

/// Actions of the filter controller
#[derive(Clone, Debug)]
pub enum SearchAction {
    /// The filter input changed
    FilterChanged(String),
    /// A quiet period ended
    DebounceElapsed {
        /// Text that started the timer
        text: String,
        /// Edit generation that started the timer
        generation: u64,
    },
    /// The filter is going away; drop any pending timer
    Teardown,
    /// Search request lifecycle
    Request(RequestAction<SearchQuery>),
    /// A search finished with these ingredients
    ResultsLoaded(IngredientCollection),
    /// Error modal of the filter closed
    DismissError,
}

/// Dependencies of the filter controller
#[derive(Clone)]
pub struct SearchEnvironment {
    /// Store searched
    pub store: Arc<dyn DocumentStore>,
    /// Quiet period before a search is issued
    pub debounce: Duration,
}

impl SearchEnvironment {
    /// Creates a new search environment
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, debounce: Duration) -> Self {
        Self { store, debounce }
    }
}

/// Reducer for [`SearchState`]
#[derive(Clone, Debug, Default)]
pub struct SearchReducer {
    request: RequestReducer<SearchQuery>,
}

impl SearchReducer {
    /// Creates a new search reducer
    #[must_use]
    pub const fn new() -> Self {
        Self {
            request: RequestReducer::new(),
        }
    }

    fn delegate(
        &self,
        state: &mut SearchState,
        action: RequestAction<SearchQuery>,
        env: &SearchEnvironment,
    ) -> SmallVec<[Effect<SearchAction>; 4]> {
        self.request
            .reduce(&mut state.request, action, &env.store)
            .into_iter()
            .map(|effect| effect.map(SearchAction::Request))
            .collect()
    }
}

impl Reducer for SearchReducer {
    type State = SearchState;
    type Action = SearchAction;
    type Environment = SearchEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            SearchAction::FilterChanged(text) => {
                state.generation += 1;
                state.filter.clone_from(&text);

                let generation = state.generation;
                smallvec![delay! {
                    duration: env.debounce,
                    action: SearchAction::DebounceElapsed { text, generation }
                }
                .cancellable(SEARCH_DEBOUNCE)]
            },
            SearchAction::DebounceElapsed { text, generation } => {
                if generation != state.generation || text != state.filter {
                    tracing::debug!(
                        generation,
                        current = state.generation,
                        "Ignoring superseded filter"
                    );
                    return smallvec![Effect::None];
                }

                let query = SearchQuery { filter: text };
                let request = query.to_request();
                self.delegate(
                    state,
                    RequestAction::Send {
                        request,
                        correlation: query,
                    },
                    env,
                )
            },
            SearchAction::Teardown => smallvec![Effect::Cancel(SEARCH_DEBOUNCE)],
            SearchAction::Request(action) => {
                let applies = match &action {
                    RequestAction::Responded { generation, .. } => {
                        state.request.is_current(*generation)
                    },
                    _ => false,
                };

                let mut effects = self.delegate(state, action, env);

                if applies && state.request.phase == Phase::Responded {
                    let payload = state.request.payload.clone().unwrap_or_default();
                    match decode_ingredients(&payload) {
                        Ok(ingredients) => {
                            effects.push(async_effect! {
                                Some(SearchAction::ResultsLoaded(ingredients))
                            });
                        },
                        Err(error) => {
                            tracing::warn!(error = %error, "Search response was not an ingredient map");
                        },
                    }
                }

                effects
            },
            // Consumed by the parent reducer
            SearchAction::ResultsLoaded(_) => smallvec![Effect::None],
            SearchAction::DismissError => self.delegate(state, RequestAction::Clear, env),
        }
    }
}
