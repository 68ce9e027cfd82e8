//! Request state machine.
//!
//! Tracks the lifecycle of one document store call at a time:
//!
//! ```text
//! Idle ──Send──▶ Sending ──Responded──▶ Responded
//!                   │
//!                   └──────Failed─────▶ Error
//!
//! any phase ──Clear──▶ Idle
//! ```
//!
//! Every `Send` starts a new generation. Outcomes are tagged with the
//! generation they were issued under, and outcomes of an older generation are
//! ignored, so a slow superseded call can never overwrite a newer one. The
//! superseded call itself still runs to completion.

use pantry_core::document_request;
use pantry_core::document_store::{DocumentRequest, DocumentStore};
use pantry_core::effect::Effect;
use pantry_core::reducer::Reducer;
use pantry_core::{SmallVec, smallvec};
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;

/// Lifecycle phase of a request
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Phase {
    /// Nothing in flight
    #[default]
    Idle,
    /// Request issued, waiting for the outcome
    Sending,
    /// Response received and parsed
    Responded,
    /// Transport or parse failure
    Error,
}

/// State of one request consumer
///
/// `T` is the correlation tag: an opaque value the caller attaches to `Send`
/// to recognise which logical operation a later response belongs to.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestState<T> {
    /// Current phase
    pub phase: Phase,
    /// Parsed response body (only while `Responded`)
    pub payload: Option<Value>,
    /// Failure message (only while `Error`)
    pub error: Option<String>,
    /// Tag of the current request; dropped on failure
    pub correlation: Option<T>,
    generation: u64,
}

impl<T> Default for RequestState<T> {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            payload: None,
            error: None,
            correlation: None,
            generation: 0,
        }
    }
}

impl<T> RequestState<T> {
    /// Whether a request is in flight
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.phase == Phase::Sending
    }

    /// Generation of the most recent `Send` or `Clear`
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether an outcome issued under `generation` would still be applied
    #[must_use]
    pub const fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }
}

/// Actions of the request state machine
#[derive(Clone, Debug)]
pub enum RequestAction<T> {
    /// Issue `request`, remembering `correlation`
    Send {
        /// Call to perform
        request: DocumentRequest,
        /// Caller's tag for this call
        correlation: T,
    },
    /// The call issued under `generation` returned a JSON body
    Responded {
        /// Generation the call was issued under
        generation: u64,
        /// Parsed body
        payload: Value,
    },
    /// The call issued under `generation` failed
    Failed {
        /// Generation the call was issued under
        generation: u64,
        /// Human-readable message
        message: String,
    },
    /// Reset to idle
    Clear,
}

/// Reducer for [`RequestState`]
///
/// The environment is the document store the call is issued against.
pub struct RequestReducer<T>(PhantomData<fn() -> T>);

impl<T> RequestReducer<T> {
    /// Creates a new request reducer
    #[must_use]
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Clone for RequestReducer<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> Default for RequestReducer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for RequestReducer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("RequestReducer")
    }
}

impl<T> Reducer for RequestReducer<T>
where
    T: Clone + Send + 'static,
{
    type State = RequestState<T>;
    type Action = RequestAction<T>;
    type Environment = Arc<dyn DocumentStore>;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            RequestAction::Send {
                request,
                correlation,
            } => {
                state.generation += 1;
                state.phase = Phase::Sending;
                state.payload = None;
                state.error = None;
                state.correlation = Some(correlation);

                let generation = state.generation;
                tracing::debug!(
                    generation,
                    method = %request.method,
                    path = %request.path,
                    "Request sending"
                );

                smallvec![document_request! {
                    store: *env,
                    request: request,
                    on_success: |payload| Some(RequestAction::Responded { generation, payload }),
                    on_error: |error| Some(RequestAction::Failed {
                        generation,
                        message: error.to_string(),
                    })
                }]
            },
            RequestAction::Responded {
                generation,
                payload,
            } => {
                if !state.is_current(generation) {
                    tracing::debug!(
                        generation,
                        current = state.generation,
                        "Ignoring stale response"
                    );
                    return smallvec![Effect::None];
                }

                tracing::debug!(generation, "Request responded");
                state.phase = Phase::Responded;
                state.payload = Some(payload);
                smallvec![Effect::None]
            },
            RequestAction::Failed {
                generation,
                message,
            } => {
                if !state.is_current(generation) {
                    tracing::debug!(
                        generation,
                        current = state.generation,
                        "Ignoring stale failure"
                    );
                    return smallvec![Effect::None];
                }

                tracing::debug!(generation, error = %message, "Request failed");
                state.phase = Phase::Error;
                state.payload = None;
                state.error = Some(message);
                state.correlation = None;
                smallvec![Effect::None]
            },
            RequestAction::Clear => {
                // The counter survives so outcomes of calls issued before the clear stay stale
                let generation = state.generation + 1;
                *state = RequestState {
                    generation,
                    ..RequestState::default()
                };
                smallvec![Effect::None]
            },
        }
    }
}
