//! # Pantry Core
//!
//! Core traits and types for the Pantry reducer architecture.
//!
//! This crate provides the fundamental abstractions for building small,
//! effect-driven applications using the Reducer pattern.
//!
//! ## Core Concepts
//!
//! - **State**: Domain state for a feature
//! - **Action**: All possible inputs to a reducer (user intents, effect outcomes)
//! - **Reducer**: Pure function `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: Side effect descriptions (not execution)
//! - **Environment**: Injected dependencies (document store, configuration)
//!
//! ## Architecture Principles
//!
//! - Functional Core, Imperative Shell
//! - Unidirectional Data Flow
//! - Explicit Effects (no hidden I/O)
//! - Dependency Injection via Environment
//!
//! ## Example
//!
//! ```
//! use pantry_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};
//!
//! #[derive(Clone, Debug, Default)]
//! struct CounterState {
//!     count: i64,
//! }
//!
//! #[derive(Clone, Debug)]
//! enum CounterAction {
//!     Increment,
//! }
//!
//! struct CounterReducer;
//!
//! impl Reducer for CounterReducer {
//!     type State = CounterState;
//!     type Action = CounterAction;
//!     type Environment = ();
//!
//!     fn reduce(
//!         &self,
//!         state: &mut CounterState,
//!         action: CounterAction,
//!         _env: &(),
//!     ) -> SmallVec<[Effect<CounterAction>; 4]> {
//!         match action {
//!             CounterAction::Increment => state.count += 1,
//!         }
//!         smallvec![Effect::None]
//!     }
//! }
//!
//! let mut state = CounterState::default();
//! CounterReducer.reduce(&mut state, CounterAction::Increment, &());
//! assert_eq!(state.count, 1);
//! ```

pub use smallvec::{SmallVec, smallvec};

/// Document store abstraction (remote JSON documents over HTTP)
pub mod document_store;

/// Declarative macros for building effects
pub mod effect_macros;

/// Reducer module - The core trait for business logic
///
/// Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`
///
/// They contain all business logic and are deterministic and testable.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// The Reducer trait - core abstraction for business logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The domain state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// This is a pure function that:
        /// 1. Updates state in place
        /// 2. Returns effect descriptions to be executed
        ///
        /// # Arguments
        ///
        /// - `state`: Mutable reference to current state
        /// - `action`: The action to process
        /// - `env`: Reference to injected dependencies
        ///
        /// # Returns
        ///
        /// Effects to be executed by the runtime
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect module - Side effect descriptions
///
/// Effects describe side effects to be performed by the runtime.
/// They are values (not execution) and are composable and cancellable.
pub mod effect {
    use crate::document_store::{DocumentRequest, DocumentStore, DocumentStoreError};
    use std::borrow::Cow;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Arc;
    use std::time::Duration;

    /// Callback turning a successful document store response into an action
    pub type OnSuccess<Action> = Box<dyn FnOnce(serde_json::Value) -> Option<Action> + Send>;

    /// Callback turning a document store failure into an action
    pub type OnError<Action> = Box<dyn FnOnce(DocumentStoreError) -> Option<Action> + Send>;

    /// Identifier for a cancellable effect
    ///
    /// Starting a [`Effect::Cancellable`] with an id that is already in flight
    /// aborts the previous task. [`Effect::Cancel`] aborts it explicitly.
    #[derive(Clone, Debug, PartialEq, Eq, Hash)]
    pub struct EffectId(Cow<'static, str>);

    impl EffectId {
        /// Create an id from a static name
        #[must_use]
        pub const fn new(name: &'static str) -> Self {
            Self(Cow::Borrowed(name))
        }

        /// The id as a string slice
        #[must_use]
        pub fn as_str(&self) -> &str {
            &self.0
        }
    }

    impl From<String> for EffectId {
        fn from(name: String) -> Self {
            Self(Cow::Owned(name))
        }
    }

    impl std::fmt::Display for EffectId {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(&self.0)
        }
    }

    /// A single call against a [`DocumentStore`]
    ///
    /// The runtime executes the request exactly once (no retries) and feeds
    /// the action produced by `on_success` or `on_error` back into the store.
    pub struct DocumentStoreOperation<Action> {
        /// Store to call
        pub store: Arc<dyn DocumentStore>,
        /// Request to issue
        pub request: DocumentRequest,
        /// Maps the parsed JSON body to a follow-up action
        pub on_success: OnSuccess<Action>,
        /// Maps the failure to a follow-up action
        pub on_error: OnError<Action>,
    }

    /// Effect type - describes a side effect to be executed
    ///
    /// Effects are NOT executed immediately. They are descriptions of what should happen,
    /// returned from reducers and executed by the Store runtime.
    ///
    /// # Type Parameters
    ///
    /// - `Action`: The action type that effects can produce (feedback loop)
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Run effects in parallel
        Parallel(Vec<Effect<Action>>),

        /// Run effects sequentially
        Sequential(Vec<Effect<Action>>),

        /// Delayed action (for timeouts, debouncing)
        Delay {
            /// How long to wait
            duration: Duration,
            /// Action to dispatch after delay
            action: Box<Action>,
        },

        /// Arbitrary async computation
        ///
        /// Returns `Option<Action>` - if Some, the action is fed back into the reducer
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),

        /// Remote document store call
        DocumentStore(DocumentStoreOperation<Action>),

        /// Run `effect` as a task that can be cancelled by `id`
        ///
        /// Any task already registered under the same id is aborted first.
        Cancellable {
            /// Cancellation key
            id: EffectId,
            /// Effect to run
            effect: Box<Effect<Action>>,
        },

        /// Abort the task registered under the id, if any
        Cancel(EffectId),
    }

    // Manual Debug implementation since Future and callbacks don't implement Debug
    impl<Action> std::fmt::Debug for Effect<Action>
    where
        Action: std::fmt::Debug,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Parallel(effects) => {
                    f.debug_tuple("Effect::Parallel").field(effects).finish()
                },
                Effect::Sequential(effects) => {
                    f.debug_tuple("Effect::Sequential").field(effects).finish()
                },
                Effect::Delay { duration, action } => f
                    .debug_struct("Effect::Delay")
                    .field("duration", duration)
                    .field("action", action)
                    .finish(),
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
                Effect::DocumentStore(op) => f
                    .debug_struct("Effect::DocumentStore")
                    .field("request", &op.request)
                    .finish_non_exhaustive(),
                Effect::Cancellable { id, effect } => f
                    .debug_struct("Effect::Cancellable")
                    .field("id", id)
                    .field("effect", effect)
                    .finish(),
                Effect::Cancel(id) => f.debug_tuple("Effect::Cancel").field(id).finish(),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Wrap this effect so it can be cancelled by `id`
        #[must_use]
        pub fn cancellable(self, id: EffectId) -> Effect<Action> {
            Effect::Cancellable {
                id,
                effect: Box::new(self),
            }
        }
    }

    impl<Action: Send + 'static> Effect<Action> {
        /// Transform every action this effect can produce
        ///
        /// Used by parent reducers to embed a child reducer's effects into
        /// their own action type.
        ///
        /// # Example
        ///
        /// ```
        /// use pantry_core::effect::Effect;
        /// use std::time::Duration;
        ///
        /// #[derive(Debug)]
        /// enum Child { Tick }
        /// #[derive(Debug)]
        /// enum Parent { Child(Child) }
        ///
        /// let effect = Effect::Delay {
        ///     duration: Duration::from_millis(10),
        ///     action: Box::new(Child::Tick),
        /// };
        /// let mapped: Effect<Parent> = effect.map(Parent::Child);
        /// assert!(matches!(mapped, Effect::Delay { .. }));
        /// ```
        #[must_use]
        pub fn map<B, F>(self, f: F) -> Effect<B>
        where
            B: Send + 'static,
            F: Fn(Action) -> B + Send + Sync + 'static,
        {
            self.map_shared(Arc::new(f))
        }

        fn map_shared<B>(self, f: Arc<dyn Fn(Action) -> B + Send + Sync>) -> Effect<B>
        where
            B: Send + 'static,
        {
            match self {
                Effect::None => Effect::None,
                Effect::Parallel(effects) => Effect::Parallel(
                    effects
                        .into_iter()
                        .map(|effect| effect.map_shared(Arc::clone(&f)))
                        .collect(),
                ),
                Effect::Sequential(effects) => Effect::Sequential(
                    effects
                        .into_iter()
                        .map(|effect| effect.map_shared(Arc::clone(&f)))
                        .collect(),
                ),
                Effect::Delay { duration, action } => Effect::Delay {
                    duration,
                    action: Box::new(f(*action)),
                },
                Effect::Future(fut) => {
                    Effect::Future(Box::pin(async move { fut.await.map(&*f) }))
                },
                Effect::DocumentStore(op) => {
                    let on_error_map = Arc::clone(&f);
                    let DocumentStoreOperation {
                        store,
                        request,
                        on_success,
                        on_error,
                    } = op;
                    Effect::DocumentStore(DocumentStoreOperation {
                        store,
                        request,
                        on_success: Box::new(move |body| on_success(body).map(&*f)),
                        on_error: Box::new(move |error| on_error(error).map(&*on_error_map)),
                    })
                },
                Effect::Cancellable { id, effect } => Effect::Cancellable {
                    id,
                    effect: Box::new(effect.map_shared(f)),
                },
                Effect::Cancel(id) => Effect::Cancel(id),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::effect::{Effect, EffectId};
    use std::time::Duration;

    #[derive(Debug, PartialEq)]
    enum Inner {
        Ping(u32),
    }

    #[derive(Debug, PartialEq)]
    enum Outer {
        Inner(Inner),
    }

    #[test]
    fn effect_id_display() {
        let id = EffectId::new("search-debounce");
        assert_eq!(id.to_string(), "search-debounce");
        assert_eq!(id, EffectId::from("search-debounce".to_string()));
    }

    #[test]
    fn map_rewrites_delay_action() {
        let effect = Effect::Delay {
            duration: Duration::from_millis(5),
            action: Box::new(Inner::Ping(1)),
        };

        match effect.map(Outer::Inner) {
            Effect::Delay { duration, action } => {
                assert_eq!(duration, Duration::from_millis(5));
                assert_eq!(*action, Outer::Inner(Inner::Ping(1)));
            },
            other => unreachable!("unexpected effect: {other:?}"),
        }
    }

    #[test]
    fn map_keeps_cancellation_id() {
        let effect = Effect::Delay {
            duration: Duration::from_millis(5),
            action: Box::new(Inner::Ping(2)),
        }
        .cancellable(EffectId::new("debounce"));

        match effect.map(Outer::Inner) {
            Effect::Cancellable { id, effect } => {
                assert_eq!(id.as_str(), "debounce");
                assert!(matches!(*effect, Effect::Delay { .. }));
            },
            other => unreachable!("unexpected effect: {other:?}"),
        }
    }

    #[tokio::test]
    async fn map_wraps_future_output() {
        let effect: Effect<Inner> = Effect::Future(Box::pin(async { Some(Inner::Ping(3)) }));

        match effect.map(Outer::Inner) {
            Effect::Future(fut) => assert_eq!(fut.await, Some(Outer::Inner(Inner::Ping(3)))),
            other => unreachable!("unexpected effect: {other:?}"),
        }
    }
}
