//! Declarative macros for ergonomic effect construction
//!
//! These macros reduce boilerplate when creating `Effect` variants, particularly
//! for document store calls.

/// Create an `Effect::DocumentStore` operation
///
/// # Example
///
/// ```rust,ignore
/// use pantry_core::document_request;
///
/// document_request! {
///     store: env.store,
///     request: DocumentRequest::get("ingredients"),
///     on_success: |body| Some(Action::Loaded { body }),
///     on_error: |error| Some(Action::Failed { message: error.to_string() })
/// }
/// ```
#[macro_export]
macro_rules! document_request {
    (
        store: $store:expr,
        request: $request:expr,
        on_success: |$success_param:ident| $success_body:expr,
        on_error: |$error_param:ident| $error_body:expr
    ) => {
        $crate::effect::Effect::DocumentStore($crate::effect::DocumentStoreOperation {
            store: {
                let store: ::std::sync::Arc<_> = ::std::sync::Arc::clone(&$store);
                store
            },
            request: $request,
            on_success: ::std::boxed::Box::new(move |$success_param| $success_body),
            on_error: ::std::boxed::Box::new(move |$error_param| $error_body),
        })
    };
}

/// Create an `Effect::Future` from an async block
///
/// # Example
///
/// ```rust,ignore
/// use pantry_core::async_effect;
///
/// async_effect! {
///     Some(SearchAction::ResultsLoaded(ingredients))
/// }
/// ```
#[macro_export]
macro_rules! async_effect {
    ($($body:tt)*) => {
        $crate::effect::Effect::Future(
            ::std::boxed::Box::pin(async move { $($body)* })
        )
    };
}

/// Create an `Effect::Delay` for scheduling delayed actions
///
/// # Example
///
/// ```rust,ignore
/// use pantry_core::delay;
/// use std::time::Duration;
///
/// delay! {
///     duration: Duration::from_millis(500),
///     action: SearchAction::DebounceElapsed { text, generation }
/// }
/// ```
#[macro_export]
macro_rules! delay {
    (
        duration: $duration:expr,
        action: $action:expr
    ) => {
        $crate::effect::Effect::Delay {
            duration: $duration,
            action: ::std::boxed::Box::new($action),
        }
    };
}
