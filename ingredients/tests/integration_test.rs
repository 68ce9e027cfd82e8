//! Integration tests for the pantry with the Store runtime
//!
//! These run the full loop (reducer, effects, document store, feedback)
//! against `InMemoryDocumentStore`, with tokio time paused so debounce
//! windows are deterministic.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use pantry_core::document_store::{DocumentStore, EqualityFilter, Method};
use pantry_ingredients::{
    AuthContext, IngredientId, IngredientRequest, NewIngredient, PantryAction, PantryEnvironment,
    PantryReducer, PantryState, Phase, RequestAction, SEARCH_DEBOUNCE, SearchAction,
};
use pantry_runtime::{Store, StoreError};
use pantry_testing::InMemoryDocumentStore;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::Receiver;

type PantryStore = Store<PantryState, PantryAction, PantryEnvironment, PantryReducer>;

const DEBOUNCE: Duration = Duration::from_millis(500);

fn pantry() -> (PantryStore, Arc<InMemoryDocumentStore>) {
    let documents = Arc::new(InMemoryDocumentStore::new());
    let store: Arc<dyn DocumentStore> = documents.clone();
    let env = PantryEnvironment::new(store, AuthContext::new(), DEBOUNCE);
    (
        Store::new(PantryState::default(), PantryReducer::new(), env),
        documents,
    )
}

/// Wait until an effect feeds back an action matching `predicate`
async fn next_matching<F>(actions: &mut Receiver<PantryAction>, predicate: F) -> PantryAction
where
    F: Fn(&PantryAction) -> bool,
{
    tokio::time::timeout(Duration::from_secs(30), async {
        loop {
            let action = actions.recv().await.expect("action channel open");
            if predicate(&action) {
                return action;
            }
        }
    })
    .await
    .expect("expected action was never produced")
}

fn is_results(action: &PantryAction) -> bool {
    matches!(action, PantryAction::Search(SearchAction::ResultsLoaded(_)))
}

fn is_response(action: &PantryAction) -> bool {
    matches!(action, PantryAction::Request(RequestAction::Responded { .. }))
}

fn filter(text: &str) -> PantryAction {
    PantryAction::Search(SearchAction::FilterChanged(text.to_string()))
}

#[tokio::test]
async fn test_submitting_form_posts_once_and_adds_server_id() -> Result<(), StoreError> {
    let (store, documents) = pantry();

    let mut handle = store
        .send(PantryAction::AddIngredient(NewIngredient::new("Salt", "1")))
        .await?;
    handle.wait().await;

    let posts = documents.requests_with_method(Method::Post);
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].body, Some(json!({"title": "Salt", "amount": "1"})));

    let state = store.state(Clone::clone).await;
    assert_eq!(state.request.phase, Phase::Responded);
    assert_eq!(state.ingredients.len(), 1);

    let stored_id = state.ingredients[0].id.clone();
    assert_eq!(state.ingredients[0].title, "Salt");
    assert_eq!(
        documents.document("ingredients", stored_id.as_str()),
        Some(json!({"title": "Salt", "amount": "1"}))
    );
    Ok(())
}

#[tokio::test]
async fn test_removing_deletes_remote_document_and_list_entry() -> Result<(), StoreError> {
    let (store, documents) = pantry();
    documents.insert("ingredients", "-Na", json!({"title": "Salt", "amount": "1"}));
    documents.insert("ingredients", "-Nb", json!({"title": "Pepper", "amount": "2"}));

    let mut actions = store.subscribe_actions();
    store.send(filter("")).await?;
    next_matching(&mut actions, is_results).await;
    assert_eq!(store.state(|s| s.ingredients.len()).await, 2);

    let mut handle = store
        .send(PantryAction::RemoveIngredient(IngredientId::from("-Na")))
        .await?;
    handle.wait().await;

    let remaining: Vec<String> = store
        .state(|s| s.ingredients.iter().map(|i| i.id.to_string()).collect())
        .await;
    assert_eq!(remaining, ["-Nb"]);
    assert_eq!(documents.collection_len("ingredients"), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_initial_empty_filter_lists_everything() -> Result<(), StoreError> {
    let (store, documents) = pantry();
    documents.insert("ingredients", "-Na", json!({"title": "Salt", "amount": "1"}));
    documents.insert("ingredients", "-Nb", json!({"title": "Flour", "amount": 500}));

    let mut actions = store.subscribe_actions();
    store.send(filter("")).await?;
    next_matching(&mut actions, is_results).await;

    let gets = documents.requests_with_method(Method::Get);
    assert_eq!(gets.len(), 1);
    assert_eq!(gets[0].filter, None);

    let titles: Vec<String> = store
        .state(|s| s.ingredients.iter().map(|i| i.title.clone()).collect())
        .await;
    assert_eq!(titles, ["Salt", "Flour"]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_typing_within_window_issues_single_get() -> Result<(), StoreError> {
    let (store, documents) = pantry();
    documents.insert("ingredients", "-Na", json!({"title": "Salt", "amount": "1"}));
    documents.insert("ingredients", "-Nb", json!({"title": "Pepper", "amount": "1"}));

    let mut actions = store.subscribe_actions();
    store.send(filter("S")).await?;
    tokio::time::advance(Duration::from_millis(100)).await;
    store.send(filter("Sal")).await?;
    tokio::time::advance(Duration::from_millis(100)).await;
    store.send(filter("Salt")).await?;

    next_matching(&mut actions, is_results).await;

    // Give any superseded timer time to fire if it were still alive
    tokio::time::sleep(DEBOUNCE * 4).await;

    let gets = documents.requests_with_method(Method::Get);
    assert_eq!(gets.len(), 1);
    assert_eq!(
        gets[0].filter,
        Some(EqualityFilter {
            field: "title".to_string(),
            value: json!("Salt"),
        })
    );

    let titles: Vec<String> = store
        .state(|s| s.ingredients.iter().map(|i| i.title.clone()).collect())
        .await;
    assert_eq!(titles, ["Salt"]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_changes_separated_by_window_issue_two_gets() -> Result<(), StoreError> {
    let (store, documents) = pantry();

    let mut actions = store.subscribe_actions();
    store.send(filter("Salt")).await?;
    next_matching(&mut actions, is_results).await;

    tokio::time::advance(DEBOUNCE * 2).await;
    store.send(filter("Pepper")).await?;
    next_matching(&mut actions, is_results).await;

    let filters: Vec<_> = documents
        .requests_with_method(Method::Get)
        .into_iter()
        .map(|request| request.filter.map(|f| f.value))
        .collect();
    assert_eq!(filters, [Some(json!("Salt")), Some(json!("Pepper"))]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_slow_superseded_request_does_not_overwrite_newer_one() -> Result<(), StoreError> {
    let (store, documents) = pantry();
    documents.insert("ingredients", "-Nb", json!({"title": "Pepper", "amount": "1"}));
    documents.delay_next(Duration::from_secs(2));

    let mut actions = store.subscribe_actions();
    store
        .send(PantryAction::Collection(
            pantry_ingredients::CollectionAction::Set(vec![
                NewIngredient::new("Pepper", "1").with_id(IngredientId::from("-Nb")),
            ]),
        ))
        .await?;

    // A: slow add, B: fast remove
    store
        .send(PantryAction::AddIngredient(NewIngredient::new("Salt", "1")))
        .await?;
    // Let A reach the document store first so it picks up the delay
    while documents.requests().is_empty() {
        tokio::task::yield_now().await;
    }
    store
        .send(PantryAction::RemoveIngredient(IngredientId::from("-Nb")))
        .await?;

    // B resolves first, A two seconds later
    next_matching(&mut actions, is_response).await;
    next_matching(&mut actions, is_response).await;

    let state = store.state(Clone::clone).await;
    assert_eq!(state.request.phase, Phase::Responded);
    assert_eq!(
        state.request.correlation,
        Some(IngredientRequest::Remove(IngredientId::from("-Nb")))
    );
    assert!(state.ingredients.is_empty());

    // The superseded call still ran to completion remotely
    assert_eq!(documents.collection_len("ingredients"), 1);
    Ok(())
}

#[tokio::test]
async fn test_failure_surfaces_error_and_drops_correlation() -> Result<(), StoreError> {
    let (store, documents) = pantry();
    documents.fail_next("connection refused");

    let mut handle = store
        .send(PantryAction::AddIngredient(NewIngredient::new("Salt", "1")))
        .await?;
    handle.wait().await;

    let request = store.state(|s| s.request.clone()).await;
    assert_eq!(request.phase, Phase::Error);
    assert_eq!(request.error.as_deref(), Some("Request failed: connection refused"));
    assert_eq!(request.correlation, None);
    assert!(store.state(|s| s.ingredients.is_empty()).await);

    store.send(PantryAction::DismissError).await?;
    let request = store.state(|s| s.request.clone()).await;
    assert_eq!(request.phase, Phase::Idle);
    assert_eq!(request.error, None);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_search_failure_has_its_own_modal() -> Result<(), StoreError> {
    let (store, documents) = pantry();
    documents.respond_with(Err(
        pantry_core::document_store::DocumentStoreError::ResponseParseFailed(
            "expected value at line 1 column 1".to_string(),
        ),
    ));

    let mut actions = store.subscribe_actions();
    store.send(filter("Salt")).await?;
    next_matching(&mut actions, |a| {
        matches!(a, PantryAction::Search(SearchAction::Request(RequestAction::Failed { .. })))
    })
    .await;

    let state = store.state(Clone::clone).await;
    assert_eq!(state.search.request.phase, Phase::Error);
    assert_eq!(state.request.phase, Phase::Idle);

    store
        .send(PantryAction::Search(SearchAction::DismissError))
        .await?;
    assert_eq!(store.state(|s| s.search.request.phase).await, Phase::Idle);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_teardown_cancels_pending_search() -> Result<(), StoreError> {
    let (store, documents) = pantry();

    store.send(filter("Salt")).await?;
    assert!(store.is_effect_active(&SEARCH_DEBOUNCE));

    store.send(PantryAction::Search(SearchAction::Teardown)).await?;
    tokio::time::sleep(DEBOUNCE * 4).await;

    assert!(!store.is_effect_active(&SEARCH_DEBOUNCE));
    assert!(documents.requests().is_empty());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_drops_pending_search_and_rejects_input() -> Result<(), StoreError> {
    let (store, documents) = pantry();

    store.send(filter("Salt")).await?;
    store.shutdown_with_timeout(Duration::from_secs(1)).await?;
    tokio::time::sleep(DEBOUNCE * 4).await;

    assert!(documents.requests().is_empty());
    assert!(matches!(
        store.send(filter("Pepper")).await,
        Err(StoreError::ShutdownInProgress)
    ));
    Ok(())
}

#[tokio::test]
async fn test_remove_with_bad_id_reports_error_and_keeps_data() -> Result<(), StoreError> {
    let (store, documents) = pantry();
    documents.insert("ingredients", "-Na", json!({"title": "Salt", "amount": "1"}));
    store
        .send(PantryAction::Collection(
            pantry_ingredients::CollectionAction::Set(vec![
                NewIngredient::new("Salt", "1").with_id(IngredientId::from("-Na")),
            ]),
        ))
        .await?;

    let mut handle = store
        .send(PantryAction::RemoveIngredient(IngredientId::from("-Na/..")))
        .await?;
    handle.wait().await;

    let state = store.state(Clone::clone).await;
    assert_eq!(state.request.phase, Phase::Error);
    assert_eq!(state.ingredients.len(), 1);
    assert_eq!(documents.collection_len("ingredients"), 1);
    Ok(())
}

#[tokio::test]
async fn test_login_marks_session_authenticated() -> Result<(), StoreError> {
    let documents: Arc<dyn DocumentStore> = Arc::new(InMemoryDocumentStore::new());
    let auth = AuthContext::new();
    let env = PantryEnvironment::new(documents, auth.clone(), DEBOUNCE);
    let store = Store::new(PantryState::default(), PantryReducer::new(), env);

    let mut handle = store.send(PantryAction::Login).await?;
    handle.wait().await;

    assert!(auth.is_authenticated());
    Ok(())
}
