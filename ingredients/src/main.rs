//! Pantry terminal front end
//!
//! Reads commands from stdin and re-renders the screen after every state
//! change. Logs go to stderr.
//!
//! # Usage
//!
//! ```bash
//! PANTRY_DATABASE_URL=https://<project>-default-rtdb.firebaseio.com \
//!   RUST_LOG=pantry=debug cargo run --bin pantry
//! ```

use anyhow::Context;
use pantry_firebase::{FirebaseConfig, FirebaseStore};
use pantry_ingredients::command::{Command, HELP};
use pantry_ingredients::{
    AuthContext, PantryAction, PantryConfig, PantryEnvironment, PantryReducer, PantryState,
    SearchAction, view,
};
use pantry_runtime::Store;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type PantryStore = Store<PantryState, PantryAction, PantryEnvironment, PantryReducer>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pantry=info,pantry_ingredients=info,pantry_runtime=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = PantryConfig::load().context("invalid configuration")?;
    tracing::info!(database = %config.database_url, "Starting pantry");

    let documents = FirebaseStore::new(
        FirebaseConfig::new(config.database_url.clone()).with_timeout(config.request_timeout),
    )
    .context("failed to create Firebase client")?;

    let auth = AuthContext::new();
    let env = PantryEnvironment::new(Arc::new(documents), auth.clone(), config.debounce);
    let store = Store::new(PantryState::default(), PantryReducer::new(), env);

    let renderer = tokio::spawn(render_on_change(store.clone(), auth.clone()));

    // Initial load goes through the filter with empty text
    store
        .send(PantryAction::Search(SearchAction::FilterChanged(String::new())))
        .await?;
    println!("{HELP}\n");
    print_screen(&store, &auth).await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match Command::parse(&line) {
            Ok(command) => command,
            Err(error) => {
                println!("{error}");
                continue;
            },
        };

        match command {
            Command::Quit => break,
            Command::Help => println!("{HELP}"),
            Command::List => print_screen(&store, &auth).await,
            command => {
                for action in command.into_actions() {
                    store.send(action).await?;
                }
                print_screen(&store, &auth).await;
            },
        }
    }

    store.send(PantryAction::Search(SearchAction::Teardown)).await?;
    if let Err(error) = store.shutdown().await {
        tracing::warn!(error = %error, "Shutdown did not complete cleanly");
    }
    renderer.abort();
    auth.teardown();

    Ok(())
}

/// Re-render whenever an effect feeds an action back into the store
async fn render_on_change(store: PantryStore, auth: AuthContext) {
    let mut actions = store.subscribe_actions();
    loop {
        match actions.recv().await {
            Ok(_) | Err(RecvError::Lagged(_)) => print_screen(&store, &auth).await,
            Err(RecvError::Closed) => break,
        }
    }
}

async fn print_screen(store: &PantryStore, auth: &AuthContext) {
    let screen = store
        .state(|state| view::render(state, auth.is_authenticated()))
        .await;
    println!("\n{screen}");
}
