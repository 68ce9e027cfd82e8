//! Text rendering of the pantry screen.

use crate::request::{Phase, RequestState};
use crate::types::PantryState;
use std::fmt::Write;

/// Render the whole screen: error modals, form, filter and list
#[must_use]
pub fn render(state: &PantryState, authenticated: bool) -> String {
    let mut out = String::new();

    let session = if authenticated { "logged in" } else { "guest" };
    let _ = writeln!(out, "=== Pantry ({session}) ===");

    render_modal(&mut out, "Error", &state.request);
    render_modal(&mut out, "Search error", &state.search.request);

    out.push_str("[Add Ingredient]");
    if state.request.is_loading() {
        out.push_str("  ...");
    }
    out.push('\n');

    let _ = write!(out, "Filter by Title: {:?}", state.search.filter);
    if state.search.request.is_loading() {
        out.push_str("  Loading...");
    }
    out.push('\n');

    out.push_str("Loaded Ingredients\n");
    if state.ingredients.is_empty() {
        out.push_str("  (none)\n");
    }
    for ingredient in &state.ingredients {
        let _ = writeln!(
            out,
            "  {}  {}  x{}",
            ingredient.id, ingredient.title, ingredient.amount
        );
    }

    out
}

fn render_modal<T>(out: &mut String, title: &str, request: &RequestState<T>) {
    if request.phase != Phase::Error {
        return;
    }
    let message = request.error.as_deref().unwrap_or("Something went wrong!");
    let _ = writeln!(out, "!! {title}: {message} (type `dismiss` to close)");
}
