//! Ingredient collection reducer (SET / ADD / DELETE).

use crate::types::{Ingredient, IngredientCollection, IngredientId};
use pantry_core::effect::Effect;
use pantry_core::reducer::Reducer;
use pantry_core::{SmallVec, smallvec};

/// Mutations of the ingredient list
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CollectionAction {
    /// Replace the whole list
    Set(IngredientCollection),
    /// Append one ingredient (no duplicate check)
    Add(Ingredient),
    /// Remove every ingredient with this id
    Delete(IngredientId),
}

/// Reducer owning the ordered ingredient list
#[derive(Clone, Debug, Default)]
pub struct CollectionReducer;

impl CollectionReducer {
    /// Creates a new collection reducer
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Reducer for CollectionReducer {
    type State = IngredientCollection;
    type Action = CollectionAction;
    type Environment = ();

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        _env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            CollectionAction::Set(ingredients) => *state = ingredients,
            CollectionAction::Add(ingredient) => state.push(ingredient),
            CollectionAction::Delete(id) => state.retain(|ingredient| ingredient.id != id),
        }
        smallvec![Effect::None]
    }
}
