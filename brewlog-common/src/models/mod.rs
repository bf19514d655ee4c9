//! Domain models shared by the editor and its collaborators

mod import;
mod ingredient;
mod metrics;
mod recipe;

pub use import::ImportPayload;
pub use ingredient::{
    AdditionId, IngredientAddition, IngredientAttributes, IngredientDefinition, IngredientId,
    IngredientKind, IngredientPatch, Quantity, Unit, UsePhase,
};
pub use metrics::Metrics;
pub use recipe::{Recipe, RecipeField, RecipePatch};
