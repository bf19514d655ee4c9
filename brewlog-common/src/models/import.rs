//! Import payloads handed to the editor by an import collaborator

use serde::{Deserialize, Serialize};

use super::ingredient::{IngredientAddition, IngredientDefinition};
use super::recipe::RecipePatch;

/// Fully resolved result of importing an external recipe file
///
/// Every `ingredient_id` in `ingredients` refers to a catalog entry that
/// already exists; `created_ingredients` lists the entries the importer had
/// to create for that to hold.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportPayload {
    #[serde(default)]
    pub recipe: RecipePatch,
    #[serde(default)]
    pub ingredients: Vec<IngredientAddition>,
    #[serde(default)]
    pub created_ingredients: Vec<IngredientDefinition>,
}

impl ImportPayload {
    /// Whether the import added entries to the ingredient catalog
    pub fn created_catalog_entries(&self) -> bool {
        !self.created_ingredients.is_empty()
    }
}
