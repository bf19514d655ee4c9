//! External collaborators consumed by the editor
//!
//! The editor never computes brewing formulas, talks to the network or parses
//! recipe files itself. It drives these traits and maps their opaque
//! `anyhow` failures into [`EditorError`](crate::EditorError) at the boundary.

use crate::catalog::CatalogLookup;
use anyhow::Result;
use async_trait::async_trait;
use brewlog_common::models::{
    ImportPayload, IngredientAddition, IngredientDefinition, Metrics, Recipe,
};
use uuid::Uuid;

/// Brewing metrics calculator
///
/// Pure and deterministic: the same composition and catalog always yield the
/// same metrics. Async only because implementations may run remotely.
#[async_trait]
pub trait Calculator: Send + Sync {
    async fn compute(
        &self,
        recipe: &Recipe,
        ingredients: &[IngredientAddition],
        catalog: &CatalogLookup,
    ) -> Result<Metrics>;
}

/// Origin of the global ingredient catalog
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetch every catalog entry, in catalog order
    async fn fetch_all(&self) -> Result<Vec<IngredientDefinition>>;
}

/// Recipe plus its ordered ingredient list, as stored
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecipe {
    pub recipe: Recipe,
    pub ingredients: Vec<IngredientAddition>,
}

/// Persistence/API collaborator
#[async_trait]
pub trait RecipeRepository: Send + Sync {
    /// Persist a recipe that has no identifier yet; returns it with `id` set
    async fn create(&self, recipe: &Recipe, ingredients: &[IngredientAddition]) -> Result<Recipe>;

    /// Overwrite an existing recipe and its ingredient list
    async fn update(
        &self,
        id: Uuid,
        recipe: &Recipe,
        ingredients: &[IngredientAddition],
    ) -> Result<Recipe>;

    async fn fetch_by_id(&self, id: Uuid) -> Result<StoredRecipe>;
}

/// Serialized recipe ready for download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedRecipe {
    pub content: String,
    pub suggested_filename: String,
}

/// Export collaborator (e.g. BeerXML writer)
#[async_trait]
pub trait RecipeExporter: Send + Sync {
    async fn export(&self, recipe_id: Uuid) -> Result<ExportedRecipe>;
}

/// Import collaborator (e.g. BeerXML reader)
///
/// Must return a fully resolved payload: any catalog entries the file needed
/// are created before returning and listed in `created_ingredients`.
#[async_trait]
pub trait RecipeImporter: Send + Sync {
    async fn import(&self, source: &[u8]) -> Result<ImportPayload>;
}
