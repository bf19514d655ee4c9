//! # Brewlog Recipe Editor
//!
//! Recipe composition and metrics engine behind the recipe editing screen.
//!
//! **Components:**
//! - `catalog`: process-wide ingredient catalog cache with single-flight fetches
//! - `composition`: the editable recipe composition and its dirty tracker
//! - `editor`: the editing session driven by the UI
//! - `save`: serialized persistence of a session's composition
//! - `collaborators`: calculator, persistence, import and export seams

pub mod catalog;
pub mod collaborators;
pub mod composition;
pub mod editor;
pub mod error;
pub mod logging;
pub(crate) mod pipeline;
pub(crate) mod save;

pub use catalog::{CatalogLookup, IngredientCatalog};
pub use collaborators::{
    Calculator, CatalogSource, ExportedRecipe, RecipeExporter, RecipeImporter, RecipeRepository,
    StoredRecipe,
};
pub use editor::{EditorServices, MetricsView, MutationOutcome, RecipeEditor};
pub use error::{EditorError, Result};
