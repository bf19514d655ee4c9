//! Composition snapshots and dirty tracking
//!
//! A snapshot keeps only the content a user can edit through the pipeline.
//! Identity and server bookkeeping (`id`, `version`, lineage, timestamps)
//! are left out, so assigning an id on first save or a server bumping
//! `updated_at` never reads as an unsaved change.

use super::store::CompositionStore;
use brewlog_common::models::{IngredientAddition, Recipe};
use std::sync::Arc;

/// Editable recipe scalars
#[derive(Debug, Clone, PartialEq)]
struct RecipeContent {
    name: String,
    style: Option<String>,
    batch_size_l: f64,
    boil_time_min: u32,
    efficiency_pct: f64,
    notes: String,
}

impl From<&Recipe> for RecipeContent {
    fn from(recipe: &Recipe) -> Self {
        Self {
            name: recipe.name.clone(),
            style: recipe.style.clone(),
            batch_size_l: recipe.batch_size_l,
            boil_time_min: recipe.boil_time_min,
            efficiency_pct: recipe.efficiency_pct,
            notes: recipe.notes.clone(),
        }
    }
}

#[derive(Debug, PartialEq)]
struct SnapshotInner {
    recipe: RecipeContent,
    ingredients: Vec<IngredientAddition>,
}

/// Immutable copy of a composition's editable content
///
/// Equality is order-sensitive for ingredients.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot(Arc<SnapshotInner>);

impl Snapshot {
    pub fn capture(store: &CompositionStore) -> Self {
        Self::of(store.recipe(), store.ingredients())
    }

    pub fn of(recipe: &Recipe, ingredients: &[IngredientAddition]) -> Self {
        Self(Arc::new(SnapshotInner {
            recipe: RecipeContent::from(recipe),
            ingredients: ingredients.to_vec(),
        }))
    }
}

/// Derives "has unsaved changes" against the last persisted snapshot
#[derive(Debug, Clone)]
pub struct DirtyTracker {
    last_persisted: Snapshot,
}

impl DirtyTracker {
    /// Tracker whose baseline is the store's current content
    pub fn clean(store: &CompositionStore) -> Self {
        Self {
            last_persisted: Snapshot::capture(store),
        }
    }

    pub fn is_dirty(&self, store: &CompositionStore) -> bool {
        Snapshot::capture(store) != self.last_persisted
    }

    /// Replace the baseline after a successful save
    pub fn mark_persisted(&mut self, snapshot: Snapshot) {
        self.last_persisted = snapshot;
    }
}
