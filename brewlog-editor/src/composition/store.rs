//! Composition store
//!
//! Authoritative in-memory recipe record plus its ordered ingredient list.
//! Every mutator is synchronous and all-or-nothing: it validates first and
//! only then touches state. Nothing here triggers a recompute; sequencing
//! recomputes is the pipeline's job.

use crate::error::{EditorError, Result};
use brewlog_common::models::{
    AdditionId, IngredientAddition, IngredientPatch, Recipe, RecipeField, RecipePatch,
};
use std::collections::HashSet;
use uuid::Uuid;

/// Recipe scalars and ordered ingredient additions of one editing session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompositionStore {
    recipe: Recipe,
    ingredients: Vec<IngredientAddition>,
}

impl CompositionStore {
    /// Store holding a new, empty recipe
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-loaded with a composition (ids assigned where missing)
    pub fn with_composition(recipe: Recipe, ingredients: Vec<IngredientAddition>) -> Result<Self> {
        let mut store = Self::new();
        store.replace_all(recipe, ingredients)?;
        Ok(store)
    }

    pub fn recipe(&self) -> &Recipe {
        &self.recipe
    }

    pub fn ingredients(&self) -> &[IngredientAddition] {
        &self.ingredients
    }

    /// Position of an addition in the ordered list
    pub fn position_of(&self, addition_id: AdditionId) -> Option<usize> {
        self.ingredients
            .iter()
            .position(|addition| addition.id == Some(addition_id))
    }

    /// Atomically replace recipe and ingredient list together
    pub fn replace_all(&mut self, recipe: Recipe, ingredients: Vec<IngredientAddition>) -> Result<()> {
        let ingredients = prepare_list(ingredients)?;
        self.recipe = recipe;
        self.ingredients = ingredients;
        Ok(())
    }

    /// Merge imported metadata and replace the ingredient list in one step
    ///
    /// Used by the atomic import: either both halves land or neither does.
    pub fn merge_and_replace(
        &mut self,
        patch: RecipePatch,
        ingredients: Vec<IngredientAddition>,
    ) -> Result<()> {
        let ingredients = prepare_list(ingredients)?;
        self.recipe.merge(patch);
        self.ingredients = ingredients;
        Ok(())
    }

    /// Merge imported metadata into the recipe scalars
    pub fn merge_recipe(&mut self, patch: RecipePatch) {
        self.recipe.merge(patch);
    }

    /// Update one scalar; every other field is left untouched
    pub fn patch_recipe_field(&mut self, field: RecipeField) {
        self.recipe.apply_field(field);
    }

    /// Append an addition, assigning an identifier if it has none
    pub fn insert_ingredient(&mut self, mut addition: IngredientAddition) -> Result<AdditionId> {
        let id = match addition.id {
            Some(id) if self.position_of(id).is_some() => {
                return Err(EditorError::InvalidInput(format!(
                    "addition {} is already in the recipe",
                    id
                )));
            }
            Some(id) => id,
            None => Uuid::new_v4(),
        };
        addition.id = Some(id);
        self.ingredients.push(addition);
        Ok(id)
    }

    /// Patch one addition in place; position is unchanged
    pub fn update_ingredient(&mut self, addition_id: AdditionId, patch: &IngredientPatch) -> Result<()> {
        let position = self
            .position_of(addition_id)
            .ok_or(EditorError::NotFound(addition_id))?;
        self.ingredients[position].apply(patch);
        Ok(())
    }

    /// Remove one addition, keeping the relative order of the rest
    pub fn remove_ingredient(&mut self, addition_id: AdditionId) -> Result<IngredientAddition> {
        let position = self
            .position_of(addition_id)
            .ok_or(EditorError::NotFound(addition_id))?;
        Ok(self.ingredients.remove(position))
    }

    /// Move one addition to `to_index`; an index past the end is rejected
    pub fn move_ingredient(&mut self, addition_id: AdditionId, to_index: usize) -> Result<()> {
        let position = self
            .position_of(addition_id)
            .ok_or(EditorError::NotFound(addition_id))?;
        if to_index >= self.ingredients.len() {
            return Err(EditorError::InvalidInput(format!(
                "target index {} out of range for {} additions",
                to_index,
                self.ingredients.len()
            )));
        }
        let addition = self.ingredients.remove(position);
        self.ingredients.insert(to_index, addition);
        Ok(())
    }

    /// Atomically replace the ingredient list, keeping the caller's order
    pub fn bulk_replace_ingredients(&mut self, ingredients: Vec<IngredientAddition>) -> Result<()> {
        self.ingredients = prepare_list(ingredients)?;
        Ok(())
    }

    /// Scale batch size and every quantity by `factor`
    ///
    /// Rejected without changes when the factor, or any scaled value,
    /// is not finite and positive (overflow to infinity, underflow to zero).
    pub fn scale(&mut self, factor: f64) -> Result<()> {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(EditorError::InvalidScaleFactor(factor));
        }
        let batch_size_l = self.recipe.batch_size_l * factor;
        if !batch_size_l.is_finite() || batch_size_l <= 0.0 {
            return Err(EditorError::InvalidScaleFactor(factor));
        }
        let quantities = self
            .ingredients
            .iter()
            .map(|addition| addition.quantity.scaled(factor))
            .collect::<Vec<_>>();
        if !quantities.iter().all(|quantity| quantity.is_valid()) {
            return Err(EditorError::InvalidScaleFactor(factor));
        }

        self.recipe.batch_size_l = batch_size_l;
        for (addition, quantity) in self.ingredients.iter_mut().zip(quantities) {
            addition.quantity = quantity;
        }
        Ok(())
    }

    /// Record identity assigned by persistence
    ///
    /// Only identity and server bookkeeping are written; content fields that
    /// may have been edited while the save was in flight are kept.
    pub fn adopt_persisted_identity(&mut self, persisted: &Recipe) {
        self.recipe.id = persisted.id;
        self.recipe.version = persisted.version;
        self.recipe.parent_recipe_id = persisted.parent_recipe_id;
        self.recipe.created_at = persisted.created_at;
        self.recipe.updated_at = persisted.updated_at;
    }
}

/// Assign missing identifiers and reject duplicates, without touching any store
fn prepare_list(mut ingredients: Vec<IngredientAddition>) -> Result<Vec<IngredientAddition>> {
    let mut seen = HashSet::with_capacity(ingredients.len());
    for addition in &ingredients {
        if let Some(id) = addition.id {
            if !seen.insert(id) {
                return Err(EditorError::InvalidInput(format!(
                    "duplicate addition id {} in ingredient list",
                    id
                )));
            }
        }
    }
    for addition in &mut ingredients {
        if addition.id.is_none() {
            addition.id = Some(Uuid::new_v4());
        }
    }
    Ok(ingredients)
}
