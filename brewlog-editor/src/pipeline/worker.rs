//! Mutation command worker
//!
//! Commands arrive on an unbounded mpsc channel and are applied strictly in
//! arrival order, one at a time. A command that has to wait on the catalog
//! (an import that created catalog entries) holds up the commands behind it,
//! so the store always sees mutations in request order.

use super::session::Session;
use crate::catalog::IngredientCatalog;
use crate::error::{EditorError, Result};
use brewlog_common::events::EditorEvent;
use brewlog_common::models::{
    AdditionId, ImportPayload, IngredientAddition, IngredientPatch, RecipeField, RecipePatch,
};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

/// One externally requested change to the composition
#[derive(Debug)]
pub(crate) enum Mutation {
    AddIngredient(IngredientAddition),
    UpdateIngredient(AdditionId, IngredientPatch),
    RemoveIngredient(AdditionId),
    MoveIngredient(AdditionId, usize),
    UpdateRecipeField(RecipeField),
    BulkUpdateIngredients(Vec<IngredientAddition>),
    ImportRecipeData(RecipePatch),
    ImportIngredients(Vec<IngredientAddition>),
    ImportRecipe(ImportPayload),
    Scale(f64),
}

impl Mutation {
    fn name(&self) -> &'static str {
        match self {
            Mutation::AddIngredient(_) => "add_ingredient",
            Mutation::UpdateIngredient(..) => "update_ingredient",
            Mutation::RemoveIngredient(_) => "remove_ingredient",
            Mutation::MoveIngredient(..) => "move_ingredient",
            Mutation::UpdateRecipeField(_) => "update_recipe_field",
            Mutation::BulkUpdateIngredients(_) => "bulk_update_ingredients",
            Mutation::ImportRecipeData(_) => "import_recipe_data",
            Mutation::ImportIngredients(_) => "import_ingredients",
            Mutation::ImportRecipe(_) => "import_recipe",
            Mutation::Scale(_) => "scale_recipe",
        }
    }
}

/// Result of applying a mutation to the store
#[derive(Debug, Clone, Copy)]
pub(crate) struct Applied {
    pub(crate) seq: u64,
    pub(crate) addition_id: Option<AdditionId>,
}

pub(crate) struct Command {
    pub(crate) mutation: Mutation,
    pub(crate) reply: oneshot::Sender<Result<Applied>>,
}

pub(crate) async fn run_command_worker(
    session: Arc<Session>,
    mut commands: mpsc::UnboundedReceiver<Command>,
) {
    loop {
        let command = tokio::select! {
            _ = session.shutdown.cancelled() => break,
            received = commands.recv() => match received {
                Some(command) => command,
                None => break,
            },
        };

        let name = command.mutation.name();
        let result = apply(&session, command.mutation).await;
        match &result {
            Ok(applied) => debug!(seq = applied.seq, "Applied {}", name),
            Err(e) => debug!("Rejected {}: {}", name, e),
        }
        // Caller may have given up waiting; nothing to do then.
        let _ = command.reply.send(result);
    }

    // Pending commands are dropped here; their callers observe SessionClosed.
    commands.close();
    debug!("Command worker stopped");
}

async fn apply(session: &Session, mutation: Mutation) -> Result<Applied> {
    let catalog = &session.catalog;
    match mutation {
        Mutation::AddIngredient(addition) => {
            check_addition(catalog, &addition)?;
            let (seq, id) = session.commit(|store| store.insert_ingredient(addition))?;
            Ok(Applied {
                seq,
                addition_id: Some(id),
            })
        }
        Mutation::UpdateIngredient(addition_id, patch) => {
            let (seq, ()) = session.commit(|store| {
                let position = store
                    .position_of(addition_id)
                    .ok_or(EditorError::NotFound(addition_id))?;
                let mut preview = store.ingredients()[position].clone();
                preview.apply(&patch);
                check_addition(catalog, &preview)?;
                store.update_ingredient(addition_id, &patch)
            })?;
            Ok(Applied {
                seq,
                addition_id: Some(addition_id),
            })
        }
        Mutation::RemoveIngredient(addition_id) => {
            let (seq, _) = session.commit(|store| store.remove_ingredient(addition_id))?;
            Ok(Applied {
                seq,
                addition_id: Some(addition_id),
            })
        }
        Mutation::MoveIngredient(addition_id, to_index) => {
            let (seq, ()) = session.commit(|store| store.move_ingredient(addition_id, to_index))?;
            Ok(Applied {
                seq,
                addition_id: Some(addition_id),
            })
        }
        Mutation::UpdateRecipeField(field) => {
            check_field(&field)?;
            let (seq, ()) = session.commit(|store| {
                store.patch_recipe_field(field);
                Ok(())
            })?;
            Ok(Applied {
                seq,
                addition_id: None,
            })
        }
        Mutation::BulkUpdateIngredients(ingredients) | Mutation::ImportIngredients(ingredients) => {
            check_list(catalog, &ingredients)?;
            let (seq, ()) = session.commit(|store| store.bulk_replace_ingredients(ingredients))?;
            Ok(Applied {
                seq,
                addition_id: None,
            })
        }
        Mutation::ImportRecipeData(patch) => {
            check_patch(&patch)?;
            let (seq, ()) = session.commit(|store| {
                store.merge_recipe(patch);
                Ok(())
            })?;
            Ok(Applied {
                seq,
                addition_id: None,
            })
        }
        Mutation::ImportRecipe(payload) => {
            check_patch(&payload.recipe)?;
            if payload.created_catalog_entries() {
                refresh_catalog(session, payload.created_ingredients.len()).await?;
            }
            check_list(catalog, &payload.ingredients)?;
            let ImportPayload {
                recipe, ingredients, ..
            } = payload;
            let (seq, ()) = session.commit(|store| store.merge_and_replace(recipe, ingredients))?;
            Ok(Applied {
                seq,
                addition_id: None,
            })
        }
        Mutation::Scale(factor) => {
            let (seq, ()) = session.commit(|store| store.scale(factor))?;
            Ok(Applied {
                seq,
                addition_id: None,
            })
        }
    }
}

/// Drop the cached catalog and fetch it again so new entries resolve
async fn refresh_catalog(session: &Session, created: usize) -> Result<()> {
    info!(created, "Import created catalog ingredients, refreshing catalog");
    session.catalog.invalidate();
    session.event_bus.emit_lossy(EditorEvent::CatalogInvalidated {
        timestamp: Utc::now(),
    });
    session.catalog.fetch_all(true).await?;
    if session.is_closed() {
        return Err(EditorError::SessionClosed);
    }
    Ok(())
}

/// Structural checks on one addition
///
/// The phase is only checked against catalog entries already cached; an
/// uncached ingredient is accepted as-is rather than forcing a fetch.
fn check_addition(catalog: &IngredientCatalog, addition: &IngredientAddition) -> Result<()> {
    if !addition.quantity.is_valid() {
        return Err(EditorError::InvalidInput(format!(
            "quantity must be a positive number, got {}",
            addition.quantity.amount
        )));
    }
    if let Some(definition) = catalog.peek(addition.ingredient_id) {
        if !addition.phase.is_valid_for(definition.kind) {
            return Err(EditorError::InvalidInput(format!(
                "{:?} is not a valid use for {} ({:?})",
                addition.phase, definition.name, definition.kind
            )));
        }
    }
    Ok(())
}

pub(crate) fn check_list(catalog: &IngredientCatalog, ingredients: &[IngredientAddition]) -> Result<()> {
    ingredients
        .iter()
        .try_for_each(|addition| check_addition(catalog, addition))
}

fn check_field(field: &RecipeField) -> Result<()> {
    match field {
        RecipeField::BatchSize(value) | RecipeField::Efficiency(value) if !value.is_finite() => Err(
            EditorError::InvalidInput(format!("{:?} must be a finite number", field)),
        ),
        _ => Ok(()),
    }
}

/// Imported metadata gets the same scalar checks as a single field edit
pub(crate) fn check_patch(patch: &RecipePatch) -> Result<()> {
    if let Some(batch_size_l) = patch.batch_size_l {
        check_field(&RecipeField::BatchSize(batch_size_l))?;
    }
    if let Some(efficiency_pct) = patch.efficiency_pct {
        check_field(&RecipeField::Efficiency(efficiency_pct))?;
    }
    Ok(())
}
