//! Save coordinator
//!
//! Serializes persistence of one session's composition.
//!
//! Saves run one at a time through a FIFO lane. A call that queued behind a
//! save which finished while it waited, and whose composition is unchanged
//! since that save captured it, returns that save's outcome instead of
//! issuing another request. If the composition changed meanwhile, the queued
//! call persists the newer state.

use crate::collaborators::RecipeRepository;
use crate::composition::Snapshot;
use crate::error::{EditorError, Result};
use crate::pipeline::session::{Captured, Session};
use crate::pipeline::status::Activity;
use brewlog_common::events::EditorEvent;
use brewlog_common::models::Recipe;
use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{info, warn};

struct SaveAttempt {
    snapshot: Snapshot,
    result: Result<Recipe>,
}

#[derive(Default)]
struct SaveLedger {
    completed: u64,
    last: Option<SaveAttempt>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SaveKind {
    InPlace,
    NewVersion,
}

pub(crate) struct SaveCoordinator {
    session: Arc<Session>,
    repository: Arc<dyn RecipeRepository>,
    lane: tokio::sync::Mutex<()>,
    ledger: Mutex<SaveLedger>,
}

impl SaveCoordinator {
    pub(crate) fn new(session: Arc<Session>, repository: Arc<dyn RecipeRepository>) -> Self {
        Self {
            session,
            repository,
            lane: tokio::sync::Mutex::new(()),
            ledger: Mutex::new(SaveLedger::default()),
        }
    }

    fn ledger(&self) -> MutexGuard<'_, SaveLedger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Persist the current composition (create on first save, update after)
    pub(crate) async fn save(&self) -> Result<Recipe> {
        self.run(SaveKind::InPlace).await
    }

    /// Persist the current composition as a new recipe descending from it
    pub(crate) async fn save_as_new_version(&self) -> Result<Recipe> {
        self.run(SaveKind::NewVersion).await
    }

    async fn run(&self, kind: SaveKind) -> Result<Recipe> {
        let _saving = self.session.status.begin(Activity::Saving);
        let entry_completed = self.ledger().completed;
        // Invalid compositions fail here rather than queueing behind a save in flight
        validate(&self.session.capture()?.recipe)?;

        let _lane = self.lane.lock().await;
        let captured = self.session.capture()?;

        if kind == SaveKind::InPlace {
            if let Some(shared) = self.shared_outcome(entry_completed, &captured.snapshot) {
                info!("Save already completed while queued, sharing its outcome");
                return shared;
            }
        }

        validate(&captured.recipe)?;
        if kind == SaveKind::NewVersion && captured.recipe.id.is_none() {
            return Err(EditorError::ValidationFailed(
                "recipe must be saved before a new version can be created".to_string(),
            ));
        }

        let result = self.persist(kind, &captured).await;
        self.record(&captured, &result);
        result
    }

    fn shared_outcome(&self, entry_completed: u64, current: &Snapshot) -> Option<Result<Recipe>> {
        let ledger = self.ledger();
        if ledger.completed <= entry_completed {
            return None;
        }
        ledger
            .last
            .as_ref()
            .filter(|attempt| attempt.snapshot == *current)
            .map(|attempt| attempt.result.clone())
    }

    async fn persist(&self, kind: SaveKind, captured: &Captured) -> Result<Recipe> {
        let recipe = &captured.recipe;
        let ingredients = &captured.ingredients;

        let request = match (kind, recipe.id) {
            (SaveKind::InPlace, Some(id)) => self.repository.update(id, recipe, ingredients).await,
            (SaveKind::InPlace, None) => self.repository.create(recipe, ingredients).await,
            (SaveKind::NewVersion, parent_id) => {
                let next = Recipe {
                    id: None,
                    version: recipe.version + 1,
                    parent_recipe_id: parent_id,
                    created_at: None,
                    updated_at: None,
                    ..recipe.clone()
                };
                self.repository.create(&next, ingredients).await
            }
        };

        let persisted = request.map_err(|e| EditorError::PersistenceFailed(e.to_string()))?;
        if persisted.id.is_none() {
            return Err(EditorError::PersistenceFailed(
                "persistence returned a recipe without an identifier".to_string(),
            ));
        }
        Ok(persisted)
    }

    fn record(&self, captured: &Captured, result: &Result<Recipe>) {
        match result {
            Ok(persisted) => {
                if !self.session.is_closed() {
                    self.session.mark_saved(persisted, captured.snapshot.clone());
                }
                if let Some(recipe_id) = persisted.id {
                    info!(recipe_id = %recipe_id, version = persisted.version, "Recipe saved");
                    self.session.event_bus.emit_lossy(EditorEvent::RecipeSaved {
                        recipe_id,
                        version: persisted.version,
                        timestamp: Utc::now(),
                    });
                }
            }
            Err(e) => {
                warn!(retryable = e.is_transient(), "Recipe save failed: {}", e);
                self.session.event_bus.emit_lossy(EditorEvent::SaveFailed {
                    reason: e.to_string(),
                    timestamp: Utc::now(),
                });
            }
        }

        let mut ledger = self.ledger();
        ledger.completed += 1;
        ledger.last = Some(SaveAttempt {
            snapshot: captured.snapshot.clone(),
            result: result.clone(),
        });
    }
}

/// Minimum validity required before anything is sent to persistence
pub(crate) fn validate(recipe: &Recipe) -> Result<()> {
    if recipe.name.trim().is_empty() {
        return Err(EditorError::ValidationFailed(
            "recipe name must not be empty".to_string(),
        ));
    }
    if !recipe.batch_size_l.is_finite() || recipe.batch_size_l <= 0.0 {
        return Err(EditorError::ValidationFailed(format!(
            "batch size must be positive, got {}",
            recipe.batch_size_l
        )));
    }
    Ok(())
}
