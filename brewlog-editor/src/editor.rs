//! Recipe editing session
//!
//! [`RecipeEditor`] is the surface the UI drives. Each instance owns one
//! composition, a FIFO command worker that applies mutations in request
//! order, and a single recompute loop. Operations resolve once their
//! mutation is applied and a recompute at or after it has settled.
//!
//! The session runs on the ambient tokio runtime; constructors must be
//! called from within one.

use crate::catalog::IngredientCatalog;
use crate::collaborators::{Calculator, ExportedRecipe, RecipeExporter, RecipeImporter, RecipeRepository};
use crate::composition::{CompositionStore, DirtyTracker};
use crate::error::{EditorError, Result};
use crate::pipeline::recompute::run_recompute_loop;
use crate::pipeline::session::{Session, SessionState};
use crate::pipeline::status::Activity;
use crate::pipeline::worker::{check_list, check_patch, run_command_worker, Command, Mutation};
use crate::save::SaveCoordinator;
use brewlog_common::config::EditorConfig;
use brewlog_common::events::{EditorEvent, EditorStatus, EventBus};
use brewlog_common::models::{
    AdditionId, ImportPayload, IngredientAddition, IngredientPatch, Metrics, Recipe, RecipeField,
    RecipePatch,
};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Collaborators a session is wired to
#[derive(Clone)]
pub struct EditorServices {
    pub catalog: Arc<IngredientCatalog>,
    pub calculator: Arc<dyn Calculator>,
    pub repository: Arc<dyn RecipeRepository>,
    pub exporter: Arc<dyn RecipeExporter>,
}

/// Result of one applied mutation
#[derive(Debug, Clone)]
pub struct MutationOutcome {
    /// Sequence number assigned to the mutation
    pub seq: u64,
    /// Addition the mutation targeted or created, if any
    pub addition_id: Option<AdditionId>,
    /// Outcome of the first recompute that settled at or after `seq`
    pub metrics: Result<Metrics>,
}

/// Metrics as currently exposed to the UI
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsView {
    /// Last successfully computed metrics
    pub value: Option<Metrics>,
    /// True when `value` was computed against an older composition
    pub stale: bool,
    /// Error from the most recent recompute, if it failed
    pub error: Option<EditorError>,
}

pub struct RecipeEditor {
    session: Arc<Session>,
    commands: mpsc::UnboundedSender<Command>,
    saver: SaveCoordinator,
    exporter: Arc<dyn RecipeExporter>,
    config: EditorConfig,
}

impl RecipeEditor {
    /// Start a session on an empty, clean recipe
    pub fn new_recipe(services: EditorServices, config: EditorConfig) -> Self {
        let store = CompositionStore::new();
        let tracker = DirtyTracker::clean(&store);
        info!("Opened new recipe for editing");
        Self::start(services, config, store, tracker)
    }

    /// Load a persisted recipe and start a clean session on it
    pub async fn open(services: EditorServices, config: EditorConfig, recipe_id: Uuid) -> Result<Self> {
        let stored = services
            .repository
            .fetch_by_id(recipe_id)
            .await
            .map_err(|e| EditorError::PersistenceFailed(e.to_string()))?;

        let store = CompositionStore::with_composition(stored.recipe, stored.ingredients)?;
        let tracker = DirtyTracker::clean(&store);
        info!(
            recipe_id = %recipe_id,
            count = store.ingredients().len(),
            "Opened recipe for editing"
        );
        Ok(Self::start(services, config, store, tracker))
    }

    /// Start a session from an import payload handed over by navigation
    ///
    /// The composition is dirty relative to an empty baseline until saved.
    pub fn from_payload(
        services: EditorServices,
        config: EditorConfig,
        payload: ImportPayload,
    ) -> Result<Self> {
        if payload.created_catalog_entries() {
            services.catalog.invalidate();
        }
        check_patch(&payload.recipe)?;
        check_list(&services.catalog, &payload.ingredients)?;

        let mut store = CompositionStore::new();
        let tracker = DirtyTracker::clean(&store);
        store.merge_and_replace(payload.recipe, payload.ingredients)?;
        info!(count = store.ingredients().len(), "Opened imported recipe for editing");
        Ok(Self::start(services, config, store, tracker))
    }

    fn start(
        services: EditorServices,
        config: EditorConfig,
        store: CompositionStore,
        tracker: DirtyTracker,
    ) -> Self {
        let event_bus = EventBus::new(config.events.capacity);
        let session = Arc::new(Session::new(
            SessionState::new(store, tracker),
            Arc::clone(&services.catalog),
            services.calculator,
            event_bus,
        ));

        let (commands, command_rx) = mpsc::unbounded_channel();
        tokio::spawn(run_command_worker(Arc::clone(&session), command_rx));
        tokio::spawn(run_recompute_loop(Arc::clone(&session)));

        if config.catalog.preload_on_open {
            let catalog = services.catalog;
            tokio::spawn(async move {
                if let Err(e) = catalog.fetch_all(false).await {
                    warn!("Catalog preload failed: {}", e);
                }
            });
        }

        let saver = SaveCoordinator::new(Arc::clone(&session), services.repository);
        Self {
            session,
            commands,
            saver,
            exporter: services.exporter,
            config,
        }
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    pub async fn add_ingredient(&self, addition: IngredientAddition) -> Result<MutationOutcome> {
        let _adding = self.session.status.begin(Activity::AddingIngredient);
        self.submit(Mutation::AddIngredient(addition)).await
    }

    pub async fn update_ingredient(
        &self,
        addition_id: AdditionId,
        patch: IngredientPatch,
    ) -> Result<MutationOutcome> {
        let _updating = self.session.status.begin(Activity::UpdatingIngredient);
        self.submit(Mutation::UpdateIngredient(addition_id, patch)).await
    }

    pub async fn remove_ingredient(&self, addition_id: AdditionId) -> Result<MutationOutcome> {
        let _updating = self.session.status.begin(Activity::UpdatingIngredient);
        self.submit(Mutation::RemoveIngredient(addition_id)).await
    }

    /// Move an addition to `to_index` in the ingredient list
    pub async fn move_ingredient(&self, addition_id: AdditionId, to_index: usize) -> Result<MutationOutcome> {
        let _updating = self.session.status.begin(Activity::UpdatingIngredient);
        self.submit(Mutation::MoveIngredient(addition_id, to_index)).await
    }

    pub async fn update_recipe_field(&self, field: RecipeField) -> Result<MutationOutcome> {
        self.submit(Mutation::UpdateRecipeField(field)).await
    }

    /// Replace the whole ingredient list in one step (AI suggestion apply)
    pub async fn bulk_update_ingredients(
        &self,
        ingredients: Vec<IngredientAddition>,
    ) -> Result<MutationOutcome> {
        let _updating = self.session.status.begin(Activity::UpdatingIngredient);
        self.submit(Mutation::BulkUpdateIngredients(ingredients)).await
    }

    /// Merge imported recipe metadata
    pub async fn import_recipe_data(&self, patch: RecipePatch) -> Result<MutationOutcome> {
        let _importing = self.session.status.begin(Activity::Importing);
        self.submit(Mutation::ImportRecipeData(patch)).await
    }

    /// Replace the ingredient list with an already resolved import list
    pub async fn import_ingredients(
        &self,
        ingredients: Vec<IngredientAddition>,
    ) -> Result<MutationOutcome> {
        let _importing = self.session.status.begin(Activity::Importing);
        self.submit(Mutation::ImportIngredients(ingredients)).await
    }

    /// Apply a whole import as one mutation
    ///
    /// When the import created catalog entries the catalog is refreshed
    /// first; if that fails nothing is applied.
    pub async fn import_recipe(&self, payload: ImportPayload) -> Result<MutationOutcome> {
        let _importing = self.session.status.begin(Activity::Importing);
        self.submit(Mutation::ImportRecipe(payload)).await
    }

    /// Run an importer over raw file contents, then apply the result
    pub async fn import_from(
        &self,
        importer: &dyn RecipeImporter,
        source: &[u8],
    ) -> Result<MutationOutcome> {
        let _importing = self.session.status.begin(Activity::Importing);
        let payload = importer
            .import(source)
            .await
            .map_err(|e| EditorError::InvalidInput(format!("import failed: {}", e)))?;
        debug!(
            count = payload.ingredients.len(),
            created = payload.created_ingredients.len(),
            "Import collaborator produced payload"
        );
        self.submit(Mutation::ImportRecipe(payload)).await
    }

    /// Scale batch size and every ingredient quantity by `factor`
    pub async fn scale_recipe(&self, factor: f64) -> Result<MutationOutcome> {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(EditorError::InvalidScaleFactor(factor));
        }
        self.submit(Mutation::Scale(factor)).await
    }

    async fn submit(&self, mutation: Mutation) -> Result<MutationOutcome> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command { mutation, reply })
            .map_err(|_| EditorError::SessionClosed)?;

        let applied = response.await.map_err(|_| EditorError::SessionClosed)??;
        let metrics = self.session.await_settled(applied.seq).await;
        if matches!(metrics, Err(EditorError::SessionClosed)) {
            return Err(EditorError::SessionClosed);
        }
        Ok(MutationOutcome {
            seq: applied.seq,
            addition_id: applied.addition_id,
            metrics,
        })
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Persist the current composition
    ///
    /// Concurrent calls are serialized; a call queued behind an identical
    /// save shares its outcome.
    pub async fn save(&self) -> Result<Recipe> {
        self.saver.save().await
    }

    /// Persist the composition as a new version descending from this recipe
    pub async fn save_as_new_version(&self) -> Result<Recipe> {
        self.saver.save_as_new_version().await
    }

    /// Export the persisted recipe, saving first where required
    pub async fn export(&self) -> Result<ExportedRecipe> {
        let (recipe_id, dirty) = {
            let state = self.session.lock();
            (state.store.recipe().id, state.has_unsaved_changes)
        };
        if self.session.is_closed() {
            return Err(EditorError::SessionClosed);
        }

        let recipe_id = match recipe_id {
            Some(id) if !dirty => id,
            Some(_) if !self.config.export.save_before_export => {
                return Err(EditorError::ValidationFailed(
                    "recipe has unsaved changes; save before exporting".to_string(),
                ));
            }
            _ => {
                debug!("Saving before export");
                self.saver.save().await?.id.ok_or_else(|| {
                    EditorError::PersistenceFailed("saved recipe has no identifier".to_string())
                })?
            }
        };

        let exported = self
            .exporter
            .export(recipe_id)
            .await
            .map_err(|e| EditorError::ExportFailed(e.to_string()))?;
        info!(recipe_id = %recipe_id, filename = %exported.suggested_filename, "Recipe exported");
        Ok(exported)
    }

    // ========================================================================
    // Observation
    // ========================================================================

    pub fn recipe(&self) -> Recipe {
        self.session.lock().store.recipe().clone()
    }

    pub fn ingredients(&self) -> Vec<IngredientAddition> {
        self.session.lock().store.ingredients().to_vec()
    }

    pub fn metrics(&self) -> MetricsView {
        let state = self.session.lock();
        MetricsView {
            value: state.metrics,
            stale: state.metrics_seq != Some(state.seq),
            error: state.metrics_error.clone(),
        }
    }

    pub fn status(&self) -> EditorStatus {
        self.session.status.snapshot()
    }

    /// Whether the composition differs from the last persisted state
    pub fn has_unsaved_changes(&self) -> bool {
        self.session.lock().has_unsaved_changes
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EditorEvent> {
        self.session.event_bus.subscribe()
    }

    /// Resolve once the latest mutation's recompute has settled
    ///
    /// Returns that recompute's outcome. Mutations applied while waiting
    /// extend the wait.
    pub async fn wait_idle(&self) -> Result<Metrics> {
        loop {
            let seq = self.session.lock().seq;
            let outcome = self.session.await_settled(seq).await;
            if matches!(outcome, Err(EditorError::SessionClosed)) || self.session.lock().seq == seq {
                return outcome;
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.session.is_closed()
    }

    /// Tear the session down
    ///
    /// Pending operations resolve with `SessionClosed`; in-flight
    /// recompute and save results are no longer applied.
    pub fn close(&self) {
        if self.session.is_closed() {
            return;
        }
        self.session.shutdown.cancel();
        self.session.event_bus.emit_lossy(EditorEvent::SessionClosed {
            timestamp: Utc::now(),
        });
        info!(recipe_id = ?self.session.lock().store.recipe().id, "Editing session closed");
    }
}

impl Drop for RecipeEditor {
    fn drop(&mut self) {
        self.session.shutdown.cancel();
    }
}
