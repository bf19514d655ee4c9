//! Scripted collaborators
//!
//! Every fake counts its calls before passing its gate, so a test can close
//! the gate, wait for the count to move, and know a call is in flight.

use anyhow::{anyhow, bail};
use async_trait::async_trait;
use brewlog_common::models::{
    ImportPayload, IngredientAddition, IngredientDefinition, Metrics, Recipe,
};
use brewlog_editor::{
    Calculator, CatalogLookup, CatalogSource, ExportedRecipe, RecipeExporter, RecipeImporter,
    RecipeRepository, StoredRecipe,
};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::watch;
use uuid::Uuid;

/// Blocks callers while closed
pub struct Gate {
    open: watch::Sender<bool>,
}

impl Gate {
    pub fn new() -> Self {
        let (open, _) = watch::channel(true);
        Self { open }
    }

    pub fn close(&self) {
        self.open.send_replace(false);
    }

    pub fn open(&self) {
        self.open.send_replace(true);
    }

    pub async fn pass(&self) {
        let mut rx = self.open.subscribe();
        let _ = rx.wait_for(|open| *open).await;
    }
}

/// Deterministic stand-in for the brewing formulas
///
/// Each metric is a plain function of the composition so tests can tell
/// exactly which composition a result was computed against.
pub fn metrics_for(recipe: &Recipe, ingredients: &[IngredientAddition]) -> Metrics {
    Metrics {
        original_gravity: recipe.batch_size_l,
        final_gravity: recipe.efficiency_pct,
        abv_pct: recipe.name.len() as f64,
        ibu: ingredients.iter().map(|a| a.quantity.amount).sum(),
        srm: ingredients.len() as f64,
    }
}

pub struct ScriptedCalculator {
    pub calls: AtomicUsize,
    pub fail: AtomicBool,
    pub gate: Gate,
    pub seen: Mutex<Vec<(Recipe, Vec<IngredientAddition>)>>,
}

impl ScriptedCalculator {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
            gate: Gate::new(),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_seen(&self) -> Option<(Recipe, Vec<IngredientAddition>)> {
        self.seen.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Calculator for ScriptedCalculator {
    async fn compute(
        &self,
        recipe: &Recipe,
        ingredients: &[IngredientAddition],
        _catalog: &CatalogLookup,
    ) -> anyhow::Result<Metrics> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen
            .lock()
            .unwrap()
            .push((recipe.clone(), ingredients.to_vec()));
        self.gate.pass().await;

        if self.fail.load(Ordering::SeqCst) {
            bail!("calculator exploded");
        }
        Ok(metrics_for(recipe, ingredients))
    }
}

pub struct CountingCatalogSource {
    pub calls: AtomicUsize,
    pub fail: AtomicBool,
    pub gate: Gate,
    entries: Mutex<Vec<IngredientDefinition>>,
}

impl CountingCatalogSource {
    pub fn new(entries: Vec<IngredientDefinition>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
            gate: Gate::new(),
            entries: Mutex::new(entries),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Simulate an entry created server-side (e.g. by an import)
    pub fn add_entry(&self, definition: IngredientDefinition) {
        self.entries.lock().unwrap().push(definition);
    }
}

#[async_trait]
impl CatalogSource for CountingCatalogSource {
    async fn fetch_all(&self) -> anyhow::Result<Vec<IngredientDefinition>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.gate.pass().await;

        if self.fail.load(Ordering::SeqCst) {
            bail!("catalog service unreachable");
        }
        Ok(self.entries.lock().unwrap().clone())
    }
}

pub struct InMemoryRepository {
    pub create_calls: AtomicUsize,
    pub update_calls: AtomicUsize,
    pub fetch_calls: AtomicUsize,
    pub fail: AtomicBool,
    pub gate: Gate,
    recipes: Mutex<HashMap<Uuid, StoredRecipe>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self {
            create_calls: AtomicUsize::new(0),
            update_calls: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
            gate: Gate::new(),
            recipes: Mutex::new(HashMap::new()),
        }
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    /// Store a recipe directly, returning its assigned identifier
    pub fn seed(&self, recipe: Recipe, ingredients: Vec<IngredientAddition>) -> Uuid {
        let id = Uuid::new_v4();
        let recipe = Recipe {
            id: Some(id),
            created_at: Some(Utc::now()),
            updated_at: Some(Utc::now()),
            ..recipe
        };
        self.recipes
            .lock()
            .unwrap()
            .insert(id, StoredRecipe { recipe, ingredients });
        id
    }

    pub fn stored(&self, id: Uuid) -> Option<StoredRecipe> {
        self.recipes.lock().unwrap().get(&id).cloned()
    }

    fn check_failure(&self) -> anyhow::Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            bail!("503 Service Unavailable");
        }
        Ok(())
    }
}

#[async_trait]
impl RecipeRepository for InMemoryRepository {
    async fn create(&self, recipe: &Recipe, ingredients: &[IngredientAddition]) -> anyhow::Result<Recipe> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.gate.pass().await;
        self.check_failure()?;

        let id = Uuid::new_v4();
        let now = Utc::now();
        let persisted = Recipe {
            id: Some(id),
            created_at: Some(now),
            updated_at: Some(now),
            ..recipe.clone()
        };
        self.recipes.lock().unwrap().insert(
            id,
            StoredRecipe {
                recipe: persisted.clone(),
                ingredients: ingredients.to_vec(),
            },
        );
        Ok(persisted)
    }

    async fn update(
        &self,
        id: Uuid,
        recipe: &Recipe,
        ingredients: &[IngredientAddition],
    ) -> anyhow::Result<Recipe> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        self.gate.pass().await;
        self.check_failure()?;

        let mut recipes = self.recipes.lock().unwrap();
        let existing = recipes
            .get_mut(&id)
            .ok_or_else(|| anyhow!("404 recipe {} not found", id))?;
        let persisted = Recipe {
            id: Some(id),
            created_at: existing.recipe.created_at,
            updated_at: Some(Utc::now()),
            ..recipe.clone()
        };
        *existing = StoredRecipe {
            recipe: persisted.clone(),
            ingredients: ingredients.to_vec(),
        };
        Ok(persisted)
    }

    async fn fetch_by_id(&self, id: Uuid) -> anyhow::Result<StoredRecipe> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;
        self.stored(id)
            .ok_or_else(|| anyhow!("404 recipe {} not found", id))
    }
}

pub struct ScriptedExporter {
    pub calls: AtomicUsize,
    pub fail: AtomicBool,
    pub exported_ids: Mutex<Vec<Uuid>>,
}

impl ScriptedExporter {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
            exported_ids: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecipeExporter for ScriptedExporter {
    async fn export(&self, recipe_id: Uuid) -> anyhow::Result<ExportedRecipe> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            bail!("export service timed out");
        }
        self.exported_ids.lock().unwrap().push(recipe_id);
        Ok(ExportedRecipe {
            content: format!("<RECIPES><RECIPE id=\"{}\"/></RECIPES>", recipe_id),
            suggested_filename: format!("{}.xml", recipe_id),
        })
    }
}

/// Importer returning a fixed payload regardless of input
pub struct StaticImporter {
    pub payload: Option<ImportPayload>,
}

#[async_trait]
impl RecipeImporter for StaticImporter {
    async fn import(&self, source: &[u8]) -> anyhow::Result<ImportPayload> {
        if source.is_empty() {
            bail!("empty recipe file");
        }
        self.payload
            .clone()
            .ok_or_else(|| anyhow!("unrecognized recipe format"))
    }
}
