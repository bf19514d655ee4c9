//! Catalog fixtures and a fully wired editing harness

use super::fakes::{CountingCatalogSource, InMemoryRepository, ScriptedCalculator, ScriptedExporter};
use brewlog_common::config::EditorConfig;
use brewlog_common::events::EditorEvent;
use brewlog_common::models::{
    IngredientAddition, IngredientAttributes, IngredientDefinition, IngredientKind, Quantity, Unit,
    UsePhase,
};
use brewlog_editor::{EditorServices, IngredientCatalog, RecipeEditor};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use uuid::Uuid;

pub struct Harness {
    pub source: Arc<CountingCatalogSource>,
    pub catalog: Arc<IngredientCatalog>,
    pub calculator: Arc<ScriptedCalculator>,
    pub repository: Arc<InMemoryRepository>,
    pub exporter: Arc<ScriptedExporter>,
    pub pale_malt: IngredientDefinition,
    pub cascade: IngredientDefinition,
    pub ale_yeast: IngredientDefinition,
}

impl Harness {
    pub fn new() -> Self {
        let pale_malt = definition("Pale Ale Malt", IngredientKind::Fermentable);
        let cascade = definition("Cascade", IngredientKind::Hop);
        let ale_yeast = definition("American Ale", IngredientKind::Yeast);

        let source = Arc::new(CountingCatalogSource::new(vec![
            pale_malt.clone(),
            cascade.clone(),
            ale_yeast.clone(),
        ]));
        Self {
            catalog: Arc::new(IngredientCatalog::new(source.clone())),
            source,
            calculator: Arc::new(ScriptedCalculator::new()),
            repository: Arc::new(InMemoryRepository::new()),
            exporter: Arc::new(ScriptedExporter::new()),
            pale_malt,
            cascade,
            ale_yeast,
        }
    }

    pub fn services(&self) -> EditorServices {
        EditorServices {
            catalog: self.catalog.clone(),
            calculator: self.calculator.clone(),
            repository: self.repository.clone(),
            exporter: self.exporter.clone(),
        }
    }

    /// Config with catalog preload off so catalog call counts are exact
    pub fn config(&self) -> EditorConfig {
        let mut config = EditorConfig::default();
        config.catalog.preload_on_open = false;
        config
    }

    pub fn new_editor(&self) -> RecipeEditor {
        RecipeEditor::new_recipe(self.services(), self.config())
    }

    pub fn malt(&self, kg: f64) -> IngredientAddition {
        IngredientAddition::new(self.pale_malt.id, UsePhase::Mash, Quantity::new(kg, Unit::Kilograms))
    }

    pub fn hop(&self, grams: f64, minutes: u32) -> IngredientAddition {
        IngredientAddition::new(self.cascade.id, UsePhase::Boil, Quantity::new(grams, Unit::Grams))
            .with_time(minutes)
    }

    pub fn yeast(&self) -> IngredientAddition {
        IngredientAddition::new(self.ale_yeast.id, UsePhase::Primary, Quantity::new(1.0, Unit::Packages))
    }
}

pub fn definition(name: &str, kind: IngredientKind) -> IngredientDefinition {
    IngredientDefinition {
        id: Uuid::new_v4(),
        name: name.to_string(),
        kind,
        attributes: IngredientAttributes::default(),
    }
}

/// Poll `condition` until it holds, panicking after two seconds
pub async fn eventually(what: &str, condition: impl Fn() -> bool) {
    let waited = tokio::time::timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "timed out waiting for {}", what);
}

/// Collect every event already delivered to `rx`
pub fn drain_events(rx: &mut broadcast::Receiver<EditorEvent>) -> Vec<EditorEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
