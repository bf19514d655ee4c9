//! Save Coordinator and Dirty Tracking Tests
//!
//! - Validation failures never reach persistence
//! - Concurrent saves are serialized and share an identical outcome
//! - A successful save writes identity back and clears dirty state
//! - A failed save leaves composition and dirty state untouched
//! - New versions and export run through the same save path

mod helpers;

use brewlog_common::events::EditorEvent;
use brewlog_common::models::{ImportPayload, Recipe, RecipeField, RecipePatch};
use brewlog_editor::{EditorError, RecipeEditor};
use helpers::{drain_events, eventually, Harness};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

async fn named_editor(h: &Harness, name: &str) -> RecipeEditor {
    let editor = h.new_editor();
    editor
        .update_recipe_field(RecipeField::Name(name.to_string()))
        .await
        .unwrap();
    editor
}

async fn open_seeded(h: &Harness) -> (RecipeEditor, uuid::Uuid) {
    let recipe = Recipe {
        name: "House Bitter".to_string(),
        ..Recipe::default()
    };
    let id = h.repository.seed(recipe, vec![h.malt(3.5), h.hop(25.0, 60)]);
    let editor = RecipeEditor::open(h.services(), h.config(), id).await.unwrap();
    (editor, id)
}

#[tokio::test]
async fn test_first_save_assigns_identifier_and_clears_dirty() {
    let h = Harness::new();
    let editor = named_editor(&h, "Session IPA").await;
    editor.add_ingredient(h.malt(4.0)).await.unwrap();
    assert!(editor.has_unsaved_changes());
    let mut events = editor.subscribe();

    let saved = editor.save().await.unwrap();

    let id = saved.id.expect("persisted recipe has an id");
    assert_eq!(editor.recipe().id, Some(id));
    assert!(!editor.has_unsaved_changes());
    assert_eq!(h.repository.create_calls(), 1);
    assert_eq!(h.repository.stored(id).unwrap().ingredients.len(), 1);
    assert!(drain_events(&mut events)
        .iter()
        .any(|e| matches!(e, EditorEvent::RecipeSaved { recipe_id, .. } if *recipe_id == id)));

    // Second save updates in place
    editor.update_recipe_field(RecipeField::Notes("dry hop day 3".into())).await.unwrap();
    let resaved = editor.save().await.unwrap();
    assert_eq!(resaved.id, Some(id));
    assert_eq!(h.repository.create_calls(), 1);
    assert_eq!(h.repository.update_calls(), 1);
}

#[tokio::test]
async fn test_invalid_recipe_fails_without_persistence_call() {
    let h = Harness::new();
    let editor = h.new_editor();

    let unnamed = editor.save().await;
    assert!(matches!(unnamed, Err(EditorError::ValidationFailed(_))));

    editor.update_recipe_field(RecipeField::Name("Zero Batch".into())).await.unwrap();
    editor.update_recipe_field(RecipeField::BatchSize(0.0)).await.unwrap();
    let empty_batch = editor.save().await;
    assert!(matches!(empty_batch, Err(EditorError::ValidationFailed(_))));

    assert_eq!(h.repository.create_calls(), 0);
    assert_eq!(h.repository.update_calls(), 0);
}

#[tokio::test]
async fn test_concurrent_saves_issue_one_request() {
    let h = Harness::new();
    let editor = named_editor(&h, "Porter").await;

    h.repository.gate.close();
    let (first, second, ()) = tokio::join!(editor.save(), editor.save(), async {
        eventually("first save in flight", || h.repository.create_calls() == 1).await;
        assert!(editor.status().saving);
        h.repository.gate.open();
    });

    let first = first.unwrap();
    let second = second.unwrap();
    assert_eq!(first, second);
    assert_eq!(h.repository.create_calls(), 1);
    assert_eq!(h.repository.update_calls(), 0);
    assert!(!editor.status().saving);
}

#[tokio::test]
async fn test_queued_save_persists_newer_changes() {
    let h = Harness::new();
    let editor = Arc::new(named_editor(&h, "Dunkel").await);

    h.repository.gate.close();
    let first = tokio::spawn({
        let editor = editor.clone();
        async move { editor.save().await }
    });
    eventually("first save in flight", || h.repository.create_calls() == 1).await;

    editor.update_recipe_field(RecipeField::Notes("lager at 10C".into())).await.unwrap();
    let second = tokio::spawn({
        let editor = editor.clone();
        async move { editor.save().await }
    });
    h.repository.gate.open();

    let first = first.await.unwrap().unwrap();
    let second = second.await.unwrap().unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(h.repository.create_calls(), 1);
    assert_eq!(h.repository.update_calls(), 1);
    assert_eq!(second.notes, "lager at 10C");
    assert!(!editor.has_unsaved_changes());
}

#[tokio::test]
async fn test_edits_during_save_keep_session_dirty() {
    let h = Harness::new();
    let editor = Arc::new(named_editor(&h, "Saison").await);

    h.repository.gate.close();
    let save = tokio::spawn({
        let editor = editor.clone();
        async move { editor.save().await }
    });
    eventually("save in flight", || h.repository.create_calls() == 1).await;
    editor.add_ingredient(h.yeast()).await.unwrap();
    h.repository.gate.open();

    let saved = save.await.unwrap().unwrap();
    assert_eq!(editor.recipe().id, saved.id);
    assert_eq!(editor.ingredients().len(), 1, "in-flight edit survives the save");
    assert!(editor.has_unsaved_changes());
}

#[tokio::test]
async fn test_invalid_save_does_not_wait_for_save_in_flight() {
    let h = Harness::new();
    let editor = Arc::new(named_editor(&h, "Helles").await);

    h.repository.gate.close();
    let in_flight = tokio::spawn({
        let editor = editor.clone();
        async move { editor.save().await }
    });
    eventually("save in flight", || h.repository.create_calls() == 1).await;

    editor.update_recipe_field(RecipeField::Name(String::new())).await.unwrap();
    let rejected = tokio::time::timeout(Duration::from_millis(500), editor.save())
        .await
        .expect("validation failure must not queue behind the save in flight");
    assert!(matches!(rejected, Err(EditorError::ValidationFailed(_))));

    h.repository.gate.open();
    assert!(in_flight.await.unwrap().is_ok());
    assert_eq!(h.repository.create_calls(), 1);
    assert_eq!(h.repository.update_calls(), 0);
}

#[tokio::test]
async fn test_failed_save_leaves_state_unchanged() {
    let h = Harness::new();
    let editor = named_editor(&h, "Barleywine").await;
    editor.add_ingredient(h.malt(8.0)).await.unwrap();
    let before = (editor.recipe(), editor.ingredients());
    let mut events = editor.subscribe();

    h.repository.fail.store(true, Ordering::SeqCst);
    let result = editor.save().await;

    assert!(matches!(result, Err(EditorError::PersistenceFailed(_))));
    assert_eq!((editor.recipe(), editor.ingredients()), before);
    assert!(editor.has_unsaved_changes());
    assert!(drain_events(&mut events)
        .iter()
        .any(|e| matches!(e, EditorEvent::SaveFailed { .. })));

    // Retry after the outage goes through
    h.repository.fail.store(false, Ordering::SeqCst);
    assert!(editor.save().await.is_ok());
    assert!(!editor.has_unsaved_changes());
}

#[tokio::test]
async fn test_opened_recipe_is_clean_until_content_changes() {
    let h = Harness::new();
    let (editor, id) = open_seeded(&h).await;

    assert_eq!(editor.recipe().id, Some(id));
    assert_eq!(editor.ingredients().len(), 2);
    assert!(!editor.has_unsaved_changes());
    editor.wait_idle().await.unwrap();

    editor.update_recipe_field(RecipeField::BoilTime(90)).await.unwrap();
    assert!(editor.has_unsaved_changes());

    // Reverting the edit restores the persisted content
    editor.update_recipe_field(RecipeField::BoilTime(60)).await.unwrap();
    assert!(!editor.has_unsaved_changes());
}

#[tokio::test]
async fn test_reordering_counts_as_unsaved_change() {
    let h = Harness::new();
    let (editor, _) = open_seeded(&h).await;
    let hop = editor.ingredients()[1].id.unwrap();

    editor.move_ingredient(hop, 0).await.unwrap();

    assert!(editor.has_unsaved_changes());
}

#[tokio::test]
async fn test_open_unknown_recipe_fails() {
    let h = Harness::new();
    let result = RecipeEditor::open(h.services(), h.config(), uuid::Uuid::new_v4()).await;
    assert!(matches!(result, Err(EditorError::PersistenceFailed(_))));
}

#[tokio::test]
async fn test_payload_session_is_dirty_against_empty_baseline() {
    let h = Harness::new();
    let payload = ImportPayload {
        recipe: RecipePatch::named("From Navigation"),
        ingredients: vec![h.malt(5.0), h.yeast()],
        created_ingredients: vec![],
    };

    let editor = RecipeEditor::from_payload(h.services(), h.config(), payload).unwrap();

    assert!(editor.has_unsaved_changes());
    assert_eq!(editor.recipe().id, None);
    let metrics = editor.wait_idle().await.unwrap();
    assert_eq!(metrics.srm, 2.0);
}

#[tokio::test]
async fn test_payload_session_rejects_malformed_values() {
    let h = Harness::new();

    let zero_quantity = ImportPayload {
        recipe: RecipePatch::named("Zero Malt"),
        ingredients: vec![h.malt(0.0)],
        created_ingredients: vec![],
    };
    let result = RecipeEditor::from_payload(h.services(), h.config(), zero_quantity);
    assert!(matches!(result, Err(EditorError::InvalidInput(_))));

    let nan_batch = ImportPayload {
        recipe: RecipePatch {
            batch_size_l: Some(f64::NAN),
            ..RecipePatch::named("NaN Batch")
        },
        ingredients: vec![h.malt(5.0)],
        created_ingredients: vec![],
    };
    let result = RecipeEditor::from_payload(h.services(), h.config(), nan_batch);
    assert!(matches!(result, Err(EditorError::InvalidInput(_))));
}

#[tokio::test]
async fn test_save_as_new_version_links_to_parent() {
    let h = Harness::new();
    let (editor, parent_id) = open_seeded(&h).await;
    editor.update_recipe_field(RecipeField::Notes("more late hops".into())).await.unwrap();

    let next = editor.save_as_new_version().await.unwrap();

    let next_id = next.id.unwrap();
    assert_ne!(next_id, parent_id);
    assert_eq!(next.version, 2);
    assert_eq!(next.parent_recipe_id, Some(parent_id));
    assert_eq!(editor.recipe().id, Some(next_id));
    assert_eq!(editor.recipe().version, 2);
    assert!(!editor.has_unsaved_changes());
    assert_eq!(h.repository.stored(parent_id).unwrap().recipe.notes, "");
}

#[tokio::test]
async fn test_new_version_requires_persisted_recipe() {
    let h = Harness::new();
    let editor = named_editor(&h, "Never Saved").await;

    let result = editor.save_as_new_version().await;

    assert!(matches!(result, Err(EditorError::ValidationFailed(_))));
    assert_eq!(h.repository.create_calls(), 0);
}

#[tokio::test]
async fn test_export_saves_unsaved_recipe_first() {
    let h = Harness::new();
    let editor = named_editor(&h, "Export Me").await;

    let exported = editor.export().await.unwrap();

    let id = editor.recipe().id.unwrap();
    assert_eq!(h.repository.create_calls(), 1);
    assert_eq!(*h.exporter.exported_ids.lock().unwrap(), vec![id]);
    assert_eq!(exported.suggested_filename, format!("{}.xml", id));
}

#[tokio::test]
async fn test_export_of_clean_recipe_skips_save() {
    let h = Harness::new();
    let (editor, id) = open_seeded(&h).await;

    editor.export().await.unwrap();

    assert_eq!(h.repository.create_calls(), 0);
    assert_eq!(h.repository.update_calls(), 0);
    assert_eq!(*h.exporter.exported_ids.lock().unwrap(), vec![id]);
}

#[tokio::test]
async fn test_export_refuses_dirty_recipe_without_autosave() {
    let h = Harness::new();
    let mut config = h.config();
    config.export.save_before_export = false;
    let id = h.repository.seed(
        Recipe {
            name: "Strict".to_string(),
            ..Recipe::default()
        },
        vec![],
    );
    let editor = RecipeEditor::open(h.services(), config, id).await.unwrap();
    editor.update_recipe_field(RecipeField::Efficiency(80.0)).await.unwrap();

    let result = editor.export().await;

    assert!(matches!(result, Err(EditorError::ValidationFailed(_))));
    assert_eq!(h.exporter.calls(), 0);
}

#[tokio::test]
async fn test_export_failure_is_reported() {
    let h = Harness::new();
    let (editor, _) = open_seeded(&h).await;
    h.exporter.fail.store(true, Ordering::SeqCst);

    let result = editor.export().await;

    assert!(matches!(result, Err(EditorError::ExportFailed(_))));
}
