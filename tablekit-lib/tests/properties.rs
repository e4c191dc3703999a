//! Invariants that hold across datasets and widget configurations.

mod common;

use std::sync::Arc;

use serde_json::json;
use tablekit_lib::DataTable;
use tablekit_lib::config::TableConfig;
use tablekit_lib::datasource::MemoryDatasource;
use tablekit_lib::edit::EditMode;
use tablekit_lib::edit::SaveOutcome;
use tablekit_lib::events::Toast;
use tablekit_lib::model::Column;
use tablekit_lib::model::add_unique_row_ids;
use tablekit_lib::pagination::reproject_selected;
use tablekit_lib::persistence::MemoryStateStorage;
use tablekit_lib::persistence::SelectedItem;
use tablekit_lib::persistence::StateStorage;
use tablekit_lib::persistence::StorageScope;
use tablekit_lib::query::FilterSpec;
use tablekit_lib::selection::ClickTarget;
use tablekit_lib::selection::SelectionMode;

use common::RecordingEvents;
use common::id;
use common::people;

#[test]
fn test_row_ids_are_stable_and_follow_content() {
    let values = vec![
        json!({"name": "Ada", "age": 36}),
        json!({"name": "Grace", "age": 45}),
        json!({"id": 9, "name": "Linus"}),
    ];
    let first = add_unique_row_ids(values.clone());
    let second = add_unique_row_ids(values.clone());
    for (a, b) in first.iter().zip(&second) {
        assert_eq!(a.id(), b.id());
    }

    let mut changed = values;
    changed[0]["age"] = json!(37);
    changed[2]["name"] = json!("Linus T.");
    let third = add_unique_row_ids(changed);
    assert_ne!(third[0].id(), first[0].id());
    assert_eq!(third[1].id(), first[1].id());
    assert_eq!(third[2].id(), first[2].id());
}

#[test]
fn test_reprojection_round_trips() {
    for (old, new) in [(5, 10), (10, 3), (7, 7), (1, 4)] {
        let items: Vec<SelectedItem> = (1..=4)
            .flat_map(|page| (0..old).map(move |index| SelectedItem::new(page, index)))
            .collect();
        let there = reproject_selected(&items, old, new);
        let back = reproject_selected(&there, new, old);
        assert_eq!(back, items, "{} -> {} -> {}", old, new, old);
    }
}

#[tokio::test]
async fn test_multi_select_wins_over_radio() {
    assert_eq!(SelectionMode::from_flags(true, true), SelectionMode::Multi);

    let config = TableConfig::new("people").with_selection(true, true);
    let table = DataTable::new(config, Vec::new());
    table.set_dataset(people(5)).await;
    table.mount().await.unwrap();
    for i in 1..=4 {
        table.handle_row_click(&ClickTarget::cell(), &id(i)).await;
    }
    assert_eq!(table.selected_ids().len(), 4);
}

#[tokio::test]
async fn test_default_state_is_cleared() {
    let storage = Arc::new(MemoryStateStorage::new());
    let config = TableConfig::new("people")
        .with_selection(false, true)
        .with_state_handler(StorageScope::Session);
    let table = DataTable::new(config, Vec::new()).with_storage(storage.clone());
    table.set_dataset(people(8)).await;
    table.mount().await.unwrap();

    table.handle_row_click(&ClickTarget::cell(), &id(2)).await;
    let state = storage.get_table_state("people", StorageScope::Session).await.unwrap();
    assert_eq!(state.unwrap().selected_item, vec![SelectedItem::new(1, 1)]);

    table.handle_row_click(&ClickTarget::cell(), &id(2)).await;
    assert!(storage.is_empty());

    table.go_to_page(2).await;
    assert!(!storage.is_empty());
    table.go_to_page(1).await;
    assert!(storage.is_empty());
}

#[tokio::test]
async fn test_unchanged_save_skips_update() {
    let ds = Arc::new(MemoryDatasource::new(people(2)));
    let events = Arc::new(RecordingEvents::default());
    let columns = vec![Column::new("name", "Name"), Column::new("age", "Age")];
    let table = DataTable::new(TableConfig::new("people").with_edit_mode(EditMode::Inline), columns)
        .with_events(events.clone())
        .with_datasource(ds.clone());
    table.mount().await.unwrap();

    table.edit_row(&id(1)).unwrap();
    table.update_field("name", json!("Person 01")).unwrap();
    assert_eq!(table.save_row().await.unwrap(), SaveOutcome::NoChanges);

    assert!(!table.editor().is_editing(&id(1)));
    assert!(events.saved.lock().unwrap().is_empty());
    assert_eq!(
        events.toasts.lock().unwrap().as_slice(),
        &[Toast::info("No changes detected")]
    );
}

#[tokio::test]
async fn test_filter_drops_page_and_selection() {
    let storage = Arc::new(MemoryStateStorage::new());
    let config = TableConfig::new("people")
        .with_selection(false, true)
        .with_state_handler(StorageScope::Local);
    let table = DataTable::new(config, Vec::new()).with_storage(storage.clone());
    table.set_dataset(people(12)).await;
    table.mount().await.unwrap();

    table.go_to_page(2).await;
    table.handle_row_click(&ClickTarget::cell(), &id(7)).await;
    let before = storage.get_table_state("people", StorageScope::Local).await.unwrap().unwrap();
    assert_eq!(before.pagination, Some(2));
    assert_eq!(before.selected_item, vec![SelectedItem::new(2, 1)]);

    table.set_filters(vec![FilterSpec::new("name", "Person 1")]).await;
    let after = storage.get_table_state("people", StorageScope::Local).await.unwrap().unwrap();
    assert_eq!(after.pagination, None);
    assert!(after.selected_item.is_empty());

    // a later page change under the same filter keeps positions out
    table.change_page_size(2).await;
    table.go_to_page(2).await;
    let later = storage.get_table_state("people", StorageScope::Local).await.unwrap().unwrap();
    assert_eq!(later.pagination, None);
    assert!(later.selected_item.is_empty());
}
