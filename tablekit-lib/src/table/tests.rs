use std::sync::Mutex;

use serde_json::json;

use super::*;
use crate::datasource::FailOn;
use crate::datasource::MemoryDatasource;
use crate::edit::EditMode;
use crate::edit::SaveOutcome;
use crate::pagination::NavigationMode;
use crate::persistence::MemoryStateStorage;
use crate::persistence::StorageScope;
use crate::persistence::TableState;
use crate::query::SortSpec;

fn records(n: usize) -> Vec<Value> {
    (1..=n).map(|i| json!({"id": i, "name": format!("Row {:02}", i)})).collect()
}

fn id(i: usize) -> RowId {
    RowId::new(i.to_string())
}

#[derive(Default)]
struct Changes(Mutex<Vec<(String, Map<String, Value>)>>);

impl ChangeListener for Changes {
    fn on_change(&self, name: &str, patch: &Map<String, Value>) {
        self.0.lock().unwrap().push((name.to_string(), patch.clone()));
    }
}

fn persisted(size: usize) -> TableConfig {
    TableConfig::new("grid")
        .with_page_size(size)
        .with_selection(false, true)
        .with_state_handler(StorageScope::Local)
}

fn persisted_radio(size: usize) -> TableConfig {
    TableConfig::new("grid")
        .with_page_size(size)
        .with_selection(true, false)
        .with_state_handler(StorageScope::Local)
}

async fn stored(storage: &MemoryStateStorage) -> Option<TableState> {
    storage.get_table_state("grid", StorageScope::Local).await.unwrap()
}

#[tokio::test]
async fn test_client_pages_and_clamps() {
    let table = DataTable::new(TableConfig::new("grid"), Vec::new());
    table.set_dataset(records(12)).await;
    table.mount().await.unwrap();

    assert_eq!(table.navigate(Direction::Last).await, NavigationOutcome::Navigated(3));
    assert_eq!(table.page_rows().len(), 2);

    table.set_dataset(records(4)).await;
    assert_eq!(table.pagination().page(), 1);
    assert_eq!(table.page_rows().len(), 4);
}

#[tokio::test]
async fn test_restores_page_and_selection() {
    let storage = Arc::new(MemoryStateStorage::new());
    let saved = TableState {
        pagination: Some(2),
        selected_item: vec![SelectedItem::new(2, 1)],
        ..TableState::default()
    };
    storage.save_table_state("grid", StorageScope::Local, &saved).await.unwrap();

    let table = DataTable::new(persisted(5), Vec::new()).with_storage(storage.clone());
    table.set_dataset(records(12)).await;
    table.mount().await.unwrap();

    assert_eq!(table.pagination().page(), 2);
    assert_eq!(table.selected_ids(), vec![id(7)]);
}

#[tokio::test]
async fn test_default_state_clears_storage() {
    let storage = Arc::new(MemoryStateStorage::new());
    let table = DataTable::new(persisted(5), Vec::new()).with_storage(storage.clone());
    table.set_dataset(records(12)).await;
    table.mount().await.unwrap();

    table.go_to_page(2).await;
    assert_eq!(
        storage.get_table_state("grid", StorageScope::Local).await.unwrap().unwrap().pagination,
        Some(2)
    );

    table.go_to_page(1).await;
    assert!(storage.get_table_state("grid", StorageScope::Local).await.unwrap().is_none());
}

#[tokio::test]
async fn test_filter_drops_persisted_position() {
    let storage = Arc::new(MemoryStateStorage::new());
    let table = DataTable::new(persisted(5), Vec::new()).with_storage(storage.clone());
    table.set_dataset(records(12)).await;
    table.mount().await.unwrap();

    table.go_to_page(2).await;
    table.handle_row_click(&ClickTarget::cell(), &id(6)).await;
    table.set_filters(vec![FilterSpec::new("name", "Row 1")]).await;

    assert_eq!(table.pagination().page(), 1);
    assert_eq!(table.page_rows().len(), 3);
    let state = storage.get_table_state("grid", StorageScope::Local).await.unwrap().unwrap();
    assert_eq!(state.pagination, None);
    assert!(state.selected_item.is_empty());
    assert_eq!(state.search.len(), 1);
}

#[tokio::test]
async fn test_selection_reaches_listener_and_cell_state() {
    let changes = Arc::new(Changes::default());
    let table = DataTable::new(TableConfig::new("grid").with_selection(false, true), Vec::new())
        .with_listener(changes.clone());
    table.set_dataset(records(3)).await;
    table.mount().await.unwrap();

    assert!(table.handle_row_click(&ClickTarget::cell(), &id(1)).await);
    assert!(table.handle_row_click(&ClickTarget::cell(), &id(3)).await);
    assert!(!table.handle_row_click(&ClickTarget::new("button"), &id(2)).await);

    let (name, patch) = changes.0.lock().unwrap().last().cloned().unwrap();
    assert_eq!(name, "grid");
    assert_eq!(patch[SELECTED_ITEM_PROPERTY].as_array().unwrap().len(), 2);
    assert_eq!(
        table.cell_state().get_value(&["selection"], Value::Null),
        json!(["1", "3"])
    );
    assert_eq!(
        table.selected_items(),
        vec![SelectedItem::new(1, 0), SelectedItem::new(1, 2)]
    );
}

#[tokio::test]
async fn test_first_row_select_on_mount() {
    let config = TableConfig::new("grid")
        .with_selection(true, false)
        .with_first_row_select(true);
    let table = DataTable::new(config, Vec::new());
    table.set_dataset(records(3)).await;
    table.mount().await.unwrap();
    assert_eq!(table.selected_ids(), vec![id(1)]);
}

#[tokio::test]
async fn test_page_size_change_reprojects_selection() {
    let table = DataTable::new(TableConfig::new("grid").with_selection(false, true), Vec::new());
    table.set_dataset(records(12)).await;
    table.mount().await.unwrap();

    table.go_to_page(2).await;
    table.handle_row_click(&ClickTarget::cell(), &id(8)).await;
    assert_eq!(table.selected_items(), vec![SelectedItem::new(2, 2)]);

    table.change_page_size(10).await;
    assert_eq!(table.selected_items(), vec![SelectedItem::new(1, 7)]);
    assert_eq!(table.pagination().page(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_server_mode_fetches_and_sorts() {
    let ds = Arc::new(MemoryDatasource::pageable(records(12)));
    let table = DataTable::new(TableConfig::new("grid"), Vec::new()).with_datasource(ds.clone());
    table.mount().await.unwrap();

    assert!(table.is_server_paginated());
    assert_eq!(table.page_rows().len(), 5);
    assert_eq!(table.pagination().page_count, 3);

    let outcome = table.sort_by("id").await.unwrap();
    assert!(matches!(outcome, QueryOutcome::Applied { .. }));
    let outcome = table.sort_by("id").await.unwrap();
    assert!(matches!(outcome, QueryOutcome::Applied { .. }));
    assert_eq!(table.page_rows()[0].id(), &id(12));
    assert_eq!(table.dataset().len(), 5);
}

#[tokio::test]
async fn test_failed_mount_reports_fetch() {
    let ds = Arc::new(MemoryDatasource::new(records(3)));
    ds.fail_next(FailOn::Invoke);
    let table = DataTable::new(TableConfig::new("grid"), Vec::new()).with_datasource(ds);
    assert!(table.mount().await.is_err());
}

#[tokio::test]
async fn test_insert_moves_to_its_page() {
    let ds = Arc::new(MemoryDatasource::new(records(6)));
    let columns = vec![Column::new("name", "Name")];
    let config = TableConfig::new("grid").with_edit_mode(EditMode::Inline);
    let table = DataTable::new(config, columns).with_datasource(ds.clone());
    table.mount().await.unwrap();

    table.add_new_row().unwrap();
    table.update_field("name", json!("Row 07")).unwrap();
    let outcome = table.save_row().await.unwrap();

    assert!(matches!(outcome, SaveOutcome::Inserted { page: 2, .. }));
    assert_eq!(table.pagination().page(), 2);
    assert_eq!(ds.records().len(), 7);
}

#[tokio::test]
async fn test_export_uses_current_query() {
    let ds = Arc::new(MemoryDatasource::new(records(4)));
    let table = DataTable::new(TableConfig::new("grid"), vec![Column::new("name", "Name")])
        .with_datasource(ds.clone());
    table.mount().await.unwrap();
    table.set_filters(vec![FilterSpec::new("name", "Row 0")]).await;

    let result = table.export("CSV", None).await.unwrap();
    assert_eq!(result["rows"], json!(4));
    assert_eq!(ds.exports()[0].fields.len(), 1);

    ds.fail_next(FailOn::Download);
    assert!(table.export("CSV", None).await.is_err());
}

#[tokio::test]
async fn test_dispose_clears_cell_state() {
    let table = DataTable::new(TableConfig::new("grid").with_selection(true, false), Vec::new());
    table.set_dataset(records(2)).await;
    table.mount().await.unwrap();
    table.handle_row_click(&ClickTarget::cell(), &id(2)).await;
    assert!(table.cell_state().has_value(&["selection"]));

    table.dispose();
    assert!(table.is_disposed());
    assert!(!table.cell_state().has_value(&["selection"]));
}

#[tokio::test]
async fn test_selection_survives_sort_and_reload() {
    let storage = Arc::new(MemoryStateStorage::new());
    let table = DataTable::new(persisted_radio(5), Vec::new()).with_storage(storage.clone());
    table.set_dataset(records(12)).await;
    table.mount().await.unwrap();

    table.handle_row_click(&ClickTarget::cell(), &id(1)).await;
    table.sort_by("name").await;
    table.sort_by("name").await;
    // descending: row 1 is now the last row
    assert_eq!(table.selected_items(), vec![SelectedItem::new(3, 1)]);
    let state = stored(&storage).await.unwrap();
    assert_eq!(state.selected_item, vec![SelectedItem::new(3, 1)]);
    assert_eq!(state.sort, Some(SortSpec::desc("name")));

    let reloaded = DataTable::new(persisted_radio(5), Vec::new()).with_storage(storage);
    reloaded.set_dataset(records(12)).await;
    reloaded.mount().await.unwrap();
    assert_eq!(reloaded.selected_ids(), vec![id(1)]);
}

#[tokio::test]
async fn test_selection_survives_delete_and_reload() {
    let storage = Arc::new(MemoryStateStorage::new());
    let table = DataTable::new(persisted_radio(5), Vec::new()).with_storage(storage.clone());
    table.set_dataset(records(12)).await;
    table.mount().await.unwrap();

    table.handle_row_click(&ClickTarget::cell(), &id(3)).await;
    assert_eq!(stored(&storage).await.unwrap().selected_item, vec![SelectedItem::new(1, 2)]);
    table.delete_row(&id(1)).await.unwrap();
    assert_eq!(stored(&storage).await.unwrap().selected_item, vec![SelectedItem::new(1, 1)]);

    let reloaded = DataTable::new(persisted_radio(5), Vec::new()).with_storage(storage);
    reloaded.set_dataset(records(12).split_off(1)).await;
    reloaded.mount().await.unwrap();
    assert_eq!(reloaded.selected_ids(), vec![id(3)]);
}

#[tokio::test]
async fn test_clearing_filter_repositions_selection() {
    let table = DataTable::new(TableConfig::new("grid").with_selection(false, true), Vec::new());
    table.set_dataset(records(12)).await;
    table.mount().await.unwrap();

    table.set_filters(vec![FilterSpec::new("name", "Row 1")]).await;
    table.handle_row_click(&ClickTarget::cell(), &id(11)).await;
    assert_eq!(table.selected_items(), vec![SelectedItem::new(1, 1)]);

    table.set_filters(Vec::new()).await;
    assert_eq!(table.selected_items(), vec![SelectedItem::new(3, 0)]);
}

#[tokio::test]
async fn test_select_all_persists_every_page() {
    let storage = Arc::new(MemoryStateStorage::new());
    let table = DataTable::new(persisted(5), Vec::new()).with_storage(storage.clone());
    table.set_dataset(records(12)).await;
    table.mount().await.unwrap();

    assert!(table.select_all(true).await);
    assert_eq!(stored(&storage).await.unwrap().selected_item.len(), 12);

    let reloaded = DataTable::new(persisted(5), Vec::new()).with_storage(storage.clone());
    reloaded.set_dataset(records(12)).await;
    reloaded.mount().await.unwrap();
    assert_eq!(reloaded.selected_ids().len(), 12);

    assert!(reloaded.select_all(false).await);
    assert!(stored(&storage).await.is_none());
}

#[tokio::test]
async fn test_mount_restores_sort_with_selection() {
    let storage = Arc::new(MemoryStateStorage::new());
    let saved = TableState {
        sort: Some(SortSpec::desc("name")),
        selected_item: vec![SelectedItem::new(1, 0)],
        ..TableState::default()
    };
    storage.save_table_state("grid", StorageScope::Local, &saved).await.unwrap();

    let table = DataTable::new(persisted(5), Vec::new()).with_storage(storage);
    table.set_dataset(records(12)).await;
    table.mount().await.unwrap();

    assert_eq!(table.sorting(), vec![SortColumn::new("name", true)]);
    assert_eq!(table.page_rows()[0].id(), &id(12));
    assert_eq!(table.selected_ids(), vec![id(12)]);
}

#[tokio::test]
async fn test_server_insert_moves_to_last_page() {
    let ds = Arc::new(MemoryDatasource::pageable(records(12)));
    let config = TableConfig::new("grid").with_edit_mode(EditMode::Inline);
    let table = DataTable::new(config, vec![Column::new("name", "Name")]).with_datasource(ds.clone());
    table.mount().await.unwrap();
    table.navigate(Direction::Last).await;

    table.add_new_row().unwrap();
    table.update_field("name", json!("Zed")).unwrap();
    let outcome = table.save_row().await.unwrap();

    assert!(matches!(outcome, SaveOutcome::Inserted { page: 3, .. }));
    assert_eq!(table.pagination().page(), 3);
    let names: Vec<Value> = table.page_rows().iter().map(|row| row.to_value()["name"].clone()).collect();
    assert_eq!(names, vec![json!("Row 11"), json!("Row 12"), json!("Zed")]);
}

#[tokio::test]
async fn test_server_insert_opens_new_page() {
    let ds = Arc::new(MemoryDatasource::pageable(records(10)));
    let config = TableConfig::new("grid").with_edit_mode(EditMode::Inline);
    let table = DataTable::new(config, vec![Column::new("name", "Name")]).with_datasource(ds.clone());
    table.mount().await.unwrap();
    assert_eq!(table.pagination().page_count, 2);

    table.add_new_row().unwrap();
    table.update_field("name", json!("Zed")).unwrap();
    let outcome = table.save_row().await.unwrap();

    assert!(matches!(outcome, SaveOutcome::Inserted { page: 3, .. }));
    assert_eq!(table.pagination().page_count, 3);
    assert_eq!(table.page_rows().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failed_server_sort_keeps_shown_order() {
    let storage = Arc::new(MemoryStateStorage::new());
    let ds = Arc::new(MemoryDatasource::pageable(records(12)));
    let table = DataTable::new(persisted(5), Vec::new())
        .with_storage(storage.clone())
        .with_datasource(ds.clone());
    table.mount().await.unwrap();

    ds.fail_next(FailOn::Invoke);
    assert_eq!(table.sort_by("name").await, Some(QueryOutcome::Failed));
    assert!(table.sorting().is_empty());
    assert!(stored(&storage).await.is_none());

    // the same query can be retried
    let outcome = table.sort_by("name").await.unwrap();
    assert!(matches!(outcome, QueryOutcome::Applied { .. }));
    assert_eq!(stored(&storage).await.unwrap().sort, Some(SortSpec::asc("name")));
}

#[tokio::test(start_paused = true)]
async fn test_query_deferred_while_loading() {
    let ds = Arc::new(MemoryDatasource::pageable(records(12)));
    let table = DataTable::new(TableConfig::new("grid"), Vec::new()).with_datasource(ds.clone());
    table.mount().await.unwrap();
    assert_eq!(table.on_datasource_loaded().await, None);

    ds.set_loading(true);
    let outcome = table.set_sorting(vec![SortColumn::new("name", true)]).await;
    assert_eq!(outcome, Some(QueryOutcome::Pending));
    assert_eq!(table.page_rows()[0].id(), &id(1));

    ds.set_loading(false);
    let outcome = table.on_datasource_loaded().await;
    assert!(matches!(outcome, Some(QueryOutcome::Applied { .. })));
    assert_eq!(table.page_rows()[0].id(), &id(12));
    assert_eq!(table.on_datasource_loaded().await, None);
}

#[tokio::test]
async fn test_scroll_mode_accumulates_rows() {
    let table = DataTable::new(TableConfig::new("grid").with_navigation(NavigationMode::Scroll), Vec::new());
    table.set_dataset(records(12)).await;
    table.mount().await.unwrap();
    assert_eq!(table.page_rows().len(), 5);

    assert_eq!(table.on_sentinel_visible().await, NavigationOutcome::Navigated(2));
    assert_eq!(table.page_rows().len(), 10);
    assert_eq!(table.load_more().await, NavigationOutcome::Navigated(3));
    assert_eq!(table.page_rows().len(), 12);
    assert_eq!(table.on_sentinel_visible().await, NavigationOutcome::Unchanged);
}

#[tokio::test]
async fn test_on_demand_server_mode_appends_pages() {
    let ds = Arc::new(MemoryDatasource::pageable(records(12)));
    let config = TableConfig::new("grid").with_navigation(NavigationMode::OnDemand);
    let table = DataTable::new(config, Vec::new()).with_datasource(ds);
    table.mount().await.unwrap();

    assert_eq!(table.load_more().await, NavigationOutcome::Navigated(2));
    assert_eq!(table.page_rows().len(), 10);
    assert_eq!(table.dataset().len(), 10);
    assert_eq!(table.on_sentinel_visible().await, NavigationOutcome::Navigated(3));
    assert_eq!(table.page_rows().len(), 12);
    assert_eq!(table.load_more().await, NavigationOutcome::Unchanged);
}
