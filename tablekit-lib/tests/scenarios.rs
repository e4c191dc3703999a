//! End-to-end widget scenarios.

mod common;

use std::sync::Arc;

use serde_json::json;
use tablekit_lib::DataTable;
use tablekit_lib::Error;
use tablekit_lib::config::SearchConfig;
use tablekit_lib::config::TableConfig;
use tablekit_lib::datasource::MemoryDatasource;
use tablekit_lib::edit::EditMode;
use tablekit_lib::model::Column;
use tablekit_lib::pagination::Direction;
use tablekit_lib::pagination::NavigationOutcome;
use tablekit_lib::persistence::SelectedItem;
use tablekit_lib::query::MatchMode;
use tablekit_lib::search::LocalSearchProvider;
use tablekit_lib::search::SearchController;
use tablekit_lib::search::SearchOutcome;
use tablekit_lib::selection::ClickTarget;

use common::RecordingEvents;
use common::id;
use common::people;

#[tokio::test]
async fn test_client_pagination_walks_to_last_page() {
    let table = DataTable::new(TableConfig::new("people").with_page_size(5), Vec::new());
    table.set_dataset(people(12)).await;
    table.mount().await.unwrap();

    assert_eq!(table.navigate(Direction::Next).await, NavigationOutcome::Navigated(2));
    let ids: Vec<_> = table.page_rows().iter().map(|row| row.id().clone()).collect();
    assert_eq!(ids, (6..=10).map(id).collect::<Vec<_>>());

    assert_eq!(table.navigate(Direction::Next).await, NavigationOutcome::Navigated(3));
    assert_eq!(table.page_rows().len(), 2);
    assert!(table.paginator().is_last_page());

    assert_eq!(table.navigate(Direction::Next).await, NavigationOutcome::Unchanged);
    assert_eq!(table.pagination().page(), 3);
}

#[tokio::test]
async fn test_multi_selection_survives_page_size_change() {
    let config = TableConfig::new("people").with_page_size(5).with_selection(false, true);
    let table = DataTable::new(config, Vec::new());
    table.set_dataset(people(12)).await;
    table.mount().await.unwrap();

    table.handle_row_click(&ClickTarget::cell(), &id(1)).await;
    table.handle_row_click(&ClickTarget::cell(), &id(3)).await;
    assert_eq!(
        table.selected_items(),
        vec![SelectedItem::new(1, 0), SelectedItem::new(1, 2)]
    );

    table.change_page_size(10).await;
    assert_eq!(
        table.selected_items(),
        vec![SelectedItem::new(1, 0), SelectedItem::new(1, 2)]
    );
    assert_eq!(table.selected_ids(), vec![id(1), id(3)]);
    let page = table.page_rows();
    assert_eq!(page[0].id(), &id(1));
    assert_eq!(page[2].id(), &id(3));
}

#[tokio::test]
async fn test_required_field_blocks_save() {
    let ds = Arc::new(MemoryDatasource::new(people(3)));
    let events = Arc::new(RecordingEvents::default());
    let columns = vec![Column::new("name", "Name").required(true), Column::new("age", "Age")];
    let config = TableConfig::new("people").with_edit_mode(EditMode::Inline);
    let table = DataTable::new(config, columns)
        .with_events(events.clone())
        .with_datasource(ds.clone());
    table.mount().await.unwrap();

    table.edit_row(&id(2)).unwrap();
    table.update_field("name", json!("")).unwrap();
    let err = table.save_row().await.unwrap_err();

    assert!(matches!(err, Error::Validation(_)));
    assert!(table.editor().is_invalid(&id(2), "name"));
    assert!(table.editor().is_editing(&id(2)));
    assert_eq!(ds.records()[1]["name"], json!("Person 02"));
    assert!(events.saved.lock().unwrap().is_empty());
    assert!(events.toasts.lock().unwrap().is_empty());
    assert_eq!(events.focused.lock().unwrap()[0], (id(2), "name".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_start_mode_search() {
    let provider = LocalSearchProvider::new(vec![json!("Apple"), json!("Banana"), json!("Grape")]);
    let config = SearchConfig::default()
        .with_match_mode(MatchMode::Start)
        .with_case_sensitive(true);
    let search = SearchController::new(Arc::new(provider), config);

    assert_eq!(search.search("Gr").await, SearchOutcome::Results(vec![json!("Grape")]));
    assert_eq!(search.search("a").await, SearchOutcome::Results(Vec::new()));
    assert!(search.results().is_empty());
}
