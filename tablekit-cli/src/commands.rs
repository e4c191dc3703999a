use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use serde_json::json;
use tablekit_lib::DataTable;
use tablekit_lib::config::SearchConfig;
use tablekit_lib::config::TableConfig;
use tablekit_lib::model::Row;
use tablekit_lib::model::RowId;
use tablekit_lib::persistence::SqliteStateStorage;
use tablekit_lib::persistence::StateStorage;
use tablekit_lib::query::FilterSpec;
use tablekit_lib::query::SortColumn;
use tablekit_lib::search::LocalSearchProvider;
use tablekit_lib::search::SearchController;
use tablekit_lib::search::SearchOutcome;
use tablekit_lib::selection::ClickTarget;

use crate::cli::PageArgs;
use crate::cli::SearchArgs;
use crate::cli::StateArgs;
use crate::error::CliError;
use crate::error::Result;
use crate::paths;

pub async fn run_page(args: PageArgs) -> Result<()> {
    let records = read_records(&args.file)?;
    let filters = args
        .filters
        .iter()
        .map(|raw| parse_filter(raw))
        .collect::<Result<Vec<_>>>()?;

    let mut config = TableConfig::new(&args.name)
        .with_page_size(args.page_size)
        .with_navigation(args.navigation)
        .with_selection(false, true);
    if let Some(scope) = args.persist {
        config = config.with_state_handler(scope);
    }
    let mut table = DataTable::new(config, Vec::new());
    if args.persist.is_some() {
        table = table.with_storage(Arc::new(open_storage().await?));
    }

    table.set_dataset(records).await;
    table.mount().await?;
    if !filters.is_empty() {
        table.set_filters(filters).await;
    }
    if let Some(field) = &args.sort {
        table.set_sorting(vec![SortColumn::new(field, args.desc)]).await;
    }
    if table.paginator().page_size() != args.page_size {
        table.change_page_size(args.page_size).await;
    }
    if let Some(page) = args.page {
        table.go_to_page(page).await;
    }
    for id in &args.select {
        table.handle_row_click(&ClickTarget::cell(), &RowId::new(id.as_str())).await;
    }

    let state = table.pagination();
    let output = json!({
        "page": state.page(),
        "pageCount": state.page_count,
        "total": state.data_size,
        "rows": table.page_rows().iter().map(Row::to_value).collect::<Vec<_>>(),
        "selected": table.selected_ids().iter().map(RowId::to_string).collect::<Vec<_>>(),
    });
    print_json(&output);
    Ok(())
}

pub async fn run_search(args: SearchArgs) -> Result<()> {
    let entries = read_records(&args.file)?;
    let config = SearchConfig::default()
        .with_keys(args.keys)
        .with_match_mode(args.mode)
        .with_case_sensitive(args.case_sensitive)
        .with_min_chars(args.min_chars)
        .with_limit(args.limit)
        .with_debounce(Duration::ZERO);
    let search = SearchController::new(Arc::new(LocalSearchProvider::new(entries)), config);

    match search.search(&args.query).await {
        SearchOutcome::Results(results) => print_json(&Value::Array(results)),
        SearchOutcome::TooShort => {
            log::info!("Query {:?} shorter than {} characters", args.query, args.min_chars);
            print_json(&Value::Array(Vec::new()));
        }
        SearchOutcome::Failed(message) => log::error!("Search failed: {}", message),
        SearchOutcome::Superseded | SearchOutcome::Cancelled => {}
    }
    Ok(())
}

pub async fn show_state(args: StateArgs) -> Result<()> {
    let storage = open_storage().await?;
    match storage.get_table_state(&args.name, args.scope).await? {
        Some(state) => print_json(&serde_json::to_value(state).unwrap_or(Value::Null)),
        None => println!("No state stored for {} ({})", args.name, args.scope.as_str()),
    }
    Ok(())
}

pub async fn clear_state(args: StateArgs) -> Result<()> {
    let storage = open_storage().await?;
    storage.clear_table_state(&args.name, args.scope).await?;
    log::info!("Cleared state of {} ({})", args.name, args.scope.as_str());
    Ok(())
}

async fn open_storage() -> Result<SqliteStateStorage> {
    let path = paths::state_db()?.ok_or(CliError::NoDataDir)?;
    log::debug!("Opening state database at {}", path.display());
    Ok(SqliteStateStorage::open(&path).await?)
}

fn read_records(path: &Path) -> Result<Vec<Value>> {
    let text = fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let value: Value = serde_json::from_str(&text).map_err(|source| CliError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    match value {
        Value::Array(records) => Ok(records),
        _ => Err(CliError::NotAnArray(path.to_path_buf())),
    }
}

fn parse_filter(raw: &str) -> Result<FilterSpec> {
    match raw.split_once('=') {
        Some((field, value)) if !field.is_empty() => Ok(FilterSpec::new(field, value)),
        _ => Err(CliError::InvalidFilter(raw.to_string())),
    }
}

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => log::error!("Cannot print result: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_filter() {
        let filter = parse_filter("city=New=York").unwrap();
        assert_eq!(filter.field, "city");
        assert_eq!(filter.value, json!("New=York"));
        assert!(parse_filter("city").is_err());
        assert!(parse_filter("=x").is_err());
    }

    #[test]
    fn test_read_records_rejects_objects() {
        let dir = std::env::temp_dir().join(format!("tablekit-cli-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("object.json");
        fs::write(&path, r#"{"id": 1}"#).unwrap();
        assert!(matches!(read_records(&path), Err(CliError::NotAnArray(_))));

        fs::write(&path, r#"[{"id": 1}, {"id": 2}]"#).unwrap();
        assert_eq!(read_records(&path).unwrap().len(), 2);
        fs::remove_dir_all(&dir).unwrap();
    }
}
