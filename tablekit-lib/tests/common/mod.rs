//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::sync::Mutex;

use serde_json::Value;
use serde_json::json;
use tablekit_lib::Error;
use tablekit_lib::events::PageChange;
use tablekit_lib::events::TableEvents;
use tablekit_lib::events::TableOperation;
use tablekit_lib::events::Toast;
use tablekit_lib::model::RowId;

/// Records every host callback.
#[derive(Default)]
pub struct RecordingEvents {
    pub toasts: Mutex<Vec<Toast>>,
    pub errors: Mutex<Vec<(TableOperation, String)>>,
    pub pages: Mutex<Vec<usize>>,
    pub focused: Mutex<Vec<(RowId, String)>>,
    pub saved: Mutex<Vec<RowId>>,
}

impl TableEvents for RecordingEvents {
    fn on_toast(&self, toast: Toast) {
        self.toasts.lock().unwrap().push(toast);
    }

    fn on_error(&self, operation: TableOperation, error: &Error) {
        self.errors.lock().unwrap().push((operation, error.to_string()));
    }

    fn on_pagination_change(&self, change: &PageChange) {
        self.pages.lock().unwrap().push(change.page);
    }

    fn on_focus_field(&self, row_id: &RowId, field: &str) {
        self.focused.lock().unwrap().push((row_id.clone(), field.to_string()));
    }

    fn on_row_saved(&self, row_id: &RowId, _value: &Value) {
        self.saved.lock().unwrap().push(row_id.clone());
    }
}

/// `n` records with ids `1..=n`.
pub fn people(n: usize) -> Vec<Value> {
    (1..=n)
        .map(|i| json!({"id": i, "name": format!("Person {:02}", i), "age": 20 + i}))
        .collect()
}

pub fn id(i: usize) -> RowId {
    RowId::new(i.to_string())
}
