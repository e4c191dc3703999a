use serde_json::Value;

use super::DataTable;
use crate::edit::EditKey;
use crate::edit::KeyOutcome;
use crate::edit::SaveOutcome;
use crate::error::Error;
use crate::model::RowId;
use crate::pagination::NavigationOutcome;
use crate::util::write_lock;

impl DataTable {
    /// Starts editing a committed row. Returns the render session.
    pub fn edit_row(&self, row_id: &RowId) -> Result<u64, Error> {
        self.sync_editor_columns();
        self.editor.edit_row(row_id)
    }

    /// Opens the add-new-row form. Returns the render session.
    pub fn add_new_row(&self) -> Result<u64, Error> {
        self.sync_editor_columns();
        self.editor.handle_add_new_row_click()
    }

    /// Writes one field of the open session.
    pub fn update_field(&self, field: &str, value: Value) -> Result<(), Error> {
        self.editor.update_field(field, value)
    }

    /// Saves the open session and refreshes the view. An inserted row is
    /// shown on the page it landed on.
    pub async fn save_row(&self) -> Result<SaveOutcome, Error> {
        self.sync_editor_columns();
        let outcome = self.editor.save_editing().await?;
        Ok(self.after_save(outcome).await)
    }

    /// Drops the open session. Returns `true` if there was one.
    pub fn cancel_edit(&self) -> bool {
        self.editor.cancel_editing()
    }

    /// Deletes a row and refreshes the view.
    pub async fn delete_row(&self, row_id: &RowId) -> Result<(), Error> {
        self.editor.delete_row(row_id).await?;
        let dropped = {
            let rows = self.dataset.snapshot();
            write_lock(&self.selection).retain_existing(&rows)
        };
        if self.is_server_paginated() {
            self.refresh().await?;
        } else {
            self.after_data_change();
        }
        if dropped.is_empty() {
            // rows after the deleted one moved up
            self.sync_selected_items(false);
            self.persist_state().await;
        } else {
            self.on_selection_changed().await;
        }
        Ok(())
    }

    /// Routes Enter and Escape from an editable row.
    pub async fn handle_key(&self, key: EditKey, source: &RowId) -> KeyOutcome {
        self.sync_editor_columns();
        match self.editor.handle_key(key, source).await {
            KeyOutcome::Saved(saved) => KeyOutcome::Saved(self.after_save(saved).await),
            outcome => outcome,
        }
    }

    async fn after_save(&self, outcome: SaveOutcome) -> SaveOutcome {
        match outcome {
            SaveOutcome::NoChanges => SaveOutcome::NoChanges,
            SaveOutcome::Updated(row_id) => {
                if self.is_server_paginated() {
                    if let Err(err) = self.refresh().await {
                        log::warn!("Could not refresh table {} after save: {}", self.name(), err);
                    }
                } else {
                    self.after_data_change();
                }
                self.persist_state().await;
                SaveOutcome::Updated(row_id)
            }
            SaveOutcome::Inserted { row_id, page } if self.is_server_paginated() => {
                let page = self.server_insert_page().unwrap_or(page);
                let current = self.paginator.current_page();
                let outcome = self.paginator.perform_page_navigation(page, current).await;
                let page = match outcome {
                    NavigationOutcome::Navigated(page) => page,
                    _ => current,
                };
                self.after_navigation(outcome).await;
                SaveOutcome::Inserted { row_id, page }
            }
            SaveOutcome::Inserted { row_id, page } => {
                self.after_data_change();
                if !matches!(self.go_to_page(page).await, NavigationOutcome::Navigated(_)) {
                    self.persist_state().await;
                }
                SaveOutcome::Inserted {
                    row_id,
                    page: self.paginator.current_page(),
                }
            }
        }
    }

    /// Server mode only has one page loaded, so the new row's page comes
    /// from the server total as of the last fetch. `None` without paging
    /// metadata.
    fn server_insert_page(&self) -> Option<usize> {
        let meta = self.paginator.meta()?;
        let size = self.paginator.page_size().max(1);
        Some((meta.total_elements + 1).div_ceil(size))
    }
}
