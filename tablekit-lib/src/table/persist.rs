use super::DataTable;
use crate::error::Error;
use crate::events::TableOperation;
use crate::persistence::StateInput;
use crate::persistence::TableState;
use crate::query::SortSpec;
use crate::util::lock;
use crate::util::read_lock;

impl DataTable {
    /// Reads the persisted state. Missing or unreadable state is the
    /// default state.
    pub(super) async fn load_state(&self) -> TableState {
        let (Some(storage), Some(scope)) = (self.storage.clone(), self.config.persistence_scope()) else {
            return TableState::default();
        };
        match storage.get_table_state(&self.config.name, scope).await {
            Ok(state) => state.unwrap_or_default(),
            Err(err) => {
                log::error!("Failed to read state of table {}: {}", self.config.name, err);
                self.events.on_error(TableOperation::Persist, &Error::from(err));
                TableState::default()
            }
        }
    }

    /// Writes the current state, or clears it when everything is default.
    /// Does nothing before mount.
    pub async fn persist_state(&self) {
        if !self.is_mounted() || self.is_disposed() {
            return;
        }
        let (Some(storage), Some(scope)) = (self.storage.clone(), self.config.persistence_scope()) else {
            return;
        };
        let page = self.paginator.current_page();
        let page_size = self.paginator.page_size();
        let selected = read_lock(&self.selected_items).clone();
        let filters = self.filters();
        let sort = self.sorting().first().map(SortSpec::from);
        let loading = self.datasource().is_some_and(|ds| ds.is_loading());
        let input = StateInput {
            page,
            page_size,
            selected: &selected,
            filters: &filters,
            sort: sort.as_ref(),
            loading,
        };

        let (is_default, state, filter_active) = {
            let mut manager = lock(&self.state_manager);
            let is_default = manager.is_default_state(&input);
            let state = manager.compute(&input);
            (is_default, state, manager.has_active_filter(&filters))
        };

        let name = &self.config.name;
        let result = if is_default {
            storage.clear_table_state(name, scope).await
        } else {
            match storage.get_table_state(name, scope).await {
                Ok(existing) => {
                    let merged = lock(&self.state_manager).merge_with_existing(state, existing.as_ref(), filter_active);
                    storage.save_table_state(name, scope, &merged).await
                }
                Err(err) => Err(err),
            }
        };
        if let Err(err) = result {
            log::error!("Failed to persist state of table {}: {}", name, err);
            self.events.on_error(TableOperation::Persist, &Error::from(err));
        }
    }

    /// Removes the persisted state.
    pub async fn clear_state(&self) -> Result<(), Error> {
        let (Some(storage), Some(scope)) = (self.storage.clone(), self.config.persistence_scope()) else {
            return Ok(());
        };
        storage.clear_table_state(&self.config.name, scope).await?;
        Ok(())
    }
}
