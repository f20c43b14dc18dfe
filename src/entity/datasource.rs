//! Supplier of one page of entities to the grid.
//!
//! Each load takes a generation number. A response whose generation is no
//! longer the latest is dropped, so a slow earlier fetch can never overwrite
//! the page of a newer one.

use super::config::EntityTableHooks;
use super::repository::EntityRepository;
use super::{BaseData, RepositoryError, lock};
use crate::page::{EntityPageLink, PageData};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{debug, warn};

/// A single rendered cell, by column index and row index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellPosition {
    pub col: usize,
    pub row: usize,
}

/// Called after a page was applied (`None`) or a single cell changed.
pub type DataLoadedFn = Arc<dyn Fn(Option<CellPosition>) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied,
    /// A newer load or a reset started while this one was in flight.
    Superseded,
}

struct DataSourceState<T> {
    page: PageData<T>,
    selection: HashSet<String>,
    current_entity: Option<String>,
    last_error: Option<RepositoryError>,
}

impl<T> Default for DataSourceState<T> {
    fn default() -> Self {
        Self {
            page: PageData::empty(),
            selection: HashSet::new(),
            current_entity: None,
            last_error: None,
        }
    }
}

pub struct EntitiesDataSource<T: BaseData> {
    repository: Arc<dyn EntityRepository<T>>,
    hooks: Arc<dyn EntityTableHooks<T>>,
    data_loaded: DataLoadedFn,
    ignore_errors: bool,
    generation: AtomicU64,
    state: Mutex<DataSourceState<T>>,
    loading: watch::Sender<bool>,
}

impl<T: BaseData> EntitiesDataSource<T> {
    pub fn new(
        repository: Arc<dyn EntityRepository<T>>,
        hooks: Arc<dyn EntityTableHooks<T>>,
        data_loaded: DataLoadedFn,
        ignore_errors: bool,
    ) -> Self {
        let (loading, _) = watch::channel(false);
        Self {
            repository,
            hooks,
            data_loaded,
            ignore_errors,
            generation: AtomicU64::new(0),
            state: Mutex::new(DataSourceState::default()),
            loading,
        }
    }

    /// Fetches `page_link` and replaces the current page.
    ///
    /// A failed fetch applies an empty page and records the error. Selection
    /// is cleared whenever a page is applied.
    pub async fn load_entities(&self, page_link: EntityPageLink) -> LoadOutcome {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.loading.send_replace(true);
        debug!(generation, query = %page_link.to_query(), "Loading entities");

        let result = self.repository.fetch_entities(&page_link).await;

        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(generation, "Discarding superseded page response");
            return LoadOutcome::Superseded;
        }

        {
            let mut state = lock(&self.state);
            match result {
                Ok(page) => {
                    state.page = page;
                    state.last_error = None;
                }
                Err(e) => {
                    if self.ignore_errors {
                        debug!(error = %e, "Entity fetch failed");
                    } else {
                        warn!(error = %e, "Entity fetch failed, showing empty page");
                    }
                    state.page = PageData::empty();
                    state.last_error = Some(e);
                }
            }
            state.selection.clear();
        }
        self.loading.send_replace(false);
        (self.data_loaded)(None);
        LoadOutcome::Applied
    }

    /// Drops all loaded state and invalidates in-flight loads.
    pub fn reset(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        *lock(&self.state) = DataSourceState::default();
        self.loading.send_replace(false);
        (self.data_loaded)(None);
    }

    pub fn entities(&self) -> Vec<T> {
        lock(&self.state).page.data.clone()
    }

    pub fn entity_at(&self, row: usize) -> Option<T> {
        lock(&self.state).page.data.get(row).cloned()
    }

    pub fn page_data(&self) -> PageData<T> {
        lock(&self.state).page.clone()
    }

    pub fn total(&self) -> u64 {
        lock(&self.state).page.total_elements
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.state).page.data.is_empty()
    }

    pub fn last_error(&self) -> Option<RepositoryError> {
        lock(&self.state).last_error.clone()
    }

    pub fn loading(&self) -> watch::Receiver<bool> {
        self.loading.subscribe()
    }

    /// Replaces the entity at `row` and reports the listed columns as changed.
    pub fn replace_entity(&self, row: usize, entity: T, changed_columns: &[usize]) -> bool {
        {
            let mut state = lock(&self.state);
            match state.page.data.get_mut(row) {
                Some(slot) => *slot = entity,
                None => return false,
            }
        }
        for &col in changed_columns {
            (self.data_loaded)(Some(CellPosition { col, row }));
        }
        true
    }

    pub fn is_selected(&self, entity: &T) -> bool {
        lock(&self.state).selection.contains(entity.id())
    }

    /// Toggles one entity. Entities whose selection is disabled are ignored.
    pub fn toggle_selection(&self, entity: &T) -> bool {
        if !self.hooks.entity_selection_enabled(entity) {
            return false;
        }
        let mut state = lock(&self.state);
        let id = entity.id().to_string();
        if !state.page.data.iter().any(|e| e.id() == id) {
            return false;
        }
        if !state.selection.remove(&id) {
            state.selection.insert(id);
        }
        true
    }

    fn selectable_ids(&self, state: &DataSourceState<T>) -> Vec<String> {
        state
            .page
            .data
            .iter()
            .filter(|e| self.hooks.entity_selection_enabled(e))
            .map(|e| e.id().to_string())
            .collect()
    }

    pub fn is_all_selected(&self) -> bool {
        let state = lock(&self.state);
        let selectable = self.selectable_ids(&state);
        !selectable.is_empty() && selectable.iter().all(|id| state.selection.contains(id))
    }

    /// Selects every selectable entity, or clears the selection when all
    /// of them already are.
    pub fn master_toggle(&self) {
        let all_selected = self.is_all_selected();
        let mut state = lock(&self.state);
        if all_selected {
            state.selection.clear();
        } else {
            let ids = self.selectable_ids(&state);
            state.selection.extend(ids);
        }
    }

    pub fn has_selection(&self) -> bool {
        !lock(&self.state).selection.is_empty()
    }

    /// Selected entities in page order.
    pub fn selected_entities(&self) -> Vec<T> {
        let state = lock(&self.state);
        state
            .page
            .data
            .iter()
            .filter(|e| state.selection.contains(e.id()))
            .cloned()
            .collect()
    }

    pub fn clear_selection(&self) {
        lock(&self.state).selection.clear();
    }

    /// Makes `entity` current. Returns `false` when it already was.
    pub fn toggle_current_entity(&self, entity: &T) -> bool {
        let mut state = lock(&self.state);
        if state.current_entity.as_deref() == Some(entity.id()) {
            false
        } else {
            state.current_entity = Some(entity.id().to_string());
            true
        }
    }

    pub fn is_current_entity(&self, entity: &T) -> bool {
        lock(&self.state).current_entity.as_deref() == Some(entity.id())
    }
}
