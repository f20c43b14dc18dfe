//! # Entity Table Configuration
//!
//! [`EntityTableConfig`] is the single source of truth for one entity screen.
//! It is created once by a feature, shared by reference, and bound to exactly
//! one view at a time: either the grid or a details page.
//!
//! ## Ownership
//!
//! ```text
//!   ViewOwner::None ──set_table──► ViewOwner::Table(weak)
//!         │                              │
//!         └──set_entity_details_page──►  ViewOwner::DetailsPage(weak)
//! ```
//!
//! Binding one view always replaces the other. The config only holds weak
//! handles, so a dropped view leaves the config detached: delegated calls
//! become no-ops with a warning instead of acting on a dead view.

use super::actions::{CellActionDescriptor, GroupActionDescriptor, HeaderActionDescriptor};
use super::columns::EntityColumn;
use super::datasource::{DataLoadedFn, EntitiesDataSource};
use super::repository::EntityRepository;
use super::{BaseData, TableError, lock, read, write};
use crate::config::ConsoleConfig;
use crate::page::timewindow::Timewindow;
use crate::page::{Direction, SortOrder};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, RwLock, Weak};
use tracing::{debug, info, warn};

/// Feature toggles and defaults of one entity screen.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSettings {
    pub table_title: String,
    pub load_data_on_init: bool,
    /// Fetch with a time-bounded page link recomputed before every load.
    pub use_time_page_link: bool,
    pub for_all_time_enabled: bool,
    pub row_pointer: bool,
    pub selection_enabled: bool,
    pub default_cursor: bool,
    pub search_enabled: bool,
    pub add_enabled: bool,
    pub entities_delete_enabled: bool,
    pub details_panel_enabled: bool,
    pub actions_column_title: Option<String>,
    pub display_pagination: bool,
    pub page_mode: bool,
    pub default_page_size: u32,
    pub default_sort_order: Option<SortOrder>,
    pub default_timewindow: Timewindow,
    /// Log failed fetches at debug instead of warn.
    pub ignore_fetch_errors: bool,
}

impl Default for TableSettings {
    fn default() -> Self {
        Self::from_console(&ConsoleConfig::default())
    }
}

impl TableSettings {
    /// Settings whose page size and time window come from the console config.
    pub fn from_console(console: &ConsoleConfig) -> Self {
        Self {
            table_title: String::new(),
            load_data_on_init: true,
            use_time_page_link: false,
            for_all_time_enabled: false,
            row_pointer: false,
            selection_enabled: true,
            default_cursor: false,
            search_enabled: true,
            add_enabled: true,
            entities_delete_enabled: true,
            details_panel_enabled: true,
            actions_column_title: None,
            display_pagination: true,
            page_mode: true,
            default_page_size: console.table.default_page_size.max(1),
            default_sort_order: Some(SortOrder::new("createdTime", Direction::Desc)),
            default_timewindow: console.time.default_timewindow(),
            ignore_fetch_errors: false,
        }
    }
}

/// Per-entity predicates, labels and lifecycle callbacks. Every method has a
/// permissive default.
pub trait EntityTableHooks<T: BaseData>: Send + Sync {
    fn delete_enabled(&self, _entity: &T) -> bool {
        true
    }

    fn entity_selection_enabled(&self, _entity: &T) -> bool {
        true
    }

    fn details_readonly(&self, _entity: &T) -> bool {
        false
    }

    /// Returns `true` when the click was handled and the details panel must
    /// not be toggled.
    fn handle_row_click(&self, _entity: &T) -> bool {
        false
    }

    fn entity_title(&self, _entity: &T) -> String {
        String::new()
    }

    fn delete_entity_title(&self, _entity: &T) -> String {
        String::new()
    }

    fn delete_entity_content(&self, _entity: &T) -> String {
        String::new()
    }

    fn delete_entities_title(&self, _count: usize) -> String {
        String::new()
    }

    fn delete_entities_content(&self, _count: usize) -> String {
        String::new()
    }

    fn entity_added(&self, _entity: &T) {}

    fn entity_updated(&self, _entity: &T) {}

    fn entities_deleted(&self, _ids: &[String]) {}

    /// Runs once per table `init`, before the first load.
    fn on_load(&self) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultHooks;

impl<T: BaseData> EntityTableHooks<T> for DefaultHooks {}

/// The grid as seen by its config.
#[async_trait]
pub trait EntitiesTableView<T: BaseData>: Send + Sync {
    async fn update_data(&self, close_details: bool);
    fn toggle_entity_details(&self, entity: &T);
    fn is_details_open(&self) -> bool;
}

/// A details page as seen by its config.
#[async_trait]
pub trait EntityDetailsPageView: Send + Sync {
    async fn reload(&self);
}

/// The single view a config is bound to.
pub enum ViewOwner<T: BaseData> {
    None,
    Table(Weak<dyn EntitiesTableView<T>>),
    DetailsPage(Weak<dyn EntityDetailsPageView>),
}

enum BoundView<T: BaseData> {
    None,
    Table(Arc<dyn EntitiesTableView<T>>),
    DetailsPage(Arc<dyn EntityDetailsPageView>),
    Detached,
}

pub struct EntityTableConfig<T: BaseData> {
    pub settings: TableSettings,
    columns: RwLock<Vec<EntityColumn<T>>>,
    cell_actions: RwLock<Vec<CellActionDescriptor<T>>>,
    group_actions: Vec<GroupActionDescriptor<T>>,
    header_actions: Vec<HeaderActionDescriptor>,
    repository: Arc<dyn EntityRepository<T>>,
    hooks: Arc<dyn EntityTableHooks<T>>,
    owner: Mutex<ViewOwner<T>>,
}

impl<T: BaseData> EntityTableConfig<T> {
    pub fn builder(repository: Arc<dyn EntityRepository<T>>) -> EntityTableConfigBuilder<T> {
        EntityTableConfigBuilder {
            settings: TableSettings::default(),
            columns: Vec::new(),
            cell_actions: Vec::new(),
            group_actions: Vec::new(),
            header_actions: Vec::new(),
            repository,
            hooks: Arc::new(DefaultHooks),
        }
    }

    pub fn repository(&self) -> Arc<dyn EntityRepository<T>> {
        self.repository.clone()
    }

    pub fn hooks(&self) -> Arc<dyn EntityTableHooks<T>> {
        self.hooks.clone()
    }

    pub fn columns(&self) -> Vec<EntityColumn<T>> {
        read(&self.columns).clone()
    }

    /// Replaces the column set. The bound table must be told through
    /// `columns_updated` so its render cache is dropped.
    pub fn set_columns(&self, columns: Vec<EntityColumn<T>>) {
        *write(&self.columns) = columns;
    }

    pub fn cell_actions(&self) -> Vec<CellActionDescriptor<T>> {
        read(&self.cell_actions).clone()
    }

    pub fn set_cell_actions(&self, actions: Vec<CellActionDescriptor<T>>) {
        *write(&self.cell_actions) = actions;
    }

    pub fn group_actions(&self) -> &[GroupActionDescriptor<T>] {
        &self.group_actions
    }

    pub fn header_actions(&self) -> &[HeaderActionDescriptor] {
        &self.header_actions
    }

    /// A data source fetching through this config's repository.
    pub fn data_source(&self, data_loaded: DataLoadedFn) -> EntitiesDataSource<T> {
        EntitiesDataSource::new(
            self.repository.clone(),
            self.hooks.clone(),
            data_loaded,
            self.settings.ignore_fetch_errors,
        )
    }

    pub fn set_table(&self, table: Weak<dyn EntitiesTableView<T>>) {
        let mut owner = lock(&self.owner);
        if matches!(*owner, ViewOwner::DetailsPage(_)) {
            info!("Config ownership moved from details page to table");
        }
        *owner = ViewOwner::Table(table);
    }

    pub fn table(&self) -> Option<Arc<dyn EntitiesTableView<T>>> {
        match &*lock(&self.owner) {
            ViewOwner::Table(table) => table.upgrade(),
            _ => None,
        }
    }

    pub fn set_entity_details_page(&self, page: Weak<dyn EntityDetailsPageView>) {
        let mut owner = lock(&self.owner);
        if matches!(*owner, ViewOwner::Table(_)) {
            info!("Config ownership moved from table to details page");
        }
        *owner = ViewOwner::DetailsPage(page);
    }

    pub fn entity_details_page(&self) -> Option<Arc<dyn EntityDetailsPageView>> {
        match &*lock(&self.owner) {
            ViewOwner::DetailsPage(page) => page.upgrade(),
            _ => None,
        }
    }

    /// Unbinds whichever view currently owns the config.
    pub fn release(&self) {
        *lock(&self.owner) = ViewOwner::None;
    }

    fn bound_view(&self) -> BoundView<T> {
        match &*lock(&self.owner) {
            ViewOwner::None => BoundView::None,
            ViewOwner::Table(table) => table.upgrade().map_or(BoundView::Detached, BoundView::Table),
            ViewOwner::DetailsPage(page) => page
                .upgrade()
                .map_or(BoundView::Detached, BoundView::DetailsPage),
        }
    }

    /// Reloads the bound view: the table refetches its page, a details page
    /// reloads its entity. No-op when nothing is bound.
    pub async fn update_data(&self, close_details: bool) -> Result<(), TableError> {
        match self.bound_view() {
            BoundView::Table(table) => {
                table.update_data(close_details).await;
                Ok(())
            }
            BoundView::DetailsPage(page) => {
                page.reload().await;
                Ok(())
            }
            BoundView::None => {
                debug!("update_data on an unbound config ignored");
                Ok(())
            }
            BoundView::Detached => {
                warn!("update_data on a config whose view was dropped; ignoring");
                Err(TableError::DetachedView)
            }
        }
    }

    pub fn toggle_entity_details(&self, entity: &T) -> Result<(), TableError> {
        match self.bound_view() {
            BoundView::Table(table) => {
                table.toggle_entity_details(entity);
                Ok(())
            }
            BoundView::Detached => {
                warn!(entity_id = entity.id(), "toggle_entity_details on a detached config; ignoring");
                Err(TableError::DetachedView)
            }
            BoundView::None | BoundView::DetailsPage(_) => Ok(()),
        }
    }

    pub fn is_details_open(&self) -> bool {
        match self.bound_view() {
            BoundView::Table(table) => table.is_details_open(),
            _ => false,
        }
    }
}

pub struct EntityTableConfigBuilder<T: BaseData> {
    settings: TableSettings,
    columns: Vec<EntityColumn<T>>,
    cell_actions: Vec<CellActionDescriptor<T>>,
    group_actions: Vec<GroupActionDescriptor<T>>,
    header_actions: Vec<HeaderActionDescriptor>,
    repository: Arc<dyn EntityRepository<T>>,
    hooks: Arc<dyn EntityTableHooks<T>>,
}

impl<T: BaseData> EntityTableConfigBuilder<T> {
    pub fn settings(mut self, settings: TableSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn column(mut self, column: impl Into<EntityColumn<T>>) -> Self {
        self.columns.push(column.into());
        self
    }

    pub fn cell_action(mut self, action: CellActionDescriptor<T>) -> Self {
        self.cell_actions.push(action);
        self
    }

    pub fn group_action(mut self, action: GroupActionDescriptor<T>) -> Self {
        self.group_actions.push(action);
        self
    }

    pub fn header_action(mut self, action: HeaderActionDescriptor) -> Self {
        self.header_actions.push(action);
        self
    }

    pub fn hooks(mut self, hooks: Arc<dyn EntityTableHooks<T>>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn build(self) -> Arc<EntityTableConfig<T>> {
        Arc::new(EntityTableConfig {
            settings: self.settings,
            columns: RwLock::new(self.columns),
            cell_actions: RwLock::new(self.cell_actions),
            group_actions: self.group_actions,
            header_actions: self.header_actions,
            repository: self.repository,
            hooks: self.hooks,
            owner: Mutex::new(ViewOwner::None),
        })
    }
}
