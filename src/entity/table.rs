//! # Entities Table
//!
//! The render and interaction engine for one [`EntityTableConfig`].
//!
//! ## Lifecycle
//!
//! ```text
//! EntitiesTable::new ──► init(config) ──► load_entities(initial link)
//!                          ▲    │
//!        config changed ───┘    ├── sort / page events ──► update_data
//!                               ├── search input ──► debounce ──► update_data
//!                               └── row / cell / group actions
//! ```
//!
//! `init` may run again whenever the bound config changes. It derives all
//! state from the config from scratch, so calling it twice with the same
//! config yields the same state as calling it once.
//!
//! ## Render Cache
//!
//! Content, tooltip and style of content columns are cached per position
//! in a [`CellCache`]. A page load drops the whole cache, a single changed
//! cell reported by the data source drops only that slot, and a new column
//! set drops everything. Chip values are recomputed on every read and action
//! columns have no content at all.

use super::actions::{CellActionHandler, GroupActionHandler, TableActions};
use super::cache::CellCache;
use super::cells::{merge_width_style, width_style, CellStyle, SafeHtml};
use super::columns::EntityColumn;
use super::config::{EntitiesTableView, EntityTableConfig};
use super::datasource::{CellPosition, EntitiesDataSource, LoadOutcome};
use super::search::SearchDebouncer;
use super::{lock, BaseData, TableError};
use crate::config::TableDefaults;
use crate::page::timewindow::{time_page_link_interval, Timewindow};
use crate::page::{
    Direction, EntityPageLink, PageLink, SortOrder, TimePageLink, MAX_SAFE_PAGE_SIZE,
};
use crate::services::{DialogService, Translator};
use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::watch;
use tracing::{debug, info, warn};

pub const SELECT_COLUMN: &str = "select";
pub const ACTIONS_COLUMN: &str = "actions";

/// Paginator widget state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    pub page_index: u32,
    pub page_size: u32,
}

/// Sort header widget state. `active == None` means unsorted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortState {
    pub active: Option<String>,
    pub direction: Direction,
}

impl SortState {
    fn from_default(sort_order: Option<&SortOrder>) -> Self {
        match sort_order {
            Some(order) => Self {
                active: Some(order.property.clone()),
                direction: order.direction,
            },
            None => Self {
                active: None,
                direction: Direction::Asc,
            },
        }
    }

    fn sort_order(&self) -> Option<SortOrder> {
        self.active
            .as_ref()
            .map(|property| SortOrder::new(property.clone(), self.direction))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableEvent {
    Sort {
        active: Option<String>,
        direction: Direction,
    },
    Page {
        page_index: u32,
        page_size: u32,
    },
}

/// An action raised by a details view on behalf of one entity.
#[derive(Debug, Clone)]
pub struct EntityAction<T> {
    pub action: String,
    pub entity: T,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedChip {
    pub value: String,
    pub icon: Option<String>,
    pub icon_color: CellStyle,
    pub tooltip: Option<String>,
}

/// Display-ready value of one cell.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderedCell {
    Content {
        html: SafeHtml,
        tooltip: Option<String>,
        style: CellStyle,
    },
    Chips {
        chips: Vec<RenderedChip>,
        style: CellStyle,
    },
    Action {
        name: String,
        icon: Option<String>,
        enabled: bool,
        style: CellStyle,
    },
}

/// Everything `init` derives from a config.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSnapshot {
    pub table_title: String,
    pub actions_column_title: Option<String>,
    pub displayed_columns: Vec<String>,
    pub header_actions: Vec<String>,
    pub group_actions: Vec<String>,
    pub cell_actions: Vec<String>,
    pub selection_enabled: bool,
    pub default_cursor: bool,
    pub row_pointer: bool,
    pub search_enabled: bool,
    pub add_enabled: bool,
    pub details_panel_enabled: bool,
    pub for_all_time_enabled: bool,
    pub page_mode: bool,
    pub display_pagination: bool,
    pub page_size_options: Vec<u32>,
    pub page_link: EntityPageLink,
    pub paginator: Paginator,
    pub sort: SortState,
}

struct TableState<T: BaseData> {
    config: Arc<EntityTableConfig<T>>,
    data_source: Arc<EntitiesDataSource<T>>,
    actions: TableActions<T>,
    columns: Vec<EntityColumn<T>>,
    displayed_columns: Vec<String>,
    selection_enabled: bool,
    default_cursor: bool,
    display_pagination: bool,
    page_size_options: Vec<u32>,
    page_link: EntityPageLink,
    paginator: Paginator,
    sort: SortState,
    timewindow: Timewindow,
    text_search_mode: bool,
    search_input: String,
}

fn displayed_columns<T: BaseData>(columns: &[EntityColumn<T>], selection_enabled: bool) -> Vec<String> {
    let mut displayed = Vec::with_capacity(columns.len() + 2);
    if selection_enabled {
        displayed.push(SELECT_COLUMN.to_string());
    }
    displayed.extend(columns.iter().map(|c| c.key().to_string()));
    displayed.push(ACTIONS_COLUMN.to_string());
    displayed
}

pub struct EntitiesTable<T: BaseData> {
    translator: Arc<dyn Translator>,
    dialogs: Arc<dyn DialogService>,
    defaults: TableDefaults,
    state: Mutex<Option<TableState<T>>>,
    cache: Mutex<CellCache>,
    details_panel: watch::Sender<bool>,
    search: Mutex<Option<SearchDebouncer>>,
    weak_self: Weak<Self>,
}

impl<T: BaseData> EntitiesTable<T> {
    pub fn new(
        translator: Arc<dyn Translator>,
        dialogs: Arc<dyn DialogService>,
        defaults: TableDefaults,
    ) -> Arc<Self> {
        let (details_panel, _) = watch::channel(false);
        Arc::new_cyclic(|weak_self| Self {
            translator,
            dialogs,
            defaults,
            state: Mutex::new(None),
            cache: Mutex::new(CellCache::default()),
            details_panel,
            search: Mutex::new(None),
            weak_self: weak_self.clone(),
        })
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut TableState<T>) -> R) -> Result<R, TableError> {
        let mut guard = lock(&self.state);
        guard.as_mut().map(f).ok_or(TableError::NotInitialized)
    }

    /// Binds the table to `config` and derives all view state from it.
    pub async fn init(&self, config: Arc<EntityTableConfig<T>>) {
        let view: Weak<dyn EntitiesTableView<T>> = self.weak_self.clone();
        config.set_table(view);

        let settings = &config.settings;
        let actions = TableActions::compose(&config, self.translator.as_ref());
        let selection_enabled = settings.selection_enabled && actions.has_enabled_group_action();
        let columns = config.columns();
        let displayed_columns = displayed_columns(&columns, selection_enabled);
        let sort_order = settings.default_sort_order.clone();
        let timewindow = settings.default_timewindow;

        let default_page_size = settings.default_page_size.max(1);
        let page_size = if settings.display_pagination {
            default_page_size
        } else {
            MAX_SAFE_PAGE_SIZE
        };
        let page_link = if settings.use_time_page_link {
            let interval = time_page_link_interval(&timewindow, Utc::now());
            EntityPageLink::Time(TimePageLink::new(
                page_size,
                0,
                None,
                sort_order.clone(),
                interval.start_time,
                interval.end_time,
            ))
        } else {
            EntityPageLink::Page(PageLink::new(page_size, 0, None, sort_order.clone()))
        };

        let weak = self.weak_self.clone();
        let data_source = Arc::new(config.data_source(Arc::new(move |position| {
            if let Some(table) = weak.upgrade() {
                table.data_loaded(position);
            }
        })));

        lock(&self.cache).set_column_count(columns.len());
        self.details_panel.send_replace(false);

        info!(
            columns = columns.len(),
            selection_enabled,
            paginated = settings.display_pagination,
            time_scoped = settings.use_time_page_link,
            "Entity table initialized"
        );

        *lock(&self.state) = Some(TableState {
            data_source: data_source.clone(),
            actions,
            columns,
            displayed_columns,
            selection_enabled,
            default_cursor: settings.default_cursor,
            display_pagination: settings.display_pagination,
            page_size_options: self.defaults.page_size_options(default_page_size),
            page_link: page_link.clone(),
            paginator: Paginator {
                page_index: 0,
                page_size: default_page_size,
            },
            sort: SortState::from_default(sort_order.as_ref()),
            timewindow,
            text_search_mode: false,
            search_input: String::new(),
            config: config.clone(),
        });

        self.ensure_search_debouncer();
        config.hooks().on_load();

        if config.settings.load_data_on_init {
            data_source.load_entities(page_link).await;
        }
    }

    fn ensure_search_debouncer(&self) {
        let mut search = lock(&self.search);
        if search.as_ref().is_some_and(SearchDebouncer::is_running) {
            return;
        }
        let weak = self.weak_self.clone();
        *search = Some(SearchDebouncer::spawn(self.defaults.search_debounce(), move |value| {
            let weak = weak.clone();
            async move {
                match weak.upgrade() {
                    Some(table) => {
                        table.apply_text_search(value).await;
                        true
                    }
                    None => false,
                }
            }
        }));
    }

    /// Writes widget state into the page link and reloads the page.
    pub async fn update_data(&self, close_details: bool) -> Result<LoadOutcome, TableError> {
        if close_details {
            self.details_panel.send_replace(false);
        }
        let (data_source, page_link) = self.with_state(|state| {
            if state.display_pagination {
                state.page_link.page = state.paginator.page_index;
                state.page_link.page_size = state.paginator.page_size.max(1);
            } else {
                state.page_link.page = 0;
            }
            state.page_link.sort_order = state.sort.sort_order();
            if state.config.settings.use_time_page_link {
                state
                    .page_link
                    .set_interval(time_page_link_interval(&state.timewindow, Utc::now()));
            }
            (state.data_source.clone(), state.page_link.clone())
        })?;
        debug!(query = %page_link.to_query(), "Reloading entities");
        Ok(data_source.load_entities(page_link).await)
    }

    /// Applies a sort or paginator change. Sorting always returns to the
    /// first page; paging only reloads when pagination is displayed.
    pub async fn handle_event(&self, event: TableEvent) -> Result<Option<LoadOutcome>, TableError> {
        let reload = self.with_state(|state| match event {
            TableEvent::Sort { active, direction } => {
                state.sort = SortState { active, direction };
                if state.display_pagination {
                    state.paginator.page_index = 0;
                }
                true
            }
            TableEvent::Page {
                page_index,
                page_size,
            } => {
                state.paginator = Paginator {
                    page_index,
                    page_size: page_size.max(1),
                };
                state.display_pagination
            }
        })?;
        if reload {
            self.update_data(true).await.map(Some)
        } else {
            Ok(None)
        }
    }

    /// Feeds the search input. The reload happens once the input settles.
    pub fn text_search_changed(&self, value: impl Into<String>) -> Result<(), TableError> {
        let value = value.into();
        self.with_state(|state| {
            if !state.config.settings.search_enabled {
                return Err(TableError::ActionDisabled("search".into()));
            }
            state.search_input.clone_from(&value);
            Ok(())
        })??;
        match lock(&self.search).as_ref() {
            Some(search) => search.push(value),
            None => warn!("Search debouncer not running"),
        }
        Ok(())
    }

    async fn apply_text_search(&self, value: String) {
        let trimmed = value.trim();
        let changed = self.with_state(|state| {
            if state.page_link.text_search.as_deref().unwrap_or("") == trimmed {
                return false;
            }
            state.page_link.text_search = (!trimmed.is_empty()).then(|| trimmed.to_string());
            if state.display_pagination {
                state.paginator.page_index = 0;
            }
            true
        });
        match changed {
            Ok(true) => {
                if let Err(e) = self.update_data(true).await {
                    warn!(error = %e, "Search reload failed");
                }
            }
            Ok(false) => debug!("Search text unchanged, skipping reload"),
            Err(e) => warn!(error = %e, "Search on an uninitialized table ignored"),
        }
    }

    pub fn enter_filter_mode(&self) -> Result<(), TableError> {
        self.with_state(|state| {
            if !state.config.settings.search_enabled {
                return Err(TableError::ActionDisabled("search".into()));
            }
            state.text_search_mode = true;
            Ok(())
        })?
    }

    /// Leaves filter mode and clears the input, which debounces to a reload
    /// when a search was active.
    pub fn exit_filter_mode(&self) -> Result<(), TableError> {
        self.with_state(|state| state.text_search_mode = false)?;
        self.text_search_changed("")
    }

    /// Restores default sort, clears search and returns to the first page.
    pub async fn reset_sort_and_filter(&self, update: bool, preserve_timewindow: bool) -> Result<(), TableError> {
        self.with_state(|state| {
            let settings = &state.config.settings;
            state.text_search_mode = false;
            state.page_link.text_search = None;
            state.search_input.clear();
            if settings.use_time_page_link && !preserve_timewindow {
                state.timewindow = settings.default_timewindow;
            }
            if state.display_pagination {
                state.paginator.page_index = 0;
            }
            state.sort = SortState::from_default(settings.default_sort_order.as_ref());
        })?;
        if update {
            self.update_data(true).await?;
        }
        Ok(())
    }

    /// Restores paging, sort and search from a query string, as kept in the
    /// address of a routed table. Only tables in page mode accept it.
    pub async fn restore_query(&self, query: &str) -> Result<LoadOutcome, TableError> {
        let link = PageLink::from_query(query)?;
        self.with_state(|state| {
            if !state.config.settings.page_mode {
                return Err(TableError::ActionDisabled("page mode".into()));
            }
            if state.display_pagination {
                state.paginator = Paginator {
                    page_index: link.page,
                    page_size: link.page_size.max(1),
                };
            }
            state.sort = SortState::from_default(link.sort_order.as_ref());
            state.page_link.text_search = link.text_search.clone();
            state.search_input = link.text_search.unwrap_or_default();
            Ok(())
        })??;
        debug!(query, "Table state restored from query");
        self.update_data(true).await
    }

    pub async fn on_timewindow_change(&self, timewindow: Timewindow) -> Result<LoadOutcome, TableError> {
        self.with_state(|state| {
            state.timewindow = timewindow;
            if state.display_pagination {
                state.paginator.page_index = 0;
            }
        })?;
        self.update_data(true).await
    }

    /// Re-reads the config's columns and drops the whole render cache.
    pub fn columns_updated(&self, reset_data: bool) -> Result<(), TableError> {
        let (column_count, data_source) = self.with_state(|state| {
            state.columns = state.config.columns();
            state.displayed_columns = displayed_columns(&state.columns, state.selection_enabled);
            (state.columns.len(), state.data_source.clone())
        })?;
        lock(&self.cache).set_column_count(column_count);
        if reset_data {
            data_source.reset();
        }
        Ok(())
    }

    pub fn cell_action_descriptors_updated(&self) -> Result<(), TableError> {
        let translator = self.translator.clone();
        self.with_state(|state| {
            state.actions.cell = TableActions::compose_cell(&state.config, translator.as_ref());
        })
    }

    /// Drops one column's cached values, e.g. after its functions changed.
    pub fn invalidate_column(&self, col: usize) {
        lock(&self.cache).invalidate_column(col);
    }

    fn data_loaded(&self, position: Option<CellPosition>) {
        let mut cache = lock(&self.cache);
        match position {
            Some(CellPosition { col, row }) => cache.invalidate_cell(row, col),
            None => cache.invalidate_all(),
        }
    }

    pub fn clear_selection(&self) -> Result<(), TableError> {
        self.data_source().map(|ds| ds.clear_selection())
    }

    /// Row click: the config's handler gets the first chance, otherwise the
    /// details panel toggles when the config has one.
    pub fn on_row_click(&self, entity: &T) -> Result<(), TableError> {
        let config = self.config()?;
        if !config.hooks().handle_row_click(entity) && config.settings.details_panel_enabled {
            self.toggle_entity_details(entity);
        }
        Ok(())
    }

    pub fn toggle_entity_details(&self, entity: &T) {
        let Ok(data_source) = self.data_source() else {
            warn!("toggle_entity_details on an uninitialized table ignored");
            return;
        };
        let open = if data_source.toggle_current_entity(entity) {
            true
        } else {
            !self.is_details_open()
        };
        debug!(entity_id = entity.id(), open, "Details panel toggled");
        self.details_panel.send_replace(open);
    }

    pub fn is_details_open(&self) -> bool {
        *self.details_panel.borrow()
    }

    pub fn details_panel_opened(&self) -> watch::Receiver<bool> {
        self.details_panel.subscribe()
    }

    /// Creates an entity through the repository; reloads when one was added.
    pub async fn add_entity(&self) -> Result<Option<T>, TableError> {
        let config = self.config()?;
        if !config.settings.add_enabled {
            return Err(TableError::ActionDisabled("add".into()));
        }
        let added = config.repository().add_entity().await?;
        if let Some(entity) = &added {
            info!(entity_id = entity.id(), "Entity added");
            self.update_data(true).await?;
            config.hooks().entity_added(entity);
        }
        Ok(added)
    }

    /// Refreshes after an in-place edit without closing the details panel.
    pub async fn on_entity_updated(&self, entity: &T) -> Result<(), TableError> {
        let config = self.config()?;
        self.update_data(false).await?;
        config.hooks().entity_updated(entity);
        Ok(())
    }

    /// Routes an action raised by a details view. Returns whether it was handled.
    pub async fn on_entity_action(&self, action: EntityAction<T>) -> Result<bool, TableError> {
        match action.action.as_str() {
            "delete" => self.delete_entity(&action.entity).await,
            other => {
                debug!(action = other, "Unhandled entity action");
                Ok(false)
            }
        }
    }

    async fn confirm(&self, title: &str, message: &str) -> bool {
        self.dialogs
            .confirm(
                title,
                message,
                &self.translator.instant("action.no"),
                &self.translator.instant("action.yes"),
                true,
            )
            .await
    }

    /// Confirms and deletes one entity. Returns `false` when declined.
    pub async fn delete_entity(&self, entity: &T) -> Result<bool, TableError> {
        let config = self.config()?;
        let hooks = config.hooks();
        let confirmed = self
            .confirm(&hooks.delete_entity_title(entity), &hooks.delete_entity_content(entity))
            .await;
        if !confirmed {
            debug!(entity_id = entity.id(), "Delete declined");
            return Ok(false);
        }
        config.repository().delete_entity(entity.id()).await?;
        info!(entity_id = entity.id(), "Entity deleted");
        self.update_data(true).await?;
        hooks.entities_deleted(&[entity.id().to_string()]);
        Ok(true)
    }

    /// Confirms once, then deletes every deletable entity concurrently.
    ///
    /// Failures are logged and left out of the result; the table reloads
    /// once after all deletes settled. `None` when declined.
    pub async fn delete_entities(&self, entities: Vec<T>) -> Result<Option<Vec<String>>, TableError> {
        let config = self.config()?;
        let hooks = config.hooks();
        let confirmed = self
            .confirm(
                &hooks.delete_entities_title(entities.len()),
                &hooks.delete_entities_content(entities.len()),
            )
            .await;
        if !confirmed {
            debug!(count = entities.len(), "Bulk delete declined");
            return Ok(None);
        }

        let repository = config.repository();
        let tasks = entities
            .iter()
            .filter(|entity| hooks.delete_enabled(entity))
            .map(|entity| {
                let repository = repository.clone();
                let id = entity.id().to_string();
                async move {
                    match repository.delete_entity(&id).await {
                        Ok(()) => Some(id),
                        Err(e) => {
                            warn!(entity_id = %id, error = %e, "Failed to delete entity");
                            None
                        }
                    }
                }
            });
        let deleted: Vec<String> = join_all(tasks).await.into_iter().flatten().collect();
        info!(
            requested = entities.len(),
            deleted = deleted.len(),
            "Bulk delete settled"
        );

        self.update_data(true).await?;
        hooks.entities_deleted(&deleted);
        Ok(Some(deleted))
    }

    /// Runs cell action `index` for `entity`.
    pub async fn invoke_cell_action(&self, index: usize, entity: T) -> Result<(), TableError> {
        let action = self
            .with_state(|state| state.actions.cell.get(index).cloned())?
            .ok_or_else(|| TableError::ActionNotFound(format!("cell action {index}")))?;
        if !action.is_enabled(&entity) {
            return Err(TableError::ActionDisabled(action.display_name(&entity)));
        }
        match action.handler {
            CellActionHandler::Delete => {
                self.delete_entity(&entity).await?;
            }
            CellActionHandler::Custom(on_action) => on_action(entity).await,
        }
        Ok(())
    }

    pub fn group_action_enabled(&self, index: usize) -> bool {
        let Ok((action, data_source)) =
            self.with_state(|state| (state.actions.group.get(index).cloned(), state.data_source.clone()))
        else {
            return false;
        };
        action.is_some_and(|action| action.is_enabled(&data_source.selected_entities()))
    }

    /// Runs group action `index` against the current selection.
    pub async fn invoke_group_action(&self, index: usize) -> Result<(), TableError> {
        let (action, data_source) =
            self.with_state(|state| (state.actions.group.get(index).cloned(), state.data_source.clone()))?;
        let action = action.ok_or_else(|| TableError::ActionNotFound(format!("group action {index}")))?;
        let selection = data_source.selected_entities();
        if !action.is_enabled(&selection) {
            return Err(TableError::ActionDisabled(action.name));
        }
        match action.handler {
            GroupActionHandler::Delete => {
                self.delete_entities(selection).await?;
            }
            GroupActionHandler::Custom(on_action) => on_action(selection).await,
        }
        Ok(())
    }

    pub async fn invoke_header_action(&self, index: usize) -> Result<(), TableError> {
        let action = self
            .with_state(|state| state.actions.header.get(index).cloned())?
            .ok_or_else(|| TableError::ActionNotFound(format!("header action {index}")))?;
        if !action.is_enabled() {
            return Err(TableError::ActionDisabled(action.name));
        }
        (action.on_action)().await;
        Ok(())
    }

    fn column(&self, col: usize) -> Option<EntityColumn<T>> {
        self.with_state(|state| state.columns.get(col).cloned())
            .ok()
            .flatten()
    }

    pub fn header_cell_style(&self, col: usize) -> CellStyle {
        let Some(column) = self.column(col) else {
            return CellStyle::new();
        };
        lock(&self.cache).header_style(col, || match column.as_content() {
            Some(content) => merge_width_style((content.header_style)(&content.key), &content.width),
            None => width_style(column.width()),
        })
    }

    /// Sanitized content of a content or date cell; empty for other variants.
    pub fn cell_content(&self, entity: &T, col: usize, row: usize) -> SafeHtml {
        let Some(column) = self.column(col) else {
            return SafeHtml::default();
        };
        match column.as_content() {
            Some(content) => lock(&self.cache).content(row, col, || {
                SafeHtml::new(&(content.content)(entity, &content.key))
            }),
            None => SafeHtml::default(),
        }
    }

    pub fn cell_tooltip(&self, entity: &T, col: usize, row: usize) -> Option<String> {
        let column = self.column(col)?;
        let content = column.as_content()?;
        lock(&self.cache).tooltip(row, col, || (content.tooltip)(entity, &content.key))
    }

    /// Cell style with the width keys forced from the column width.
    pub fn cell_style(&self, entity: &T, col: usize, row: usize) -> CellStyle {
        let Some(column) = self.column(col) else {
            return CellStyle::new();
        };
        lock(&self.cache).style(row, col, || match column.as_content() {
            Some(content) => merge_width_style((content.style)(entity, &content.key), &content.width),
            None => width_style(column.width()),
        })
    }

    pub fn cell_chips_content(&self, entity: &T, col: usize) -> Vec<String> {
        match self.column(col) {
            Some(EntityColumn::Chips(chips)) => chips.chips(entity),
            _ => Vec::new(),
        }
    }

    pub fn cell_chip_action(&self, value: &str, entity: &T, col: usize) {
        if let Some(EntityColumn::Chips(chips)) = self.column(col) {
            (chips.chip_action)(entity, value);
        }
    }

    pub fn cell_chip_icon(&self, value: &str, entity: &T, col: usize) -> Option<String> {
        match self.column(col) {
            Some(EntityColumn::Chips(chips)) => (chips.chip_icon)(entity, value),
            _ => None,
        }
    }

    pub fn cell_chip_icon_color(&self, value: &str, entity: &T, col: usize) -> Option<CellStyle> {
        match self.column(col) {
            Some(EntityColumn::Chips(chips)) => Some((chips.chip_icon_color)(entity, value)),
            _ => None,
        }
    }

    pub fn cell_chip_tooltip(&self, value: &str, entity: &T, col: usize) -> Option<String> {
        match self.column(col) {
            Some(EntityColumn::Chips(chips)) => (chips.chip_tooltip)(entity, value),
            _ => None,
        }
    }

    pub fn render_cell(&self, entity: &T, col: usize, row: usize) -> Option<RenderedCell> {
        let column = self.column(col)?;
        let style = self.cell_style(entity, col, row);
        let cell = match &column {
            EntityColumn::Content(_) | EntityColumn::Date(_) => RenderedCell::Content {
                html: self.cell_content(entity, col, row),
                tooltip: self.cell_tooltip(entity, col, row),
                style,
            },
            EntityColumn::Chips(chips) => RenderedCell::Chips {
                chips: chips
                    .chips(entity)
                    .into_iter()
                    .map(|value| RenderedChip {
                        icon: (chips.chip_icon)(entity, &value),
                        icon_color: (chips.chip_icon_color)(entity, &value),
                        tooltip: (chips.chip_tooltip)(entity, &value),
                        value,
                    })
                    .collect(),
                style,
            },
            EntityColumn::Action(action) => RenderedCell::Action {
                name: action.action.display_name(entity),
                icon: action.action.icon.clone(),
                enabled: action.action.is_enabled(entity),
                style,
            },
        };
        Some(cell)
    }

    /// Renders every loaded row, columns in config order.
    pub fn render_rows(&self) -> Vec<Vec<RenderedCell>> {
        let Ok((entities, column_count)) =
            self.with_state(|state| (state.data_source.entities(), state.columns.len()))
        else {
            return Vec::new();
        };
        entities
            .iter()
            .enumerate()
            .map(|(row, entity)| {
                (0..column_count)
                    .filter_map(|col| self.render_cell(entity, col, row))
                    .collect()
            })
            .collect()
    }

    pub fn config(&self) -> Result<Arc<EntityTableConfig<T>>, TableError> {
        self.with_state(|state| state.config.clone())
    }

    pub fn data_source(&self) -> Result<Arc<EntitiesDataSource<T>>, TableError> {
        self.with_state(|state| state.data_source.clone())
    }

    pub fn actions(&self) -> Result<TableActions<T>, TableError> {
        self.with_state(|state| state.actions.clone())
    }

    pub fn page_link(&self) -> Result<EntityPageLink, TableError> {
        self.with_state(|state| state.page_link.clone())
    }

    pub fn paginator(&self) -> Result<Paginator, TableError> {
        self.with_state(|state| state.paginator)
    }

    pub fn sort(&self) -> Result<SortState, TableError> {
        self.with_state(|state| state.sort.clone())
    }

    pub fn timewindow(&self) -> Result<Timewindow, TableError> {
        self.with_state(|state| state.timewindow)
    }

    pub fn text_search_mode(&self) -> bool {
        self.with_state(|state| state.text_search_mode).unwrap_or(false)
    }

    pub fn search_input(&self) -> String {
        self.with_state(|state| state.search_input.clone()).unwrap_or_default()
    }

    pub fn displayed_columns(&self) -> Vec<String> {
        self.with_state(|state| state.displayed_columns.clone()).unwrap_or_default()
    }

    pub fn selection_enabled(&self) -> bool {
        self.with_state(|state| state.selection_enabled).unwrap_or(false)
    }

    pub fn snapshot(&self) -> Result<TableSnapshot, TableError> {
        self.with_state(|state| {
            let (header_actions, group_actions, cell_actions) = state.actions.names();
            let settings = &state.config.settings;
            TableSnapshot {
                table_title: settings.table_title.clone(),
                actions_column_title: settings.actions_column_title.clone(),
                displayed_columns: state.displayed_columns.clone(),
                header_actions,
                group_actions,
                cell_actions,
                selection_enabled: state.selection_enabled,
                default_cursor: state.default_cursor,
                row_pointer: settings.row_pointer,
                search_enabled: settings.search_enabled,
                add_enabled: settings.add_enabled,
                details_panel_enabled: settings.details_panel_enabled,
                for_all_time_enabled: settings.for_all_time_enabled,
                page_mode: settings.page_mode,
                display_pagination: state.display_pagination,
                page_size_options: state.page_size_options.clone(),
                page_link: state.page_link.clone(),
                paginator: state.paginator,
                sort: state.sort.clone(),
            }
        })
    }
}

#[async_trait]
impl<T: BaseData> EntitiesTableView<T> for EntitiesTable<T> {
    async fn update_data(&self, close_details: bool) {
        if let Err(e) = EntitiesTable::update_data(self, close_details).await {
            warn!(error = %e, "Table reload failed");
        }
    }

    fn toggle_entity_details(&self, entity: &T) {
        EntitiesTable::toggle_entity_details(self, entity);
    }

    fn is_details_open(&self) -> bool {
        EntitiesTable::is_details_open(self)
    }
}
