//! # Entity Table Engine
//!
//! Configuration-driven grid shared by every entity list screen of the
//! console. A feature describes its entity once in an [`EntityTableConfig`]
//! (columns, actions, repository, hooks) and the generic [`EntitiesTable`]
//! handles paging, sorting, search, selection, deletes and cell rendering.
//!
//! ## Module Architecture
//!
//! ```text
//! entity/
//! ├── config.rs      - EntityTableConfig, settings, hooks, single-view ownership
//! ├── columns.rs     - Content / Date / Action / Chips column variants
//! ├── actions.rs     - cell, group and header action descriptors
//! ├── repository.rs  - async CRUD contract implemented by feature services
//! ├── datasource.rs  - one loaded page plus selection state
//! ├── cache.rs       - position-indexed render cache
//! ├── search.rs      - debounced text search input
//! ├── table.rs       - the grid engine
//! └── details.rs     - details page sharing the table's config
//! ```
//!
//! ## Data Flow
//!
//! ```text
//! EntityTableConfig ──init──► EntitiesTable ──EntityPageLink──► EntitiesDataSource
//!        ▲                          │                                  │
//!        │ owner (table | details)  │ render cache                     ▼
//!        └──────────────────────────┘ ◄──── data_loaded(cell?) ── EntityRepository
//! ```

pub mod actions;
pub mod cache;
pub mod cells;
pub mod columns;
pub mod config;
pub mod datasource;
pub mod details;
pub mod error;
pub mod repository;
pub mod search;
pub mod table;

#[cfg(test)]
mod tests;

use serde::Serialize;
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

pub use actions::{
    CellActionDescriptor, CellActionHandler, CellActionType, GroupActionDescriptor,
    GroupActionHandler, HeaderActionDescriptor, TableActions,
};
pub use cache::CellCache;
pub use cells::{CellStyle, SafeHtml};
pub use columns::{ActionColumn, ChipsColumn, ContentColumn, DateColumn, EntityColumn};
pub use config::{
    DefaultHooks, EntitiesTableView, EntityDetailsPageView, EntityTableConfig,
    EntityTableConfigBuilder, EntityTableHooks, TableSettings, ViewOwner,
};
pub use datasource::{CellPosition, EntitiesDataSource, LoadOutcome};
pub use details::EntityDetailsPage;
pub use error::{RepositoryError, TableError};
pub use repository::{EmptyRepository, EntityRepository};
pub use table::{EntitiesTable, EntityAction, RenderedCell, TableEvent, TableSnapshot};

/// A domain record displayed as one grid row.
///
/// `Serialize` backs the default column content function, which looks up the
/// column key as a property of the serialized entity.
pub trait BaseData: Clone + Serialize + Send + Sync + 'static {
    fn id(&self) -> &str;
}

/// Serialized value of `key` on `entity`, rendered as display text.
///
/// Strings are returned as-is, `null` and missing properties become empty.
pub fn entity_property<T: Serialize>(entity: &T, key: &str) -> String {
    match serde_json::to_value(entity) {
        Ok(serde_json::Value::Object(map)) => match map.get(key) {
            None | Some(serde_json::Value::Null) => String::new(),
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Bool(false)) => String::new(),
            Some(other) => other.to_string(),
        },
        _ => String::new(),
    }
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
