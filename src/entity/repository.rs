//! CRUD contract between the generic grid and an entity-specific service.
//!
//! Every method has a harmless default so a feature config only implements
//! what its screen actually uses.

use super::{BaseData, RepositoryError};
use crate::page::{EntityPageLink, PageData};
use async_trait::async_trait;

#[async_trait]
pub trait EntityRepository<T: BaseData>: Send + Sync {
    /// Fetches one page. "No results" is an empty page, never an error.
    async fn fetch_entities(&self, _page_link: &EntityPageLink) -> Result<PageData<T>, RepositoryError> {
        Ok(PageData::empty())
    }

    /// Persists `entity`; `original` is the pre-edit copy when editing.
    async fn save_entity(&self, entity: T, _original: Option<&T>) -> Result<T, RepositoryError> {
        Ok(entity)
    }

    async fn delete_entity(&self, _id: &str) -> Result<(), RepositoryError> {
        Ok(())
    }

    async fn load_entity(&self, id: &str) -> Result<T, RepositoryError> {
        Err(RepositoryError::NotFound(id.to_string()))
    }

    /// Creates a new entity, `None` when creation was cancelled.
    async fn add_entity(&self) -> Result<Option<T>, RepositoryError> {
        Ok(None)
    }
}

/// Repository with every operation left at its default.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyRepository;

#[async_trait]
impl<T: BaseData> EntityRepository<T> for EmptyRepository {}
