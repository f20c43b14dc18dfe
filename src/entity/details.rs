//! Single-entity view sharing its table's config.
//!
//! Binding a details page takes ownership of the config away from the table,
//! so config-level reloads reach the page instead.

use super::config::{EntityDetailsPageView, EntityTableConfig};
use super::{lock, BaseData, TableError};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, Weak};
use tracing::{debug, info, warn};

struct DetailsState<T: BaseData> {
    config: Arc<EntityTableConfig<T>>,
    entity_id: String,
    entity: Option<T>,
}

pub struct EntityDetailsPage<T: BaseData> {
    state: Mutex<Option<DetailsState<T>>>,
    weak_self: Weak<Self>,
}

impl<T: BaseData> EntityDetailsPage<T> {
    pub fn new() -> Arc<Self> {
        Arc::new_cyclic(|weak_self| Self {
            state: Mutex::new(None),
            weak_self: weak_self.clone(),
        })
    }

    /// Takes ownership of `config` and loads `entity_id`.
    pub async fn bind(&self, config: Arc<EntityTableConfig<T>>, entity_id: impl Into<String>) {
        let view: Weak<dyn EntityDetailsPageView> = self.weak_self.clone();
        config.set_entity_details_page(view);
        let entity_id = entity_id.into();
        info!(entity_id = %entity_id, "Details page bound");
        *lock(&self.state) = Some(DetailsState {
            config,
            entity_id,
            entity: None,
        });
        self.reload().await;
    }

    pub fn entity(&self) -> Option<T> {
        lock(&self.state).as_ref().and_then(|s| s.entity.clone())
    }

    fn config_and_id(&self) -> Result<(Arc<EntityTableConfig<T>>, String), TableError> {
        lock(&self.state)
            .as_ref()
            .map(|s| (s.config.clone(), s.entity_id.clone()))
            .ok_or(TableError::NotInitialized)
    }

    /// Loads the entity again through the repository.
    pub async fn reload(&self) {
        let Ok((config, entity_id)) = self.config_and_id() else {
            debug!("Reload of an unbound details page ignored");
            return;
        };
        match config.repository().load_entity(&entity_id).await {
            Ok(entity) => {
                if let Some(state) = lock(&self.state).as_mut() {
                    state.entity = Some(entity);
                }
            }
            Err(e) => warn!(entity_id = %entity_id, error = %e, "Failed to load entity"),
        }
    }

    /// Persists `entity`, passing the loaded copy as the original.
    pub async fn save(&self, entity: T) -> Result<T, TableError> {
        let (config, _) = self.config_and_id()?;
        let original = self.entity();
        let saved = config
            .repository()
            .save_entity(entity, original.as_ref())
            .await?;
        if let Some(state) = lock(&self.state).as_mut() {
            state.entity_id = saved.id().to_string();
            state.entity = Some(saved.clone());
        }
        config.hooks().entity_updated(&saved);
        Ok(saved)
    }

    pub fn is_readonly(&self) -> bool {
        let state = lock(&self.state);
        match state.as_ref() {
            Some(DetailsState {
                config,
                entity: Some(entity),
                ..
            }) => config.hooks().details_readonly(entity),
            _ => true,
        }
    }
}

#[async_trait]
impl<T: BaseData> EntityDetailsPageView for EntityDetailsPage<T> {
    async fn reload(&self) {
        EntityDetailsPage::reload(self).await;
    }
}
