//! Cell, group and header action descriptors.
//!
//! The lists a table actually shows are produced by [`TableActions::compose`],
//! which appends the built-in delete actions to copies of the user-declared
//! ones. Nothing mutates the config's own lists, so repeated `init` calls
//! never accumulate duplicates.

use super::cells::CellStyle;
use super::config::EntityTableConfig;
use super::BaseData;
use crate::services::Translator;
use futures::future::{BoxFuture, FutureExt};
use std::future::Future;
use std::sync::Arc;

pub const DELETE_ACTION_ICON: &str = "mdi:trash-can-outline";

pub type EntityPredicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;
pub type EntityActionFn<T> = Arc<dyn Fn(T) -> BoxFuture<'static, ()> + Send + Sync>;
pub type EntitiesActionFn<T> = Arc<dyn Fn(Vec<T>) -> BoxFuture<'static, ()> + Send + Sync>;
pub type HeaderActionFn = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CellActionType {
    #[default]
    Default,
    CopyButton,
}

/// What happens when a cell action fires.
pub enum CellActionHandler<T: BaseData> {
    /// Built-in single delete, confirmed through the dialog service.
    Delete,
    Custom(EntityActionFn<T>),
}

impl<T: BaseData> Clone for CellActionHandler<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Delete => Self::Delete,
            Self::Custom(f) => Self::Custom(f.clone()),
        }
    }
}

impl<T: BaseData> CellActionHandler<T> {
    pub fn custom<F, Fut>(f: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self::Custom(Arc::new(move |entity| f(entity).boxed()))
    }
}

pub struct CellActionDescriptor<T: BaseData> {
    pub name: String,
    /// Per-entity label overriding `name`.
    pub name_fn: Option<Arc<dyn Fn(&T) -> String + Send + Sync>>,
    pub icon: Option<String>,
    pub style: CellStyle,
    pub is_enabled: EntityPredicate<T>,
    pub handler: CellActionHandler<T>,
    pub action_type: CellActionType,
}

impl<T: BaseData> Clone for CellActionDescriptor<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            name_fn: self.name_fn.clone(),
            icon: self.icon.clone(),
            style: self.style.clone(),
            is_enabled: self.is_enabled.clone(),
            handler: self.handler.clone(),
            action_type: self.action_type,
        }
    }
}

impl<T: BaseData> CellActionDescriptor<T> {
    /// Always-enabled action.
    pub fn new(name: impl Into<String>, icon: impl Into<String>, handler: CellActionHandler<T>) -> Self {
        Self {
            name: name.into(),
            name_fn: None,
            icon: Some(icon.into()),
            style: CellStyle::new(),
            is_enabled: Arc::new(|_: &T| true),
            handler,
            action_type: CellActionType::Default,
        }
    }

    pub fn enabled_when(mut self, f: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        self.is_enabled = Arc::new(f);
        self
    }

    pub fn name_fn(mut self, f: impl Fn(&T) -> String + Send + Sync + 'static) -> Self {
        self.name_fn = Some(Arc::new(f));
        self
    }

    pub fn with_style(mut self, style: CellStyle) -> Self {
        self.style = style;
        self
    }

    pub fn copy_button(mut self) -> Self {
        self.action_type = CellActionType::CopyButton;
        self
    }

    pub fn display_name(&self, entity: &T) -> String {
        match &self.name_fn {
            Some(f) => f(entity),
            None => self.name.clone(),
        }
    }

    pub fn is_enabled(&self, entity: &T) -> bool {
        (self.is_enabled)(entity)
    }
}

pub enum GroupActionHandler<T: BaseData> {
    /// Built-in bulk delete.
    Delete,
    Custom(EntitiesActionFn<T>),
}

impl<T: BaseData> Clone for GroupActionHandler<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Delete => Self::Delete,
            Self::Custom(f) => Self::Custom(f.clone()),
        }
    }
}

impl<T: BaseData> GroupActionHandler<T> {
    pub fn custom<F, Fut>(f: F) -> Self
    where
        F: Fn(Vec<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self::Custom(Arc::new(move |entities| f(entities).boxed()))
    }
}

/// Action applied to the current multi-row selection.
pub struct GroupActionDescriptor<T: BaseData> {
    pub name: String,
    pub icon: Option<String>,
    pub enabled: bool,
    pub handler: GroupActionHandler<T>,
}

impl<T: BaseData> Clone for GroupActionDescriptor<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            icon: self.icon.clone(),
            enabled: self.enabled,
            handler: self.handler.clone(),
        }
    }
}

impl<T: BaseData> GroupActionDescriptor<T> {
    pub fn new(name: impl Into<String>, icon: impl Into<String>, handler: GroupActionHandler<T>) -> Self {
        Self {
            name: name.into(),
            icon: Some(icon.into()),
            enabled: true,
            handler,
        }
    }

    /// A group action never runs against an empty selection.
    pub fn is_enabled(&self, selection: &[T]) -> bool {
        self.enabled && !selection.is_empty()
    }
}

pub struct HeaderActionDescriptor {
    pub name: String,
    pub icon: String,
    pub is_enabled: Arc<dyn Fn() -> bool + Send + Sync>,
    pub on_action: HeaderActionFn,
}

impl Clone for HeaderActionDescriptor {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            icon: self.icon.clone(),
            is_enabled: self.is_enabled.clone(),
            on_action: self.on_action.clone(),
        }
    }
}

impl HeaderActionDescriptor {
    pub fn new<F, Fut>(name: impl Into<String>, icon: impl Into<String>, on_action: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            name: name.into(),
            icon: icon.into(),
            is_enabled: Arc::new(|| true),
            on_action: Arc::new(move || on_action().boxed()),
        }
    }

    pub fn enabled_when(mut self, f: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        self.is_enabled = Arc::new(f);
        self
    }

    pub fn is_enabled(&self) -> bool {
        (self.is_enabled)()
    }
}

/// The final action lists a table renders.
pub struct TableActions<T: BaseData> {
    pub header: Vec<HeaderActionDescriptor>,
    pub group: Vec<GroupActionDescriptor<T>>,
    pub cell: Vec<CellActionDescriptor<T>>,
}

impl<T: BaseData> Clone for TableActions<T> {
    fn clone(&self) -> Self {
        Self {
            header: self.header.clone(),
            group: self.group.clone(),
            cell: self.cell.clone(),
        }
    }
}

impl<T: BaseData> TableActions<T> {
    pub fn compose(config: &EntityTableConfig<T>, translator: &dyn Translator) -> Self {
        Self {
            header: config.header_actions().to_vec(),
            group: Self::compose_group(config, translator),
            cell: Self::compose_cell(config, translator),
        }
    }

    /// User cell actions plus the delete action when deletion is enabled.
    pub fn compose_cell(config: &EntityTableConfig<T>, translator: &dyn Translator) -> Vec<CellActionDescriptor<T>> {
        let mut actions = config.cell_actions();
        if config.settings.entities_delete_enabled {
            let hooks = config.hooks();
            actions.push(
                CellActionDescriptor::new(
                    translator.instant("action.delete"),
                    DELETE_ACTION_ICON,
                    CellActionHandler::Delete,
                )
                .enabled_when(move |entity| hooks.delete_enabled(entity)),
            );
        }
        actions
    }

    fn compose_group(config: &EntityTableConfig<T>, translator: &dyn Translator) -> Vec<GroupActionDescriptor<T>> {
        let mut actions = config.group_actions().to_vec();
        if config.settings.entities_delete_enabled {
            actions.push(GroupActionDescriptor::new(
                translator.instant("action.delete"),
                DELETE_ACTION_ICON,
                GroupActionHandler::Delete,
            ));
        }
        actions
    }

    pub fn has_enabled_group_action(&self) -> bool {
        self.group.iter().any(|action| action.enabled)
    }

    pub fn names(&self) -> (Vec<String>, Vec<String>, Vec<String>) {
        (
            self.header.iter().map(|a| a.name.clone()).collect(),
            self.group.iter().map(|a| a.name.clone()).collect(),
            self.cell.iter().map(|a| a.name.clone()).collect(),
        )
    }
}
