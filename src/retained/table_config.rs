//! Retained messages screen: table config plus the activity-aware wrapper
//! used when the table lives on a tab that may be hidden.

use super::store::{InMemoryRetainedMessages, RetainedMessage, RetainedMessageQuery};
use crate::config::ConsoleConfig;
use crate::entity::{
    lock, read, write, CellActionDescriptor, CellActionHandler, ContentColumn, DateColumn,
    EntitiesTable, EntityRepository, EntityTableConfig, EntityTableHooks, HeaderActionDescriptor,
    RepositoryError, TableError, TableSettings,
};
use crate::page::{EntityPageLink, PageData, Timewindow};
use crate::services::{DialogService, Notifier, ToastNotification, Translator};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, OnceLock, RwLock, Weak};
use tracing::{debug, info, warn};

pub const RETAINED_MESSAGES_TOAST_TARGET: &str = "retainedMessages";

/// Repository view of the store narrowed to the current entity id.
struct ScopedRetainedMessages {
    store: Arc<InMemoryRetainedMessages>,
    entity_id: Arc<RwLock<Option<String>>>,
}

#[async_trait]
impl EntityRepository<RetainedMessage> for ScopedRetainedMessages {
    async fn fetch_entities(&self, page_link: &EntityPageLink) -> Result<PageData<RetainedMessage>, RepositoryError> {
        let mut query = RetainedMessageQuery::from_page_link(page_link);
        query.topic_name = read(&self.entity_id).clone();
        Ok(self.store.query(&query))
    }

    async fn delete_entity(&self, id: &str) -> Result<(), RepositoryError> {
        self.store.delete_entity(id).await
    }

    async fn load_entity(&self, id: &str) -> Result<RetainedMessage, RepositoryError> {
        self.store.load_entity(id).await
    }
}

struct RetainedHooks {
    translator: Arc<dyn Translator>,
    notifier: Notifier,
}

impl EntityTableHooks<RetainedMessage> for RetainedHooks {
    fn entity_title(&self, entity: &RetainedMessage) -> String {
        entity.topic.clone()
    }

    fn delete_entity_title(&self, _entity: &RetainedMessage) -> String {
        self.translator
            .instant("retained-message.delete-retained-message-title")
    }

    fn delete_entity_content(&self, _entity: &RetainedMessage) -> String {
        self.translator
            .instant("retained-message.delete-retained-message-text")
    }

    fn entities_deleted(&self, ids: &[String]) {
        if ids.is_empty() {
            return;
        }
        self.notifier.show(ToastNotification::success(
            self.translator
                .instant("retained-message.retained-message-deleted"),
            RETAINED_MESSAGES_TOAST_TARGET,
        ));
    }
}

pub struct RetainedMessagesTableConfig {
    config: Arc<EntityTableConfig<RetainedMessage>>,
    entity_id: Arc<RwLock<Option<String>>>,
}

impl RetainedMessagesTableConfig {
    pub fn new(
        store: Arc<InMemoryRetainedMessages>,
        translator: Arc<dyn Translator>,
        dialogs: Arc<dyn DialogService>,
        notifier: Notifier,
        entity_id: Option<String>,
        console: &ConsoleConfig,
    ) -> Self {
        let entity_id = Arc::new(RwLock::new(entity_id));
        let repository = Arc::new(ScopedRetainedMessages {
            store,
            entity_id: entity_id.clone(),
        });
        let settings = TableSettings {
            use_time_page_link: true,
            for_all_time_enabled: true,
            default_timewindow: Timewindow::for_all_time(),
            add_enabled: false,
            details_panel_enabled: false,
            ..TableSettings::from_console(console)
        };

        // The refresh action needs the config it belongs to.
        let bound: Arc<OnceLock<Weak<EntityTableConfig<RetainedMessage>>>> = Arc::new(OnceLock::new());
        let refresh_target = bound.clone();
        let qos_translator = translator.clone();
        let hooks = Arc::new(RetainedHooks {
            translator: translator.clone(),
            notifier,
        });

        let config = EntityTableConfig::<RetainedMessage>::builder(repository)
            .settings(settings)
            .hooks(hooks)
            .column(DateColumn::new(
                "createdTime",
                translator.instant("common.time"),
                "150px",
            ))
            .column(
                ContentColumn::new("topic", translator.instant("retained-message.topic"), "30%")
                    .content(|m: &RetainedMessage, _| m.topic.clone()),
            )
            .column(
                ContentColumn::new("qos", translator.instant("retained-message.qos"), "50px")
                    .content(|m: &RetainedMessage, _| m.qos.to_string())
                    .tooltip(move |m: &RetainedMessage, _| {
                        let key = match m.qos {
                            0 => "mqtt-client-session.qos-at-most-once",
                            1 => "mqtt-client-session.qos-at-least-once",
                            _ => "mqtt-client-session.qos-exactly-once",
                        };
                        Some(qos_translator.instant(key))
                    }),
            )
            .column(
                ContentColumn::new("payload", translator.instant("retained-message.payload"), "0px")
                    .content(|m: &RetainedMessage, _| m.payload.clone())
                    .sortable(false),
            )
            .cell_action(show_payload_action(translator.as_ref(), dialogs))
            .header_action(HeaderActionDescriptor::new(
                translator.instant("action.refresh"),
                "refresh",
                move || {
                    let target = refresh_target.get().and_then(Weak::upgrade);
                    async move {
                        match target {
                            Some(config) => {
                                if let Err(e) = config.update_data(true).await {
                                    warn!(error = %e, "Retained messages refresh failed");
                                }
                            }
                            None => debug!("Refresh on a dropped retained messages config"),
                        }
                    }
                },
            ))
            .build();
        let _ = bound.set(Arc::downgrade(&config));

        Self { config, entity_id }
    }

    pub fn config(&self) -> Arc<EntityTableConfig<RetainedMessage>> {
        self.config.clone()
    }

    pub fn entity_id(&self) -> Option<String> {
        read(&self.entity_id).clone()
    }

    /// Narrows the listing to topics containing `entity_id`. Returns whether
    /// the scope changed.
    pub fn set_entity_id(&self, entity_id: Option<String>) -> bool {
        let mut current = write(&self.entity_id);
        if *current == entity_id {
            return false;
        }
        debug!(entity_id = ?entity_id, "Retained messages scope changed");
        *current = entity_id;
        true
    }
}

fn show_payload_action(
    translator: &dyn Translator,
    dialogs: Arc<dyn DialogService>,
) -> CellActionDescriptor<RetainedMessage> {
    let title = translator.instant("retained-message.payload");
    CellActionDescriptor::new(
        translator.instant("retained-message.show-data"),
        "mdi:code-braces",
        CellActionHandler::custom(move |m: RetainedMessage| {
            let dialogs = dialogs.clone();
            let title = title.clone();
            async move { dialogs.show_content(&title, &m.payload).await }
        }),
    )
}

#[derive(Debug, Clone, Copy, Default)]
struct Activity {
    active: bool,
    dirty: bool,
}

/// Retained messages table that defers reloads while hidden.
///
/// A scope change on an inactive table only marks it dirty; the reload
/// happens once it becomes active again.
pub struct RetainedMessagesTable {
    table: Arc<EntitiesTable<RetainedMessage>>,
    config: RetainedMessagesTableConfig,
    activity: Mutex<Activity>,
}

impl RetainedMessagesTable {
    pub async fn new(
        table: Arc<EntitiesTable<RetainedMessage>>,
        config: RetainedMessagesTableConfig,
        active: bool,
    ) -> Self {
        table.init(config.config()).await;
        Self {
            table,
            config,
            activity: Mutex::new(Activity {
                active,
                dirty: !active,
            }),
        }
    }

    pub fn table(&self) -> Arc<EntitiesTable<RetainedMessage>> {
        self.table.clone()
    }

    pub fn config(&self) -> &RetainedMessagesTableConfig {
        &self.config
    }

    pub fn is_active(&self) -> bool {
        lock(&self.activity).active
    }

    pub fn is_dirty(&self) -> bool {
        lock(&self.activity).dirty
    }

    pub async fn set_active(&self, active: bool) -> Result<(), TableError> {
        let reload = {
            let mut activity = lock(&self.activity);
            if activity.active == active {
                return Ok(());
            }
            activity.active = active;
            let reload = active && activity.dirty;
            if reload {
                activity.dirty = false;
            }
            reload
        };
        if reload {
            info!("Reloading retained messages after becoming active");
            self.table.update_data(true).await?;
        }
        Ok(())
    }

    /// Rescopes the table, resetting sort and filter. Only an active table
    /// reloads right away.
    pub async fn set_entity_id(&self, entity_id: Option<String>) -> Result<(), TableError> {
        if !self.config.set_entity_id(entity_id) {
            return Ok(());
        }
        let active = self.is_active();
        self.table.reset_sort_and_filter(active, false).await?;
        if !active {
            lock(&self.activity).dirty = true;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TableDefaults;
    use crate::services::{AutoConfirmDialogs, MapTranslator, ToastMessage};

    fn seeded_store() -> Arc<InMemoryRetainedMessages> {
        let store = Arc::new(InMemoryRetainedMessages::new());
        for topic in ["topic/test1", "topic/test2", "topic/test3", "my/topic", "home/temp"] {
            store.retain(topic, "payload", 1);
        }
        store
    }

    fn table() -> Arc<EntitiesTable<RetainedMessage>> {
        EntitiesTable::new(
            Arc::new(MapTranslator::english()),
            Arc::new(AutoConfirmDialogs),
            TableDefaults::default(),
        )
    }

    fn retained_config(
        store: Arc<InMemoryRetainedMessages>,
        notifier: Notifier,
        entity_id: Option<&str>,
    ) -> RetainedMessagesTableConfig {
        RetainedMessagesTableConfig::new(
            store,
            Arc::new(MapTranslator::english()),
            Arc::new(AutoConfirmDialogs),
            notifier,
            entity_id.map(str::to_string),
            &ConsoleConfig::default(),
        )
    }

    fn total(table: &EntitiesTable<RetainedMessage>) -> u64 {
        table.data_source().expect("initialized").total()
    }

    #[tokio::test]
    async fn composes_retained_actions() {
        let table = table();
        table
            .init(retained_config(seeded_store(), Notifier::new(), None).config())
            .await;

        let snapshot = table.snapshot().expect("snapshot");
        assert_eq!(snapshot.header_actions, vec!["Refresh"]);
        assert_eq!(snapshot.cell_actions, vec!["Show payload", "Delete"]);
        assert_eq!(snapshot.group_actions, vec!["Delete"]);
        assert_eq!(
            snapshot.displayed_columns,
            vec!["select", "createdTime", "topic", "qos", "payload", "actions"]
        );
        assert_eq!(total(&table), 5);
        let link = snapshot.page_link;
        let time = link.as_time().expect("time scoped");
        assert_eq!((time.start_time, time.end_time), (None, None));
    }

    #[tokio::test]
    async fn delete_shows_toast() {
        let store = seeded_store();
        let notifier = Notifier::new();
        let mut toasts = notifier.subscribe();
        let table = table();
        table
            .init(retained_config(store.clone(), notifier, None).config())
            .await;

        let message = store.get("home/temp").expect("seeded");
        assert!(table.delete_entity(&message).await.expect("deleted"));

        assert!(store.get("home/temp").is_none());
        assert_eq!(total(&table), 4);
        match toasts.recv().await.expect("toast") {
            ToastMessage::Show(toast) => {
                assert_eq!(toast.message, "Retained message deleted");
                assert_eq!(toast.target, RETAINED_MESSAGES_TOAST_TARGET);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn refresh_header_action_reloads() {
        let store = seeded_store();
        let retained = retained_config(store.clone(), Notifier::new(), None);
        let table = table();
        table.init(retained.config()).await;

        store.retain("garage/door", "open", 0);
        table.invoke_header_action(0).await.expect("refresh");

        assert_eq!(total(&table), 6);
    }

    #[tokio::test]
    async fn entity_id_narrows_topics() {
        let table = table();
        table
            .init(retained_config(seeded_store(), Notifier::new(), Some("topic/")).config())
            .await;

        assert_eq!(total(&table), 3);
    }

    #[tokio::test]
    async fn inactive_table_defers_reload_until_active() {
        let retained = retained_config(seeded_store(), Notifier::new(), None);
        let wrapper = RetainedMessagesTable::new(table(), retained, false).await;
        assert!(wrapper.is_dirty());
        wrapper.set_active(true).await.expect("activate");
        assert!(!wrapper.is_dirty());
        wrapper.set_active(false).await.expect("deactivate");

        wrapper
            .set_entity_id(Some("home".into()))
            .await
            .expect("rescope");
        assert!(wrapper.is_dirty());
        assert_eq!(total(&wrapper.table()), 5);

        wrapper.set_active(true).await.expect("activate");
        assert!(!wrapper.is_dirty());
        assert_eq!(total(&wrapper.table()), 1);
    }

    #[tokio::test]
    async fn active_table_reloads_on_rescope() {
        let retained = retained_config(seeded_store(), Notifier::new(), None);
        let wrapper = RetainedMessagesTable::new(table(), retained, true).await;
        wrapper
            .table()
            .handle_event(crate::entity::TableEvent::Sort {
                active: Some("topic".into()),
                direction: crate::page::Direction::Asc,
            })
            .await
            .expect("sort");

        wrapper
            .set_entity_id(Some("topic/".into()))
            .await
            .expect("rescope");

        assert!(!wrapper.is_dirty());
        assert_eq!(total(&wrapper.table()), 3);
        let sort = wrapper.table().sort().expect("sort");
        assert_eq!(sort.active.as_deref(), Some("createdTime"));

        wrapper
            .set_entity_id(Some("topic/".into()))
            .await
            .expect("unchanged scope");
        assert_eq!(wrapper.config().entity_id().as_deref(), Some("topic/"));
    }
}
