//! Table config of the messenger's message history.
//!
//! Read-only listing: no add, no delete, no selection and no details panel.
//! Every change of the [`MessageStore`] reloads whichever view is bound to
//! the config, keeping an open details panel open.

use super::message_store::{MessageStore, StoreEvent, WsTableMessage};
use crate::config::ConsoleConfig;
use crate::entity::cells::{arrow_icon, cell_with_background, DEFAULT_ARROW_COLOR};
use crate::entity::{
    lock, CellActionDescriptor, CellActionHandler, ContentColumn, DateColumn, EntityTableConfig,
    EntityTableHooks, TableSettings,
};
use crate::services::{DialogService, Translator};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

const RETAIN_BACKGROUND: &str = "rgba(0, 0, 0, 0.08)";
const PAYLOAD_ICON: &str = "mdi:code-braces";
const PROPERTIES_ICON: &str = "mdi:information-outline";

/// Payload column width follows the available screen width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PayloadLayout {
    #[default]
    Regular,
    Wide,
}

impl PayloadLayout {
    pub fn payload_width(self) -> &'static str {
        match self {
            Self::Regular => "150px",
            Self::Wide => "400px",
        }
    }
}

/// Pretty prints JSON payloads, leaves anything else untouched.
pub fn pretty_payload(payload: &str) -> String {
    serde_json::from_str::<serde_json::Value>(payload)
        .ok()
        .and_then(|value| serde_json::to_string_pretty(&value).ok())
        .unwrap_or_else(|| payload.to_string())
}

fn qos_translation_key(qos: u8) -> &'static str {
    match qos {
        0 => "mqtt-client-session.qos-at-most-once",
        1 => "mqtt-client-session.qos-at-least-once",
        _ => "mqtt-client-session.qos-exactly-once",
    }
}

fn message_type_translation_key(received: bool) -> &'static str {
    if received {
        "ws-client.messages.received"
    } else {
        "ws-client.messages.published"
    }
}

struct MessagesHooks;

impl EntityTableHooks<WsTableMessage> for MessagesHooks {
    fn entity_title(&self, entity: &WsTableMessage) -> String {
        entity.topic.clone()
    }

    fn details_readonly(&self, _entity: &WsTableMessage) -> bool {
        true
    }
}

struct MessageWatcher {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

pub struct MessagesTableConfig {
    config: Arc<EntityTableConfig<WsTableMessage>>,
    store: Arc<MessageStore>,
    watcher: Mutex<Option<MessageWatcher>>,
}

impl MessagesTableConfig {
    pub fn new(
        store: Arc<MessageStore>,
        translator: Arc<dyn Translator>,
        dialogs: Arc<dyn DialogService>,
        layout: PayloadLayout,
        console: &ConsoleConfig,
    ) -> Self {
        let settings = TableSettings {
            details_panel_enabled: false,
            entities_delete_enabled: false,
            add_enabled: false,
            selection_enabled: false,
            default_cursor: true,
            display_pagination: true,
            ..TableSettings::from_console(console)
        };

        let type_translator = translator.clone();
        let qos_translator = translator.clone();
        let config = EntityTableConfig::<WsTableMessage>::builder(store.clone())
            .settings(settings)
            .hooks(Arc::new(MessagesHooks))
            .column(
                ContentColumn::new("type", "", "30px")
                    .content(|m: &WsTableMessage, _| {
                        arrow_icon(
                            m.message_type.is_received(),
                            Some(m.color.as_deref().unwrap_or(DEFAULT_ARROW_COLOR)),
                        )
                    })
                    .sortable(false)
                    .tooltip(move |m: &WsTableMessage, _| {
                        let key = message_type_translation_key(m.message_type.is_received());
                        Some(type_translator.instant(key))
                    }),
            )
            .column(DateColumn::new(
                "createdTime",
                translator.instant("common.time"),
                "150px",
            ))
            .column(
                ContentColumn::new("topic", translator.instant("retained-message.topic"), "100%")
                    .content(|m: &WsTableMessage, _| m.topic.clone())
                    .tooltip(|m: &WsTableMessage, _| Some(m.topic.clone())),
            )
            .column(
                ContentColumn::new("qos", translator.instant("retained-message.qos"), "50px")
                    .content(|m: &WsTableMessage, _| m.qos.to_string())
                    .tooltip(move |m: &WsTableMessage, _| {
                        Some(qos_translator.instant(qos_translation_key(m.qos)))
                    }),
            )
            .column(
                ContentColumn::new("retain", translator.instant("ws-client.messages.retained"), "50px")
                    .content(|m: &WsTableMessage, _| {
                        if m.retain {
                            cell_with_background("True", Some(RETAIN_BACKGROUND))
                        } else {
                            String::new()
                        }
                    }),
            )
            .column(
                ContentColumn::new(
                    "payload",
                    translator.instant("retained-message.payload"),
                    layout.payload_width(),
                )
                .content(|m: &WsTableMessage, _| pretty_payload(&m.payload))
                .tooltip(|m: &WsTableMessage, _| Some(m.payload.clone())),
            )
            .cell_action(show_payload_action(translator.as_ref(), dialogs.clone()))
            .cell_action(show_properties_action(translator.as_ref(), dialogs))
            .build();

        Self {
            config,
            store,
            watcher: Mutex::new(None),
        }
    }

    pub fn config(&self) -> Arc<EntityTableConfig<WsTableMessage>> {
        self.config.clone()
    }

    pub fn store(&self) -> Arc<MessageStore> {
        self.store.clone()
    }

    /// Starts reloading the bound view on every store change. Idempotent.
    pub fn watch_messages(&self) {
        let mut watcher = lock(&self.watcher);
        if watcher.as_ref().is_some_and(|w| !w.handle.is_finished()) {
            return;
        }

        let mut rx = self.store.subscribe();
        let config = Arc::downgrade(&self.config);
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    event = rx.recv() => event,
                };
                match event {
                    Ok(StoreEvent::Added { id }) => debug!(message_id = %id, "Message history changed"),
                    Ok(StoreEvent::Cleared) => debug!("Message history cleared"),
                    Err(RecvError::Lagged(skipped)) => debug!(skipped, "Message watcher lagged"),
                    Err(RecvError::Closed) => break,
                }
                let Some(config) = config.upgrade() else {
                    break;
                };
                if let Err(e) = config.update_data(false).await {
                    debug!(error = %e, "Message table reload skipped");
                }
            }
            info!("Message watcher stopped");
        });

        *watcher = Some(MessageWatcher { cancel, handle });
    }

    pub fn stop_watching(&self) {
        if let Some(watcher) = lock(&self.watcher).take() {
            watcher.cancel.cancel();
        }
    }
}

impl Drop for MessagesTableConfig {
    fn drop(&mut self) {
        self.stop_watching();
    }
}

fn show_payload_action(
    translator: &dyn Translator,
    dialogs: Arc<dyn DialogService>,
) -> CellActionDescriptor<WsTableMessage> {
    let title = translator.instant("retained-message.payload");
    let name = translator.instant("ws-client.messages.show-payload");
    CellActionDescriptor::new(
        name,
        PAYLOAD_ICON,
        CellActionHandler::custom(move |m: WsTableMessage| {
            let dialogs = dialogs.clone();
            let title = title.clone();
            async move { dialogs.show_content(&title, &m.payload).await }
        }),
    )
    .enabled_when(|m: &WsTableMessage| !m.payload.is_empty())
}

fn show_properties_action(
    translator: &dyn Translator,
    dialogs: Arc<dyn DialogService>,
) -> CellActionDescriptor<WsTableMessage> {
    let title = translator.instant("ws-client.connections.properties");
    let name = translator.instant("ws-client.messages.show-properties");
    CellActionDescriptor::new(
        name,
        PROPERTIES_ICON,
        CellActionHandler::custom(move |m: WsTableMessage| {
            let dialogs = dialogs.clone();
            let title = title.clone();
            async move {
                let content = m
                    .properties
                    .as_ref()
                    .and_then(|p| serde_json::to_string_pretty(p).ok())
                    .unwrap_or_default();
                dialogs.show_content(&title, &content).await
            }
        }),
    )
    .enabled_when(|m: &WsTableMessage| m.properties.as_ref().is_some_and(|p| p.is_defined()))
}
