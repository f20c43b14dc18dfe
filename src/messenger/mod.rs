//! # Messenger
//!
//! Message history of the WebSocket MQTT test client and the table that
//! lists it.
//!
//! ```text
//! messenger/
//! ├── message_store.rs         - bounded history, subscriptions, publish validation
//! └── messages_table_config.rs - read-only table config fed by the store
//! ```
//!
//! The store broadcasts a [`StoreEvent`] per change; the table config turns
//! those into reloads of whichever view is bound to it:
//!
//! ```text
//! broker / publish form ──► MessageStore ──StoreEvent──► watch_messages task
//!                                ▲                              │
//!                                └──── fetch_entities ◄── update_data(false)
//! ```

pub mod message_store;
pub mod messages_table_config;

pub use message_store::{
    topic_matches_filter, validate_payload, validate_topic_filter, validate_topic_name, MessageStore,
    OutgoingMessage, PayloadFormat, PublishMessageProperties, StoreEvent, ValidationError,
    WsMessageType, WsTableMessage,
};
pub use messages_table_config::{pretty_payload, MessagesTableConfig, PayloadLayout};
