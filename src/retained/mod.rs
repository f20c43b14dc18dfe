//! # Retained Messages
//!
//! Broker-side retained messages, listed and deleted through the generic
//! entity table.
//!
//! ```text
//! retained/
//! ├── store.rs        - RetainedMessage, query filter, in-memory store
//! └── table_config.rs - table config, entity scoping, activity-aware wrapper
//! ```

pub mod store;
pub mod table_config;

pub use store::{InMemoryRetainedMessages, RetainedMessage, RetainedMessageQuery};
pub use table_config::{
    RetainedMessagesTable, RetainedMessagesTableConfig, RETAINED_MESSAGES_TOAST_TARGET,
};
