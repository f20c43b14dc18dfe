//! # Broker Console
//!
//! Entity screens of an MQTT broker administration console, built on a
//! configuration-driven table engine.
//!
//! ```text
//! broker_console/
//! ├── config.rs   - console defaults loaded from TOML
//! ├── page/       - page links, time windows, page data
//! ├── entity/     - generic table engine, config model, details page
//! ├── services/   - dialogs, translations, toast notifications
//! ├── messenger/  - WebSocket client message history and its table
//! └── retained/   - retained messages store and table
//! ```

pub mod config;
pub mod entity;
pub mod messenger;
pub mod page;
pub mod retained;
pub mod services;
