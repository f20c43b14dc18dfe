//! # External Collaborators
//!
//! Contracts for the services the table engine consumes but does not own:
//! confirmation dialogs, translation lookup and toast notifications. The
//! console binary wires simple implementations, tests wire fakes.
//!
//! ```text
//! services/
//! ├── dialog.rs        - async confirm / alert / content dialogs
//! ├── translate.rs     - key → localized string lookup
//! └── notification.rs  - target-scoped toast broadcast channel
//! ```

pub mod dialog;
pub mod notification;
pub mod translate;

pub use dialog::{AutoConfirmDialogs, DialogService};
pub use notification::{NotificationKind, Notifier, ToastMessage, ToastNotification};
pub use translate::{MapTranslator, Translator};
