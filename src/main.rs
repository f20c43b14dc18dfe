use broker_console::config::{ConsoleConfig, LogConfig};
use broker_console::entity::{EntitiesTable, RenderedCell};
use broker_console::messenger::{MessageStore, MessagesTableConfig, OutgoingMessage, PayloadFormat, PayloadLayout};
use broker_console::retained::{InMemoryRetainedMessages, RetainedMessagesTable, RetainedMessagesTableConfig};
use broker_console::services::{AutoConfirmDialogs, DialogService, MapTranslator, Notifier, ToastMessage, Translator};
use color_eyre::{eyre::eyre, Result};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = ConsoleConfig::config_path();
    let loaded = ConsoleConfig::read_from(&config_path).await;
    let level = match &loaded {
        Ok(Some(config)) => config.log.level.clone(),
        _ => LogConfig::default().level,
    };
    setup(&level)?;
    let config = ConsoleConfig::or_default(&config_path, loaded);

    let config_path = ConsoleConfig::ensure_default_config().await?;
    info!("Console config at {}", config_path.display());

    let translator: Arc<dyn Translator> = Arc::new(MapTranslator::english());
    let dialogs: Arc<dyn DialogService> = Arc::new(AutoConfirmDialogs);
    let notifier = Notifier::new();
    spawn_toast_logger(&notifier);

    run_messenger_demo(&config, translator.clone(), dialogs.clone()).await?;
    run_retained_demo(&config, translator, dialogs, notifier).await?;

    Ok(())
}

fn setup(default_level: &str) -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", default_level)
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    let level = std::env::var("RUST_LOG")
        .ok()
        .and_then(|value| Level::from_str(&value).ok())
        .unwrap_or(Level::INFO);
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}

fn spawn_toast_logger(notifier: &Notifier) {
    let mut rx = notifier.subscribe();
    tokio::spawn(async move {
        while let Ok(message) = rx.recv().await {
            match message {
                ToastMessage::Show(toast) => info!(target_view = %toast.target, "Toast: {}", toast.message),
                ToastMessage::Hide { target } => info!(target_view = %target, "Toast hidden"),
            }
        }
    });
}

async fn run_messenger_demo(
    config: &ConsoleConfig,
    translator: Arc<dyn Translator>,
    dialogs: Arc<dyn DialogService>,
) -> Result<()> {
    let store = Arc::new(MessageStore::from_config(&config.messenger));
    let messages = MessagesTableConfig::new(
        store.clone(),
        translator.clone(),
        dialogs.clone(),
        PayloadLayout::Regular,
        config,
    );
    let table = EntitiesTable::new(translator, dialogs, config.table.clone());
    table.init(messages.config()).await;
    messages.watch_messages();

    store
        .add_subscription("sensors/#")
        .map_err(|e| eyre!("Failed to subscribe: {}", e))?;

    store
        .publish(OutgoingMessage {
            topic: "sensors/livingroom/temperature".into(),
            payload: r#"{"celsius": 21.5}"#.into(),
            format: PayloadFormat::Json,
            qos: 1,
            ..OutgoingMessage::default()
        })
        .map_err(|e| eyre!("Failed to publish demo message: {}", e))?;
    store.deliver("sensors/livingroom/temperature", r#"{"celsius": 21.5}"#, 1, false, None);
    store.deliver("sensors/garage/door", "open", 0, true, None);
    store.deliver("office/printer/status", "idle", 0, false, None);

    if let Err(e) = store.publish(OutgoingMessage {
        topic: "sensors/+/temperature".into(),
        ..OutgoingMessage::default()
    }) {
        warn!("Rejected publish: {}", e);
    }

    // Let the watcher apply the last change.
    tokio::time::sleep(Duration::from_millis(50)).await;
    table
        .update_data(false)
        .await
        .map_err(|e| eyre!("Failed to reload messages: {}", e))?;
    log_rows("messages", &table.render_rows());
    messages.stop_watching();
    Ok(())
}

async fn run_retained_demo(
    config: &ConsoleConfig,
    translator: Arc<dyn Translator>,
    dialogs: Arc<dyn DialogService>,
    notifier: Notifier,
) -> Result<()> {
    let store = Arc::new(InMemoryRetainedMessages::new());
    store.retain("home/livingroom/temperature", "21.5", 1);
    store.retain("home/garage/door", "closed", 1);
    store.retain("office/printer/status", "idle", 0);

    let retained = RetainedMessagesTableConfig::new(
        store.clone(),
        translator.clone(),
        dialogs.clone(),
        notifier,
        None,
        config,
    );
    let table = EntitiesTable::new(translator, dialogs, config.table.clone());
    let retained = RetainedMessagesTable::new(table, retained, true).await;
    log_rows("retained", &retained.table().render_rows());

    retained
        .set_entity_id(Some("home/".into()))
        .await
        .map_err(|e| eyre!("Failed to scope retained messages: {}", e))?;
    log_rows("retained home/", &retained.table().render_rows());

    if let Some(message) = store.get("home/garage/door") {
        retained
            .table()
            .delete_entity(&message)
            .await
            .map_err(|e| eyre!("Failed to delete retained message: {}", e))?;
    }
    log_rows("retained home/ after delete", &retained.table().render_rows());
    tokio::task::yield_now().await;
    Ok(())
}

fn log_rows(title: &str, rows: &[Vec<RenderedCell>]) {
    info!("{} ({} rows)", title, rows.len());
    for row in rows {
        let cells: Vec<String> = row
            .iter()
            .map(|cell| match cell {
                RenderedCell::Content { html, .. } => html.to_string(),
                RenderedCell::Chips { chips, .. } => chips
                    .iter()
                    .map(|c| c.value.as_str())
                    .collect::<Vec<_>>()
                    .join(","),
                RenderedCell::Action { name, .. } => format!("[{name}]"),
            })
            .collect();
        info!("  {}", cells.join(" | "));
    }
}
