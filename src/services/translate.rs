use std::collections::HashMap;
use tracing::debug;

/// Synchronous key lookup. Missing keys degrade to a visible placeholder.
pub trait Translator: Send + Sync {
    fn instant(&self, key: &str) -> String;
}

/// Translator backed by a flat key map. Unknown keys are returned verbatim.
#[derive(Debug, Clone, Default)]
pub struct MapTranslator {
    entries: HashMap<String, String>,
}

impl MapTranslator {
    pub fn new<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// English labels for the keys the console itself uses.
    pub fn english() -> Self {
        Self::new([
            ("action.delete", "Delete"),
            ("action.no", "No"),
            ("action.yes", "Yes"),
            ("action.refresh", "Refresh"),
            ("common.time", "Time"),
            ("retained-message.topic", "Topic"),
            ("retained-message.qos", "QoS"),
            ("retained-message.payload", "Payload"),
            ("ws-client.messages.retained", "Retained"),
            ("ws-client.connections.properties", "Properties"),
            ("retained-message.show-data", "Show payload"),
            ("retained-message.delete-retained-message-title", "Delete retained message"),
            ("retained-message.delete-retained-message-text", "Be careful, after the confirmation the retained message will be removed."),
            ("retained-message.retained-message-deleted", "Retained message deleted"),
            ("ws-client.messages.show-payload", "Show payload"),
            ("ws-client.messages.show-properties", "Show properties"),
            ("ws-client.messages.received", "Received"),
            ("ws-client.messages.published", "Published"),
            ("mqtt-client-session.qos-at-most-once", "At most once"),
            ("mqtt-client-session.qos-at-least-once", "At least once"),
            ("mqtt-client-session.qos-exactly-once", "Exactly once"),
        ])
    }
}

impl Translator for MapTranslator {
    fn instant(&self, key: &str) -> String {
        match self.entries.get(key) {
            Some(value) => value.clone(),
            None => {
                debug!(key, "Missing translation");
                key.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_falls_back_to_key() {
        let translator = MapTranslator::new([("action.yes", "Yes")]);
        assert_eq!(translator.instant("action.yes"), "Yes");
        assert_eq!(translator.instant("action.maybe"), "action.maybe");
    }
}
