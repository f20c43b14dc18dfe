//! In-memory history of the messenger's received and published messages.

use crate::config::MessengerDefaults;
use crate::entity::{read, write, BaseData, EntityRepository, RepositoryError};
use crate::page::{EntityPageLink, PageData};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::RwLock;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info};

const CHANGE_CHANNEL_CAPACITY: usize = 16;
const MAX_QOS: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WsMessageType {
    Received,
    Published,
}

impl WsMessageType {
    pub fn is_received(self) -> bool {
        self == Self::Received
    }
}

/// MQTT 5 publish properties attached to a message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishMessageProperties {
    pub payload_format_indicator: Option<bool>,
    pub content_type: Option<String>,
    pub message_expiry_interval: Option<u32>,
    pub topic_alias: Option<u16>,
    pub response_topic: Option<String>,
    pub correlation_data: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub user_properties: BTreeMap<String, String>,
}

impl PublishMessageProperties {
    /// `true` when at least one property carries a value.
    pub fn is_defined(&self) -> bool {
        self.payload_format_indicator.is_some()
            || self.content_type.is_some()
            || self.message_expiry_interval.is_some()
            || self.topic_alias.is_some()
            || self.response_topic.is_some()
            || self.correlation_data.is_some()
            || !self.user_properties.is_empty()
    }
}

/// One row of the messenger's message table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WsTableMessage {
    pub id: String,
    #[serde(rename = "type")]
    pub message_type: WsMessageType,
    pub created_time: i64,
    pub topic: String,
    pub qos: u8,
    pub retain: bool,
    pub payload: String,
    pub properties: Option<PublishMessageProperties>,
    /// Display color of the connection the message belongs to
    pub color: Option<String>,
}

impl BaseData for WsTableMessage {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadFormat {
    #[default]
    Text,
    Json,
}

/// A message about to be published.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OutgoingMessage {
    pub topic: String,
    pub payload: String,
    pub format: PayloadFormat,
    pub qos: u8,
    pub retain: bool,
    pub properties: Option<PublishMessageProperties>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Topic must not be empty")]
    EmptyTopic,

    /// Wildcards or NUL characters in a topic name
    #[error("Invalid topic name: {0}")]
    InvalidTopic(String),

    #[error("Invalid topic filter: {0}")]
    InvalidTopicFilter(String),

    #[error("Invalid QoS level: {0}")]
    InvalidQos(u8),

    #[error("Payload is not valid JSON: {0}")]
    InvalidJson(String),
}

/// Checks a topic a message is published to.
pub fn validate_topic_name(topic: &str) -> Result<(), ValidationError> {
    if topic.is_empty() {
        return Err(ValidationError::EmptyTopic);
    }
    if topic.contains(['+', '#', '\0']) {
        return Err(ValidationError::InvalidTopic(topic.to_string()));
    }
    Ok(())
}

/// Checks a subscription filter: `+` must fill a whole level, `#` must fill
/// the last one.
pub fn validate_topic_filter(filter: &str) -> Result<(), ValidationError> {
    if filter.is_empty() {
        return Err(ValidationError::EmptyTopic);
    }
    let levels: Vec<&str> = filter.split('/').collect();
    let last = levels.len() - 1;
    for (i, level) in levels.iter().enumerate() {
        let valid = match *level {
            "+" => true,
            "#" => i == last,
            other => !other.contains(['+', '#', '\0']),
        };
        if !valid {
            return Err(ValidationError::InvalidTopicFilter(filter.to_string()));
        }
    }
    Ok(())
}

/// MQTT filter matching. Filters starting with a wildcard skip `$` topics.
pub fn topic_matches_filter(filter: &str, topic: &str) -> bool {
    if topic.starts_with('$') && filter.starts_with(['+', '#']) {
        return false;
    }
    let mut levels = topic.split('/');
    for level in filter.split('/') {
        match level {
            "#" => return true,
            "+" => {
                if levels.next().is_none() {
                    return false;
                }
            }
            exact => {
                if levels.next() != Some(exact) {
                    return false;
                }
            }
        }
    }
    levels.next().is_none()
}

/// Checks a payload declared as JSON.
pub fn validate_payload(payload: &str, format: PayloadFormat) -> Result<(), ValidationError> {
    match format {
        PayloadFormat::Text => Ok(()),
        PayloadFormat::Json => serde_json::from_str::<serde_json::Value>(payload)
            .map(|_| ())
            .map_err(|e| ValidationError::InvalidJson(e.to_string())),
    }
}

/// Change notification sent to every subscriber of the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    Added { id: String },
    Cleared,
}

/// Bounded message history, newest message first.
///
/// Doubles as the repository behind the messenger's table: pages are cut from
/// the in-memory history with [`PageLink::page_data`](crate::page::PageLink::page_data).
pub struct MessageStore {
    messages: RwLock<VecDeque<WsTableMessage>>,
    max_messages: usize,
    next_id: AtomicU64,
    changes: broadcast::Sender<StoreEvent>,
    subscriptions: RwLock<BTreeSet<String>>,
}

impl MessageStore {
    pub fn new(max_messages: usize) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            messages: RwLock::new(VecDeque::new()),
            max_messages: max_messages.max(1),
            next_id: AtomicU64::new(1),
            changes,
            subscriptions: RwLock::new(BTreeSet::new()),
        }
    }

    pub fn from_config(config: &MessengerDefaults) -> Self {
        Self::new(config.max_messages)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.changes.subscribe()
    }

    /// Adds a topic filter. Returns `false` when it was already present.
    pub fn add_subscription(&self, filter: &str) -> Result<bool, ValidationError> {
        validate_topic_filter(filter)?;
        let added = write(&self.subscriptions).insert(filter.to_string());
        if added {
            info!(filter, "Subscribed");
        }
        Ok(added)
    }

    pub fn remove_subscription(&self, filter: &str) -> bool {
        let removed = write(&self.subscriptions).remove(filter);
        if removed {
            info!(filter, "Unsubscribed");
        }
        removed
    }

    pub fn subscriptions(&self) -> Vec<String> {
        read(&self.subscriptions).iter().cloned().collect()
    }

    pub fn is_subscribed(&self, topic: &str) -> bool {
        read(&self.subscriptions)
            .iter()
            .any(|filter| topic_matches_filter(filter, topic))
    }

    /// Records a broker delivery when one of the subscriptions matches its
    /// topic.
    pub fn deliver(
        &self,
        topic: &str,
        payload: impl Into<String>,
        qos: u8,
        retain: bool,
        properties: Option<PublishMessageProperties>,
    ) -> Option<WsTableMessage> {
        if !self.is_subscribed(topic) {
            debug!(topic, "Delivery without a matching subscription dropped");
            return None;
        }
        Some(self.received(topic, payload, qos, retain, properties))
    }

    /// Records a message delivered by the broker.
    pub fn received(
        &self,
        topic: impl Into<String>,
        payload: impl Into<String>,
        qos: u8,
        retain: bool,
        properties: Option<PublishMessageProperties>,
    ) -> WsTableMessage {
        let message = WsTableMessage {
            id: self.next_id(),
            message_type: WsMessageType::Received,
            created_time: Utc::now().timestamp_millis(),
            topic: topic.into(),
            qos,
            retain,
            payload: payload.into(),
            properties,
            color: None,
        };
        self.push(message.clone());
        message
    }

    /// Validates and records a message the user publishes.
    pub fn publish(&self, outgoing: OutgoingMessage) -> Result<WsTableMessage, ValidationError> {
        validate_topic_name(&outgoing.topic)?;
        if outgoing.qos > MAX_QOS {
            return Err(ValidationError::InvalidQos(outgoing.qos));
        }
        validate_payload(&outgoing.payload, outgoing.format)?;

        let message = WsTableMessage {
            id: self.next_id(),
            message_type: WsMessageType::Published,
            created_time: Utc::now().timestamp_millis(),
            topic: outgoing.topic,
            qos: outgoing.qos,
            retain: outgoing.retain,
            payload: outgoing.payload,
            properties: outgoing.properties,
            color: outgoing.color,
        };
        info!(topic = %message.topic, qos = message.qos, "Message published");
        self.push(message.clone());
        Ok(message)
    }

    fn next_id(&self) -> String {
        self.next_id.fetch_add(1, AtomicOrdering::Relaxed).to_string()
    }

    /// Inserts at the front and drops the oldest messages beyond the bound.
    pub fn push(&self, message: WsTableMessage) {
        let id = message.id.clone();
        {
            let mut messages = write(&self.messages);
            messages.push_front(message);
            while messages.len() > self.max_messages {
                messages.pop_back();
            }
        }
        debug!(message_id = %id, "Message stored");
        let _ = self.changes.send(StoreEvent::Added { id });
    }

    pub fn clear(&self) {
        write(&self.messages).clear();
        let _ = self.changes.send(StoreEvent::Cleared);
    }

    pub fn messages(&self) -> Vec<WsTableMessage> {
        read(&self.messages).iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        read(&self.messages).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// One page of history. Search matches the topic; without a sort order
    /// the newest-first order is kept.
    pub fn get_messages(&self, page_link: &EntityPageLink) -> PageData<WsTableMessage> {
        let (start, end) = page_link
            .as_time()
            .map_or((None, None), |t| (t.start_time, t.end_time));
        let items: Vec<WsTableMessage> = read(&self.messages)
            .iter()
            .filter(|m| start.map_or(true, |s| m.created_time >= s))
            .filter(|m| end.map_or(true, |e| m.created_time <= e))
            .cloned()
            .collect();
        page_link.page_data(items, |m: &WsTableMessage| m.topic.clone(), compare_messages)
    }
}

fn compare_messages(a: &WsTableMessage, b: &WsTableMessage, property: &str) -> Ordering {
    match property {
        "topic" => a.topic.cmp(&b.topic),
        "qos" => a.qos.cmp(&b.qos),
        "payload" => a.payload.cmp(&b.payload),
        "type" => a.message_type.is_received().cmp(&b.message_type.is_received()),
        _ => a.created_time.cmp(&b.created_time),
    }
}

#[async_trait]
impl EntityRepository<WsTableMessage> for MessageStore {
    async fn fetch_entities(&self, page_link: &EntityPageLink) -> Result<PageData<WsTableMessage>, RepositoryError> {
        Ok(self.get_messages(page_link))
    }

    async fn load_entity(&self, id: &str) -> Result<WsTableMessage, RepositoryError> {
        read(&self.messages)
            .iter()
            .find(|m| m.id == id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{Direction, PageLink, SortOrder};

    fn page(size: u32, page: u32, search: Option<&str>) -> EntityPageLink {
        EntityPageLink::Page(PageLink::new(size, page, search.map(str::to_string), None))
    }

    #[test]
    fn history_is_bounded_and_newest_first() {
        let store = MessageStore::new(3);
        for i in 0..5 {
            store.received(format!("sensors/{i}"), "21.5", 0, false, None);
        }

        let topics: Vec<String> = store.messages().into_iter().map(|m| m.topic).collect();
        assert_eq!(topics, vec!["sensors/4", "sensors/3", "sensors/2"]);
    }

    #[test]
    fn paging_keeps_totals_past_the_end() {
        let store = MessageStore::new(100);
        for i in 0..5 {
            store.received(format!("home/room{i}/temp"), "20", 1, false, None);
        }

        let first = store.get_messages(&page(3, 0, None));
        assert_eq!(first.data.len(), 3);
        assert!(first.has_next);

        let beyond = store.get_messages(&page(3, 2, None));
        assert!(beyond.data.is_empty());
        assert_eq!(beyond.total_elements, 5);
        assert_eq!(beyond.total_pages, 2);
    }

    #[test]
    fn search_and_sort_apply_to_history() {
        let store = MessageStore::new(100);
        store.received("home/temp", "1", 0, false, None);
        store.received("garage/door", "open", 0, false, None);
        store.received("home/humidity", "40", 2, false, None);

        let found = store.get_messages(&page(10, 0, Some("HOME")));
        assert_eq!(found.total_elements, 2);

        let sorted = store.get_messages(&EntityPageLink::Page(PageLink::new(
            10,
            0,
            None,
            Some(SortOrder::new("topic", Direction::Asc)),
        )));
        let topics: Vec<&str> = sorted.data.iter().map(|m| m.topic.as_str()).collect();
        assert_eq!(topics, vec!["garage/door", "home/humidity", "home/temp"]);
    }

    #[test]
    fn publish_validates_before_storing() {
        let store = MessageStore::new(10);

        let wildcard = store.publish(OutgoingMessage {
            topic: "home/+/temp".into(),
            ..OutgoingMessage::default()
        });
        assert_eq!(wildcard, Err(ValidationError::InvalidTopic("home/+/temp".into())));

        let bad_json = store.publish(OutgoingMessage {
            topic: "home/temp".into(),
            payload: "{\"value\": ".into(),
            format: PayloadFormat::Json,
            ..OutgoingMessage::default()
        });
        assert!(matches!(bad_json, Err(ValidationError::InvalidJson(_))));

        let qos = store.publish(OutgoingMessage {
            topic: "home/temp".into(),
            qos: 3,
            ..OutgoingMessage::default()
        });
        assert_eq!(qos, Err(ValidationError::InvalidQos(3)));
        assert!(store.is_empty());

        let sent = store
            .publish(OutgoingMessage {
                topic: "home/temp".into(),
                payload: "{\"value\": 21}".into(),
                format: PayloadFormat::Json,
                qos: 1,
                ..OutgoingMessage::default()
            })
            .expect("valid message");
        assert_eq!(sent.message_type, WsMessageType::Published);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn topic_filter_wildcards_fill_whole_levels() {
        assert!(validate_topic_filter("home/+/temp").is_ok());
        assert!(validate_topic_filter("home/#").is_ok());
        assert!(validate_topic_filter("#").is_ok());
        assert!(validate_topic_filter("home/#/temp").is_err());
        assert!(validate_topic_filter("home/te+mp").is_err());
        assert!(validate_topic_filter("home#").is_err());
        assert_eq!(validate_topic_filter(""), Err(ValidationError::EmptyTopic));
    }

    #[test]
    fn filters_match_mqtt_levels() {
        assert!(topic_matches_filter("home/+/temp", "home/kitchen/temp"));
        assert!(!topic_matches_filter("home/+/temp", "home/kitchen/oven/temp"));
        assert!(topic_matches_filter("home/#", "home"));
        assert!(topic_matches_filter("home/#", "home/kitchen/temp"));
        assert!(topic_matches_filter("home/temp", "home/temp"));
        assert!(!topic_matches_filter("home/temp", "home/temp/x"));
        assert!(!topic_matches_filter("home/+", "home"));
        assert!(!topic_matches_filter("#", "$SYS/uptime"));
        assert!(topic_matches_filter("$SYS/#", "$SYS/uptime"));
    }

    #[test]
    fn subscriptions_reject_invalid_filters() {
        let store = MessageStore::new(10);

        assert_eq!(
            store.add_subscription("home/#/temp"),
            Err(ValidationError::InvalidTopicFilter("home/#/temp".into()))
        );
        assert_eq!(store.add_subscription(""), Err(ValidationError::EmptyTopic));
        assert!(store.subscriptions().is_empty());

        assert_eq!(store.add_subscription("home/+/temp"), Ok(true));
        assert_eq!(store.add_subscription("home/+/temp"), Ok(false));
        assert_eq!(store.subscriptions(), vec!["home/+/temp".to_string()]);

        assert!(store.remove_subscription("home/+/temp"));
        assert!(!store.remove_subscription("home/+/temp"));
    }

    #[test]
    fn deliveries_are_kept_only_for_subscribed_topics() {
        let store = MessageStore::new(10);
        store.add_subscription("home/+/temp").expect("valid filter");

        let kept = store.deliver("home/kitchen/temp", "21", 1, false, None);
        assert_eq!(kept.map(|m| m.message_type), Some(WsMessageType::Received));

        assert!(store.deliver("garage/door", "open", 0, false, None).is_none());
        assert_eq!(store.len(), 1);

        store.remove_subscription("home/+/temp");
        assert!(store.deliver("home/kitchen/temp", "22", 1, false, None).is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn empty_properties_are_not_defined() {
        assert!(!PublishMessageProperties::default().is_defined());
        let props = PublishMessageProperties {
            content_type: Some("application/json".into()),
            ..PublishMessageProperties::default()
        };
        assert!(props.is_defined());
    }

    #[tokio::test]
    async fn subscribers_see_every_change() {
        let store = MessageStore::new(10);
        let mut rx = store.subscribe();

        let message = store.received("a/b", "x", 0, false, None);
        store.clear();

        assert_eq!(rx.recv().await.expect("added"), StoreEvent::Added { id: message.id });
        assert_eq!(rx.recv().await.expect("cleared"), StoreEvent::Cleared);
    }
}
