//! Retained messages held by the broker, one per topic.

use crate::entity::{read, write, BaseData, EntityRepository, RepositoryError};
use crate::messenger::PublishMessageProperties;
use crate::page::{EntityPageLink, PageData, TimePageLink};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetainedMessage {
    pub topic: String,
    pub payload: String,
    pub qos: u8,
    pub created_time: i64,
    pub properties: Option<PublishMessageProperties>,
}

impl BaseData for RetainedMessage {
    /// A topic holds at most one retained message, so the topic is the id.
    fn id(&self) -> &str {
        &self.topic
    }
}

/// Filter of the retained message page service.
///
/// Every present criterion must match: `topic_name` and `payload` as
/// substrings, `qos_list` as a set of accepted levels (empty accepts all),
/// the time bounds against `created_time`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetainedMessageQuery {
    pub page_link: TimePageLink,
    pub topic_name: Option<String>,
    pub qos_list: BTreeSet<u8>,
    pub payload: Option<String>,
}

impl RetainedMessageQuery {
    pub fn new(page_link: TimePageLink) -> Self {
        Self {
            page_link,
            topic_name: None,
            qos_list: BTreeSet::new(),
            payload: None,
        }
    }

    /// Lifts a table page link; plain links get unbounded time.
    pub fn from_page_link(page_link: &EntityPageLink) -> Self {
        let page_link = match page_link {
            EntityPageLink::Time(link) => link.clone(),
            EntityPageLink::Page(link) => TimePageLink {
                page_link: link.clone(),
                start_time: None,
                end_time: None,
            },
        };
        Self::new(page_link)
    }

    pub fn topic_name(mut self, topic_name: impl Into<String>) -> Self {
        self.topic_name = Some(topic_name.into());
        self
    }

    pub fn qos_list(mut self, qos_list: impl IntoIterator<Item = u8>) -> Self {
        self.qos_list = qos_list.into_iter().collect();
        self
    }

    pub fn payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    pub fn matches(&self, message: &RetainedMessage) -> bool {
        let topic_ok = self
            .topic_name
            .as_deref()
            .map_or(true, |t| message.topic.contains(t));
        let qos_ok = self.qos_list.is_empty() || self.qos_list.contains(&message.qos);
        let payload_ok = self
            .payload
            .as_deref()
            .map_or(true, |p| message.payload.contains(p));
        let start_ok = self
            .page_link
            .start_time
            .map_or(true, |s| message.created_time >= s);
        let end_ok = self
            .page_link
            .end_time
            .map_or(true, |e| message.created_time <= e);
        topic_ok && qos_ok && payload_ok && start_ok && end_ok
    }
}

fn compare_retained(a: &RetainedMessage, b: &RetainedMessage, property: &str) -> Ordering {
    match property {
        "topic" => a.topic.cmp(&b.topic),
        "qos" => a.qos.cmp(&b.qos),
        "payload" => a.payload.cmp(&b.payload),
        _ => a.created_time.cmp(&b.created_time),
    }
}

#[derive(Debug, Default)]
pub struct InMemoryRetainedMessages {
    messages: RwLock<BTreeMap<String, RetainedMessage>>,
}

impl InMemoryRetainedMessages {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a retained publish. An empty payload clears the topic.
    pub fn retain(&self, topic: impl Into<String>, payload: impl Into<String>, qos: u8) -> Option<RetainedMessage> {
        let topic = topic.into();
        let payload = payload.into();
        if payload.is_empty() {
            debug!(topic = %topic, "Empty retained payload clears topic");
            self.remove(&topic);
            return None;
        }
        let message = RetainedMessage {
            topic,
            payload,
            qos,
            created_time: Utc::now().timestamp_millis(),
            properties: None,
        };
        self.insert(message.clone());
        Some(message)
    }

    pub fn insert(&self, message: RetainedMessage) {
        write(&self.messages).insert(message.topic.clone(), message);
    }

    pub fn remove(&self, topic: &str) -> Option<RetainedMessage> {
        write(&self.messages).remove(topic)
    }

    pub fn get(&self, topic: &str) -> Option<RetainedMessage> {
        read(&self.messages).get(topic).cloned()
    }

    pub fn len(&self) -> usize {
        read(&self.messages).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Filters by `query`, then searches, sorts and pages with its page link.
    pub fn query(&self, query: &RetainedMessageQuery) -> PageData<RetainedMessage> {
        let items: Vec<RetainedMessage> = read(&self.messages)
            .values()
            .filter(|m| query.matches(m))
            .cloned()
            .collect();
        query
            .page_link
            .page_link
            .page_data(items, |m: &RetainedMessage| m.topic.clone(), compare_retained)
    }
}

#[async_trait]
impl EntityRepository<RetainedMessage> for InMemoryRetainedMessages {
    async fn fetch_entities(&self, page_link: &EntityPageLink) -> Result<PageData<RetainedMessage>, RepositoryError> {
        Ok(self.query(&RetainedMessageQuery::from_page_link(page_link)))
    }

    async fn delete_entity(&self, id: &str) -> Result<(), RepositoryError> {
        match self.remove(id) {
            Some(_) => {
                info!(topic = id, "Retained message deleted");
                Ok(())
            }
            None => Err(RepositoryError::NotFound(id.to_string())),
        }
    }

    async fn load_entity(&self, id: &str) -> Result<RetainedMessage, RepositoryError> {
        self.get(id)
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))
    }
}
