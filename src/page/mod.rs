//! # Page Links
//!
//! Serializable descriptions of "which page, what sort, what search, what time
//! window" for a fetch request, plus the page of results that comes back.
//!
//! ```text
//! EntitiesTable ──► EntityPageLink ──► to_query() ──► REST collaborator
//!                        │                                   │
//!                  (Page | Time)                        PageData<T>
//! ```
//!
//! Query key names (`page`, `pageSize`, `sortProperty`, `sortOrder`,
//! `textSearch`, `startTime`, `endTime`) are shared with the broker's REST
//! API and must not change.

pub mod timewindow;

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::str::FromStr;

pub use timewindow::{
    calculate_interval_start_end_time, history_interval, time_page_link_interval,
    FixedTimewindow, HistoryWindow, HistoryWindowType, QuickTimeInterval, TimeInterval,
    Timewindow, DAY, HOUR, MINUTE, SECOND,
};

/// Page size that tells the fetch function to return every matching row at once.
pub const MAX_SAFE_PAGE_SIZE: u32 = 2_147_483_647;

/// Sort direction as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = PageLinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ASC" => Ok(Direction::Asc),
            "DESC" => Ok(Direction::Desc),
            other => Err(PageLinkError::InvalidValue {
                key: "sortOrder",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortOrder {
    pub property: String,
    pub direction: Direction,
}

impl SortOrder {
    pub fn new(property: impl Into<String>, direction: Direction) -> Self {
        Self {
            property: property.into(),
            direction,
        }
    }
}

/// Errors produced while parsing a page link query string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PageLinkError {
    #[error("Missing query parameter: {0}")]
    MissingKey(&'static str),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// Page index, page size, free-text search and sort order of one fetch.
///
/// Two links with equal fields serialize to equal query strings, so a link can
/// be used directly as a dedup key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageLink {
    pub page_size: u32,
    pub page: u32,
    pub text_search: Option<String>,
    pub sort_order: Option<SortOrder>,
}

impl Default for PageLink {
    fn default() -> Self {
        Self::new(10, 0, None, None)
    }
}

impl PageLink {
    pub fn new(
        page_size: u32,
        page: u32,
        text_search: Option<String>,
        sort_order: Option<SortOrder>,
    ) -> Self {
        Self {
            page_size: page_size.max(1),
            page,
            text_search,
            sort_order,
        }
    }

    /// True when the link requests everything in a single page.
    pub fn is_unpaginated(&self) -> bool {
        self.page_size == MAX_SAFE_PAGE_SIZE
    }

    pub fn next_page_link(&self) -> PageLink {
        PageLink {
            page: self.page.saturating_add(1),
            ..self.clone()
        }
    }

    /// Canonical query string, always starting with `?`.
    pub fn to_query(&self) -> String {
        let mut query = format!("?pageSize={}&page={}", self.page_size, self.page);
        if let Some(text) = self.text_search.as_deref().filter(|t| !t.is_empty()) {
            query.push_str("&textSearch=");
            query.push_str(&urlencoding::encode(text));
        }
        if let Some(sort) = &self.sort_order {
            query.push_str("&sortProperty=");
            query.push_str(&urlencoding::encode(&sort.property));
            query.push_str("&sortOrder=");
            query.push_str(sort.direction.as_str());
        }
        query
    }

    /// Parses a query produced by [`PageLink::to_query`]. Unknown keys are ignored.
    pub fn from_query(query: &str) -> Result<PageLink, PageLinkError> {
        let params = QueryParams::parse(query)?;
        let page_size = params.required_number("pageSize")?;
        let page = params.required_number("page")?;
        let text_search = params.get("textSearch").filter(|t| !t.is_empty());
        let sort_order = match (params.get("sortProperty"), params.get("sortOrder")) {
            (Some(property), Some(direction)) => {
                Some(SortOrder::new(property, direction.parse::<Direction>()?))
            }
            (None, None) => None,
            (Some(_), None) => return Err(PageLinkError::MissingKey("sortOrder")),
            (None, Some(_)) => return Err(PageLinkError::MissingKey("sortProperty")),
        };
        Ok(PageLink::new(page_size, page, text_search, sort_order))
    }

    /// Pages an in-memory collection the way the broker's page services do.
    ///
    /// Items are kept when their search text contains `text_search`
    /// (case-insensitive), ordered with `compare` on the sort property, then
    /// sliced to the requested page.
    pub fn page_data<T, S, C>(&self, items: Vec<T>, search_text: S, compare: C) -> PageData<T>
    where
        S: Fn(&T) -> String,
        C: Fn(&T, &T, &str) -> Ordering,
    {
        let needle = self
            .text_search
            .as_deref()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty());

        let mut filtered: Vec<T> = match needle {
            Some(needle) => items
                .into_iter()
                .filter(|item| search_text(item).to_lowercase().contains(&needle))
                .collect(),
            None => items,
        };

        if let Some(sort) = &self.sort_order {
            filtered.sort_by(|a, b| {
                let ordering = compare(a, b, &sort.property);
                match sort.direction {
                    Direction::Asc => ordering,
                    Direction::Desc => ordering.reverse(),
                }
            });
        }

        let total_elements = filtered.len() as u64;
        let page_size = u64::from(self.page_size.max(1));
        let start = u64::from(self.page).saturating_mul(page_size);
        let total_pages = total_elements.div_ceil(page_size);
        let has_next = total_elements > start.saturating_add(page_size);

        let data = filtered
            .into_iter()
            .skip(usize::try_from(start).unwrap_or(usize::MAX))
            .take(usize::try_from(page_size).unwrap_or(usize::MAX))
            .collect();

        PageData {
            data,
            total_pages,
            total_elements,
            has_next,
        }
    }
}

/// [`PageLink`] bounded by an optional `[start_time, end_time]` window in epoch ms.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimePageLink {
    #[serde(flatten)]
    pub page_link: PageLink,
    pub start_time: Option<i64>,
    pub end_time: Option<i64>,
}

impl TimePageLink {
    pub fn new(
        page_size: u32,
        page: u32,
        text_search: Option<String>,
        sort_order: Option<SortOrder>,
        start_time: Option<i64>,
        end_time: Option<i64>,
    ) -> Self {
        Self {
            page_link: PageLink::new(page_size, page, text_search, sort_order),
            start_time,
            end_time,
        }
    }

    pub fn next_page_link(&self) -> TimePageLink {
        TimePageLink {
            page_link: self.page_link.next_page_link(),
            ..self.clone()
        }
    }

    pub fn to_query(&self) -> String {
        let mut query = self.page_link.to_query();
        if let Some(start) = self.start_time {
            query.push_str(&format!("&startTime={start}"));
        }
        if let Some(end) = self.end_time {
            query.push_str(&format!("&endTime={end}"));
        }
        query
    }

    pub fn from_query(query: &str) -> Result<TimePageLink, PageLinkError> {
        let page_link = PageLink::from_query(query)?;
        let params = QueryParams::parse(query)?;
        Ok(TimePageLink {
            page_link,
            start_time: params.optional_number("startTime")?,
            end_time: params.optional_number("endTime")?,
        })
    }
}

impl Deref for TimePageLink {
    type Target = PageLink;

    fn deref(&self) -> &Self::Target {
        &self.page_link
    }
}

impl DerefMut for TimePageLink {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.page_link
    }
}

/// The link a table hands to its data source: plain or time-scoped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum EntityPageLink {
    Time(TimePageLink),
    Page(PageLink),
}

impl EntityPageLink {
    pub fn to_query(&self) -> String {
        match self {
            EntityPageLink::Page(link) => link.to_query(),
            EntityPageLink::Time(link) => link.to_query(),
        }
    }

    pub fn next_page_link(&self) -> EntityPageLink {
        match self {
            EntityPageLink::Page(link) => EntityPageLink::Page(link.next_page_link()),
            EntityPageLink::Time(link) => EntityPageLink::Time(link.next_page_link()),
        }
    }

    pub fn as_time(&self) -> Option<&TimePageLink> {
        match self {
            EntityPageLink::Time(link) => Some(link),
            EntityPageLink::Page(_) => None,
        }
    }

    /// Applies a time interval; a no-op for plain links.
    pub fn set_interval(&mut self, interval: TimeInterval) {
        if let EntityPageLink::Time(link) = self {
            link.start_time = interval.start_time;
            link.end_time = interval.end_time;
        }
    }
}

impl Deref for EntityPageLink {
    type Target = PageLink;

    fn deref(&self) -> &Self::Target {
        match self {
            EntityPageLink::Page(link) => link,
            EntityPageLink::Time(link) => &link.page_link,
        }
    }
}

impl DerefMut for EntityPageLink {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match self {
            EntityPageLink::Page(link) => link,
            EntityPageLink::Time(link) => &mut link.page_link,
        }
    }
}

impl From<PageLink> for EntityPageLink {
    fn from(link: PageLink) -> Self {
        EntityPageLink::Page(link)
    }
}

impl From<TimePageLink> for EntityPageLink {
    fn from(link: TimePageLink) -> Self {
        EntityPageLink::Time(link)
    }
}

/// One page of results as returned by a fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageData<T> {
    pub data: Vec<T>,
    pub total_pages: u64,
    pub total_elements: u64,
    pub has_next: bool,
}

impl<T> PageData<T> {
    pub fn empty() -> Self {
        Self {
            data: Vec::new(),
            total_pages: 0,
            total_elements: 0,
            has_next: false,
        }
    }
}

impl<T> Default for PageData<T> {
    fn default() -> Self {
        Self::empty()
    }
}

struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    fn parse(query: &str) -> Result<Self, PageLinkError> {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut params = Vec::new();
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let value = urlencoding::decode(value).map_err(|_| PageLinkError::InvalidValue {
                key: "query",
                value: value.to_string(),
            })?;
            params.push((key.to_string(), value.into_owned()));
        }
        Ok(Self(params))
    }

    fn get(&self, key: &str) -> Option<String> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    fn required_number<N: FromStr>(&self, key: &'static str) -> Result<N, PageLinkError> {
        let raw = self.get(key).ok_or(PageLinkError::MissingKey(key))?;
        raw.parse()
            .map_err(|_| PageLinkError::InvalidValue { key, value: raw })
    }

    fn optional_number<N: FromStr>(&self, key: &'static str) -> Result<Option<N>, PageLinkError> {
        match self.get(key) {
            Some(_) => self.required_number(key).map(Some),
            None => Ok(None),
        }
    }
}
