//! Column variants of the entity grid.
//!
//! A column is one of four tagged variants, each carrying its own function
//! bundle. The grid dispatches on the variant with a `match`, so adding a
//! variant forces every render path to handle it.
//!
//! All functions are shared behind `Arc` and must stay referentially stable
//! for the lifetime of a column definition: the render cache is keyed by
//! position, not by content.

use super::actions::CellActionDescriptor;
use super::cells::{AUTO_WIDTH, CellStyle};
use super::{BaseData, entity_property};
use chrono::DateTime;
use std::sync::Arc;

pub type CellContentFn<T> = Arc<dyn Fn(&T, &str) -> String + Send + Sync>;
pub type CellTooltipFn<T> = Arc<dyn Fn(&T, &str) -> Option<String> + Send + Sync>;
pub type CellStyleFn<T> = Arc<dyn Fn(&T, &str) -> CellStyle + Send + Sync>;
pub type HeaderCellStyleFn = Arc<dyn Fn(&str) -> CellStyle + Send + Sync>;
pub type ChipActionFn<T> = Arc<dyn Fn(&T, &str) + Send + Sync>;
pub type ChipIconFn<T> = Arc<dyn Fn(&T, &str) -> Option<String> + Send + Sync>;

pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn property_content<T: BaseData>() -> CellContentFn<T> {
    Arc::new(|entity: &T, key: &str| entity_property(entity, key))
}

fn empty_style<T: BaseData>() -> CellStyleFn<T> {
    Arc::new(|_: &T, _: &str| CellStyle::new())
}

fn no_tooltip<T: BaseData>() -> CellTooltipFn<T> {
    Arc::new(|_: &T, _: &str| None)
}

/// Plain content column. Content is sanitized and cached per cell.
pub struct ContentColumn<T: BaseData> {
    pub key: String,
    pub title: String,
    pub width: String,
    pub sortable: bool,
    pub is_number_column: bool,
    pub content: CellContentFn<T>,
    pub style: CellStyleFn<T>,
    pub header_style: HeaderCellStyleFn,
    pub tooltip: CellTooltipFn<T>,
    /// Inline action rendered next to the content.
    pub action_cell: Option<CellActionDescriptor<T>>,
}

impl<T: BaseData> Clone for ContentColumn<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            title: self.title.clone(),
            width: self.width.clone(),
            sortable: self.sortable,
            is_number_column: self.is_number_column,
            content: self.content.clone(),
            style: self.style.clone(),
            header_style: self.header_style.clone(),
            tooltip: self.tooltip.clone(),
            action_cell: self.action_cell.clone(),
        }
    }
}

impl<T: BaseData> ContentColumn<T> {
    /// Sortable column showing the entity property named by `key`.
    pub fn new(key: impl Into<String>, title: impl Into<String>, width: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            title: title.into(),
            width: width.into(),
            sortable: true,
            is_number_column: false,
            content: property_content(),
            style: empty_style(),
            header_style: Arc::new(|_: &str| CellStyle::new()),
            tooltip: no_tooltip(),
            action_cell: None,
        }
    }

    pub fn content(mut self, f: impl Fn(&T, &str) -> String + Send + Sync + 'static) -> Self {
        self.content = Arc::new(f);
        self
    }

    pub fn style(mut self, f: impl Fn(&T, &str) -> CellStyle + Send + Sync + 'static) -> Self {
        self.style = Arc::new(f);
        self
    }

    pub fn header_style(mut self, f: impl Fn(&str) -> CellStyle + Send + Sync + 'static) -> Self {
        self.header_style = Arc::new(f);
        self
    }

    pub fn tooltip(
        mut self,
        f: impl Fn(&T, &str) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.tooltip = Arc::new(f);
        self
    }

    pub fn sortable(mut self, sortable: bool) -> Self {
        self.sortable = sortable;
        self
    }

    pub fn number(mut self) -> Self {
        self.is_number_column = true;
        self
    }

    pub fn action_cell(mut self, action: CellActionDescriptor<T>) -> Self {
        self.action_cell = Some(action);
        self
    }
}

/// Content column whose value is an epoch-millisecond timestamp.
///
/// Timestamps are formatted in UTC; `0` and missing values render empty.
pub struct DateColumn<T: BaseData> {
    pub column: ContentColumn<T>,
    pub date_format: String,
}

impl<T: BaseData> Clone for DateColumn<T> {
    fn clone(&self) -> Self {
        Self {
            column: self.column.clone(),
            date_format: self.date_format.clone(),
        }
    }
}

impl<T: BaseData> DateColumn<T> {
    pub fn new(key: impl Into<String>, title: impl Into<String>, width: impl Into<String>) -> Self {
        Self::with_format(key, title, width, DEFAULT_DATE_FORMAT)
    }

    pub fn with_format(
        key: impl Into<String>,
        title: impl Into<String>,
        width: impl Into<String>,
        date_format: &str,
    ) -> Self {
        let format = date_format.to_string();
        let column = ContentColumn::new(key, title, width).content(move |entity: &T, key: &str| {
            let value = serde_json::to_value(entity)
                .ok()
                .and_then(|v| v.get(key).and_then(serde_json::Value::as_i64));
            format_timestamp(value, &format)
        });
        Self {
            column,
            date_format: date_format.to_string(),
        }
    }

    pub fn style(mut self, f: impl Fn(&T, &str) -> CellStyle + Send + Sync + 'static) -> Self {
        self.column = self.column.style(f);
        self
    }
}

/// Formats an epoch-ms timestamp, returning empty text for `0`, missing or
/// out-of-range values.
pub fn format_timestamp(value: Option<i64>, format: &str) -> String {
    match value {
        None | Some(0) => String::new(),
        Some(ms) => DateTime::from_timestamp_millis(ms)
            .map(|dt| dt.format(format).to_string())
            .unwrap_or_default(),
    }
}

/// Column that only renders an action trigger. Never sortable.
pub struct ActionColumn<T: BaseData> {
    pub key: String,
    pub title: String,
    pub width: String,
    pub action: CellActionDescriptor<T>,
}

impl<T: BaseData> Clone for ActionColumn<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            title: self.title.clone(),
            width: self.width.clone(),
            action: self.action.clone(),
        }
    }
}

impl<T: BaseData> ActionColumn<T> {
    pub fn new(
        key: impl Into<String>,
        title: impl Into<String>,
        action: CellActionDescriptor<T>,
        width: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            title: title.into(),
            width: width.into(),
            action,
        }
    }
}

/// Multi-value column. The content function yields a comma separated list
/// and every chip gets its own action, icon, icon color and tooltip.
pub struct ChipsColumn<T: BaseData> {
    pub key: String,
    pub title: String,
    pub width: String,
    pub content: CellContentFn<T>,
    pub chip_action: ChipActionFn<T>,
    pub chip_icon: ChipIconFn<T>,
    pub chip_icon_color: CellStyleFn<T>,
    pub chip_tooltip: CellTooltipFn<T>,
}

impl<T: BaseData> Clone for ChipsColumn<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            title: self.title.clone(),
            width: self.width.clone(),
            content: self.content.clone(),
            chip_action: self.chip_action.clone(),
            chip_icon: self.chip_icon.clone(),
            chip_icon_color: self.chip_icon_color.clone(),
            chip_tooltip: self.chip_tooltip.clone(),
        }
    }
}

impl<T: BaseData> ChipsColumn<T> {
    pub fn new(key: impl Into<String>, title: impl Into<String>, width: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            title: title.into(),
            width: width.into(),
            content: property_content(),
            chip_action: Arc::new(|_: &T, _: &str| {}),
            chip_icon: Arc::new(|_: &T, _: &str| None),
            chip_icon_color: empty_style(),
            chip_tooltip: no_tooltip(),
        }
    }

    pub fn content(mut self, f: impl Fn(&T, &str) -> String + Send + Sync + 'static) -> Self {
        self.content = Arc::new(f);
        self
    }

    pub fn chip_action(mut self, f: impl Fn(&T, &str) + Send + Sync + 'static) -> Self {
        self.chip_action = Arc::new(f);
        self
    }

    pub fn chip_icon(
        mut self,
        f: impl Fn(&T, &str) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.chip_icon = Arc::new(f);
        self
    }

    pub fn chip_icon_color(
        mut self,
        f: impl Fn(&T, &str) -> CellStyle + Send + Sync + 'static,
    ) -> Self {
        self.chip_icon_color = Arc::new(f);
        self
    }

    pub fn chip_tooltip(
        mut self,
        f: impl Fn(&T, &str) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.chip_tooltip = Arc::new(f);
        self
    }

    /// Chip values of one cell. Empty content yields no chips.
    pub fn chips(&self, entity: &T) -> Vec<String> {
        let content = (self.content)(entity, &self.key);
        if content.is_empty() {
            return Vec::new();
        }
        content.split(',').map(str::to_string).collect()
    }
}

pub enum EntityColumn<T: BaseData> {
    Content(ContentColumn<T>),
    Date(DateColumn<T>),
    Action(ActionColumn<T>),
    Chips(ChipsColumn<T>),
}

impl<T: BaseData> Clone for EntityColumn<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Content(c) => Self::Content(c.clone()),
            Self::Date(c) => Self::Date(c.clone()),
            Self::Action(c) => Self::Action(c.clone()),
            Self::Chips(c) => Self::Chips(c.clone()),
        }
    }
}

impl<T: BaseData> EntityColumn<T> {
    pub fn key(&self) -> &str {
        match self {
            Self::Content(c) => &c.key,
            Self::Date(c) => &c.column.key,
            Self::Action(c) => &c.key,
            Self::Chips(c) => &c.key,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Self::Content(c) => &c.title,
            Self::Date(c) => &c.column.title,
            Self::Action(c) => &c.title,
            Self::Chips(c) => &c.title,
        }
    }

    pub fn width(&self) -> &str {
        match self {
            Self::Content(c) => &c.width,
            Self::Date(c) => &c.column.width,
            Self::Action(c) => &c.width,
            Self::Chips(c) => &c.width,
        }
    }

    pub fn sortable(&self) -> bool {
        match self {
            Self::Content(c) => c.sortable,
            Self::Date(c) => c.column.sortable,
            Self::Action(_) | Self::Chips(_) => false,
        }
    }

    /// The content bundle for variants rendered through the content cache.
    pub fn as_content(&self) -> Option<&ContentColumn<T>> {
        match self {
            Self::Content(c) => Some(c),
            Self::Date(c) => Some(&c.column),
            Self::Action(_) | Self::Chips(_) => None,
        }
    }

    pub fn is_auto_width(&self) -> bool {
        self.width() == AUTO_WIDTH
    }
}

impl<T: BaseData> From<ContentColumn<T>> for EntityColumn<T> {
    fn from(column: ContentColumn<T>) -> Self {
        Self::Content(column)
    }
}

impl<T: BaseData> From<DateColumn<T>> for EntityColumn<T> {
    fn from(column: DateColumn<T>) -> Self {
        Self::Date(column)
    }
}

impl<T: BaseData> From<ActionColumn<T>> for EntityColumn<T> {
    fn from(column: ActionColumn<T>) -> Self {
        Self::Action(column)
    }
}

impl<T: BaseData> From<ChipsColumn<T>> for EntityColumn<T> {
    fn from(column: ChipsColumn<T>) -> Self {
        Self::Chips(column)
    }
}
