//! Display helpers shared by feature columns: style maps, HTML snippets and
//! the sanitizer every content cell passes through before it is cached.

use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

/// CSS property → value. Ordered so equal styles compare and print equally.
pub type CellStyle = BTreeMap<String, String>;

/// Column width that means "size to content".
pub const AUTO_WIDTH: &str = "0px";

pub fn style<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> CellStyle {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Width constraints derived from a declared column width.
pub fn width_style(width: &str) -> CellStyle {
    let mut res = style([("width", width)]);
    if width != AUTO_WIDTH {
        res.insert("min-width".to_string(), width.to_string());
        res.insert("max-width".to_string(), width.to_string());
    }
    res
}

/// Overlays the width constraints on a column's own style.
pub fn merge_width_style(base: CellStyle, width: &str) -> CellStyle {
    let mut res = base;
    res.extend(width_style(width));
    res
}

/// HTML that has passed through [`sanitize_html`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SafeHtml(String);

impl SafeHtml {
    pub fn new(raw: &str) -> Self {
        Self(sanitize_html(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for SafeHtml {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

struct SanitizerPatterns {
    blocks: Regex,
    stray_tags: Regex,
    handlers: Regex,
    script_urls: Regex,
}

fn patterns() -> &'static SanitizerPatterns {
    static PATTERNS: OnceLock<SanitizerPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| SanitizerPatterns {
        blocks: Regex::new(r"(?is)<\s*(script|style)\b[^>]*>.*?<\s*/\s*(script|style)\s*>")
            .expect("static regex"),
        stray_tags: Regex::new(r"(?i)<\s*/?\s*(script|style)\b[^>]*>").expect("static regex"),
        handlers: Regex::new(r#"(?i)\s+on[a-z]+\s*=\s*("[^"]*"|'[^']*'|[^\s>]+)"#)
            .expect("static regex"),
        script_urls: Regex::new(r"(?i)javascript\s*:").expect("static regex"),
    })
}

/// Removes executable content from cell HTML while keeping markup and inline styles.
pub fn sanitize_html(raw: &str) -> String {
    let p = patterns();
    let res = p.blocks.replace_all(raw, "");
    let res = p.stray_tags.replace_all(&res, "");
    let res = p.handlers.replace_all(&res, "");
    p.script_urls.replace_all(&res, "").into_owned()
}

fn html_element(tag: &str, styles: &[(&str, &str)], content: &str, classes: &str) -> String {
    let style_string = styles
        .iter()
        .map(|(property, value)| format!("{property}: {value}"))
        .collect::<Vec<_>>()
        .join("; ");
    format!(r#"<{tag} class="{classes}" style="{style_string}">{content}</{tag}>"#)
}

const ICON_CLASSES: &str = "material-icons mat-icon";
const DEFAULT_ICON_COLOR: &str = "rgba(0,0,0,0.54)";
pub const DEFAULT_CHIP_BACKGROUND: &str = "rgba(111, 116, 242, 0.07)";

pub fn check_box_cell(value: bool) -> String {
    let icon = if value {
        "check_box"
    } else {
        "check_box_outline_blank"
    };
    html_element("mat-icon", &[], icon, ICON_CLASSES)
}

pub fn color_icon(icon: &str, icon_color: Option<&str>) -> String {
    html_element(
        "mat-icon",
        &[
            ("color", icon_color.unwrap_or(DEFAULT_ICON_COLOR)),
            ("height", "20px"),
            ("width", "20px"),
            ("font-size", "20px"),
        ],
        icon,
        ICON_CLASSES,
    )
}

pub fn cell_with_icon(
    value: &str,
    icon: &str,
    background_color: &str,
    icon_color: Option<&str>,
    value_color: Option<&str>,
) -> String {
    let inner = format!(
        r#"<span style="display: inline-flex; align-items: center; gap: 4px;"><span style="color: {};">{}</span>{}</span>"#,
        value_color.unwrap_or("inherit"),
        value,
        color_icon(icon, icon_color)
    );
    html_element(
        "section",
        &[
            ("background", background_color),
            ("border-radius", "16px"),
            ("padding", "4px 8px"),
            ("white-space", "nowrap"),
            ("width", "fit-content"),
        ],
        &inner,
        "",
    )
}

pub fn cell_with_background(value: &str, background_color: Option<&str>) -> String {
    html_element(
        "span",
        &[
            (
                "background",
                background_color.unwrap_or(DEFAULT_CHIP_BACKGROUND),
            ),
            ("border-radius", "16px"),
            ("padding", "4px 8px"),
        ],
        value,
        "",
    )
}

pub fn connected_state_cell(connection_state: &str, color: &str) -> String {
    let dot = html_element(
        "span",
        &[
            ("vertical-align", "bottom"),
            ("font-size", "32px"),
            ("color", color),
        ],
        "&#8226;",
        "",
    );
    let label = html_element(
        "span",
        &[
            ("color", color),
            ("background", "rgba(111, 116, 242, 0)"),
            ("border-radius", "16px"),
            ("padding", "4px 8px"),
        ],
        connection_state,
        "",
    );
    format!("{dot} {label}")
}

const ARROW_DOWN_PATH: &str = "M12 2a10 10 0 1 1 0 20a10 10 0 0 1 0-20zM12 17l5-5h-3V8h-4v4H7l5 5z";
const ARROW_UP_PATH: &str = "M12 22a10 10 0 1 1 0-20a10 10 0 0 1 0 20zM12 7l-5 5h3v4h4v-4h3l-5-5z";
pub const DEFAULT_ARROW_COLOR: &str = "rgba(0, 0, 0, 0.38)";

/// Down arrow for received messages, up arrow for published ones.
pub fn arrow_icon(message_received: bool, icon_color: Option<&str>) -> String {
    let path = if message_received {
        ARROW_DOWN_PATH
    } else {
        ARROW_UP_PATH
    };
    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="24" height="24" viewBox="0 0 24 24" fill="none"><path d="{path}" fill="{}"/></svg>"#,
        icon_color.unwrap_or(DEFAULT_ARROW_COLOR)
    )
}

const BYTE_UNITS: [&str; 9] = ["B", "KB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];

/// Human readable size in 1024 steps, trailing zeros dropped ("1.5 KB", "2 MB").
pub fn format_bytes(bytes: u64, decimals: usize) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }
    let k = 1024f64;
    let value = bytes as f64;
    let exponent = ((value.ln() / k.ln()).floor() as usize).min(BYTE_UNITS.len() - 1);
    let scaled = value / k.powi(exponent as i32);
    let formatted = format!("{scaled:.decimals$}");
    let trimmed = if formatted.contains('.') {
        formatted.trim_end_matches('0').trim_end_matches('.')
    } else {
        formatted.as_str()
    };
    format!("{trimmed} {}", BYTE_UNITS[exponent])
}
