pub mod catalog;
pub mod extract;
pub mod image_prompt;
pub mod optimizer;
pub mod script;
pub mod social;
pub mod title;
pub mod validate;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::ComicResult;

/// One comic page: a title and its ordered rows.
///
/// Fields the model adds beyond the known ones are kept in `extra` and
/// written back out unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    #[serde(default, deserialize_with = "lenient_title")]
    pub title: String,
    pub rows: Vec<Row>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A horizontal strip of panels.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub height: Option<String>,
    pub panels: Vec<Panel>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Panel {
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub text: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Scalars are read as their text form; null, lists and objects count as
/// absent.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => Some(text),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    })
}

fn lenient_title<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_text(deserializer).map(Option::unwrap_or_default)
}

impl Panel {
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

impl Page {
    /// Non-empty, trimmed panel texts in reading order.
    pub fn panel_texts(&self) -> Vec<&str> {
        self.rows
            .iter()
            .flat_map(|row| row.panels.iter())
            .map(|panel| panel.text().trim())
            .filter(|text| !text.is_empty())
            .collect()
    }

    pub fn first_panel_text(&self) -> Option<&str> {
        self.rows
            .first()
            .and_then(|row| row.panels.first())
            .map(Panel::text)
            .filter(|text| !text.is_empty())
    }
}

/// Ordered pages making up one generated story.
pub type ComicScript = Vec<Page>;

/// Validates a script value and converts it into typed pages.
///
/// A lone page record is accepted and treated as a one-page script.
pub fn pages_from_value(value: Value) -> ComicResult<ComicScript> {
    validate::ensure_valid(&value)?;
    let pages = match value {
        Value::Array(_) => serde_json::from_value::<Vec<Page>>(value)?,
        other => vec![serde_json::from_value::<Page>(other)?],
    };
    Ok(pages)
}

/// Lenient page reader for caller-supplied comic data: a list of pages, a
/// `{pages: [...]}` wrapper or one page. Entries that do not look like pages
/// are skipped.
pub fn pages_from_comic_data(comic_data: &Value) -> Vec<Page> {
    let entries: Vec<&Value> = match comic_data {
        Value::Array(items) => items.iter().collect(),
        Value::Object(map) => match map.get("pages") {
            Some(Value::Array(items)) => items.iter().collect(),
            _ => vec![comic_data],
        },
        _ => Vec::new(),
    };
    entries
        .into_iter()
        .filter_map(|entry| serde_json::from_value::<Page>(entry.clone()).ok())
        .collect()
}
