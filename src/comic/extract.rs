use serde_json::Value;

use crate::error::ComicResult;

const JSON_FENCE: &str = "```json";
const FENCE: &str = "```";

/// Pulls the JSON payload out of free-form model text.
///
/// Looks for the first fence tagged `json`, then for any fence, and otherwise
/// takes the whole text. Only the first fenced block is considered.
pub fn extract_json(raw_text: &str) -> &str {
    let block = if let Some(start) = raw_text.find(JSON_FENCE) {
        fenced_body(&raw_text[start + JSON_FENCE.len()..])
    } else if let Some(start) = raw_text.find(FENCE) {
        fenced_body(&raw_text[start + FENCE.len()..])
    } else {
        raw_text
    };
    block.trim()
}

fn fenced_body(after_open: &str) -> &str {
    match after_open.find(FENCE) {
        Some(end) => &after_open[..end],
        None => after_open,
    }
}

/// Extracts and parses; parser errors surface as `MalformedResponse`.
pub fn parse_json_response(raw_text: &str) -> ComicResult<Value> {
    Ok(serde_json::from_str(extract_json(raw_text))?)
}
