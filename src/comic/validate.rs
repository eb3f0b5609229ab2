use serde_json::Value;

use crate::error::{ComicError, ComicResult};

pub const NO_SCRIPT: &str = "No script provided";
pub const INVALID_PAGE: &str = "Invalid page structure";

/// Checks the page → row → panel shape of a script.
///
/// Accepts one page record or a list of them. Stops at the first violation and
/// returns its reason; later problems are not reported.
pub fn validate_script(script: &Value) -> Result<(), String> {
    if is_empty_script(script) {
        return Err(NO_SCRIPT.to_string());
    }

    match script {
        Value::Array(pages) => {
            for (index, page) in pages.iter().enumerate() {
                validate_page(page, index + 1)?;
            }
            Ok(())
        }
        page => validate_page(page, 1),
    }
}

/// `validate_script` mapped into the pipeline error type.
pub fn ensure_valid(script: &Value) -> ComicResult<()> {
    validate_script(script).map_err(ComicError::Validation)
}

fn is_empty_script(script: &Value) -> bool {
    match script {
        Value::Null => true,
        Value::Bool(value) => !value,
        Value::Number(number) => number.as_f64() == Some(0.0),
        Value::String(text) => text.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

fn violation(page: usize, detail: &str) -> String {
    format!("{INVALID_PAGE} (page {page}: {detail})")
}

fn validate_page(page: &Value, page_no: usize) -> Result<(), String> {
    let Some(page_map) = page.as_object() else {
        return Err(violation(page_no, "page must be an object"));
    };
    let Some(rows) = page_map.get("rows").and_then(Value::as_array) else {
        return Err(violation(page_no, "rows must be a list"));
    };

    for (row_index, row) in rows.iter().enumerate() {
        let row_no = row_index + 1;
        let Some(row_map) = row.as_object() else {
            return Err(violation(page_no, &format!("row {row_no} must be an object")));
        };
        let Some(panels) = row_map.get("panels").and_then(Value::as_array) else {
            return Err(violation(
                page_no,
                &format!("row {row_no} panels must be a list"),
            ));
        };
        if let Some(panel_index) = panels.iter().position(|panel| !panel.is_object()) {
            return Err(violation(
                page_no,
                &format!("row {row_no} panel {} must be an object", panel_index + 1),
            ));
        }
    }

    Ok(())
}
