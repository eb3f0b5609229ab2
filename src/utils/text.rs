use serde_json::Value;

pub fn truncate_for_log(value: &str, limit: usize) -> String {
    if value.chars().count() <= limit {
        return value.to_string();
    }
    let truncated: String = value.chars().take(limit).collect();
    format!("{truncated}... (truncated)")
}

/// Keeps at most `max_chars` characters, appending `...` when cut.
pub fn preview_chars(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    let truncated: String = value.chars().take(max_chars).collect();
    format!("{truncated}...")
}

/// Returns the provider's own error message when the body carries one, plus a
/// bounded summary of the whole body for logs.
pub fn summarize_error_body(body: &str) -> (Option<String>, String) {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return (None, "empty response body".to_string());
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        let message = value
            .pointer("/error/message")
            .and_then(|v| v.as_str())
            .map(|v| v.to_string())
            .or_else(|| {
                value
                    .get("message")
                    .and_then(|v| v.as_str())
                    .map(|v| v.to_string())
            });
        return (message, truncate_for_log(&value.to_string(), 2000));
    }

    (None, truncate_for_log(trimmed, 2000))
}

/// Treats blank strings as absent.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_counts_characters_not_bytes() {
        let text = "漫".repeat(120);
        let preview = preview_chars(&text, 100);
        assert_eq!(preview.chars().count(), 103);
        assert!(preview.ends_with("..."));
        assert_eq!(preview_chars("short", 100), "short");
    }

    #[test]
    fn error_body_prefers_nested_message() {
        let (message, summary) =
            summarize_error_body(r#"{"error":{"message":"API key not valid","code":400}}"#);
        assert_eq!(message.as_deref(), Some("API key not valid"));
        assert!(summary.contains("\"code\":400"));

        let (message, summary) = summarize_error_body("   ");
        assert_eq!(message, None);
        assert_eq!(summary, "empty response body");
    }

    #[test]
    fn blank_values_are_dropped() {
        assert_eq!(non_blank(Some("  ".to_string())), None);
        assert_eq!(non_blank(Some(" sk-1 ".to_string())).as_deref(), Some("sk-1"));
        assert_eq!(non_blank(None), None);
    }
}
