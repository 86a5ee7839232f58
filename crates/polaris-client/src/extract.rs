//! Best-effort recovery of a JSON value from model output.
//!
//! Models asked for JSON still wrap it in prose or markdown fences
//! often enough that direct parsing is not sufficient. Recovery is
//! all-or-nothing per call: either one of the strategies yields a
//! parseable value or the whole call fails.

use crate::error::ClientError;

/// Extract a JSON value from a possibly-wrapped model response.
///
/// Strategies in order, first success wins:
/// 1. Parse the trimmed text directly.
/// 2. Parse the contents of a fenced code block (```json or bare ```).
/// 3. Parse the substring between the first `{` and the last `}`.
///
/// # Errors
///
/// Returns [`ClientError::MalformedResponse`] when every strategy fails.
pub fn extract_json(text: &str) -> Result<serde_json::Value, ClientError> {
    let trimmed = text.trim();

    if let Ok(value) = serde_json::from_str(trimmed) {
        return Ok(value);
    }

    if let Some(inner) = fenced_block(trimmed)
        && let Ok(value) = serde_json::from_str(inner)
    {
        return Ok(value);
    }

    if let Some(span) = brace_span(trimmed)
        && let Ok(value) = serde_json::from_str(span)
    {
        return Ok(value);
    }

    Err(ClientError::MalformedResponse(preview(trimmed)))
}

/// The contents of the first fenced code block, if any.
fn fenced_block(text: &str) -> Option<&str> {
    let start = text
        .find("```json")
        .map(|i| i.saturating_add(7))
        .or_else(|| text.find("```").map(|i| i.saturating_add(3)))?;
    let rest = text.get(start..)?;
    let end = rest.find("```")?;
    rest.get(..end).map(str::trim)
}

/// The widest `{...}` span in the text, if any.
fn brace_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end > start {
        text.get(start..=end)
    } else {
        None
    }
}

/// Short prefix of the unparseable text for the error message.
fn preview(text: &str) -> String {
    const MAX: usize = 120;
    if text.len() <= MAX {
        return text.to_owned();
    }
    let mut end = MAX;
    while end > 0 && !text.is_char_boundary(end) {
        end = end.saturating_sub(1);
    }
    let mut out = text.get(..end).unwrap_or_default().to_owned();
    out.push_str("...");
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn bare_object_parses() {
        let value = extract_json(r#"{"title": "Report", "score": 7}"#).unwrap();
        assert_eq!(value.get("score").and_then(serde_json::Value::as_i64), Some(7));
    }

    #[test]
    fn fenced_json_block_parses() {
        let text = "Here is the result:\n```json\n{\"title\": \"Report\"}\n```\n";
        let value = extract_json(text).unwrap();
        assert_eq!(
            value.get("title").and_then(serde_json::Value::as_str),
            Some("Report")
        );
    }

    #[test]
    fn unlabeled_fence_parses() {
        let text = "```\n{\"ok\": true}\n```";
        let value = extract_json(text).unwrap();
        assert_eq!(value.get("ok").and_then(serde_json::Value::as_bool), Some(true));
    }

    #[test]
    fn object_embedded_in_prose_parses() {
        let text = "Here is the result: {\"title\": \"Report\"} Thanks!";
        let value = extract_json(text).unwrap();
        assert_eq!(
            value.get("title").and_then(serde_json::Value::as_str),
            Some("Report")
        );
    }

    #[test]
    fn text_without_braces_fails() {
        let result = extract_json("I could not produce the requested data.");
        assert!(matches!(result, Err(ClientError::MalformedResponse(_))));
    }

    #[test]
    fn nested_braces_use_widest_span() {
        let text = "prefix {\"outer\": {\"inner\": 1}} suffix";
        let value = extract_json(text).unwrap();
        assert!(value.get("outer").is_some());
    }

    #[test]
    fn error_preview_is_truncated() {
        let long = "x".repeat(500);
        match extract_json(&long) {
            Err(ClientError::MalformedResponse(msg)) => assert!(msg.len() < 200),
            other => panic!("expected MalformedResponse, got {other:?}"),
        }
    }
}
