//! Error types and vendor error-code translation.
//!
//! Non-2xx responses from the GLM API carry a body of the form
//! `{"error": {"code": "...", "message": "..."}}`. Known codes map to
//! canned explanations so the dashboard never shows raw vendor text;
//! unknown codes fall back to a generic message carrying the code.

use serde::Deserialize;

/// Errors produced by the GLM client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Configuration is invalid or the API key is missing.
    ///
    /// Raised before any network attempt.
    #[error("configuration error: {0}")]
    Config(String),

    /// The vendor rejected the request; `message` is already translated.
    #[error("{message} (code {code})")]
    Vendor {
        /// Vendor error code (numeric, as a string) or the HTTP status.
        code: String,
        /// Human-readable translated explanation.
        message: String,
    },

    /// No JSON object could be recovered from the model response.
    #[error("could not parse the model's JSON response, please retry: {0}")]
    MalformedResponse(String),

    /// Network-level failure: no usable response at all.
    #[error("transport error: {0}")]
    Transport(String),

    /// A batch job reached a terminal status other than `completed`.
    #[error("batch job ended in status {0}")]
    Batch(String),
}

impl ClientError {
    /// Whether this error indicates vendor-side rate limiting.
    ///
    /// The retry wrapper treats rate-limit failures like any other
    /// failure; this exists for log annotation only.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::Vendor { code, .. } if code == "429" || code == "1303")
    }
}

/// Canned explanation for a known vendor error code.
fn vendor_message(code: &str) -> Option<&'static str> {
    match code {
        "400" => Some("invalid request parameters, check the request body"),
        "429" => Some("concurrency quota exceeded or account limit reached"),
        "500" => Some("the AI service failed while processing the request"),
        "1000" => Some("authentication failed, check the configured API key"),
        "1113" => Some("account balance exhausted, top up and retry"),
        "1211" => Some("model does not exist, check the model identifier"),
        "1301" => Some("input was flagged by the provider's content safety system"),
        "1303" => Some("request rate too high for this API, reduce the call frequency"),
        "1304" => Some("daily call quota for this API has been reached"),
        _ => None,
    }
}

/// Vendor error body shape: `{"error": {"code": ..., "message": ...}}`.
#[derive(Debug, Default, Deserialize)]
struct VendorErrorBody {
    #[serde(default)]
    error: VendorErrorDetail,
}

#[derive(Debug, Default, Deserialize)]
struct VendorErrorDetail {
    #[serde(default)]
    code: Option<serde_json::Value>,
    #[serde(default)]
    message: Option<String>,
}

/// Translate a non-2xx response into a [`ClientError::Vendor`].
///
/// `status` is the HTTP status code, `body` the raw response text. The
/// vendor code (not the HTTP status) selects the canned message; when
/// the body is unparseable or carries no code, the HTTP status stands in.
pub(crate) fn translate_vendor_error(status: u16, body: &str) -> ClientError {
    let parsed: VendorErrorBody = serde_json::from_str(body).unwrap_or_default();

    // Codes arrive as either JSON strings or numbers.
    let code = match parsed.error.code {
        Some(serde_json::Value::String(s)) => s,
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => status.to_string(),
    };

    let message = vendor_message(&code).map_or_else(
        || {
            let raw = parsed
                .error
                .message
                .unwrap_or_else(|| String::from("no error detail"));
            format!("AI service error: {raw}")
        },
        ToOwned::to_owned,
    );

    ClientError::Vendor { code, message }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn known_code_uses_canned_message_not_vendor_text() {
        // HTTP 401 with vendor code 1000: the canned auth message wins
        // over the raw vendor message.
        let err = translate_vendor_error(401, r#"{"error":{"code":"1000","message":"x"}}"#);
        match err {
            ClientError::Vendor { code, message } => {
                assert_eq!(code, "1000");
                assert!(message.contains("authentication failed"));
                assert!(!message.contains('x'));
            }
            other => panic!("expected Vendor, got {other:?}"),
        }
    }

    #[test]
    fn numeric_code_is_accepted() {
        let err = translate_vendor_error(429, r#"{"error":{"code":1303,"message":"slow down"}}"#);
        match err {
            ClientError::Vendor { code, message } => {
                assert_eq!(code, "1303");
                assert!(message.contains("request rate too high"));
            }
            other => panic!("expected Vendor, got {other:?}"),
        }
    }

    #[test]
    fn unknown_code_falls_back_to_generic() {
        let err = translate_vendor_error(502, r#"{"error":{"code":"9999","message":"boom"}}"#);
        match err {
            ClientError::Vendor { code, message } => {
                assert_eq!(code, "9999");
                assert!(message.contains("AI service error: boom"));
            }
            other => panic!("expected Vendor, got {other:?}"),
        }
    }

    #[test]
    fn unparseable_body_uses_http_status() {
        let err = translate_vendor_error(503, "<html>gateway timeout</html>");
        match err {
            ClientError::Vendor { code, .. } => assert_eq!(code, "503"),
            other => panic!("expected Vendor, got {other:?}"),
        }
    }

    #[test]
    fn rate_limit_classification() {
        let limited = translate_vendor_error(429, r#"{"error":{"code":"429"}}"#);
        assert!(limited.is_rate_limited());

        let auth = translate_vendor_error(401, r#"{"error":{"code":"1000"}}"#);
        assert!(!auth.is_rate_limited());
    }
}
