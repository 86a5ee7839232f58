//! Asynchronous batch-job protocol for bulk completions.
//!
//! The vendor's batch API trades latency for quota: upload a JSON Lines
//! file of requests, create a job referencing it, poll until the job
//! reaches a terminal status, then download the output file. Polaris
//! uses it for bulk DNA generation only.
//!
//! A malformed individual output line is dropped rather than failing the
//! whole batch; a terminal status other than `completed` fails it.

use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::LlmConfig;
use crate::error::{ClientError, translate_vendor_error};

/// Fixed delay between status polls.
pub const POLL_INTERVAL: Duration = Duration::from_secs(3);

/// The completion endpoint batch requests are replayed against.
pub const BATCH_ENDPOINT: &str = "/v4/chat/completions";

/// Statuses after which a batch job will never change again.
const TERMINAL_STATUSES: [&str; 4] = ["completed", "failed", "cancelled", "expired"];

/// Whether a batch status is terminal.
pub(crate) fn is_terminal(status: &str) -> bool {
    TERMINAL_STATUSES.contains(&status)
}

/// Build one request line of a batch input file.
///
/// `custom_id` is the caller's correlation key; it comes back verbatim
/// on the matching output line.
pub fn request_line(custom_id: &str, model: &str, system: &str, user: &str) -> serde_json::Value {
    serde_json::json!({
        "custom_id": custom_id,
        "method": "POST",
        "url": BATCH_ENDPOINT,
        "body": {
            "model": model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user}
            ],
            "temperature": 0.1
        }
    })
}

/// One successfully parsed line of a batch output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchLine {
    /// The correlation key from the matching request line.
    pub custom_id: String,
    /// The completion text (`response.body.choices[0].message.content`).
    pub content: String,
}

/// Response carrying a freshly created resource id (file or batch).
#[derive(Debug, Deserialize)]
struct CreatedResource {
    id: String,
}

/// `GET {base}/batches/{id}` response.
#[derive(Debug, Deserialize)]
struct BatchResource {
    #[serde(default)]
    status: String,
    #[serde(default)]
    request_counts: RequestCounts,
    #[serde(default)]
    output_file_id: Option<String>,
}

/// Progress counters reported by the batch resource.
#[derive(Debug, Default, Deserialize)]
struct RequestCounts {
    #[serde(default)]
    completed: u64,
    #[serde(default)]
    total: u64,
}

/// HTTP client for the vendor's batch-job resources.
pub struct BatchClient {
    http: reqwest::Client,
    config: LlmConfig,
}

impl BatchClient {
    /// Create a new batch client.
    pub fn new(config: LlmConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Upload a JSON Lines payload as a batch input file.
    ///
    /// Returns the file id.
    pub async fn upload_jsonl(&self, payload: String) -> Result<String, ClientError> {
        let url = format!("{}/files", self.config.base_url);

        let part = reqwest::multipart::Part::bytes(payload.into_bytes())
            .file_name("batch.jsonl")
            .mime_str("application/jsonl")
            .map_err(|e| ClientError::Transport(format!("invalid upload part: {e}")))?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("purpose", "batch");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ClientError::Transport(format!("file upload failed: {e}")))?;
        let response = check_status(response).await?;

        let file: CreatedResource = response
            .json()
            .await
            .map_err(|e| ClientError::Transport(format!("file upload response read failed: {e}")))?;
        debug!(file_id = file.id, "batch input file uploaded");
        Ok(file.id)
    }

    /// Create a batch job over an uploaded input file.
    ///
    /// Returns the batch id.
    pub async fn create_batch(
        &self,
        input_file_id: &str,
        description: &str,
    ) -> Result<String, ClientError> {
        let url = format!("{}/batches", self.config.base_url);
        let body = serde_json::json!({
            "input_file_id": input_file_id,
            "endpoint": BATCH_ENDPOINT,
            "auto_delete_input_file": true,
            "metadata": {"description": description},
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ClientError::Transport(format!("batch creation failed: {e}")))?;
        let response = check_status(response).await?;

        let batch: CreatedResource = response
            .json()
            .await
            .map_err(|e| ClientError::Transport(format!("batch creation response read failed: {e}")))?;
        debug!(batch_id = batch.id, "batch job created");
        Ok(batch.id)
    }

    /// Poll the batch resource until it reaches a terminal status.
    ///
    /// `on_status` receives a progress line on every poll. Returns the
    /// output file id once the job completes.
    ///
    /// # Errors
    ///
    /// [`ClientError::Batch`] for any terminal status other than
    /// `completed`, or when a completed job carries no output file.
    pub async fn wait_for_completion(
        &self,
        batch_id: &str,
        mut on_status: impl FnMut(&str),
    ) -> Result<String, ClientError> {
        let url = format!("{}/batches/{batch_id}", self.config.base_url);

        loop {
            tokio::time::sleep(POLL_INTERVAL).await;

            let response = self
                .http
                .get(&url)
                .bearer_auth(&self.config.api_key)
                .send()
                .await
                .map_err(|e| ClientError::Transport(format!("batch poll failed: {e}")))?;
            let response = check_status(response).await?;

            let batch: BatchResource = response
                .json()
                .await
                .map_err(|e| ClientError::Transport(format!("batch poll response read failed: {e}")))?;

            on_status(&format!(
                "batch {}: {}/{}",
                batch.status, batch.request_counts.completed, batch.request_counts.total
            ));

            if !is_terminal(&batch.status) {
                continue;
            }
            if batch.status != "completed" {
                return Err(ClientError::Batch(batch.status));
            }
            return batch.output_file_id.ok_or_else(|| {
                ClientError::Batch(String::from("completed without an output file"))
            });
        }
    }

    /// Download and parse the output file of a completed batch.
    ///
    /// Malformed lines are dropped with a warning; the surviving lines
    /// keep file order.
    pub async fn download_output(&self, output_file_id: &str) -> Result<Vec<BatchLine>, ClientError> {
        let url = format!("{}/files/{output_file_id}/content", self.config.base_url);

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map_err(|e| ClientError::Transport(format!("output download failed: {e}")))?;
        let response = check_status(response).await?;

        let text = response
            .text()
            .await
            .map_err(|e| ClientError::Transport(format!("output read failed: {e}")))?;

        Ok(text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| {
                let parsed = parse_output_line(line);
                if parsed.is_none() {
                    warn!(line_len = line.len(), "dropping malformed batch output line");
                }
                parsed
            })
            .collect())
    }
}

/// Translate a non-2xx response into a vendor error.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| String::from("unable to read error body"));
    Err(translate_vendor_error(status.as_u16(), &body))
}

/// Parse one output line: `{custom_id, response:{body:{choices:[...]}}}`.
pub(crate) fn parse_output_line(line: &str) -> Option<BatchLine> {
    let value: serde_json::Value = serde_json::from_str(line).ok()?;
    let custom_id = value
        .get("custom_id")
        .and_then(serde_json::Value::as_str)?
        .to_owned();
    let content = value
        .get("response")
        .and_then(|r| r.get("body"))
        .and_then(|b| b.get("choices"))
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(serde_json::Value::as_str)?
        .to_owned();
    Some(BatchLine { custom_id, content })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn request_line_shape() {
        let line = request_line("req-42", "glm-4-flash", "You are an analyst.", "Company: X");
        assert_eq!(line.get("custom_id"), Some(&serde_json::json!("req-42")));
        assert_eq!(line.get("url"), Some(&serde_json::json!(BATCH_ENDPOINT)));
        let messages = line
            .get("body")
            .and_then(|b| b.get("messages"))
            .and_then(serde_json::Value::as_array)
            .unwrap();
        assert_eq!(messages.len(), 2);
    }

    #[test]
    fn output_line_parses() {
        let line = r#"{"custom_id":"req-7","response":{"body":{"choices":[{"message":{"content":"{\"name\":\"X\"}"}}]}}}"#;
        let parsed = parse_output_line(line).unwrap();
        assert_eq!(parsed.custom_id, "req-7");
        assert!(parsed.content.contains("name"));
    }

    #[test]
    fn malformed_output_line_is_none() {
        assert!(parse_output_line("not json").is_none());
        assert!(parse_output_line(r#"{"custom_id":"req-7"}"#).is_none());
        assert!(parse_output_line(r#"{"response":{"body":{"choices":[]}}}"#).is_none());
    }

    #[test]
    fn terminal_status_detection() {
        for status in ["completed", "failed", "cancelled", "expired"] {
            assert!(is_terminal(status));
        }
        for status in ["validating", "in_progress", "finalizing"] {
            assert!(!is_terminal(status));
        }
    }
}
