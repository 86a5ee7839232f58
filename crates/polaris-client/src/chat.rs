//! Chat-completion transport for the GLM API.
//!
//! One client covers both call shapes: buffered (single response body)
//! and streaming (server-sent events). In streaming mode the per-token
//! callback always receives the accumulated text so far, never the bare
//! delta, so consumers can render "current best full text" without
//! keeping their own accumulator.
//!
//! The client holds no state between calls; every request carries a
//! fresh `request_id`.

use futures::StreamExt;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::config::LlmConfig;
use crate::error::{ClientError, translate_vendor_error};

// ---------------------------------------------------------------------------
// Messages and options
// ---------------------------------------------------------------------------

/// Chat message role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instruction frame for the model.
    System,
    /// Caller-supplied content.
    User,
    /// Prior model output (unused by Polaris but part of the wire shape).
    Assistant,
}

/// One role-tagged message in a chat request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    /// Message role.
    pub role: Role,
    /// Message content.
    pub content: String,
}

impl ChatMessage {
    /// A system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// A user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Per-call behavior flags.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChatOptions {
    /// Constrain output to a JSON object and lower the temperature.
    pub json_mode: bool,
    /// Enable the vendor's web-search tool.
    pub web_search: bool,
}

impl ChatOptions {
    /// JSON-constrained output.
    pub const fn json() -> Self {
        Self {
            json_mode: true,
            web_search: false,
        }
    }

    /// JSON-constrained output with web search enabled.
    pub const fn json_with_search() -> Self {
        Self {
            json_mode: true,
            web_search: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// HTTP client for `POST {base}/chat/completions`.
pub struct ChatClient {
    http: reqwest::Client,
    config: LlmConfig,
}

impl ChatClient {
    /// Create a new chat client.
    pub fn new(config: LlmConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// The configuration this client was built with.
    pub const fn config(&self) -> &LlmConfig {
        &self.config
    }

    /// Issue one buffered request and return the completion text.
    ///
    /// # Errors
    ///
    /// [`ClientError::Vendor`] for non-2xx responses (translated),
    /// [`ClientError::Transport`] for network failures,
    /// [`ClientError::MalformedResponse`] when the body has no content.
    pub async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: ChatOptions,
    ) -> Result<String, ClientError> {
        let payload = self.build_payload(model, messages, options, false);
        let response = self.send(&payload).await?;
        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ClientError::Transport(format!("chat response read failed: {e}")))?;
        message_content(&json)
    }

    /// Issue one streaming request, invoking `on_token` with the running
    /// accumulated text after every received delta.
    ///
    /// Returns the final accumulated text (identical to the last
    /// callback argument).
    ///
    /// # Errors
    ///
    /// Same failure modes as [`ChatClient::complete`]; a mid-stream read
    /// failure surfaces as [`ClientError::Transport`].
    pub async fn complete_streaming(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: ChatOptions,
        mut on_token: impl FnMut(&str),
    ) -> Result<String, ClientError> {
        let payload = self.build_payload(model, messages, options, true);
        let response = self.send(&payload).await?;

        let mut decoder = SseDecoder::new();
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk =
                chunk.map_err(|e| ClientError::Transport(format!("stream read failed: {e}")))?;
            decoder.push(&String::from_utf8_lossy(&chunk), &mut on_token);
        }
        Ok(decoder.finish(&mut on_token))
    }

    /// Assemble the request payload.
    fn build_payload(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: ChatOptions,
        stream: bool,
    ) -> serde_json::Value {
        // JSON mode lowers the temperature for shape stability.
        let temperature = if options.json_mode { 0.1 } else { 0.7 };

        let mut payload = serde_json::json!({
            "model": model,
            "messages": messages,
            "temperature": temperature,
            "top_p": 0.7,
            "stream": stream,
            "request_id": format!("polaris-{}", Uuid::new_v4()),
        });

        if let Some(map) = payload.as_object_mut() {
            if options.json_mode {
                map.insert(
                    String::from("response_format"),
                    serde_json::json!({"type": "json_object"}),
                );
            }
            if options.web_search {
                map.insert(
                    String::from("tools"),
                    serde_json::json!([{
                        "type": "web_search",
                        "web_search": {"enable": true, "search_result": true}
                    }]),
                );
            }
        }

        payload
    }

    /// Send the payload and translate non-2xx responses.
    async fn send(&self, payload: &serde_json::Value) -> Result<reqwest::Response, ClientError> {
        let url = format!("{}/chat/completions", self.config.base_url);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(payload)
            .send()
            .await
            .map_err(|e| ClientError::Transport(format!("chat request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unable to read error body"));
            return Err(translate_vendor_error(status.as_u16(), &body));
        }
        Ok(response)
    }
}

/// Extract `choices[0].message.content` from a buffered response.
fn message_content(json: &serde_json::Value) -> Result<String, ClientError> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(serde_json::Value::as_str)
        .map(ToOwned::to_owned)
        .ok_or_else(|| {
            ClientError::MalformedResponse(String::from(
                "response missing choices[0].message.content",
            ))
        })
}

/// Extract `choices[0].delta.content` from a streamed event.
fn delta_content(event: &serde_json::Value) -> Option<&str> {
    event
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("delta"))
        .and_then(|d| d.get("content"))
        .and_then(serde_json::Value::as_str)
}

// ---------------------------------------------------------------------------
// SSE decoding
// ---------------------------------------------------------------------------

/// Incremental decoder for a `text/event-stream` body.
///
/// Bytes arrive in arbitrary chunk boundaries; the decoder buffers
/// partial lines, handles `data:` payloads, skips the `[DONE]` sentinel,
/// and accumulates deltas into the running full text.
pub(crate) struct SseDecoder {
    buffer: String,
    full_text: String,
}

impl SseDecoder {
    /// A fresh decoder with empty buffers.
    pub(crate) const fn new() -> Self {
        Self {
            buffer: String::new(),
            full_text: String::new(),
        }
    }

    /// Feed one chunk of body text, invoking `on_token` with the running
    /// total for every completed delta line.
    pub(crate) fn push(&mut self, chunk: &str, on_token: &mut impl FnMut(&str)) {
        self.buffer.push_str(chunk);
        while let Some(pos) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=pos).collect();
            self.take_line(line.trim(), on_token);
        }
    }

    /// Flush any final unterminated line and return the accumulated text.
    pub(crate) fn finish(mut self, on_token: &mut impl FnMut(&str)) -> String {
        let leftover = std::mem::take(&mut self.buffer);
        let leftover = leftover.trim();
        if !leftover.is_empty() {
            self.take_line(leftover, on_token);
        }
        self.full_text
    }

    /// Process one complete line of the event stream.
    fn take_line(&mut self, line: &str, on_token: &mut impl FnMut(&str)) {
        let Some(data) = line.strip_prefix("data:") else {
            return;
        };
        let data = data.trim();
        if data == "[DONE]" {
            return;
        }
        let Ok(event) = serde_json::from_str::<serde_json::Value>(data) else {
            debug!(line = data, "skipping unparseable stream event");
            return;
        };
        if let Some(delta) = delta_content(&event)
            && !delta.is_empty()
        {
            self.full_text.push_str(delta);
            on_token(&self.full_text);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn delta_line(content: &str) -> String {
        format!("data: {{\"choices\":[{{\"delta\":{{\"content\":\"{content}\"}}}}]}}\n")
    }

    #[test]
    fn callback_receives_running_total() {
        let mut decoder = SseDecoder::new();
        let mut seen: Vec<String> = Vec::new();
        let mut on_token = |text: &str| seen.push(text.to_owned());

        decoder.push(&delta_line("Hel"), &mut on_token);
        decoder.push(&delta_line("lo"), &mut on_token);
        decoder.push(&delta_line(" World"), &mut on_token);
        decoder.push("data: [DONE]\n", &mut on_token);
        let full = decoder.finish(&mut on_token);

        assert_eq!(seen, vec!["Hel", "Hello", "Hello World"]);
        assert_eq!(full, "Hello World");
    }

    #[test]
    fn chunks_split_mid_line_are_reassembled() {
        let mut decoder = SseDecoder::new();
        let mut seen: Vec<String> = Vec::new();

        let line = delta_line("Hello");
        let (head, tail) = line.split_at(10);
        decoder.push(head, &mut |text: &str| seen.push(text.to_owned()));
        assert!(seen.is_empty(), "no callback before the line completes");
        decoder.push(tail, &mut |text: &str| seen.push(text.to_owned()));

        assert_eq!(seen, vec!["Hello"]);
    }

    #[test]
    fn non_data_lines_and_empty_deltas_are_ignored() {
        let mut decoder = SseDecoder::new();
        let mut count = 0_u32;
        let mut on_token = |_: &str| count = count.saturating_add(1);

        decoder.push(": keep-alive comment\n", &mut on_token);
        decoder.push("event: ping\n", &mut on_token);
        decoder.push(
            "data: {\"choices\":[{\"delta\":{\"content\":\"\"}}]}\n",
            &mut on_token,
        );
        decoder.push("data: not json at all\n", &mut on_token);

        assert_eq!(count, 0);
    }

    #[test]
    fn final_line_without_newline_is_flushed() {
        let mut decoder = SseDecoder::new();
        let mut seen: Vec<String> = Vec::new();

        let line = delta_line("tail");
        decoder.push(line.trim_end(), &mut |text: &str| seen.push(text.to_owned()));
        assert!(seen.is_empty());
        let full = decoder.finish(&mut |text: &str| seen.push(text.to_owned()));

        assert_eq!(seen, vec!["tail"]);
        assert_eq!(full, "tail");
    }

    #[test]
    fn message_content_valid() {
        let json = serde_json::json!({
            "choices": [{"message": {"content": "{\"title\": \"Report\"}"}}]
        });
        let content = message_content(&json).unwrap();
        assert!(content.contains("Report"));
    }

    #[test]
    fn message_content_missing_choices() {
        let json = serde_json::json!({"error": "rate_limit"});
        assert!(message_content(&json).is_err());
    }

    #[test]
    fn payload_shape_for_json_mode() {
        let client = ChatClient::new(crate::config::LlmConfig::with_key("k"));
        let messages = vec![ChatMessage::system("s"), ChatMessage::user("u")];
        let payload = client.build_payload("glm-4.6", &messages, ChatOptions::json(), false);

        assert_eq!(
            payload.get("response_format").and_then(|f| f.get("type")),
            Some(&serde_json::json!("json_object"))
        );
        assert_eq!(payload.get("temperature"), Some(&serde_json::json!(0.1)));
        assert!(payload.get("tools").is_none());
        let request_id = payload
            .get("request_id")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default();
        assert!(request_id.starts_with("polaris-"));
    }

    #[test]
    fn payload_shape_for_search() {
        let client = ChatClient::new(crate::config::LlmConfig::with_key("k"));
        let messages = vec![ChatMessage::user("who launched last week?")];
        let payload =
            client.build_payload("glm-4-flash", &messages, ChatOptions::json_with_search(), false);

        let tools = payload.get("tools").and_then(serde_json::Value::as_array);
        assert!(tools.is_some_and(|t| !t.is_empty()));
    }
}
