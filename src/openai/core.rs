use futures::stream::BoxStream;
use futures_util::StreamExt;
use http::{StatusCode, header};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

use crate::core::AppConfig;

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub enum Role {
    #[serde(rename = "system")]
    System,
    #[serde(rename = "assistant")]
    Assistant,
    #[serde(rename = "user")]
    User,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: &str) -> Self {
        Message {
            role,
            content: content.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("quota exceeded ({status}): {message}")]
    QuotaExceeded { status: StatusCode, message: String },
    #[error("completion request failed with {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("completion transport failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("completion stream failed: {0}")]
    Stream(String),
    #[error("failed to parse completion chunk: {0}")]
    Decode(#[from] serde_json::Error),
}

impl UpstreamError {
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, UpstreamError::QuotaExceeded { .. })
    }
}

/// Text deltas of a streaming completion in arrival order.
pub type DeltaStream = BoxStream<'static, Result<String, UpstreamError>>;

// OpenAI uses a string `code`, OpenRouter uses the numeric HTTP
// status, so keep it loosely typed.
#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    code: Option<Value>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ErrorDetail {
    fn is_insufficient_quota(&self) -> bool {
        let code = self.code.as_ref().and_then(Value::as_str);
        code == Some("insufficient_quota") || self.kind.as_deref() == Some("insufficient_quota")
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

/// Turn a non-success completion response into an error, separating
/// billing failures from everything else.
fn classify_error_response(status: StatusCode, body: &str) -> UpstreamError {
    let detail = serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .map(|envelope| envelope.error);

    let quota = status == StatusCode::PAYMENT_REQUIRED
        || detail.as_ref().is_some_and(ErrorDetail::is_insufficient_quota);

    if quota {
        let message = detail
            .and_then(|d| d.message)
            .unwrap_or_else(|| body.to_string());
        return UpstreamError::QuotaExceeded { status, message };
    }

    UpstreamError::Status {
        status,
        body: body.to_string(),
    }
}

#[derive(Debug, Default, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompletionChunkChoice {
    #[serde(default)]
    delta: Option<Delta>,
    #[allow(dead_code)]
    #[serde(default)]
    finish_reason: Option<String>,
}

// Role-only, finish-only and usage-only chunks all deserialize here
// with no content.
#[derive(Debug, Deserialize)]
struct CompletionChunk {
    #[serde(default)]
    choices: Vec<CompletionChunkChoice>,
    #[serde(default)]
    error: Option<ErrorDetail>,
}

/// Extract the text delta of a single `data` payload, if it has one.
fn chunk_text(data: &str) -> Result<Option<String>, UpstreamError> {
    let chunk = serde_json::from_str::<CompletionChunk>(data).inspect_err(|e| {
        tracing::error!("Parsing completion chunk failed for {}\nError:{}", data, e)
    })?;

    if let Some(error) = chunk.error {
        let message = error
            .message
            .unwrap_or_else(|| String::from("unknown error"));
        return Err(UpstreamError::Stream(message));
    }

    let text = chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta)
        .and_then(|delta| delta.content)
        .filter(|content| !content.is_empty());

    Ok(text)
}

/// Reassembles server-sent events from arbitrarily split network reads.
#[derive(Debug, Default)]
pub(crate) struct SseDecoder {
    buffer: Vec<u8>,
    // Bytes of `buffer` already searched for an event boundary
    scanned: usize,
}

impl SseDecoder {
    /// Feed the next read and return the `data` payload of every event
    /// it completed, in order. Bytes are buffered until an event
    /// boundary so a multi-byte character split across reads is never
    /// decoded early. A bad event doesn't discard the ones before it.
    pub(crate) fn push(&mut self, bytes: &[u8]) -> Vec<Result<String, UpstreamError>> {
        self.buffer.extend_from_slice(bytes);

        let mut payloads = Vec::new();
        // A separator can straddle the previous read
        let mut from = self.scanned.saturating_sub(3);
        while let Some((end, separator_len)) = find_event_boundary(&self.buffer, from) {
            let raw: Vec<u8> = self.buffer.drain(..end + separator_len).collect();
            if let Some(data) = event_data(&raw[..end]).transpose() {
                payloads.push(data);
            }
            from = 0;
        }
        self.scanned = self.buffer.len();
        payloads
    }

    /// Flush a final event that wasn't terminated by a blank line.
    pub(crate) fn finish(&mut self) -> Result<Option<String>, UpstreamError> {
        let raw = std::mem::take(&mut self.buffer);
        self.scanned = 0;
        event_data(&raw)
    }
}

fn find_event_boundary(buffer: &[u8], from: usize) -> Option<(usize, usize)> {
    (from..buffer.len()).find_map(|i| {
        let rest = &buffer[i..];
        if rest.starts_with(b"\n\n") {
            Some((i, 2))
        } else if rest.starts_with(b"\r\n\r\n") {
            Some((i, 4))
        } else {
            None
        }
    })
}

fn event_data(raw: &[u8]) -> Result<Option<String>, UpstreamError> {
    let event = std::str::from_utf8(raw)
        .map_err(|e| UpstreamError::Stream(format!("invalid UTF-8 in event: {}", e)))?;

    // Comment lines (": OPENROUTER PROCESSING") are keep-alives
    let data_lines: Vec<&str> = event
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|data| data.strip_prefix(' ').unwrap_or(data))
        .collect();

    if data_lines.is_empty() {
        return Ok(None);
    }

    let data = data_lines.join("\n");
    if data.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(data))
}

/// Open a streaming chat completion and return its text deltas.
///
/// Errors returned from this function happen before any text is
/// produced. Errors yielded by the stream mean the completion was cut
/// off part way through.
pub async fn completion_stream(
    client: &reqwest::Client,
    messages: &[Message],
    config: &AppConfig,
) -> Result<DeltaStream, UpstreamError> {
    let payload = json!({
        "model": config.openai_model,
        "messages": messages,
        "stream": true,
    });
    let url = format!(
        "{}/v1/chat/completions",
        config.openai_api_hostname.trim_end_matches("/")
    );

    let mut request = client
        .post(url)
        .bearer_auth(&config.openai_api_key)
        .header(header::CONTENT_TYPE, "application/json")
        .json(&payload);
    if let Some(site_url) = &config.site_url {
        request = request.header("HTTP-Referer", site_url);
    }
    if let Some(site_name) = &config.site_name {
        request = request.header("X-Title", site_name);
    }
    if let Some(timeout) = config.upstream_timeout {
        request = request.timeout(timeout);
    }

    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(classify_error_response(status, &body));
    }

    let mut bytes = response.bytes_stream();

    let deltas: DeltaStream = Box::pin(async_stream::try_stream! {
        let mut decoder = SseDecoder::default();
        let mut done = false;

        'outer: while let Some(chunk) = bytes.next().await {
            let chunk = chunk?;
            for data in decoder.push(&chunk) {
                let data = data?;
                if data == "[DONE]" {
                    done = true;
                    break 'outer;
                }
                if let Some(text) = chunk_text(&data)? {
                    yield text;
                }
            }
        }

        if !done {
            if let Some(data) = decoder.finish()? {
                if data != "[DONE]" {
                    if let Some(text) = chunk_text(&data)? {
                        yield text;
                    }
                }
            }
        }
    });

    Ok(deltas)
}
