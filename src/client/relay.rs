use anyhow::{Result, bail};
use futures::stream::BoxStream;
use futures_util::StreamExt;
use http::header;

use super::decode::Utf8Fragments;
use crate::openai::Message;

/// Decoded text fragments of a relay response in arrival order
pub type FragmentStream = BoxStream<'static, Result<String>>;

/// HTTP client for the relay endpoint
#[derive(Clone, Debug)]
pub struct RelayClient {
    http: reqwest::Client,
    url: String,
}

impl RelayClient {
    pub fn new(url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.to_string(),
        }
    }

    /// Post the transcript and return the reply as it streams in. A
    /// non-success status is an error before any text is read.
    pub async fn send(&self, messages: &[Message]) -> Result<FragmentStream> {
        let response = self
            .http
            .post(&self.url)
            .header(header::CONTENT_TYPE, "application/json")
            .json(messages)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Relay responded with {}: {}", status, body);
        }

        let mut bytes = response.bytes_stream();
        let fragments: FragmentStream = Box::pin(async_stream::try_stream! {
            let mut decoder = Utf8Fragments::new();
            while let Some(chunk) = bytes.next().await {
                let text = decoder.push(&chunk?);
                if !text.is_empty() {
                    yield text;
                }
            }
            let tail = decoder.finish();
            if !tail.is_empty() {
                yield tail;
            }
        });

        Ok(fragments)
    }
}
