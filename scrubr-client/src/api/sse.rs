//! Real-time job progress channel
//!
//! The backend pushes one Server-Sent Event per progress tick on
//! `GET /api/jobs/{id}/events`. Each event's `data:` payload is a JSON
//! `JobProgressSnapshot`; decoding is left to the monitor so that malformed
//! payloads can be dropped in one place.

use futures::stream::{BoxStream, StreamExt};
use scrubr_common::api::JobId;
use tracing::debug;

use crate::error::{ClientError, ClientResult};

/// Something that happened on a subscription
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// Connection established; messages may follow
    Opened,
    /// One pushed payload (raw text)
    Message(String),
    /// Transport failure; no further events follow
    Error(String),
}

/// Live subscription to one job's channel
///
/// The stream ending means the server closed the channel. Dropping the
/// subscription closes the underlying connection.
pub type Subscription = BoxStream<'static, ChannelEvent>;

/// Source of per-job push subscriptions
pub trait ProgressChannel: Send + Sync {
    /// Open a subscription. Connection work happens lazily when the stream is polled.
    fn subscribe(&self, job_id: &JobId) -> Subscription;
}

/// SSE-over-HTTP progress channel
#[derive(Debug, Clone)]
pub struct SseProgressChannel {
    http_client: reqwest::Client,
    base_url: String,
}

impl SseProgressChannel {
    /// No request timeout is set: the stream stays open for the life of the job.
    pub fn new(base_url: impl Into<String>) -> ClientResult<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("scrubr/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

impl ProgressChannel for SseProgressChannel {
    fn subscribe(&self, job_id: &JobId) -> Subscription {
        let client = self.http_client.clone();
        let url = format!("{}/api/jobs/{}/events", self.base_url, job_id);

        let stream = async_stream::stream! {
            debug!(url = %url, "Opening progress channel");

            let response = match client
                .get(&url)
                .header(reqwest::header::ACCEPT, "text/event-stream")
                .send()
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    yield ChannelEvent::Error(e.to_string());
                    return;
                }
            };

            if !response.status().is_success() {
                yield ChannelEvent::Error(format!("channel rejected with status {}", response.status()));
                return;
            }

            yield ChannelEvent::Opened;

            let mut parser = SseParser::default();
            let mut body = response.bytes_stream();

            while let Some(chunk) = body.next().await {
                match chunk {
                    Ok(bytes) => {
                        for data in parser.push(&bytes) {
                            yield ChannelEvent::Message(data);
                        }
                    }
                    Err(e) => {
                        yield ChannelEvent::Error(e.to_string());
                        return;
                    }
                }
            }

            debug!(url = %url, "Progress channel closed by server");
        };

        stream.boxed()
    }
}

/// Incremental `text/event-stream` decoder
///
/// Only `data:` fields matter here; `event:`, `id:`, `retry:` and comment
/// lines are skipped.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: Vec<u8>,
    data: Vec<String>,
}

impl SseParser {
    /// Feed raw bytes; returns the data payload of every event completed by them
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);
        let mut events = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            let line = String::from_utf8_lossy(&line);

            if line.is_empty() {
                if !self.data.is_empty() {
                    events.push(self.data.join("\n"));
                    self.data.clear();
                }
                continue;
            }

            if line.starts_with(':') {
                continue;
            }

            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (line.as_ref(), ""),
            };

            if field == "data" {
                self.data.push(value.to_string());
            }
        }

        events
    }
}
