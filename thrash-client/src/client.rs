//! The `ApiClient` trait and watch-stream types

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};
use serde_json::Value as JsonValue;
use std::time::Duration;

use crate::errors::{ClientError, ClientResult};

/// Request scope: the whole cluster or a single namespace
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Broadcast scope across every target
    Cluster,
    /// Scoped to one target namespace
    Namespaced(String),
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scope::Cluster => write!(f, "cluster"),
            Scope::Namespaced(ns) => write!(f, "namespace/{}", ns),
        }
    }
}

/// One event read off a watch stream
#[derive(Debug, Clone)]
pub struct WatchEvent {
    /// Event type reported by the server (ADDED, MODIFIED, DELETED, ...)
    pub kind: String,
    /// The object attached to the event
    pub object: JsonValue,
}

/// A lazily-read watch stream of newline-delimited JSON events.
///
/// The stream is closeable mid-read: dropping it (or calling [`close`])
/// tears the connection down, which is how a task abandons an open watch
/// when shutdown is observed.
///
/// [`close`]: WatchStream::close
pub struct WatchStream {
    body: BoxStream<'static, ClientResult<Bytes>>,
    buffer: Vec<u8>,
}

impl WatchStream {
    /// Wrap a raw byte stream
    pub fn new(body: impl futures::Stream<Item = ClientResult<Bytes>> + Send + 'static) -> Self {
        Self {
            body: body.boxed(),
            buffer: Vec::new(),
        }
    }

    /// Build a stream from pre-framed event lines. Test aid.
    pub fn from_lines(lines: Vec<String>) -> Self {
        let joined = lines.join("\n") + "\n";
        Self::new(futures::stream::once(async move {
            Ok(Bytes::from(joined))
        }))
    }

    /// Read the next event, or `None` when the server closed the stream
    pub async fn next_event(&mut self) -> ClientResult<Option<WatchEvent>> {
        loop {
            if let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = self.buffer.drain(..=pos).collect();
                let line = String::from_utf8_lossy(&line[..line.len() - 1]);
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                return Ok(Some(parse_event(line)?));
            }

            match self.body.next().await {
                Some(Ok(chunk)) => self.buffer.extend_from_slice(&chunk),
                Some(Err(e)) => return Err(e),
                None => return Ok(None),
            }
        }
    }

    /// Explicitly close the stream, dropping the connection
    pub fn close(self) {}
}

fn parse_event(line: &str) -> ClientResult<WatchEvent> {
    let value: JsonValue = serde_json::from_str(line)
        .map_err(|e| ClientError::Protocol(format!("malformed watch event: {}", e)))?;
    let kind = value
        .get("type")
        .and_then(|t| t.as_str())
        .unwrap_or("UNKNOWN")
        .to_string();
    let object = value.get("object").cloned().unwrap_or(JsonValue::Null);
    Ok(WatchEvent { kind, object })
}

/// The three control-plane operations the harness drives.
///
/// Every call can fail with a transient connectivity error (retried
/// immediately by the caller) or any other error (fatal to the task).
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// List objects in the given scope; returns the item count
    async fn list(&self, scope: &Scope) -> ClientResult<u64>;

    /// Open a watch stream over the given scope. `timeout` is the
    /// server-side duration the stream stays open before a clean close.
    async fn watch(&self, scope: &Scope, timeout: Duration) -> ClientResult<WatchStream>;

    /// Create one object in the target namespace
    async fn create(&self, target: &str, payload: JsonValue) -> ClientResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stream_yields_events_in_order() {
        let mut stream = WatchStream::from_lines(vec![
            r#"{"type":"ADDED","object":{"kind":"Secret"}}"#.to_string(),
            r#"{"type":"DELETED","object":{"kind":"Secret"}}"#.to_string(),
        ]);

        let first = stream.next_event().await.unwrap().unwrap();
        assert_eq!(first.kind, "ADDED");
        let second = stream.next_event().await.unwrap().unwrap();
        assert_eq!(second.kind, "DELETED");
        assert!(stream.next_event().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn stream_reassembles_split_chunks() {
        let body = futures::stream::iter(vec![
            Ok(Bytes::from_static(b"{\"type\":\"ADD")),
            Ok(Bytes::from_static(b"ED\",\"object\":null}\n")),
        ]);
        let mut stream = WatchStream::new(body);

        let event = stream.next_event().await.unwrap().unwrap();
        assert_eq!(event.kind, "ADDED");
    }

    #[tokio::test]
    async fn malformed_event_is_a_protocol_error() {
        let mut stream = WatchStream::from_lines(vec!["not json".to_string()]);
        let err = stream.next_event().await.unwrap_err();
        assert!(!err.is_transient());
    }

    #[test]
    fn scope_display() {
        assert_eq!(Scope::Cluster.to_string(), "cluster");
        assert_eq!(
            Scope::Namespaced("default".into()).to_string(),
            "namespace/default"
        );
    }
}
