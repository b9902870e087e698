//! Worker IPC protocol
//!
//! Newline-delimited JSON envelopes over the worker child's stdin/stdout.
//! The orchestrator sends one `Run` message at spawn and at most one
//! `Shutdown` relay; the worker answers with a single terminal result
//! line. Worker logging goes to stderr so stdout stays a clean channel.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::partition::ProcessAssignment;
use crate::workload::Operation;
use thrash_config::LoadConfig;

/// IPC protocol version for compatibility checking
pub const IPC_PROTOCOL_VERSION: u32 = 1;

/// Envelope wrapping every message on the wire
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEnvelope<T> {
    pub protocol_version: u32,
    pub timestamp: DateTime<Utc>,
    pub message: T,
}

impl<T> MessageEnvelope<T> {
    pub fn new(message: T) -> Self {
        Self {
            protocol_version: IPC_PROTOCOL_VERSION,
            timestamp: Utc::now(),
            message,
        }
    }
}

/// Messages sent from the orchestrator to a worker child
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerMessage {
    /// Start the fan-out for this process's share of the workload
    Run {
        assignment: ProcessAssignment,
        operation: Operation,
        load: LoadConfig,
    },
    /// Relay of the orchestrator's shutdown flag
    Shutdown,
}

/// Terminal status reported by a worker child
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerResult {
    /// All tasks drained (normal completion or cooperative shutdown)
    Completed { process_index: usize },
    /// A task hit a fatal error; the whole process failed
    Failed { process_index: usize, error: String },
}

/// IPC error types
#[derive(Debug, Error)]
pub enum IpcError {
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("deserialization error: {0}")]
    Deserialization(String),

    #[error("i/o error: {0}")]
    Io(String),

    #[error("connection closed")]
    ConnectionClosed,

    #[error("protocol version mismatch: expected {expected}, got {actual}")]
    ProtocolVersionMismatch { expected: u32, actual: u32 },
}

impl From<std::io::Error> for IpcError {
    fn from(err: std::io::Error) -> Self {
        IpcError::Io(err.to_string())
    }
}

/// Write one envelope as a single JSON line
pub async fn write_envelope<T, W>(writer: &mut W, message: T) -> Result<(), IpcError>
where
    T: Serialize,
    W: AsyncWrite + Unpin,
{
    let envelope = MessageEnvelope::new(message);
    let json =
        serde_json::to_string(&envelope).map_err(|e| IpcError::Serialization(e.to_string()))?;
    writer.write_all(json.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}

/// Read one envelope line; EOF maps to `ConnectionClosed`
pub async fn read_envelope<T, R>(reader: &mut R) -> Result<MessageEnvelope<T>, IpcError>
where
    T: DeserializeOwned,
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    let read = reader.read_line(&mut line).await?;
    if read == 0 {
        return Err(IpcError::ConnectionClosed);
    }

    let envelope: MessageEnvelope<T> = serde_json::from_str(line.trim_end())
        .map_err(|e| IpcError::Deserialization(e.to_string()))?;

    if envelope.protocol_version != IPC_PROTOCOL_VERSION {
        return Err(IpcError::ProtocolVersionMismatch {
            expected: IPC_PROTOCOL_VERSION,
            actual: envelope.protocol_version,
        });
    }

    Ok(envelope)
}
