//! Error types for the fan-out engine

use thiserror::Error;

/// Execution result type
pub type ExecutionResult<T> = Result<T, ExecutionError>;

/// Errors surfaced by the orchestrator and worker runtime
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("configuration error: {0}")]
    Configuration(#[from] thrash_config::ConfigError),

    #[error("client error: {0}")]
    Client(#[from] thrash_client::ClientError),

    #[error("ipc error: {0}")]
    Ipc(#[from] crate::ipc::IpcError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("worker {process_index} failed: {error}")]
    WorkerFailed { process_index: usize, error: String },

    #[error("worker {process_index} exited abnormally: {status}")]
    WorkerExited {
        process_index: usize,
        status: std::process::ExitStatus,
    },

    #[error("worker panicked: {0}")]
    Join(String),

    #[error("invalid workload: {0}")]
    InvalidWorkload(String),
}
