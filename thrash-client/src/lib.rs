//! Control-plane API client boundary
//!
//! The fan-out engine only depends on the [`ApiClient`] trait defined here;
//! the concrete [`HttpApiClient`] speaks the Kubernetes REST conventions
//! over reqwest. Everything a worker task needs from the control plane is
//! one of three operations: a scoped list poll, a long-lived watch stream,
//! or an object creation call.

pub mod client;
pub mod credentials;
pub mod errors;
pub mod http;
pub mod payload;

pub use client::{ApiClient, Scope, WatchEvent, WatchStream};
pub use credentials::Credentials;
pub use errors::{ClientError, ClientResult};
pub use http::HttpApiClient;
