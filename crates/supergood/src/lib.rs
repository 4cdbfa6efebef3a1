//! Supergood - client-side interception SDK for outbound HTTP traffic.
//!
//! The SDK wraps an HTTP transport, records request/response pairs for
//! traffic the remote policy allows, redacts sensitive fields and ships
//! the surviving events to the Supergood collector in batches. A secondary
//! path rewrites selected requests through a credential-injection proxy.
//!
//! ## Modules
//!
//! - [`options`] - Configuration surface and validation
//! - [`transport`] - The transport seam and the intercepting wrapper
//! - `interceptor` - The per-request decision pipeline
//! - `queue` - Size-bounded in-memory event queue
//! - `flusher` / `refresher` - Background workers
//! - `api` - Authenticated collector client
//!
//! ## Usage
//!
//! ```no_run
//! use bytes::Bytes;
//! use supergood::{Options, Supergood, Transport};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let supergood = Supergood::init(Options::new("client-id", "client-secret")).await?;
//! let client = supergood.client();
//!
//! let request = http::Request::builder()
//!     .method("GET")
//!     .uri("https://api.example.com/v1/items")
//!     .body(Bytes::new())?;
//! let response = client.round_trip(request).await?;
//! assert!(response.status().is_success());
//!
//! // Upload anything still pending before exit.
//! supergood.close().await?;
//! # Ok(())
//! # }
//! ```

mod api;
mod error;
mod flusher;
mod interceptor;
pub mod options;
mod queue;
mod refresher;
mod service;
pub mod transport;

pub use error::{ConfigError, SupergoodError};
pub use options::{OnError, Options, SelectRequests};
pub use service::Supergood;
pub use transport::{BoxError, ReqwestTransport, SupergoodTransport, Transport};

// Re-export the core vocabulary the public API surfaces.
pub use supergood_core::{Event, MetaData, RedactedKeyMeta, RequestProbe};
