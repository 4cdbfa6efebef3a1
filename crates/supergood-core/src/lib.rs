//! Supergood Core - Event model, policy cache, classification and redaction.
//!
//! This crate holds the side-effect-free half of the Supergood SDK. It
//! owns every decision that does not require I/O; the `supergood` crate
//! layers the transport seam, the background workers and the collector
//! client on top.
//!
//! ## Modules
//!
//! - [`body`] - Buffered body capture into a tagged value
//! - [`cache`] - Thread-safe policy snapshot (endpoint rules, proxy hosts)
//! - [`config`] - Collector `/v2/config` wire types
//! - [`domain`] - Registrable-domain and subdomain helpers
//! - [`event`] - Request/response event records
//! - [`matcher`] - Request classification against cached rules
//! - [`redact`] - Path-directed and force-all redaction

pub mod body;
pub mod cache;
pub mod config;
pub mod domain;
mod error;
pub mod event;
pub mod matcher;
pub mod redact;

pub use cache::{Action, EndpointRule, KeyAction, PolicyCache, RedactionOptions};
pub use error::{CacheError, MatchError, RedactError};
pub use event::{Event, MetaData, RedactedKeyMeta, Request, Response};
pub use matcher::{Location, RequestProbe};
