//! Portico - an edge API gateway for independently-owned backend services.
//!
//! Portico sits in front of a set of HTTP backends and runs every inbound
//! request through one synchronous dispatch pipeline: open or continue a
//! trace span, match an ordered route table, delegate authorization to a
//! remote identity service, relay the request to the owning backend and
//! record per-route metrics. The gateway holds no credentials and no
//! persistent state of its own.
//!
//! # Features
//! - Ordered, first-match-wins route table with wildcard-suffix patterns
//! - Delegated authorization (`validate` / `is-admin`) against an external
//!   identity service, one downstream call per protected request
//! - Trace-context extraction and propagation across the backend hop
//! - Per-route request counters, latency histograms and an application error
//!   counter, rendered on a Prometheus scrape endpoint
//! - Streaming reverse proxy with per-call deadlines
//! - Structured logging via `tracing` and graceful shutdown
//!
//! # Architecture
//! The crate separates **ports** (traits) from **adapters** (implementations)
//! while keeping routing, auth and trace types inside `core`. The binary
//! wires a [`DispatchPipeline`] from configuration at startup; the route
//! table is immutable afterwards and safe to share across request tasks.
//!
//! # Error Handling
//! Fallible APIs return `eyre::Result<T>` or a domain specific error type.
//! Request-path failures (no route, denied, upstream unreachable) are not
//! errors at the API level: they map to responses inside the pipeline and
//! can never take down the process.
// Re-export public modules with explicit visibility controls
pub mod config;
pub mod metrics;
pub mod ports;
pub mod response;
pub mod tracing_setup;
pub mod utils;

// These modules are implementation details and should not be directly used by users
pub mod adapters;
pub mod core;

// Re-export the specific types needed by the binary crate
pub use crate::{
    adapters::{DispatchPipeline, Forwarder, HttpClientAdapter, IdentityClient},
    core::{AuthDecision, AuthMode, AuthRequirement, BackendUrl, RequestSpan, RouteTable},
    ports::{http_client::HttpClient, identity::IdentityVerifier},
    utils::GracefulShutdown,
};
