//! Decision tracing over a policy and precedent graph.
//!
//! This crate bundles the `trace-*` crates behind feature flags. Enable
//! `server` to embed the REST router in another binary.

#![warn(missing_docs, clippy::pedantic)]

/// Graph schema, identifiers and property helpers.
pub use trace_primitives as primitives;

/// Chat and embedding model adapters (enabled by `adapters` feature).
#[cfg(feature = "adapters")]
pub use trace_adapters as adapters;

/// Graph stores and precedent search (enabled by `graph` feature).
#[cfg(feature = "graph")]
pub use trace_graph as graph;

/// Policies, verdicts and the knowledge base (enabled by `policy` feature).
#[cfg(feature = "policy")]
pub use trace_policy as policy;

/// The decision pipeline (enabled by `orchestrator` feature).
#[cfg(feature = "orchestrator")]
pub use trace_orchestrator as orchestrator;

/// Logging setup and health payloads (enabled by `telemetry` feature).
#[cfg(feature = "telemetry")]
pub use trace_telemetry as telemetry;

/// REST API (enabled by `server` feature).
#[cfg(feature = "server")]
pub use trace_server as server;
