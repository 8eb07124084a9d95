//! Core engine for configurable concurrent HTTP load and stress testing.
//!
//! This crate owns the hard engineering: VU scheduling, request
//! execution over a shared connection pool, a streaming metrics
//! pipeline, and a phased stress controller with SLA-driven halting.
//! File parsing (YAML config, Postman collections), a CLI surface, and
//! report rendering are external collaborators that plug into the
//! `serde`-deserializable config types and the `RequestSource` trait
//! this crate exposes.
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod http;
pub mod logging;
pub mod metrics;
pub mod scheduler;
pub mod shutdown;
pub mod sla;
pub mod stress;

pub use engine::{run_load_test, run_stress_test, RunDetail, RunOutcome, RESULTS_CHANNEL_CAPACITY};
