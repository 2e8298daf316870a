//! A metrics store decorator that forwards every accepted batch, best-effort,
//! to a Prometheus remote-write receiver.

pub mod app;
pub mod cli;
pub mod config;
pub mod convert;
pub mod domain;
pub mod forward;
pub mod http;
pub mod ingest;
pub mod metrics;
pub mod readiness;
pub mod remote_write;
pub mod store;

pub use domain::PartitionedMetrics;
pub use forward::{ForwardStore, Forwarder};
pub use store::{MemStore, MetricStore, StoreError};
