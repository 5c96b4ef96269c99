//! Observability: runtime counters and the sink they flow through.
//!
//! Session code never touches `metrics` state directly; every measurement is
//! a [`MetricsEvent`] handed to the active [`MetricsSink`].

pub mod metrics;
pub mod sink;

// re-exports
pub use metrics::{EntitySummary, EventReport};
pub use sink::{MetricsEvent, MetricsSink, OpKind, metrics_report, metrics_reset_all};
