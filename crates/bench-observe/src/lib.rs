//! Progress/metrics sink (C12): the incremental `ProgressSink` seam plus
//! a prometheus-backed implementation and `/metrics` endpoint, grounded on
//! the teacher's `metrics::{register_metrics, spawn_metrics_server}`.

pub mod prometheus_sink;
pub mod sink;

pub use prometheus_sink::{global_registry, spawn_metrics_server, PrometheusSink};
pub use sink::{ActionObservation, EvaluationObservation, NullSink, ProgressSink};
