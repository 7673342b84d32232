//! Prometheus-backed [`ProgressSink`], grounded on the root binary's
//! `metrics::register_metrics`/`spawn_metrics_server` pair (global
//! `Lazy<Registry>`, `OnceCell`-guarded registration, an axum `/metrics`
//! route serving the text-format encoder output).

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, routing::get, Router};
use once_cell::sync::{Lazy, OnceCell};
use prometheus::{histogram_opts, Encoder, GaugeVec, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use tokio::{net::TcpListener, task::JoinHandle};
use tracing::{error, info};

use crate::sink::{ActionObservation, EvaluationObservation, ProgressSink};

static GLOBAL_REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

static ACTIONS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static ACTION_LATENCY_MS: OnceCell<HistogramVec> = OnceCell::new();
static EVALUATIONS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static EVALUATION_SCORE: OnceCell<HistogramVec> = OnceCell::new();
static ROLLUP_SUCCESS_RATE: OnceCell<GaugeVec> = OnceCell::new();

const LATENCY_BUCKETS_MS: &[f64] = &[10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0];

/// Publishes every observation to the process-wide prometheus registry
/// returned by [`global_registry`].
pub struct PrometheusSink;

impl PrometheusSink {
    pub fn new() -> Self {
        register_metrics();
        Self
    }
}

impl Default for PrometheusSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for PrometheusSink {
    fn record_action(&self, observation: ActionObservation<'_>) {
        let result = if observation.success { "ok" } else { "error" };
        if let Some(counter) = ACTIONS_TOTAL.get() {
            counter
                .with_label_values(&[observation.project, observation.action_kind, result])
                .inc();
        }
        if let Some(histogram) = ACTION_LATENCY_MS.get() {
            histogram
                .with_label_values(&[observation.project, observation.action_kind])
                .observe(observation.latency_ms as f64);
        }
    }

    fn record_evaluation(&self, observation: EvaluationObservation<'_>) {
        if let Some(counter) = EVALUATIONS_TOTAL.get() {
            counter
                .with_label_values(&[observation.project, observation.agent_id])
                .inc();
        }
        if let Some(histogram) = EVALUATION_SCORE.get() {
            histogram
                .with_label_values(&[observation.project, observation.agent_id])
                .observe(observation.final_score);
        }
        info!(
            project = observation.project,
            agent_id = observation.agent_id,
            final_score = observation.final_score,
            total_ms = observation.total_ms,
            "evaluation completed"
        );
    }

    fn record_rollup(&self, project: &str, agent_id: &str, success_count: u64, total: u64) {
        if let Some(gauge) = ROLLUP_SUCCESS_RATE.get() {
            let rate = if total == 0 {
                0.0
            } else {
                success_count as f64 / total as f64
            };
            gauge.with_label_values(&[project, agent_id]).set(rate);
        }
    }
}

pub fn global_registry() -> &'static Registry {
    &GLOBAL_REGISTRY
}

fn register_metrics() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        let registry = global_registry();

        let actions = IntCounterVec::new(
            Opts::new("bench_actions_total", "Browser actions executed, by project/kind/result"),
            &["project", "action_kind", "result"],
        )
        .expect("create actions counter");
        register(registry, Box::new(actions.clone()));
        let _ = ACTIONS_TOTAL.set(actions);

        let latency = HistogramVec::new(
            histogram_opts!(
                "bench_action_latency_ms",
                "Per-action execution latency in milliseconds",
                LATENCY_BUCKETS_MS.to_vec()
            ),
            &["project", "action_kind"],
        )
        .expect("create action latency histogram");
        register(registry, Box::new(latency.clone()));
        let _ = ACTION_LATENCY_MS.set(latency);

        let evaluations = IntCounterVec::new(
            Opts::new("bench_evaluations_total", "Completed (task, agent) evaluations"),
            &["project", "agent_id"],
        )
        .expect("create evaluations counter");
        register(registry, Box::new(evaluations.clone()));
        let _ = EVALUATIONS_TOTAL.set(evaluations);

        let score = HistogramVec::new(
            histogram_opts!(
                "bench_evaluation_final_score",
                "Distribution of final_score across completed evaluations",
                vec![0.0, 0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0]
            ),
            &["project", "agent_id"],
        )
        .expect("create evaluation score histogram");
        register(registry, Box::new(score.clone()));
        let _ = EVALUATION_SCORE.set(score);

        let rollup = GaugeVec::new(
            Opts::new("bench_rollup_success_rate", "Running per-agent success rate within a project"),
            &["project", "agent_id"],
        )
        .expect("create rollup gauge");
        register(registry, Box::new(rollup.clone()));
        let _ = ROLLUP_SUCCESS_RATE.set(rollup);
    });
}

fn register(registry: &Registry, collector: Box<dyn prometheus::core::Collector>) {
    if let Err(err) = registry.register(collector) {
        error!(?err, "failed to register prometheus collector");
    }
}

/// Serves the registry at `GET /metrics` in prometheus text format,
/// matching the root binary's `metrics::spawn_metrics_server`. Returns
/// `None` when `port == 0` (disabled).
pub fn spawn_metrics_server(port: u16) -> Option<JoinHandle<()>> {
    if port == 0 {
        return None;
    }
    register_metrics();
    let registry = Arc::new(global_registry().clone());
    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(registry);
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    info!(%addr, "bench-observe metrics server listening");
    Some(tokio::spawn(async move {
        match TcpListener::bind(addr).await {
            Ok(listener) => {
                if let Err(err) = axum::serve(listener, app.into_make_service()).await {
                    error!(?err, "metrics server exited with error");
                }
            }
            Err(err) => error!(?err, "failed to bind metrics listener"),
        }
    }))
}

async fn metrics_handler(State(registry): State<Arc<Registry>>) -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = registry.gather();
    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        error!(?err, "failed to encode prometheus metrics");
        return (axum::http::StatusCode::INTERNAL_SERVER_ERROR, "metric encode error".to_string());
    }
    match String::from_utf8(buffer) {
        Ok(body) => (axum::http::StatusCode::OK, body),
        Err(err) => {
            error!(?err, "failed to convert prometheus metrics to utf8");
            (axum::http::StatusCode::INTERNAL_SERVER_ERROR, "metric encode error".to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_does_not_panic_before_a_server_is_spawned() {
        let sink = PrometheusSink::new();
        sink.record_action(ActionObservation {
            project: "demo",
            action_kind: "Click",
            success: true,
            latency_ms: 42,
        });
        sink.record_evaluation(EvaluationObservation {
            project: "demo",
            agent_id: "agent-1",
            final_score: 0.75,
            total_ms: 1000,
        });
        sink.record_rollup("demo", "agent-1", 3, 4);
    }
}
