#[cfg(test)]
mod metrics_test;

use lazy_static::lazy_static;
use prometheus::exponential_buckets;
use prometheus::HistogramOpts;
use prometheus::HistogramVec;
use prometheus::IntCounterVec;
use prometheus::IntGauge;
use prometheus::Opts;
use prometheus::Registry;
use tokio::sync::watch;
use tracing::error;
use tracing::info;
use warp::Filter;
use warp::Rejection;
use warp::Reply;

lazy_static! {
    /// Release cache activity: get, get_by_id, load, load_by_id, invalidate,
    /// malformed_key, load_failure, warm_up_failure, evict
    pub static ref CONFIG_CACHE_EVENTS: IntCounterVec = IntCounterVec::new(
        Opts::new("config_cache_events", "Release cache events by type"),
        &["event"]
    )
    .expect("metric can not be created");

    pub static ref CACHE_LOAD_DURATION_METRIC: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "config_cache_load_duration_ms",
            "Histogram of durable store load latency in ms"
        )
        .buckets(exponential_buckets(1.0, 2.0, 12).expect("valid buckets")),
        &["cache"]
    )
    .expect("metric can not be created");

    /// Long poll outcomes: registered, changed, immediate, not_modified, cancelled
    pub static ref LONG_POLL_EVENTS: IntCounterVec = IntCounterVec::new(
        Opts::new("long_poll_events", "Long poll lifecycle events"),
        &["outcome"]
    )
    .expect("metric can not be created");

    pub static ref PENDING_LONG_POLLS: IntGauge =
        IntGauge::new("pending_long_polls", "Long poll requests currently held")
            .expect("metric can not be created");

    pub static ref RELEASE_MESSAGES_RECEIVED: IntCounterVec = IntCounterVec::new(
        Opts::new("release_messages_received", "Release messages delivered to listeners"),
        &["channel"]
    )
    .expect("metric can not be created");

    pub static ref REGISTRY: Registry = Registry::new();
}

pub(crate) fn register_custom_metrics(registry: &Registry) {
    registry
        .register(Box::new(CONFIG_CACHE_EVENTS.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(CACHE_LOAD_DURATION_METRIC.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(LONG_POLL_EVENTS.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(PENDING_LONG_POLLS.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(RELEASE_MESSAGES_RECEIVED.clone()))
        .expect("collector can be registered");
}

#[inline]
pub(crate) fn record_cache_event(event: &str) {
    CONFIG_CACHE_EVENTS.with_label_values(&[event]).inc();
}

#[inline]
pub(crate) fn record_long_poll_event(outcome: &str) {
    LONG_POLL_EVENTS.with_label_values(&[outcome]).inc();
}

/// Serves `/metrics` until the shutdown signal fires
pub async fn start_server(
    port: u16,
    mut shutdown_signal: watch::Receiver<()>,
) {
    register_custom_metrics(&REGISTRY);

    let metrics_route = warp::path!("metrics")
        .map(|| REGISTRY.clone())
        .and_then(metrics_handler);

    let (addr, server) =
        warp::serve(metrics_route).bind_with_graceful_shutdown(([0, 0, 0, 0], port), async move {
            let _ = shutdown_signal.changed().await;
        });
    info!(%addr, "metrics server started");
    server.await;
}

async fn metrics_handler(registry: Registry) -> Result<impl Reply, Rejection> {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&registry.gather(), &mut buffer) {
        error!("could not encode custom metrics: {}", e);
    };
    let res = match String::from_utf8(buffer) {
        Ok(v) => v,
        Err(e) => {
            error!("custom metrics could not be from_utf8'd: {}", e);
            String::default()
        }
    };
    Ok(res)
}
