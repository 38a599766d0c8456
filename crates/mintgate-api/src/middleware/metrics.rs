//! # Prometheus Metrics
//!
//! HTTP-level metrics (request counts, latency, errors) recorded in
//! middleware, plus domain counters the route handlers bump per
//! outcome. Everything lives in one registry, scraped at `/metrics`.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use prometheus::{
    core::Collector, Encoder, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

/// Shared metrics state backed by a Prometheus registry.
#[derive(Clone)]
pub struct ApiMetrics {
    inner: Arc<Inner>,
}

struct Inner {
    registry: Registry,

    http_requests_total: IntCounterVec,
    http_request_duration_seconds: HistogramVec,
    http_errors_total: IntCounterVec,

    // Domain counters, labelled by outcome.
    mints_total: IntCounterVec,
    claims_total: IntCounterVec,
    checkins_total: IntCounterVec,
    webhook_rejections_total: IntCounterVec,
}

impl std::fmt::Debug for ApiMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiMetrics")
            .field("requests", &self.requests())
            .finish()
    }
}

impl ApiMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new("mintgate_http_requests_total", "Total HTTP requests"),
            &["method", "path", "status"],
        )
        .expect("metric can be created");

        let http_request_duration_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "mintgate_http_request_duration_seconds",
                "HTTP request duration in seconds",
            )
            .buckets(vec![
                0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ]),
            &["method", "path"],
        )
        .expect("metric can be created");

        let http_errors_total = IntCounterVec::new(
            Opts::new(
                "mintgate_http_errors_total",
                "Total HTTP errors (4xx and 5xx)",
            ),
            &["method", "path", "status"],
        )
        .expect("metric can be created");

        let mints_total = IntCounterVec::new(
            Opts::new("mintgate_mints_total", "Mint attempts by outcome"),
            &["outcome"],
        )
        .expect("metric can be created");

        let claims_total = IntCounterVec::new(
            Opts::new("mintgate_claims_total", "Claim attempts by outcome"),
            &["outcome"],
        )
        .expect("metric can be created");

        let checkins_total = IntCounterVec::new(
            Opts::new("mintgate_checkins_total", "Gate check-ins by outcome"),
            &["outcome"],
        )
        .expect("metric can be created");

        let webhook_rejections_total = IntCounterVec::new(
            Opts::new(
                "mintgate_webhook_rejections_total",
                "Rejected payment notifications by reason",
            ),
            &["reason"],
        )
        .expect("metric can be created");

        registry
            .register(Box::new(http_requests_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(http_request_duration_seconds.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(http_errors_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(mints_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(claims_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(checkins_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(webhook_rejections_total.clone()))
            .expect("metric can be registered");

        Self {
            inner: Arc::new(Inner {
                registry,
                http_requests_total,
                http_request_duration_seconds,
                http_errors_total,
                mints_total,
                claims_total,
                checkins_total,
                webhook_rejections_total,
            }),
        }
    }

    /// Total request count across all labels.
    pub fn requests(&self) -> u64 {
        let mut total = 0u64;
        for mf in &self.inner.http_requests_total.collect() {
            for m in mf.get_metric() {
                total += m.get_counter().get_value() as u64;
            }
        }
        total
    }

    fn record_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.inner
            .http_requests_total
            .with_label_values(&[method, path, &status_str])
            .inc();
        self.inner
            .http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
        if status >= 400 {
            self.inner
                .http_errors_total
                .with_label_values(&[method, path, &status_str])
                .inc();
        }
    }

    pub fn record_mint(&self, outcome: &str) {
        self.inner.mints_total.with_label_values(&[outcome]).inc();
    }

    pub fn record_claim(&self, outcome: &str) {
        self.inner.claims_total.with_label_values(&[outcome]).inc();
    }

    pub fn record_checkin(&self, outcome: &str) {
        self.inner
            .checkins_total
            .with_label_values(&[outcome])
            .inc();
    }

    pub fn record_webhook_rejection(&self, reason: &str) {
        self.inner
            .webhook_rejections_total
            .with_label_values(&[reason])
            .inc();
    }

    /// Gather all metrics and encode to Prometheus text format.
    pub fn gather_and_encode(&self) -> Result<String, String> {
        let encoder = TextEncoder::new();
        let families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&families, &mut buffer)
            .map_err(|e| format!("failed to encode metrics: {e}"))?;
        String::from_utf8(buffer)
            .map_err(|e| format!("metrics encoding produced invalid UTF-8: {e}"))
    }
}

impl Default for ApiMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Collapse caller-supplied path segments so label cardinality stays
/// bounded. Order ids live one segment below `/v1/orders`.
fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = path.split('/').collect();
    for i in 1..segments.len() {
        if segments[i - 1] == "orders" && !segments[i].is_empty() {
            segments[i] = "{merchantOrderId}";
        }
    }
    segments.join("/")
}

/// Middleware recording HTTP request metrics.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let metrics = request.extensions().get::<ApiMetrics>().cloned();
    let method = request.method().to_string();
    let path = normalize_path(request.uri().path());
    let start = Instant::now();

    let response = next.run(request).await;

    if let Some(m) = metrics {
        m.record_request(
            &method,
            &path,
            response.status().as_u16(),
            start.elapsed().as_secs_f64(),
        );
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero_and_increment() {
        let m = ApiMetrics::new();
        assert_eq!(m.requests(), 0);
        m.record_request("POST", "/v1/claims", 200, 0.01);
        m.record_request("POST", "/v1/claims", 401, 0.01);
        assert_eq!(m.requests(), 2);
    }

    #[test]
    fn clones_share_the_registry() {
        let m = ApiMetrics::new();
        let clone = m.clone();
        m.record_request("GET", "/metrics", 200, 0.001);
        assert_eq!(clone.requests(), 1);
    }

    #[test]
    fn encoding_includes_domain_counters() {
        let m = ApiMetrics::new();
        m.record_mint("processed");
        m.record_claim("duplicate");
        m.record_checkin("admitted");
        m.record_webhook_rejection("Invalid signature");
        let text = m.gather_and_encode().unwrap();
        assert!(text.contains("mintgate_mints_total"));
        assert!(text.contains("mintgate_claims_total"));
        assert!(text.contains("mintgate_checkins_total"));
        assert!(text.contains("mintgate_webhook_rejections_total"));
    }

    #[test]
    fn order_lookups_collapse_to_one_label() {
        assert_eq!(
            normalize_path("/v1/orders/ord-2041"),
            "/v1/orders/{merchantOrderId}"
        );
        assert_eq!(normalize_path("/v1/claims"), "/v1/claims");
    }
}
