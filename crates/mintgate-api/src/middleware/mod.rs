//! HTTP middleware: Prometheus metrics and fixed-window rate limiting.

pub mod metrics;
pub mod rate_limit;
