//! # Fixed-Window Rate Limiting
//!
//! In-memory fixed-window limiter keyed by client and route. Windows
//! reset wholesale rather than sliding; the occasional burst at a
//! window boundary is acceptable for this surface, where the limiter's
//! job is stopping claim-code guessing and webhook floods, not precise
//! traffic shaping.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use parking_lot::Mutex;

use crate::error::AppError;
use crate::state::StartupError;

/// Limiter settings.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests per key per window.
    pub max_requests: u64,
    /// Window duration in seconds.
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 120,
            window_secs: 60,
        }
    }
}

impl RateLimitConfig {
    /// Read `MINTGATE_RATE_LIMIT_MAX` and
    /// `MINTGATE_RATE_LIMIT_WINDOW_SECS`, defaulting unset values.
    pub fn from_env() -> Result<Self, StartupError> {
        let defaults = Self::default();
        Ok(Self {
            max_requests: read_parsed("MINTGATE_RATE_LIMIT_MAX")?
                .unwrap_or(defaults.max_requests),
            window_secs: read_parsed("MINTGATE_RATE_LIMIT_WINDOW_SECS")?
                .unwrap_or(defaults.window_secs),
        })
    }
}

fn read_parsed(var: &str) -> Result<Option<u64>, StartupError> {
    match std::env::var(var) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|e| StartupError::Config(format!("{var}: {e}"))),
        _ => Ok(None),
    }
}

#[derive(Debug)]
struct Window {
    count: u64,
    started_at: Instant,
}

/// Shared limiter state.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    windows: Arc<Mutex<HashMap<String, Window>>>,
}

enum Decision {
    Allow,
    Deny { retry_after_ms: u64 },
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn check(&self, key: &str) -> Decision {
        let now = Instant::now();
        let window = Duration::from_secs(self.config.window_secs);
        let mut windows = self.windows.lock();
        let entry = windows.entry(key.to_string()).or_insert(Window {
            count: 0,
            started_at: now,
        });

        if now.duration_since(entry.started_at) >= window {
            entry.count = 0;
            entry.started_at = now;
        }

        if entry.count >= self.config.max_requests {
            let elapsed = now.duration_since(entry.started_at);
            let remaining = window.saturating_sub(elapsed);
            Decision::Deny {
                retry_after_ms: remaining.as_millis() as u64,
            }
        } else {
            entry.count += 1;
            Decision::Allow
        }
    }
}

/// Middleware enforcing the per-client, per-route limit.
///
/// The client key comes from `X-Forwarded-For` when present (first
/// hop), otherwise requests fold into one `direct` bucket.
pub async fn rate_limit_middleware(request: Request, next: Next) -> Response {
    let limiter = request.extensions().get::<RateLimiter>().cloned();

    if let Some(limiter) = limiter {
        let client = request
            .headers()
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .unwrap_or("direct")
            .trim();
        let key = format!("{client}:{}", request.uri().path());

        if let Decision::Deny { retry_after_ms } = limiter.check(&key) {
            return AppError::RateLimited { retry_after_ms }.into_response();
        }
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_within_the_limit_pass() {
        let limiter = RateLimiter::new(RateLimitConfig {
            max_requests: 3,
            window_secs: 60,
        });
        for _ in 0..3 {
            assert!(matches!(limiter.check("a:/v1/claims"), Decision::Allow));
        }
        assert!(matches!(
            limiter.check("a:/v1/claims"),
            Decision::Deny { .. }
        ));
    }

    #[test]
    fn keys_are_independent() {
        let limiter = RateLimiter::new(RateLimitConfig {
            max_requests: 1,
            window_secs: 60,
        });
        assert!(matches!(limiter.check("a:/v1/claims"), Decision::Allow));
        assert!(matches!(limiter.check("b:/v1/claims"), Decision::Allow));
        assert!(matches!(limiter.check("a:/v1/orders"), Decision::Allow));
    }

    #[test]
    fn denial_reports_time_until_the_window_resets() {
        let limiter = RateLimiter::new(RateLimitConfig {
            max_requests: 1,
            window_secs: 60,
        });
        let _ = limiter.check("a:/v1/claims");
        match limiter.check("a:/v1/claims") {
            Decision::Deny { retry_after_ms } => assert!(retry_after_ms <= 60_000),
            Decision::Allow => panic!("second request should be denied"),
        }
    }
}
