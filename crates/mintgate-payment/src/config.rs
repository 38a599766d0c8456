//! # Verifier Configuration
//!
//! Shared-secret material for webhook verification. The provider
//! issues separate merchant keys for live and test traffic; which one
//! applies is selected per notification by its `mode` field, so both
//! can be configured at once and sandbox notifications keep working in
//! production deployments.

/// Secrets and salt for [`crate::PaymentVerifier`].
#[derive(Debug, Clone, Default)]
pub struct VerifierConfig {
    /// Merchant key for live notifications.
    pub secret: Option<String>,
    /// Merchant key for notifications with `mode=test`.
    pub secret_test: Option<String>,
    /// Merchant salt mixed into the signed concatenation.
    pub salt: String,
}

impl VerifierConfig {
    /// Read `MINTGATE_WEBHOOK_SECRET`, `MINTGATE_WEBHOOK_SECRET_TEST`
    /// and `MINTGATE_WEBHOOK_SALT` from the environment. Unset secrets
    /// stay `None`; verification then rejects the corresponding mode
    /// with `Server misconfigured`.
    pub fn from_env() -> Self {
        Self {
            secret: read_nonempty("MINTGATE_WEBHOOK_SECRET"),
            secret_test: read_nonempty("MINTGATE_WEBHOOK_SECRET_TEST"),
            salt: read_nonempty("MINTGATE_WEBHOOK_SALT").unwrap_or_default(),
        }
    }

    /// The merchant key for a notification mode. `mode=test` selects
    /// the test key; anything else, including absence, selects live.
    pub fn secret_for_mode(&self, mode: Option<&str>) -> Option<&str> {
        match mode {
            Some("test") => self.secret_test.as_deref(),
            _ => self.secret.as_deref(),
        }
    }
}

fn read_nonempty(var: &str) -> Option<String> {
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => Some(value),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_selects_secret() {
        let config = VerifierConfig {
            secret: Some("live-key".into()),
            secret_test: Some("test-key".into()),
            salt: "s".into(),
        };
        assert_eq!(config.secret_for_mode(None), Some("live-key"));
        assert_eq!(config.secret_for_mode(Some("live")), Some("live-key"));
        assert_eq!(config.secret_for_mode(Some("test")), Some("test-key"));
    }

    #[test]
    fn missing_secret_stays_none() {
        let config = VerifierConfig {
            secret: None,
            secret_test: None,
            salt: String::new(),
        };
        assert_eq!(config.secret_for_mode(None), None);
        assert_eq!(config.secret_for_mode(Some("test")), None);
    }
}
