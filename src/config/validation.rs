//! Configuration validation logic.

use crate::config::schema::SiteConfig;
use regex::Regex;

/// Error type for configuration validation failures.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError(pub String);

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Validation error: {}", self.0)
    }
}

/// Validate a SiteConfig for semantic correctness.
pub fn validate_config(config: &SiteConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    // 1. A zero port cannot be dialed by clients
    if config.port == 0 {
        errors.push(ValidationError("port must be > 0".to_string()));
    }

    // 2. A zero write timeout would close every websocket immediately
    if config.streaming.timeout_ms == 0 {
        errors.push(ValidationError(
            "streaming.timeout_ms must be > 0".to_string(),
        ));
    }

    // 3. Every redirect pattern must be a valid regex
    for rule in &config.redirects {
        if let Err(e) = Regex::new(&rule.from) {
            errors.push(ValidationError(format!(
                "redirect pattern '{}' is not a valid regex: {}",
                rule.from, e
            )));
        } else if !rule.from.starts_with('/') {
            // Canonical paths always begin with '/', so such a rule can
            // never match. Guidance only; the regex is opaque.
            tracing::warn!(
                pattern = %rule.from,
                "redirect pattern does not begin with '/' and will never match"
            );
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
