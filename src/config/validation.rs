//! Configuration validation.
//!
//! Semantic checks on top of what serde already guarantees
//! syntactically. Validation is a pure function over the config and
//! returns every violation it finds, not just the first.

use std::collections::HashSet;
use std::net::SocketAddr;

use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic violation in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// No backends configured; the pool would be permanently empty.
    NoBackends,
    /// The listener bind address does not parse.
    InvalidBindAddress(String),
    /// A backend URL does not parse or is not plain http(s).
    InvalidBackendUrl { name: String, url: String, reason: String },
    /// Two backends share the same URL.
    DuplicateBackendUrl(String),
    /// A duration that must be positive is zero.
    ZeroDuration(&'static str),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::NoBackends => write!(f, "no backends configured"),
            ValidationError::InvalidBindAddress(addr) => {
                write!(f, "invalid listener bind address {addr:?}")
            }
            ValidationError::InvalidBackendUrl { name, url, reason } => {
                write!(f, "backend {name:?}: invalid url {url:?}: {reason}")
            }
            ValidationError::DuplicateBackendUrl(url) => {
                write!(f, "duplicate backend url {url:?}")
            }
            ValidationError::ZeroDuration(field) => {
                write!(f, "{field} must be greater than zero")
            }
        }
    }
}

/// Validate a configuration, collecting all violations.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.backends.is_empty() {
        errors.push(ValidationError::NoBackends);
    }

    let mut seen = HashSet::new();
    for backend in &config.backends {
        match Url::parse(&backend.url) {
            Ok(url) if url.scheme() != "http" && url.scheme() != "https" => {
                errors.push(ValidationError::InvalidBackendUrl {
                    name: backend.name.clone(),
                    url: backend.url.clone(),
                    reason: format!("unsupported scheme {:?}", url.scheme()),
                });
            }
            Ok(url) if url.host_str().is_none() => {
                errors.push(ValidationError::InvalidBackendUrl {
                    name: backend.name.clone(),
                    url: backend.url.clone(),
                    reason: "missing host".to_string(),
                });
            }
            Ok(_) => {
                if !seen.insert(backend.url.trim_end_matches('/').to_string()) {
                    errors.push(ValidationError::DuplicateBackendUrl(backend.url.clone()));
                }
            }
            Err(e) => {
                errors.push(ValidationError::InvalidBackendUrl {
                    name: backend.name.clone(),
                    url: backend.url.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    if config.health_check.enabled {
        if config.health_check.interval_secs == 0 {
            errors.push(ValidationError::ZeroDuration("health_check.interval_secs"));
        }
        if config.health_check.timeout_secs == 0 {
            errors.push(ValidationError::ZeroDuration("health_check.timeout_secs"));
        }
    }
    if config.rate_limit.enabled && config.rate_limit.window_secs == 0 {
        errors.push(ValidationError::ZeroDuration("rate_limit.window_secs"));
    }
    if config.timeouts.upstream_secs == 0 {
        errors.push(ValidationError::ZeroDuration("timeouts.upstream_secs"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroDuration("timeouts.request_secs"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
