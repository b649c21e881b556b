//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (windows > 0, quotas > 0, addresses parse)
//! - Reject account tables the login endpoint cannot serve
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{GatewayConfig, PolicyConfig};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid {field} address '{value}'")]
    InvalidAddress { field: &'static str, value: String },

    #[error("auth.jwt_secret must not be empty")]
    EmptySecret,

    #[error("auth.token_ttl_secs must be greater than zero")]
    ZeroTokenTtl,

    #[error("duplicate username '{0}' in auth.users")]
    DuplicateUser(String),

    #[error("rate_limit.{policy}.{field} must be greater than zero")]
    ZeroPolicyValue {
        policy: &'static str,
        field: &'static str,
    },

    #[error("timeouts.{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("observability.log_format must be 'json' or 'pretty', got '{0}'")]
    UnknownLogFormat(String),

    #[error("audit.recent_capacity must be greater than zero")]
    ZeroAuditCapacity,
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if !matches!(config.observability.log_format.as_str(), "json" | "pretty") {
        errors.push(ValidationError::UnknownLogFormat(
            config.observability.log_format.clone(),
        ));
    }

    if config.auth.jwt_secret.is_empty() {
        errors.push(ValidationError::EmptySecret);
    }
    if config.auth.token_ttl_secs == 0 {
        errors.push(ValidationError::ZeroTokenTtl);
    }

    let mut seen = HashSet::new();
    for user in &config.auth.users {
        if !seen.insert(user.username.as_str()) {
            errors.push(ValidationError::DuplicateUser(user.username.clone()));
        }
    }

    check_policy("general", &config.rate_limit.general, &mut errors);
    check_policy("ai_call", &config.rate_limit.ai_call, &mut errors);

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("request_secs"));
    }
    if config.timeouts.upstream_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("upstream_secs"));
    }

    if config.audit.recent_capacity == 0 {
        errors.push(ValidationError::ZeroAuditCapacity);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_policy(name: &'static str, policy: &PolicyConfig, errors: &mut Vec<ValidationError>) {
    if policy.window_secs == 0 {
        errors.push(ValidationError::ZeroPolicyValue {
            policy: name,
            field: "window_secs",
        });
    }
    if policy.max_requests == 0 {
        errors.push(ValidationError::ZeroPolicyValue {
            policy: name,
            field: "max_requests",
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::UserAccount;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&GatewayConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = GatewayConfig::default();
        config.listener.bind_address = "not an address".into();
        config.auth.jwt_secret.clear();
        config.rate_limit.ai_call.max_requests = 0;
        config.observability.log_format = "xml".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::EmptySecret));
        assert!(errors.contains(&ValidationError::ZeroPolicyValue {
            policy: "ai_call",
            field: "max_requests",
        }));
    }

    #[test]
    fn test_duplicate_usernames_rejected() {
        let mut config = GatewayConfig::default();
        config.auth.users.push(UserAccount::default());

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::DuplicateUser("demo".into())]);
    }
}
