//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (sizes > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::{IpAddr, SocketAddr};

use crate::config::schema::ServerConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Parse `ip` or `ip:port`; bare addresses get `default_port`.
///
/// IPv6 addresses with a port use the bracketed form (`[::1]:8080`).
pub fn parse_bind_address(address: &str, default_port: u16) -> Result<SocketAddr, String> {
    let address = address.trim();
    if let Ok(addr) = address.parse::<SocketAddr>() {
        return Ok(addr);
    }

    let bare = address
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .unwrap_or(address);
    bare.parse::<IpAddr>()
        .map(|ip| SocketAddr::new(ip, default_port))
        .map_err(|_| format!("`{address}` is not an IP address or socket address"))
}

/// Validate a configuration, collecting every problem.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let listener = &config.listener;
    for (i, address) in listener.bind_addresses.iter().enumerate() {
        if let Err(message) = parse_bind_address(address, listener.default_port) {
            errors.push(ValidationError::new(
                format!("listener.bind_addresses[{i}]"),
                message,
            ));
        }
    }
    if listener.max_connections == 0 {
        errors.push(ValidationError::new(
            "listener.max_connections",
            "must be greater than 0",
        ));
    }
    if listener.request_queue_depth == 0 {
        errors.push(ValidationError::new(
            "listener.request_queue_depth",
            "must be greater than 0",
        ));
    }

    if let Some(in_memory) = &config.logging.in_memory {
        if in_memory.capacity == 0 {
            errors.push(ValidationError::new(
                "logging.in_memory.capacity",
                "must be greater than 0",
            ));
        }
        if !in_memory.route.starts_with('/') {
            errors.push(ValidationError::new(
                "logging.in_memory.route",
                "must start with `/`",
            ));
        }
    }

    let response = &config.response;
    if response.chunk_size == 0 {
        errors.push(ValidationError::new(
            "response.chunk_size",
            "must be greater than 0",
        ));
    }
    if response.max_retained_capacity < response.chunk_size {
        errors.push(ValidationError::new(
            "response.max_retained_capacity",
            "must be at least response.chunk_size",
        ));
    }

    if config.observability.log_level.trim().is_empty() {
        errors.push(ValidationError::new(
            "observability.log_level",
            "must not be empty",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::InMemoryLogConfig;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(validate_config(&ServerConfig::default()), Ok(()));
    }

    #[test]
    fn bind_address_forms() {
        assert_eq!(
            parse_bind_address("127.0.0.1", 80).unwrap(),
            "127.0.0.1:80".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(
            parse_bind_address("0.0.0.0:8080", 80).unwrap(),
            "0.0.0.0:8080".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(
            parse_bind_address("::1", 9000).unwrap(),
            "[::1]:9000".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(
            parse_bind_address("[::1]", 9000).unwrap(),
            "[::1]:9000".parse::<SocketAddr>().unwrap()
        );
        assert!(parse_bind_address("localhost:80", 80).is_err());
        assert!(parse_bind_address("10.0.0.1:99999", 80).is_err());
    }

    #[test]
    fn collects_every_error() {
        let mut config = ServerConfig::default();
        config.listener.bind_addresses = vec!["127.0.0.1".into(), "nope".into()];
        config.listener.max_connections = 0;
        config.logging.in_memory = Some(InMemoryLogConfig {
            capacity: 0,
            route: "log".into(),
        });
        config.response.chunk_size = 0;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            [
                "listener.bind_addresses[1]",
                "listener.max_connections",
                "logging.in_memory.capacity",
                "logging.in_memory.route",
                "response.chunk_size",
            ]
        );
    }
}
