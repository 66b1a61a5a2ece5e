//! Server configuration, populated from environment variables.

use std::net::SocketAddr;

/// Runtime configuration for the todo server.
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | `TODO_BIND` | `127.0.0.1:$PORT` | TCP socket address to listen on |
/// | `PORT` | `3000` | Port used when `TODO_BIND` is absent |
/// | `TODO_BODY_LIMIT` | `2097152` | Largest buffered request body, in bytes |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub body_limit: usize,
}

#[derive(Debug, thiserror::Error)]
#[error("{variable} is invalid: {value:?}")]
pub struct ConfigError {
    pub variable: &'static str,
    pub value: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            body_limit: crate::adapter::BODY_LIMIT,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Reads the variables through `var`, applying defaults where absent.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind = match (var("TODO_BIND"), var("PORT")) {
            (Some(bind), _) => ("TODO_BIND", bind),
            (None, Some(port)) => ("PORT", format!("127.0.0.1:{port}")),
            (None, None) => ("TODO_BIND", "127.0.0.1:3000".to_string()),
        };
        let bind_addr = bind.1.parse().map_err(|_| ConfigError {
            variable: bind.0,
            value: bind.1.clone(),
        })?;

        let body_limit = match var("TODO_BODY_LIMIT") {
            Some(value) => value.parse().map_err(|_| ConfigError {
                variable: "TODO_BODY_LIMIT",
                value,
            })?,
            None => crate::adapter::BODY_LIMIT,
        };

        Ok(Self { bind_addr, body_limit })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        ServerConfig::from_vars(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_without_variables() {
        assert_eq!(config(&[]).unwrap(), ServerConfig::default());
    }

    #[test]
    fn port_is_used_when_bind_is_absent() {
        let config = config(&[("PORT", "8080")]).unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:8080".parse().unwrap());
    }

    #[test]
    fn bind_wins_over_port() {
        let config = config(&[("TODO_BIND", "0.0.0.0:9000"), ("PORT", "8080")]).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:9000".parse().unwrap());
    }

    #[test]
    fn invalid_values_name_their_variable() {
        let error = config(&[("TODO_BODY_LIMIT", "lots")]).unwrap_err();
        assert_eq!(error.to_string(), r#"TODO_BODY_LIMIT is invalid: "lots""#);
        assert_eq!(config(&[("PORT", "http")]).unwrap_err().variable, "PORT");
    }
}
