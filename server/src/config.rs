use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerConfigError {
    #[error("{name} must be a valid {expected}, got '{value}'")]
    InvalidVar {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Server configuration from environment variables.
///
/// | Env Var              | Default                        |
/// |----------------------|--------------------------------|
/// | `NANOBATCH_HOST`     | `127.0.0.1`                    |
/// | `NANOBATCH_PORT`     | `3001`                         |
/// | `NANOBATCH_CONFIG`   | `~/.nano-batch/config.json`    |
/// | `NANOBATCH_LOG_JSON` | unset (human-readable logs)    |
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    pub settings_path: Option<PathBuf>,
    pub log_json: bool,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ServerConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ServerConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = match lookup("NANOBATCH_HOST") {
            Some(value) => value.trim().parse().map_err(|_| ServerConfigError::InvalidVar {
                name: "NANOBATCH_HOST",
                expected: "IP address",
                value,
            })?,
            None => IpAddr::from([127, 0, 0, 1]),
        };

        let port = match lookup("NANOBATCH_PORT") {
            Some(value) => value.trim().parse().map_err(|_| ServerConfigError::InvalidVar {
                name: "NANOBATCH_PORT",
                expected: "port number",
                value,
            })?,
            None => 3001,
        };

        let settings_path = lookup("NANOBATCH_CONFIG")
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .map(PathBuf::from);

        let log_json = lookup("NANOBATCH_LOG_JSON")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            host,
            port,
            settings_path,
            log_json,
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
