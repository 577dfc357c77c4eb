//! Server configuration, parsed from the command line.

use crate::storage::ReclaimConfig;
use crate::{DEFAULT_HOST, DEFAULT_PORT};
use clap::Parser;
use std::time::Duration;

/// Command-line configuration for the server
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "emberkv")]
#[command(version)]
#[command(about = "An in-memory key-value cache speaking a simplified Redis protocol", long_about = None)]
pub struct Config {
    /// Host to bind to
    #[arg(long, default_value = DEFAULT_HOST)]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Milliseconds between sweeps for expired keys
    #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(u64).range(1..))]
    pub sweep_interval_ms: u64,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            sweep_interval_ms: 100,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Returns the bind address as a string
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn reclaim_config(&self) -> ReclaimConfig {
        ReclaimConfig {
            interval: Duration::from_millis(self.sweep_interval_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_parsed_defaults() {
        let parsed = Config::try_parse_from(["emberkv"]).unwrap();
        assert_eq!(parsed, Config::default());
        assert_eq!(parsed.bind_address(), "127.0.0.1:6379");
        assert_eq!(parsed.reclaim_config(), ReclaimConfig::default());
    }

    #[test]
    fn test_parse_overrides() {
        let parsed = Config::try_parse_from([
            "emberkv",
            "--host",
            "0.0.0.0",
            "-p",
            "6380",
            "--sweep-interval-ms",
            "10",
            "--log-level",
            "debug",
        ])
        .unwrap();

        assert_eq!(parsed.bind_address(), "0.0.0.0:6380");
        assert_eq!(parsed.reclaim_config().interval, Duration::from_millis(10));
        assert_eq!(parsed.log_level, "debug");
    }

    #[test]
    fn test_rejects_zero_interval() {
        assert!(Config::try_parse_from(["emberkv", "--sweep-interval-ms", "0"]).is_err());
    }

    #[test]
    fn test_rejects_bad_port() {
        assert!(Config::try_parse_from(["emberkv", "--port", "notaport"]).is_err());
    }
}
