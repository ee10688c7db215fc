//! Server configuration.
//!
//! Values come from the environment first and are then overridden by any
//! command-line flags that were given.

use std::path::PathBuf;

use crate::cli::ServeArgs;
use crate::core::tables::DEFAULT_DATA_DIR;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory holding the tax bracket and RMD lookup files.
    pub data_dir: PathBuf,
    /// Directory exported spreadsheets are written to and served from.
    pub output_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            output_dir: PathBuf::from("."),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset or unparsable values keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            host: lookup("SS_HOST").unwrap_or(defaults.host),
            port: lookup("SS_PORT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            data_dir: lookup("SS_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            output_dir: lookup("SS_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
        }
    }

    pub fn with_overrides(mut self, args: &ServeArgs) -> Self {
        if let Some(host) = &args.host {
            self.host = host.clone();
        }
        if let Some(port) = args.port {
            self.port = port;
        }
        if let Some(dir) = &args.data_dir {
            self.data_dir = dir.clone();
        }
        if let Some(dir) = &args.output_dir {
            self.output_dir = dir.clone();
        }
        self
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::AssumptionArgs;
    use std::collections::HashMap;

    #[test]
    fn from_lookup_reads_known_keys_and_ignores_bad_port() {
        let env = HashMap::from([
            ("SS_HOST", "127.0.0.1"),
            ("SS_PORT", "not-a-port"),
            ("SS_OUTPUT_DIR", "/tmp/exports"),
        ]);
        let config = ServerConfig::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.data_dir, PathBuf::from(DEFAULT_DATA_DIR));
        assert_eq!(config.output_dir, PathBuf::from("/tmp/exports"));
    }

    #[test]
    fn flags_override_environment() {
        let env = HashMap::from([("SS_PORT", "9000"), ("SS_DATA_DIR", "/srv/tables")]);
        let args = ServeArgs {
            host: None,
            port: Some(8123),
            data_dir: None,
            output_dir: Some(PathBuf::from("out")),
            assumptions: AssumptionArgs::default(),
        };
        let config =
            ServerConfig::from_lookup(|k| env.get(k).map(|v| v.to_string())).with_overrides(&args);
        assert_eq!(config.port, 8123);
        assert_eq!(config.data_dir, PathBuf::from("/srv/tables"));
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.bind_addr(), "0.0.0.0:8123");
    }
}
