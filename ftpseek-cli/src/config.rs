//! Configuration file handling
//!
//! The config file is optional JSON stored in `config.json` under the
//! platform config directory. Every field is optional; command-line flags take
//! precedence over the file, and built-in defaults fill whatever is left.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use ftpseek_common::{
    ANONYMOUS_PASSWORD, ANONYMOUS_USER, Credentials, DEFAULT_FTP_PORT, DEFAULT_MAX_SESSIONS,
    DEFAULT_SESSION_TIMEOUT, ServerEndpoint, ValidationError,
};

use crate::args::Args;

/// Directory under the platform config dir
const APP_DIR_NAME: &str = "ftpseek";

/// Config file name
const CONFIG_FILE_NAME: &str = "config.json";

/// Error loading or applying the configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no server given; pass --host or set \"host\" in the config file")]
    MissingHost,

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Contents of the config file
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Concurrent connections the server accepts from one address
    pub max_connections: Option<usize>,
    pub timeout_secs: Option<u64>,
    /// Filename → directory where it is expected
    pub hints: BTreeMap<String, String>,
}

// Custom Debug implementation that redacts the password
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("max_connections", &self.max_connections)
            .field("timeout_secs", &self.timeout_secs)
            .field("hints", &self.hints)
            .finish()
    }
}

impl Config {
    /// Get the platform-specific config file path
    ///
    /// Returns None if the config directory cannot be determined.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load the config file
    ///
    /// An explicit path must exist. The default path is optional: if it is
    /// missing, or the config directory cannot be determined, the defaults are
    /// used.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Read` or `ConfigError::Parse` if a file that
    /// should be used cannot be read or is not valid JSON.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::load_from(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::load_from(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    /// Load the config file at `path`
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Build the server endpoint from flags, this config and the defaults
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingHost` if no hostname was given anywhere,
    /// or `ConfigError::Validation` if the result is not a valid endpoint.
    pub fn endpoint(&self, args: &Args) -> Result<ServerEndpoint, ConfigError> {
        let host = args
            .host
            .clone()
            .or_else(|| self.host.clone())
            .ok_or(ConfigError::MissingHost)?;

        let credentials = Credentials::new(
            args.user
                .clone()
                .or_else(|| self.username.clone())
                .unwrap_or_else(|| ANONYMOUS_USER.to_string()),
            args.password
                .clone()
                .or_else(|| self.password.clone())
                .unwrap_or_else(|| ANONYMOUS_PASSWORD.to_string()),
        );

        let max_sessions = args
            .max_connections
            .or(self.max_connections)
            .unwrap_or(DEFAULT_MAX_SESSIONS);
        let port = args.port.or(self.port).unwrap_or(DEFAULT_FTP_PORT);
        let timeout = args
            .timeout
            .or(self.timeout_secs)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_SESSION_TIMEOUT);

        let endpoint = ServerEndpoint::new(host, credentials, max_sessions)?
            .with_port(port)
            .with_timeout(timeout)?;
        Ok(endpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use ftpseek_common::validators::HostnameError;
    use tempfile::TempDir;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["ftpseek", "co2.txt"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    fn write_config(dir: &TempDir, json: &str) -> PathBuf {
        let path = dir.path().join("config.json");
        fs::write(&path, json).unwrap();
        path
    }

    // =========================================================================
    // Loading
    // =========================================================================

    #[test]
    fn test_load_full_config() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"{
                "host": "aftp.cmdl.noaa.gov",
                "port": 2121,
                "username": "alice",
                "password": "secret",
                "max_connections": 3,
                "timeout_secs": 20,
                "hints": { "co2_weekly_mlo.txt": "/products/trends/co2" }
            }"#,
        );

        let config = Config::load(Some(path.as_path())).unwrap();
        assert_eq!(config.host.as_deref(), Some("aftp.cmdl.noaa.gov"));
        assert_eq!(config.port, Some(2121));
        assert_eq!(config.max_connections, Some(3));
        assert_eq!(config.timeout_secs, Some(20));
        assert_eq!(
            config.hints.get("co2_weekly_mlo.txt").map(String::as_str),
            Some("/products/trends/co2")
        );
    }

    #[test]
    fn test_missing_fields_default() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, r#"{ "host": "example.org" }"#);

        let config = Config::load(Some(path.as_path())).unwrap();
        assert_eq!(config.host.as_deref(), Some("example.org"));
        assert!(config.port.is_none());
        assert!(config.hints.is_empty());
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.json");
        assert!(matches!(
            Config::load(Some(path.as_path())),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn test_invalid_json_is_error() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "{ not json");
        let err = Config::load(Some(path.as_path())).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("config.json"));
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = Config {
            password: Some("hunter2".to_string()),
            ..Config::default()
        };
        let debug = format!("{:?}", config);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("[REDACTED]"));
    }

    // =========================================================================
    // Endpoint resolution
    // =========================================================================

    #[test]
    fn test_endpoint_defaults() {
        let config = Config {
            host: Some("aftp.cmdl.noaa.gov".to_string()),
            ..Config::default()
        };
        let endpoint = config.endpoint(&args(&[])).unwrap();

        assert_eq!(endpoint.hostname(), "aftp.cmdl.noaa.gov");
        assert_eq!(endpoint.port(), DEFAULT_FTP_PORT);
        assert_eq!(endpoint.credentials().username, ANONYMOUS_USER);
        assert_eq!(endpoint.credentials().password, ANONYMOUS_PASSWORD);
        assert_eq!(endpoint.max_sessions(), DEFAULT_MAX_SESSIONS);
        assert_eq!(endpoint.timeout(), DEFAULT_SESSION_TIMEOUT);
    }

    #[test]
    fn test_flags_override_config() {
        let config = Config {
            host: Some("config.example.org".to_string()),
            port: Some(2121),
            username: Some("config-user".to_string()),
            max_connections: Some(8),
            timeout_secs: Some(60),
            ..Config::default()
        };
        let endpoint = config
            .endpoint(&args(&[
                "--host",
                "flag.example.org",
                "--user",
                "flag-user",
                "--max-connections",
                "2",
            ]))
            .unwrap();

        assert_eq!(endpoint.hostname(), "flag.example.org");
        assert_eq!(endpoint.credentials().username, "flag-user");
        assert_eq!(endpoint.max_sessions(), 2);
        // Not overridden
        assert_eq!(endpoint.port(), 2121);
        assert_eq!(endpoint.timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_missing_host() {
        let result = Config::default().endpoint(&args(&[]));
        assert!(matches!(result, Err(ConfigError::MissingHost)));
    }

    #[test]
    fn test_invalid_host_is_validation_error() {
        let result = Config::default().endpoint(&args(&["--host=-bad.example"]));
        assert!(matches!(
            result,
            Err(ConfigError::Validation(ValidationError::Hostname {
                reason: HostnameError::MisplacedHyphen,
                ..
            }))
        ));
    }

    #[test]
    fn test_zero_connections_rejected() {
        let result = Config::default().endpoint(&args(&["--host", "example.org", "-c", "0"]));
        assert!(matches!(
            result,
            Err(ConfigError::Validation(ValidationError::MaxSessions { .. }))
        ));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let result = Config::default().endpoint(&args(&["--host", "example.org", "--timeout", "0"]));
        assert!(matches!(
            result,
            Err(ConfigError::Validation(ValidationError::ZeroTimeout))
        ));
    }
}
