//! Configuration loading for finality-watcher.
//!
//! Configuration is loaded from a TOML file (default: `watcher.toml`).
//! Every section and field is optional.

use finality_core::Deadlines;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default config file looked up when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "watcher.toml";

/// Root configuration for finality-watcher.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Control channel server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Timer and deadline configuration.
    #[serde(default)]
    pub schedule: ScheduleConfig,
    /// Outbound HTTP configuration.
    #[serde(default)]
    pub http: HttpConfig,
    /// Transaction submission configuration.
    #[serde(default)]
    pub submit: SubmitConfig,
}

/// Control channel server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address for the control channel (default: 0.0.0.0:6666).
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

/// Timer and deadline configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    /// Chain info refresh interval in milliseconds (default: 2000).
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,
    /// Per-watch poll interval in milliseconds (default: 1000).
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Consistency check interval in milliseconds (default: 10000).
    #[serde(default = "default_check_interval_ms")]
    pub check_interval_ms: u64,
    /// Age after which ambiguous watches are classified (default: 20).
    #[serde(default = "default_soft_deadline_secs")]
    pub soft_deadline_secs: u64,
    /// Age after which a watch aborts the run (default: 200).
    #[serde(default = "default_hard_deadline_secs")]
    pub hard_deadline_secs: u64,
}

/// Outbound HTTP configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Timeout for a single node request in milliseconds (default: 5000).
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

/// Transaction submission configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitConfig {
    /// Submission endpoint used when a run request names none.
    #[serde(default = "default_submit_url")]
    pub default_url: String,
}

// Default value functions
fn default_bind_address() -> String {
    "0.0.0.0:6666".to_string()
}

fn default_refresh_interval_ms() -> u64 {
    2000
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_check_interval_ms() -> u64 {
    10_000
}

fn default_soft_deadline_secs() -> u64 {
    20
}

fn default_hard_deadline_secs() -> u64 {
    200
}

fn default_request_timeout_ms() -> u64 {
    5000
}

fn default_submit_url() -> String {
    "http://127.0.0.1:8888".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            refresh_interval_ms: default_refresh_interval_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            check_interval_ms: default_check_interval_ms(),
            soft_deadline_secs: default_soft_deadline_secs(),
            hard_deadline_secs: default_hard_deadline_secs(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl Default for SubmitConfig {
    fn default() -> Self {
        Self {
            default_url: default_submit_url(),
        }
    }
}

impl ScheduleConfig {
    /// Soft and hard deadlines.
    pub fn deadlines(&self) -> Deadlines {
        Deadlines {
            soft: Duration::from_secs(self.soft_deadline_secs),
            hard: Duration::from_secs(self.hard_deadline_secs),
        }
    }
}

impl HttpConfig {
    /// Per-request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// schedule is unusable.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, else `watcher.toml` if present, else defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.exists() {
                    Self::from_file(fallback)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Reject zero intervals and a hard deadline below the soft one.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.schedule;
        for (name, value) in [
            ("refresh_interval_ms", s.refresh_interval_ms),
            ("poll_interval_ms", s.poll_interval_ms),
            ("check_interval_ms", s.check_interval_ms),
            ("request_timeout_ms", self.http.request_timeout_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{name} must be positive")));
            }
        }

        if s.hard_deadline_secs < s.soft_deadline_secs {
            return Err(ConfigError::Invalid(format!(
                "hard_deadline_secs ({}) is below soft_deadline_secs ({})",
                s.hard_deadline_secs, s.soft_deadline_secs
            )));
        }

        Ok(())
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
    /// Values parsed but make no sense together.
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert_eq!(config.server.bind_address, "0.0.0.0:6666");
        assert_eq!(config.schedule.poll_interval_ms, 1000);
        assert_eq!(config.schedule.deadlines(), Deadlines::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_from_toml_string() {
        let toml = r#"
[server]
bind_address = "127.0.0.1:7000"

[schedule]
poll_interval_ms = 500
soft_deadline_secs = 30
hard_deadline_secs = 120

[http]
request_timeout_ms = 1500

[submit]
default_url = "http://10.0.0.1:8888"
"#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.bind_address, "127.0.0.1:7000");
        assert_eq!(config.schedule.poll_interval_ms, 500);
        assert_eq!(config.schedule.refresh_interval_ms, 2000);
        assert_eq!(
            config.schedule.deadlines().soft,
            Duration::from_secs(30)
        );
        assert_eq!(config.http.request_timeout(), Duration::from_millis(1500));
        assert_eq!(config.submit.default_url, "http://10.0.0.1:8888");
    }

    #[test]
    fn config_missing_sections_use_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.schedule.check_interval_ms, 10_000);
        assert_eq!(config.schedule.hard_deadline_secs, 200);
        assert_eq!(config.submit.default_url, "http://127.0.0.1:8888");
    }

    #[test]
    fn example_config_matches_defaults() {
        let config: Config = toml::from_str(include_str!("../../watcher.example.toml")).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.bind_address, Config::default().server.bind_address);
        assert_eq!(config.schedule.deadlines(), Deadlines::default());
    }

    #[test]
    fn zero_interval_is_invalid() {
        let config: Config = toml::from_str("[schedule]\npoll_interval_ms = 0\n").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn hard_below_soft_is_invalid() {
        let config: Config = toml::from_str(
            "[schedule]\nsoft_deadline_secs = 50\nhard_deadline_secs = 10\n",
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn from_file_reads_and_reports_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nbind_address = \"127.0.0.1:1\"").unwrap();
        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.server.bind_address, "127.0.0.1:1");

        let missing = Config::from_file(Path::new("/nonexistent/watcher.toml"));
        assert!(matches!(missing, Err(ConfigError::ReadError { .. })));

        let mut bad = tempfile::NamedTempFile::new().unwrap();
        writeln!(bad, "[server\n").unwrap();
        assert!(matches!(
            Config::from_file(bad.path()),
            Err(ConfigError::ParseError { .. })
        ));
    }
}
