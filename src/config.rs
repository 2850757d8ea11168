use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use clap::Parser;
use directories::ProjectDirs;
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::counts::RefreshInterval;

const CONFIG_FILE: &str = "config.json";
const STATE_FILE: &str = "state.json";
const LOG_FILE: &str = "fleetop.log";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{0}")]
    InvalidRefresh(String),
    #[error("unknown log level {0:?}")]
    InvalidLogLevel(String),
    #[error("request timeout must be at least one second")]
    InvalidTimeout,
}

/// Command line flags. Every flag overrides the matching config file entry.
#[derive(Debug, Default, Parser)]
#[command(name = "fleetop", version, about)]
pub struct Cli {
    /// Config file, defaults to the per-user config directory
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Base URL of the management API, e.g. http://localhost:9090/api/v1
    #[arg(long)]
    pub server_url: Option<String>,
    /// Default rows per page
    #[arg(long)]
    pub page_size: Option<usize>,
    /// Per-request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,
    /// Container count refresh interval in seconds (30, 60, 120, 180, 300 or 0)
    #[arg(long)]
    pub refresh: Option<u64>,
    #[arg(long)]
    pub log_file: Option<PathBuf>,
    /// off, error, warn, info, debug or trace
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub server_url: String,
    pub page_size: usize,
    pub refresh_interval: RefreshInterval,
    pub request_timeout_secs: u64,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
    pub state_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:9090/api/v1".to_string(),
            page_size: 10,
            refresh_interval: RefreshInterval::default(),
            request_timeout_secs: 15,
            log_level: "info".to_string(),
            log_file: None,
            state_file: None,
        }
    }
}

impl Config {
    /// Config file (if any) with the command line applied on top.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let mut config = match &cli.config {
            Some(path) => Self::from_file(path)?,
            None => match project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE)) {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };
        config.apply(cli)?;
        if config.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout);
        }
        config.log_level_filter()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn apply(&mut self, cli: &Cli) -> Result<(), ConfigError> {
        if let Some(url) = &cli.server_url {
            self.server_url = url.clone();
        }
        if let Some(size) = cli.page_size {
            self.page_size = size.max(1);
        }
        if let Some(timeout) = cli.timeout {
            self.request_timeout_secs = timeout;
        }
        if let Some(secs) = cli.refresh {
            self.refresh_interval =
                RefreshInterval::try_from(secs).map_err(ConfigError::InvalidRefresh)?;
        }
        if let Some(log_file) = &cli.log_file {
            self.log_file = Some(log_file.clone());
        }
        if let Some(level) = &cli.log_level {
            self.log_level = level.clone();
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn log_level_filter(&self) -> Result<LevelFilter, ConfigError> {
        LevelFilter::from_str(&self.log_level)
            .map_err(|_| ConfigError::InvalidLogLevel(self.log_level.clone()))
    }

    pub fn log_file_path(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| data_dir().join(LOG_FILE))
    }

    pub fn state_file_path(&self) -> PathBuf {
        self.state_file
            .clone()
            .unwrap_or_else(|| data_dir().join(STATE_FILE))
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "fleetop")
}

fn data_dir() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_local_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.request_timeout(), Duration::from_secs(15));
        assert_eq!(config.refresh_interval.as_secs(), 60);
        assert_eq!(config.log_level_filter().unwrap(), LevelFilter::Info);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"serverUrl": "https://fleet.example.com/api/v1", "refreshInterval": 120}"#,
        )
        .unwrap();

        let cli = Cli {
            config: Some(path),
            ..Default::default()
        };
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.server_url, "https://fleet.example.com/api/v1");
        assert_eq!(config.refresh_interval.as_secs(), 120);
        assert_eq!(config.page_size, 10);
    }

    #[test]
    fn command_line_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"pageSize": 50, "logLevel": "warn"}"#).unwrap();

        let cli = Cli {
            config: Some(path),
            page_size: Some(25),
            refresh: Some(0),
            log_level: Some("debug".into()),
            ..Default::default()
        };
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.page_size, 25);
        assert_eq!(config.refresh_interval, RefreshInterval::OFF);
        assert_eq!(config.log_level_filter().unwrap(), LevelFilter::Debug);
    }

    #[test]
    fn bad_values_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"refreshInterval": 45}"#).unwrap();
        let cli = Cli {
            config: Some(path.clone()),
            ..Default::default()
        };
        assert!(matches!(Config::load(&cli), Err(ConfigError::Parse { .. })));

        std::fs::write(&path, "{}").unwrap();
        let cli = Cli {
            config: Some(path.clone()),
            refresh: Some(7),
            ..Default::default()
        };
        assert!(matches!(Config::load(&cli), Err(ConfigError::InvalidRefresh(_))));

        let cli = Cli {
            config: Some(path.clone()),
            log_level: Some("loud".into()),
            ..Default::default()
        };
        assert!(matches!(Config::load(&cli), Err(ConfigError::InvalidLogLevel(_))));

        let cli = Cli {
            config: Some(path.clone()),
            timeout: Some(0),
            ..Default::default()
        };
        assert!(matches!(Config::load(&cli), Err(ConfigError::InvalidTimeout)));

        std::fs::write(&path, r#"{"requestTimeoutSecs": 0}"#).unwrap();
        let cli = Cli {
            config: Some(path.clone()),
            ..Default::default()
        };
        assert!(matches!(Config::load(&cli), Err(ConfigError::InvalidTimeout)));

        let cli = Cli {
            config: Some(dir.path().join("missing.json")),
            ..Default::default()
        };
        assert!(matches!(Config::load(&cli), Err(ConfigError::Io { .. })));
    }
}
