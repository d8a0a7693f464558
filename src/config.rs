// Configuration for speech-data
// Reads the store location and training host settings from the environment (.env supported)

use std::path::PathBuf;

use thiserror::Error;

use crate::training::{RemoteShellSubmitter, SshShell, TrainingJobSubmitter, WatchDirSubmitter};

const DEFAULT_DB_PATH: &str = "speech_data.db";
const DEFAULT_WATCH_DIR: &str = "Data/dev/watch";
const DEFAULT_CONTROL_FILE: &str = "labels.csv";
const DEFAULT_SSH_PORT: u16 = 22;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid value '{value}' for {var}")]
    Invalid { var: &'static str, value: String },
}

/// How training jobs reach the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitMode {
    /// Control file written over SSH on the GPU host
    Ssh,
    /// Control file written into a locally mounted watch directory
    WatchDir,
}

/// Connection settings for the GPU host
#[derive(Clone, PartialEq, Eq)]
pub struct TrainingHostConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: Option<String>,
    pub connect_timeout_secs: u64,
}

// Keep the password out of logs
impl std::fmt::Debug for TrainingHostConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrainingHostConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_path: PathBuf,
    pub submit_mode: SubmitMode,
    /// Present in SSH mode
    pub training_host: Option<TrainingHostConfig>,
    /// Remote path in SSH mode, local path in watch-dir mode
    pub watch_dir: String,
    pub control_file_name: String,
}

impl Config {
    /// Load from the process environment, after applying a `.env` file if present
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            log::debug!("Loaded environment from {:?}", path);
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key/value source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let submit_mode = match get("TRAINING_SUBMIT_MODE").as_deref() {
            None | Some("ssh") => SubmitMode::Ssh,
            Some("watch-dir") => SubmitMode::WatchDir,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "TRAINING_SUBMIT_MODE",
                    value: other.to_string(),
                })
            }
        };

        let training_host = match submit_mode {
            SubmitMode::Ssh => Some(TrainingHostConfig {
                host: get("GPU_HOST").ok_or(ConfigError::Missing("GPU_HOST"))?,
                port: parse_or(get("GPU_PORT"), "GPU_PORT", DEFAULT_SSH_PORT)?,
                username: get("GPU_USERNAME").ok_or(ConfigError::Missing("GPU_USERNAME"))?,
                password: get("GPU_PASSWORD"),
                connect_timeout_secs: parse_or(
                    get("GPU_CONNECT_TIMEOUT_SECS"),
                    "GPU_CONNECT_TIMEOUT_SECS",
                    DEFAULT_CONNECT_TIMEOUT_SECS,
                )?,
            }),
            SubmitMode::WatchDir => None,
        };

        Ok(Self {
            database_path: get("SPEECH_DATA_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH)),
            submit_mode,
            training_host,
            watch_dir: get("TRAINING_WATCH_DIR").unwrap_or_else(|| DEFAULT_WATCH_DIR.to_string()),
            control_file_name: get("TRAINING_CONTROL_FILE")
                .unwrap_or_else(|| DEFAULT_CONTROL_FILE.to_string()),
        })
    }

    /// The submitter matching the configured mode
    pub fn build_submitter(&self) -> Result<Box<dyn TrainingJobSubmitter>, ConfigError> {
        match self.submit_mode {
            SubmitMode::Ssh => {
                let host = self
                    .training_host
                    .as_ref()
                    .ok_or(ConfigError::Missing("GPU_HOST"))?;
                Ok(Box::new(RemoteShellSubmitter::new(
                    SshShell::new(host),
                    self.watch_dir.clone(),
                    self.control_file_name.clone(),
                )))
            }
            SubmitMode::WatchDir => Ok(Box::new(WatchDirSubmitter::new(
                self.watch_dir.clone(),
                self.control_file_name.clone(),
            ))),
        }
    }
}

fn parse_or<T: std::str::FromStr>(
    value: Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value: raw }),
    }
}
