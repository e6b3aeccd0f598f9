use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use directories::{BaseDirs, ProjectDirs};
use serde::{Deserialize, Serialize};

#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;

use crate::aws::wait::WaitOptions;
use crate::{Ec2ToolsError, Result};

/// Global settings for ec2tools
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// AWS region override; the SDK default chain applies when unset
    #[serde(default)]
    pub region: Option<String>,

    /// SSH client configuration file kept in sync with instance addresses
    #[serde(default = "default_ssh_config_path")]
    pub ssh_config_path: PathBuf,

    /// Directory where `<key-pair-name>.pem` identity files live
    #[serde(default = "default_pem_dir")]
    pub pem_dir: PathBuf,

    /// Ordered (image pattern, login username) table for username inference
    #[serde(default = "default_username_patterns")]
    pub username_patterns: Vec<(String, String)>,

    /// Seconds between state polls in the wait loop
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Seconds before the wait loop gives up
    #[serde(default = "default_wait_timeout_secs")]
    pub wait_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            region: None,
            ssh_config_path: default_ssh_config_path(),
            pem_dir: default_pem_dir(),
            username_patterns: default_username_patterns(),
            poll_interval_secs: default_poll_interval_secs(),
            wait_timeout_secs: default_wait_timeout_secs(),
        }
    }
}

impl Settings {
    /// Get the path to the config file
    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "ec2tools").map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Load settings from the config file, falling back to defaults when the
    /// file does not exist
    pub fn load() -> Result<Self> {
        let path = Self::config_path()
            .ok_or_else(|| Ec2ToolsError::Config("Cannot determine config directory".to_string()))?;

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        let settings: Settings = serde_json::from_str(&content)
            .map_err(|e| Ec2ToolsError::Config(format!("Failed to parse config file: {}", e)))?;

        Ok(settings)
    }

    /// Save settings to the config file with restricted permissions (0600)
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()
            .ok_or_else(|| Ec2ToolsError::Config("Cannot determine config directory".to_string()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;

        #[cfg(unix)]
        {
            let mut file = std::fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(&path)?;
            file.write_all(content.as_bytes())?;
        }

        #[cfg(not(unix))]
        {
            std::fs::write(&path, content)?;
        }

        Ok(())
    }

    /// Wait-loop options derived from the configured interval and timeout
    pub fn wait_options(&self, verbose: bool) -> WaitOptions {
        WaitOptions {
            timeout_secs: self.wait_timeout_secs,
            poll_interval: Duration::from_secs(self.poll_interval_secs.max(1)),
            verbose,
        }
    }
}

fn home_dir() -> PathBuf {
    BaseDirs::new()
        .map(|dirs| dirs.home_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

fn default_ssh_config_path() -> PathBuf {
    home_dir().join(".ssh").join("config")
}

fn default_pem_dir() -> PathBuf {
    home_dir().join(".ssh")
}

fn default_username_patterns() -> Vec<(String, String)> {
    vec![("^Amazon Linux.*".to_string(), "ec2-user".to_string())]
}

fn default_poll_interval_secs() -> u64 {
    1
}

fn default_wait_timeout_secs() -> u64 {
    300
}
