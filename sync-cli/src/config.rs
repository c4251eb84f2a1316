//! Preference storage for poolsync.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use sync_client::{ClientConfig, Timing};

const PREFERENCES_FILE: &str = "preferences.json";

/// Temperature unit used for display and setpoints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum Units {
    /// Degrees Fahrenheit.
    #[default]
    #[serde(rename = "F")]
    #[value(name = "F", alias = "f")]
    Fahrenheit,
    /// Degrees Celsius.
    #[serde(rename = "C")]
    #[value(name = "C", alias = "c")]
    Celsius,
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fahrenheit => f.write_str("°F"),
            Self::Celsius => f.write_str("°C"),
        }
    }
}

/// User preferences stored locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    /// Controller host name or address.
    #[serde(default = "default_host")]
    pub host: String,
    /// Controller port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Use https/wss.
    #[serde(default)]
    pub use_tls: bool,
    /// Temperature unit.
    #[serde(default)]
    pub units: Units,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    4200
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            use_tls: false,
            units: Units::default(),
        }
    }
}

impl Preferences {
    /// Path of the preferences file inside `data_dir`.
    pub fn path(data_dir: &Path) -> PathBuf {
        data_dir.join(PREFERENCES_FILE)
    }

    /// Load preferences, falling back to defaults when none are saved.
    pub async fn load(data_dir: &Path) -> Result<Self> {
        let path = Self::path(data_dir);
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = tokio::fs::read_to_string(&path)
            .await
            .context("Failed to read preferences")?;
        serde_json::from_str(&contents).context("Invalid preferences file")
    }

    /// Save preferences to `data_dir`.
    pub async fn save(&self, data_dir: &Path) -> Result<()> {
        let path = Self::path(data_dir);
        let contents = serde_json::to_string_pretty(self)?;
        tokio::fs::write(&path, contents)
            .await
            .context("Failed to save preferences")?;
        set_file_permissions_0600(&path).await?;
        Ok(())
    }

    /// Client configuration for these preferences.
    pub fn client_config(&self, timing: Timing) -> ClientConfig {
        ClientConfig::new(&self.host, self.port, self.use_tls).with_timing(timing)
    }
}

/// Set file permissions to 0600 (owner read/write only) on Unix.
/// No-op on non-Unix platforms.
async fn set_file_permissions_0600(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
            .await
            .context("Failed to set file permissions")?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}

/// Set directory permissions to 0700 (owner only) on Unix.
/// No-op on non-Unix platforms.
pub async fn set_dir_permissions_0700(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
            .await
            .context("Failed to set directory permissions")?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}
