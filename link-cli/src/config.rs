//! Configuration management for pairlink.
//!
//! Settings are loaded from a TOML file (default: `<data-dir>/pairlink.toml`).
//! The device identity lives next to it in `device.json`.

use anyhow::{Context, Result};
use link_client::{ClientConfig, DeviceId, DEFAULT_QR_BUFFER};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "pairlink.toml";
const DEVICE_FILE: &str = "device.json";

/// Root configuration for pairlink.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CliConfig {
    /// Client configuration.
    #[serde(default)]
    pub client: ClientSection,
    /// Simulated pairing server configuration.
    #[serde(default)]
    pub simulator: SimulatorSection,
}

/// Client configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSection {
    /// Pairing server address (default: pair.pairlink.local).
    #[serde(default = "default_server_address")]
    pub server_address: String,
    /// Codes buffered for a slow reader (default: 7).
    #[serde(default = "default_qr_buffer")]
    pub qr_buffer: usize,
}

/// Simulated pairing server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SimulatorSection {
    /// Codes in the batch (default: 6).
    #[serde(default = "default_code_count")]
    pub code_count: usize,
    /// How long each code is shown, in milliseconds (default: 20000).
    #[serde(default = "default_code_timeout_ms")]
    pub code_timeout_ms: u64,
    /// Platform reported for the scanning phone (default: android).
    #[serde(default = "default_platform")]
    pub platform: String,
}

// Default value functions
fn default_server_address() -> String {
    "pair.pairlink.local".to_string()
}

fn default_qr_buffer() -> usize {
    DEFAULT_QR_BUFFER
}

fn default_code_count() -> usize {
    6
}

fn default_code_timeout_ms() -> u64 {
    20_000
}

fn default_platform() -> String {
    "android".to_string()
}

impl Default for ClientSection {
    fn default() -> Self {
        Self {
            server_address: default_server_address(),
            qr_buffer: default_qr_buffer(),
        }
    }
}

impl Default for SimulatorSection {
    fn default() -> Self {
        Self {
            code_count: default_code_count(),
            code_timeout_ms: default_code_timeout_ms(),
            platform: default_platform(),
        }
    }
}

impl CliConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Load the explicit file if given, else `pairlink.toml` in the data
    /// directory if present, else defaults.
    pub fn load(explicit: Option<&Path>, data_dir: &Path) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        let path = data_dir.join(CONFIG_FILE);
        if path.exists() {
            Self::from_file(&path)
        } else {
            tracing::debug!("No {} in {}, using defaults", CONFIG_FILE, data_dir.display());
            Ok(Self::default())
        }
    }

    /// Library configuration for the client.
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(&self.client.server_address).with_qr_buffer(self.client.qr_buffer)
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
}

/// Device identity stored locally after a successful pairing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceRecord {
    /// Device identifier (base64).
    pub device_id: String,
    /// Platform of the phone this device was paired with.
    pub platform: String,
    /// When pairing completed (Unix seconds).
    pub paired_at: u64,
}

impl DeviceRecord {
    /// Create a record for a freshly paired identity.
    pub fn new(device_id: DeviceId, platform: &str) -> Self {
        Self {
            device_id: device_id.to_string(),
            platform: platform.to_string(),
            paired_at: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default(),
        }
    }

    /// Parse the stored identifier.
    pub fn device_id(&self) -> Result<DeviceId> {
        self.device_id
            .parse()
            .context("Invalid device identity in device.json")
    }

    /// Load the device record from a directory.
    pub async fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(DEVICE_FILE);
        let contents = tokio::fs::read_to_string(&path)
            .await
            .context("Not paired. Run 'pairlink pair' first.")?;
        serde_json::from_str(&contents).context("Invalid device record")
    }

    /// Load the device record if one exists.
    pub async fn load_optional(data_dir: &Path) -> Result<Option<Self>> {
        if Self::exists(data_dir).await {
            Self::load(data_dir).await.map(Some)
        } else {
            Ok(None)
        }
    }

    /// Save the device record to a directory.
    pub async fn save(&self, data_dir: &Path) -> Result<()> {
        let path = data_dir.join(DEVICE_FILE);
        let contents = serde_json::to_string_pretty(self)?;
        tokio::fs::write(&path, contents)
            .await
            .context("Failed to save device record")?;
        set_file_permissions_0600(&path).await?;
        Ok(())
    }

    /// Delete the device record. Returns false if there was none.
    pub async fn delete(data_dir: &Path) -> Result<bool> {
        if !Self::exists(data_dir).await {
            return Ok(false);
        }
        tokio::fs::remove_file(data_dir.join(DEVICE_FILE))
            .await
            .context("Failed to delete device record")?;
        Ok(true)
    }

    /// Check if a device record exists.
    pub async fn exists(data_dir: &Path) -> bool {
        data_dir.join(DEVICE_FILE).exists()
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
