//! Configuration management
//!
//! This module handles loading, saving, and migrating the mtx configuration file.
//! The configuration file is stored in TOML format at ~/.config/mtx/config.toml,
//! or under `$MTX_CONFIG_DIR` when that variable is set.
//!
//! The loaded [`Config`] is turned into an immutable [`Settings`] value once at
//! start-up; engine components receive it by reference.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::exclude::ExcludedNames;
use crate::traits::{ObjectHandle, SIZE_OVERFLOW};

/// Current configuration schema version
///
/// Bumping this version requires a migration step in [`ConfigManager::load`].
pub const SCHEMA_VERSION: u32 = 1;

/// Environment variable overriding the configuration directory
pub const CONFIG_DIR_ENV: &str = "MTX_CONFIG_DIR";

/// Default output format
const DEFAULT_OUTPUT: &str = "human";

/// Default color setting
const DEFAULT_COLOR: &str = "auto";

/// Default permission mode for local directories
pub const DEFAULT_DIR_MODE: u32 = 0o755;

/// Default transfer chunk size (1 MiB)
pub const DEFAULT_CHUNK_SIZE: u32 = 1024 * 1024;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Schema version for migration support
    pub schema_version: u32,

    /// Default settings
    #[serde(default)]
    pub defaults: Defaults,

    /// Walk behavior
    #[serde(default)]
    pub walk: WalkConfig,

    /// Transfer tuning
    #[serde(default)]
    pub transfer: TransferConfig,

    /// Device selection
    #[serde(default)]
    pub device: DeviceConfig,
}

/// Default settings for CLI behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Defaults {
    /// Output format: "human" or "json"
    #[serde(default = "default_output")]
    pub output: String,

    /// Color mode: "auto", "always", or "never"
    #[serde(default = "default_color")]
    pub color: String,

    /// Show progress bars
    #[serde(default = "default_true")]
    pub progress: bool,
}

/// Walk configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkConfig {
    /// Skip OS artifact names during walks
    #[serde(default = "default_true")]
    pub skip_excluded: bool,

    /// Per-name overrides merged over the built-in exclusion set
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub excluded: BTreeMap<String, bool>,
}

/// Transfer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Bytes per transfer chunk
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u32,

    /// Permission mode for created local directories
    #[serde(default = "default_dir_mode")]
    pub dir_mode: u32,
}

/// Device configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Directory backing the mirror device
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
}

fn default_output() -> String {
    DEFAULT_OUTPUT.to_string()
}

fn default_color() -> String {
    DEFAULT_COLOR.to_string()
}

fn default_true() -> bool {
    true
}

fn default_chunk_size() -> u32 {
    DEFAULT_CHUNK_SIZE
}

fn default_dir_mode() -> u32 {
    DEFAULT_DIR_MODE
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            progress: true,
        }
    }
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            skip_excluded: true,
            excluded: BTreeMap::new(),
        }
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            dir_mode: default_dir_mode(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            defaults: Defaults::default(),
            walk: WalkConfig::default(),
            transfer: TransferConfig::default(),
            device: DeviceConfig::default(),
        }
    }
}

impl Config {
    /// Build the immutable engine settings from this configuration
    pub fn settings(&self) -> Settings {
        Settings {
            excluded: ExcludedNames::default().with_overrides(&self.walk.excluded),
            skip_excluded: self.walk.skip_excluded,
            dir_mode: self.transfer.dir_mode,
            chunk_size: self.transfer.chunk_size.max(1),
            ..Settings::default()
        }
    }
}

/// Named constants and tunables shared by the engine components
#[derive(Debug, Clone)]
pub struct Settings {
    /// Handle of the storage root
    pub root_handle: ObjectHandle,
    /// Compact size value that requires a precise size query
    pub size_overflow: u32,
    /// Names always skipped by walks
    pub excluded: ExcludedNames,
    /// Whether callers should skip excluded names by default
    pub skip_excluded: bool,
    /// Permission mode for created local directories
    pub dir_mode: u32,
    /// Bytes per transfer chunk
    pub chunk_size: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            root_handle: ObjectHandle::ROOT,
            size_overflow: SIZE_OVERFLOW,
            excluded: ExcludedNames::default(),
            skip_excluded: true,
            dir_mode: DEFAULT_DIR_MODE,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Configuration manager handles loading and saving config
#[derive(Debug)]
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager with the default config path
    pub fn new() -> Result<Self> {
        let config_dir = match std::env::var_os(CONFIG_DIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => dirs::config_dir()
                .ok_or_else(|| Error::Config("Could not determine config directory".into()))?
                .join("mtx"),
        };
        Ok(Self {
            config_path: config_dir.join("config.toml"),
        })
    }

    /// Create a ConfigManager with a custom path (useful for testing)
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the configuration file path
    pub fn config_path(&self) -> &PathBuf {
        &self.config_path
    }

    /// Load configuration from disk
    ///
    /// If the configuration file doesn't exist, returns a default configuration.
    /// If the schema version doesn't match, attempts migration.
    pub fn load(&self) -> Result<Config> {
        if !self.config_path.exists() {
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(&self.config_path)?;
        let mut config: Config = toml::from_str(&content)?;

        if config.schema_version < SCHEMA_VERSION {
            config = self.migrate(config)?;
        } else if config.schema_version > SCHEMA_VERSION {
            return Err(Error::Config(format!(
                "Configuration file version {} is newer than supported version {}. Please upgrade mtx.",
                config.schema_version, SCHEMA_VERSION
            )));
        }

        Ok(config)
    }

    /// Save configuration to disk
    ///
    /// Creates parent directories if they don't exist.
    pub fn save(&self, config: &Config) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(config)?;
        std::fs::write(&self.config_path, content)?;
        Ok(())
    }

    /// Migrate configuration from older schema version
    fn migrate(&self, mut config: Config) -> Result<Config> {
        tracing::debug!(
            from = config.schema_version,
            to = SCHEMA_VERSION,
            "migrating configuration"
        );
        config.schema_version = SCHEMA_VERSION;
        Ok(config)
    }
}
