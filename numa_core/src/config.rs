//! Configuration file support for NUMA onboarding.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/numa/config.toml`.

use crate::{Clinician, Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub navigation: NavigationConfig,

    #[serde(default)]
    pub booking: BookingConfig,

    #[serde(default)]
    pub roster: RosterConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_draft_file")]
    pub draft_file: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            draft_file: default_draft_file(),
        }
    }
}

impl DataConfig {
    /// Full path of the draft file
    pub fn draft_path(&self) -> PathBuf {
        self.data_dir.join(&self.draft_file)
    }
}

/// Where the wizard hands control back to when it exits
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NavigationConfig {
    #[serde(default = "default_exit_destination")]
    pub exit_destination: String,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            exit_destination: default_exit_destination(),
        }
    }
}

/// Checkout parameters
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BookingConfig {
    #[serde(default = "default_meeting_base_url")]
    pub meeting_base_url: String,

    #[serde(default = "default_payment_delay_ms")]
    pub payment_delay_ms: u64,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            meeting_base_url: default_meeting_base_url(),
            payment_delay_ms: default_payment_delay_ms(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

/// Roster extensions
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct RosterConfig {
    #[serde(default)]
    pub custom: Vec<Clinician>,
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(".local/share"))
            .unwrap_or_else(|| PathBuf::from("."))
    });
    base.join("numa")
}

fn default_draft_file() -> String {
    "onboarding_draft.json".into()
}

fn default_exit_destination() -> String {
    "http://localhost:3000".into()
}

fn default_meeting_base_url() -> String {
    "https://meet.numa.care/session".into()
}

fn default_payment_delay_ms() -> u64 {
    2_000
}

fn default_poll_interval_ms() -> u64 {
    250
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            std::env::var_os("HOME")
                .map(|home| PathBuf::from(home).join(".config"))
                .unwrap_or_else(|| PathBuf::from("."))
        });
        base.join("numa").join("config.toml")
    }

    /// Reject values the wizard cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.data.draft_file.trim().is_empty() {
            return Err(Error::Config("data.draft_file must not be empty".into()));
        }
        if self.navigation.exit_destination.trim().is_empty() {
            return Err(Error::Config(
                "navigation.exit_destination must not be empty".into(),
            ));
        }
        if self.booking.meeting_base_url.trim().is_empty() {
            return Err(Error::Config(
                "booking.meeting_base_url must not be empty".into(),
            ));
        }
        if self.booking.poll_interval_ms == 0 {
            return Err(Error::Config(
                "booking.poll_interval_ms must be positive".into(),
            ));
        }
        Ok(())
    }
}
