//! Configuration loading and validation

use airport_globe_core::{Color, PinBuilder};
use airport_globe_source::AirportDataSource;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub daemon: DaemonConfig,
    #[serde(default)]
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub marker: MarkerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Bind address for the API server
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// URL of the airport JSON array (absolute, or relative to `base_url`)
    #[serde(default = "default_dataset_url")]
    pub url: String,
    /// Base for relative dataset URLs
    #[serde(default)]
    pub base_url: Option<String>,
    /// Display name; defaults to the dataset filename
    #[serde(default)]
    pub name: Option<String>,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            url: default_dataset_url(),
            base_url: None,
            name: None,
        }
    }
}

fn default_dataset_url() -> String {
    "http://127.0.0.1:8000/airports.json".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkerConfig {
    /// Pin color as #RRGGBB or #RRGGBBAA
    #[serde(default = "default_color")]
    pub color: String,
    /// Pin size in pixels
    #[serde(default = "default_size")]
    pub size: u32,
    /// Initial marker scale; must be positive
    #[serde(default = "default_height_scale")]
    pub height_scale: f64,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            color: default_color(),
            size: default_size(),
            height_scale: default_height_scale(),
        }
    }
}

fn default_color() -> String {
    "#4169E1".to_string()
}

fn default_size() -> u32 {
    PinBuilder::DEFAULT_SIZE
}

fn default_height_scale() -> f64 {
    AirportDataSource::DEFAULT_HEIGHT_SCALE
}

impl Config {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch.timeout_secs)
    }

    /// Build the pin style from the `[marker]` section
    pub fn pin_builder(&self) -> Result<PinBuilder> {
        let color = Color::from_css_hex(&self.marker.color).context("Invalid [marker] color")?;
        Ok(PinBuilder::new(color, self.marker.size))
    }

    pub fn validate(&self) -> Result<()> {
        if self.fetch.timeout_secs == 0 {
            bail!("[fetch] timeout_secs must be greater than 0");
        }
        if self.marker.size == 0 {
            bail!("[marker] size must be greater than 0");
        }
        if !(self.marker.height_scale.is_finite() && self.marker.height_scale > 0.0) {
            bail!("[marker] height_scale must be a positive number");
        }
        self.pin_builder()?;
        Ok(())
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<Config> {
    let config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        info!(path = %path.display(), "Loaded configuration");
        config
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Config::default()
    };

    config.validate()?;
    Ok(config)
}

/// Save default configuration to file
pub fn save_default_config(path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(&Config::default())?;
    std::fs::write(path, content)?;
    Ok(())
}
