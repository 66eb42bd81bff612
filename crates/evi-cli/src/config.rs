//! Configuration loading and management.

use std::path::{Path, PathBuf};

use evi_core::{ExportNameOptions, Frame};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Samples per second used to convert frames to real time.
    pub sample_rate: f64,
    /// Field separator for delimited export.
    pub delimiter: String,
    /// Spacing of gap-fill rows in delimited export. No fill when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_resolution: Option<Frame>,
    pub value_attribute: String,
    pub level_attribute: String,
    pub uri_attribute: String,
}

impl Default for Config {
    fn default() -> Self {
        let names = ExportNameOptions::default();
        Self {
            sample_rate: 44_100.0,
            delimiter: ",".to_string(),
            fill_resolution: None,
            value_attribute: names.value_attribute,
            level_attribute: names.level_attribute,
            uri_attribute: names.uri_attribute,
        }
    }
}

impl Config {
    /// Loads configuration from default locations, then `config_path` if
    /// given, then `EVI_*` environment variables.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // EVI_SAMPLE_RATE, EVI_DELIMITER, ...
        figment = figment.merge(Env::prefixed("EVI_"));

        figment.extract()
    }

    /// XML attribute names configured for this run.
    pub fn export_names(&self) -> ExportNameOptions {
        ExportNameOptions {
            value_attribute: self.value_attribute.clone(),
            level_attribute: self.level_attribute.clone(),
            uri_attribute: self.uri_attribute.clone(),
        }
    }
}

/// Returns the platform-specific config directory for evi.
///
/// On Linux: `~/.config/evi`
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("evi"))
}
