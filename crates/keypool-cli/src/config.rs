//! CLI configuration file support
//!
//! Loads configuration from ~/.config/keypool/config.toml. Flags and
//! environment variables take precedence over the file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    #[serde(default)]
    pub default: DefaultConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefaultConfig {
    /// Server to talk to when `--server` is not given
    pub server_url: Option<String>,
    pub admin_token: Option<String>,
    /// Provider used by `check` when `--provider` is not given
    pub provider: Option<String>,
}

impl CliConfig {
    pub fn load() -> Self {
        match Self::default_path() {
            Some(path) => Self::load_from_path(&path),
            None => Self::default(),
        }
    }

    pub fn load_from_path(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("keypool").join("config.toml"))
    }

    pub fn server_url(&self, flag: Option<String>) -> Option<String> {
        non_blank(flag).or_else(|| non_blank(self.default.server_url.clone()))
    }

    pub fn admin_token(&self, flag: Option<String>) -> Option<String> {
        non_blank(flag).or_else(|| non_blank(self.default.admin_token.clone()))
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
