use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::client::Credentials;

/// Salsa account settings (`[salsa]` section in config.toml).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalsaSettings {
    /// Salsa host, e.g. `https://salsa4.salsalabs.com`.
    #[serde(default)]
    pub host: String,
    /// API user email.
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
    /// Needed only when the API user can access more than one organization.
    #[serde(default)]
    pub organization_key: Option<String>,
    /// Needed only when the organization has several chapters. Ignored without `organization_key`.
    #[serde(default)]
    pub chapter_key: Option<String>,
}

impl SalsaSettings {
    /// Login credentials; the chapter key is dropped when no organization key is set.
    pub fn credentials(&self) -> Credentials {
        let organization_key = self
            .organization_key
            .clone()
            .filter(|k| !k.trim().is_empty());
        let chapter_key = if organization_key.is_some() {
            self.chapter_key.clone().filter(|k| !k.trim().is_empty())
        } else {
            None
        };
        Credentials {
            host: self.host.trim().to_string(),
            user: self.user.clone(),
            password: self.password.clone(),
            organization_key,
            chapter_key,
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.host.trim().is_empty() && !self.user.is_empty() && !self.password.is_empty()
    }
}

/// Global configuration loaded from `~/.config/salsa-bridge/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub salsa: SalsaSettings,
    /// Send mapped fields even when their value is empty, clearing what Salsa has stored.
    #[serde(default = "default_override_empty_fields")]
    pub override_empty_fields: bool,
    /// Connect timeout for Salsa requests, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Whole-request timeout for Salsa requests, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// How long a fetched group list stays cached, in seconds.
    #[serde(default = "default_group_cache_ttl_secs")]
    pub group_cache_ttl_secs: u64,
}

fn default_override_empty_fields() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    5
}

fn default_group_cache_ttl_secs() -> u64 {
    24 * 60 * 60
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            salsa: SalsaSettings::default(),
            override_empty_fields: default_override_empty_fields(),
            connect_timeout_secs: default_timeout_secs(),
            timeout_secs: default_timeout_secs(),
            group_cache_ttl_secs: default_group_cache_ttl_secs(),
        }
    }
}

impl BridgeConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn group_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.group_cache_ttl_secs)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("salsa-bridge")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<BridgeConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = BridgeConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from_path(&path)
}

/// Load configuration from an explicit path; the file must exist.
pub fn load_from_path(path: &Path) -> Result<BridgeConfig> {
    let data =
        fs::read_to_string(path).with_context(|| format!("read config: {}", path.display()))?;
    let cfg: BridgeConfig =
        toml::from_str(&data).with_context(|| format!("parse config: {}", path.display()))?;
    Ok(cfg)
}
