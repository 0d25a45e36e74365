use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

use log::info;
use serde::{Deserialize, Serialize};

use crate::modules::contract::{
    ANALYZE_CONTENT_PATH, CLAIM_OFFER_PATH, CSRF_COOKIE, FETCH_PROFILE_PATH,
};
use crate::modules::error::DashboardError;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct DashboardConfig {
    pub base_url: String,
    pub csrf_cookie: String,
    /// Page loaded to build the page model, relative to `base_url`.
    pub page_path: String,
    pub endpoints: Endpoints,
    pub timings: Timings,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000/".to_string(),
            csrf_cookie: CSRF_COOKIE.to_string(),
            page_path: "/dashboard/".to_string(),
            endpoints: Endpoints::default(),
            timings: Timings::default(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct Endpoints {
    pub fetch_profile: String,
    pub analyze_content: String,
    pub claim_offer: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            fetch_profile: FETCH_PROFILE_PATH.to_string(),
            analyze_content: ANALYZE_CONTENT_PATH.to_string(),
            claim_offer: CLAIM_OFFER_PATH.to_string(),
        }
    }
}

impl Endpoints {
    pub fn claim_path(&self, offer_id: &str) -> String {
        self.claim_offer.replace("{offer_id}", offer_id)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct Timings {
    pub debounce_ms: u64,
    pub min_username_len: usize,
    pub alert_timeout_ms: u64,
    pub reload_delay_ms: u64,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            debounce_ms: 1500,
            min_username_len: 3,
            alert_timeout_ms: 5000,
            reload_delay_ms: 1500,
        }
    }
}

impl Timings {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn alert_timeout(&self) -> Duration {
        Duration::from_millis(self.alert_timeout_ms)
    }

    pub fn reload_delay(&self) -> Duration {
        Duration::from_millis(self.reload_delay_ms)
    }
}

pub fn load_config(path: impl AsRef<Path>) -> Result<DashboardConfig, DashboardError> {
    let text = fs::read_to_string(path)?;
    let config: DashboardConfig = toml::from_str(&text)?;
    Ok(config)
}

/// Like [`load_config`], but a missing file yields the defaults.
pub fn load_config_or_default(path: impl AsRef<Path>) -> Result<DashboardConfig, DashboardError> {
    let path = path.as_ref();
    match load_config(path) {
        Ok(config) => Ok(config),
        Err(DashboardError::Io(err)) if err.kind() == io::ErrorKind::NotFound => {
            info!("no config at {}, using defaults", path.display());
            Ok(DashboardConfig::default())
        }
        Err(err) => Err(err),
    }
}

pub fn save_config(path: impl AsRef<Path>, config: &DashboardConfig) -> Result<(), DashboardError> {
    let toml_str = toml::to_string_pretty(config)?;
    fs::write(path, toml_str)?;
    Ok(())
}
