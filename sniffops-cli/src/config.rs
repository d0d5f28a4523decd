// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


//! Dashboard configuration
//!
//! Layered as defaults, then the TOML file, then environment variables.
//! Command-line flags are applied on top by the caller.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sniffops_client::DEFAULT_BASE_URL;
use sniffops_query::{PageSize, StatsPeriod};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_API_URL: &str = "SNIFFOPS_API_URL";
pub const ENV_TIMEOUT_SECS: &str = "SNIFFOPS_TIMEOUT_SECS";
pub const ENV_PAGE_SIZE: &str = "SNIFFOPS_PAGE_SIZE";
pub const ENV_SOURCE: &str = "SNIFFOPS_SOURCE";

/// SniffOps dashboard configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct DashboardConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub view: ViewConfig,
    #[serde(default)]
    pub source: SourceConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ApiConfig {
    /// Dashboard API address (e.g., "http://127.0.0.1:9090")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ViewConfig {
    /// Rows per table page; one of 10, 25, 50, 100
    #[serde(default)]
    pub page_size: PageSize,

    /// Look-back window for `stats` when no period is given
    #[serde(default)]
    pub stats_period: StatsPeriod,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub mode: SourceMode,
}

/// Where traces come from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    /// The dashboard REST API
    #[default]
    Http,
    /// Built-in sample data, no network
    Fixture,
}

impl std::str::FromStr for SourceMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(SourceMode::Http),
            "fixture" => Ok(SourceMode::Fixture),
            other => anyhow::bail!("unknown source mode: {}", other),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl DashboardConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Invalid config file {:?}", path))?;
        Ok(config)
    }

    /// `~/.config/sniffops/dashboard.toml` on Linux
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("sniffops").join("dashboard.toml"))
    }

    /// Load with file, then environment overrides, over defaults.
    ///
    /// An explicitly given file must exist; the default path is optional.
    pub fn load(config_file: Option<PathBuf>) -> Result<Self> {
        let mut config = match config_file {
            Some(path) => {
                tracing::info!("Loading configuration from file: {:?}", path);
                Self::from_file(&path)?
            }
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => {
                    tracing::info!("Loading configuration from file: {:?}", path);
                    Self::from_file(&path)?
                }
                None => Self::default(),
            },
        };

        config.merge_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply environment overrides. Unparseable values are ignored.
    ///
    /// Supported environment variables:
    /// - SNIFFOPS_API_URL: dashboard API address
    /// - SNIFFOPS_TIMEOUT_SECS: request timeout in seconds
    /// - SNIFFOPS_PAGE_SIZE: rows per page (10, 25, 50 or 100)
    /// - SNIFFOPS_SOURCE: `http` or `fixture`
    pub fn merge_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_API_URL) {
            self.api.base_url = url;
        }

        if let Some(timeout) = lookup(ENV_TIMEOUT_SECS) {
            match timeout.trim().parse() {
                Ok(val) => self.api.timeout_secs = val,
                Err(_) => tracing::warn!("Ignoring {}={:?}", ENV_TIMEOUT_SECS, timeout),
            }
        }

        if let Some(size) = lookup(ENV_PAGE_SIZE) {
            match size.trim().parse::<u32>().ok().and_then(PageSize::new) {
                Some(val) => self.view.page_size = val,
                None => tracing::warn!("Ignoring {}={:?}", ENV_PAGE_SIZE, size),
            }
        }

        if let Some(mode) = lookup(ENV_SOURCE) {
            match mode.parse() {
                Ok(val) => self.source.mode = val,
                Err(_) => tracing::warn!("Ignoring {}={:?}", ENV_SOURCE, mode),
            }
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let url = self.api.base_url.trim();
        if url.is_empty() {
            anyhow::bail!("api.base_url must not be empty");
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            anyhow::bail!("api.base_url must be an http(s) URL, got {:?}", url);
        }
        if self.api.timeout_secs == 0 {
            anyhow::bail!("api.timeout_secs must be greater than zero");
        }
        Ok(())
    }
}
