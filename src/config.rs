//! Runtime configuration: an optional TOML file plus environment overrides.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::ConfigError;

pub const DEFAULT_CONFIG_FILE: &str = "spacetraveling.toml";

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Config {
    pub port: u16,
    pub prismic: PrismicConfig,
    pub site: SiteConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct PrismicConfig {
    /// Repository API root, e.g. `https://spacetraveling.cdn.prismic.io/api/v2`.
    pub endpoint: String,
    pub access_token: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct SiteConfig {
    pub document_type: String,
    /// Posts per listing page (and per "load more").
    pub page_size: u32,
    /// Page size used when enumerating detail paths to pre-render.
    pub paths_page_size: u32,
    pub revalidate_secs: u64,
    /// Serve a placeholder for paths that were not pre-rendered.
    pub fallback: bool,
    pub max_pages: usize,
    pub prerender_concurrency: usize,
    /// Most not-found or failed slugs remembered at once.
    pub missing_capacity: usize,
    pub templates_dir: Option<PathBuf>,
    pub static_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            prismic: PrismicConfig::default(),
            site: SiteConfig::default(),
        }
    }
}

impl Default for PrismicConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://spacetraveling.cdn.prismic.io/api/v2".to_string(),
            access_token: None,
            timeout_secs: 10,
        }
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            document_type: "publication".to_string(),
            page_size: 1,
            paths_page_size: 20,
            revalidate_secs: 60 * 60 * 24,
            fallback: true,
            max_pages: 50,
            prerender_concurrency: 4,
            missing_capacity: 1024,
            templates_dir: None,
            static_dir: PathBuf::from("static"),
        }
    }
}

impl Config {
    /// Reads `path` when it exists (defaults otherwise) and applies the
    /// process environment on top.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::load_with_env(path, |name| std::env::var(name).ok())
    }

    fn load_with_env(
        path: &Path,
        var: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            info!(path = %path.display(), "loading config file");
            let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.display().to_string(),
                source,
            })?;
            Self::from_toml(&raw)?
        } else {
            debug!(path = %path.display(), "no config file, using defaults");
            Self::default()
        };
        config.apply_env(var)?;
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(port) = var("PORT") {
            self.port = port
                .parse()
                .map_err(|_| ConfigError::InvalidEnv { name: "PORT", value: port })?;
        }
        if let Some(endpoint) = var("PRISMIC_API_ENDPOINT") {
            self.prismic.endpoint = endpoint;
        }
        if let Some(token) = var("PRISMIC_ACCESS_TOKEN") {
            self.prismic.access_token = Some(token).filter(|t| !t.is_empty());
        }
        Ok(())
    }
}
