//! Configuration loading for the egoweb site service
//!
//! All components receive an explicit [`SiteConfig`]; nothing reads the
//! environment after startup. Resolution priority, highest first:
//! 1. Command-line arguments (applied by the binary)
//! 2. Environment variables
//! 3. TOML config file
//! 4. Compiled defaults

use crate::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Default content-type identifier of the site-settings singleton entry.
/// The CMS models site settings under a generated schema id rather than a
/// human-readable one.
pub const DEFAULT_SETTINGS_CONTENT_TYPE: &str = "6b7cR8MAmg1gzxiibBMiG7";

/// How the per-visitor variant decision is obtained.
///
/// Exactly one strategy is active per deployment; they are never composed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionStrategy {
    /// Request-time middleware calls the personalization service and stores
    /// the decision in short-lived cookies before rendering.
    Edge,
    /// The server always renders baseline; the client runtime owns the
    /// decision. The server only maintains the visit-count heuristic cookie.
    Client,
}

impl Default for DecisionStrategy {
    fn default() -> Self {
        DecisionStrategy::Edge
    }
}

/// HTTP server settings
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5780
}

/// CMS delivery/preview API settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CmsConfig {
    pub space_id: String,
    #[serde(default = "default_cms_environment")]
    pub environment: String,
    /// Token for the published-content API
    pub delivery_token: String,
    /// Token for the draft-content API; preview mode is unavailable without it
    #[serde(default)]
    pub preview_token: Option<String>,
    /// Reference-inclusion depth for root page queries
    #[serde(default = "default_include_depth")]
    pub include_depth: u8,
    /// Content-type id of the site-settings singleton
    #[serde(default = "default_settings_content_type")]
    pub settings_content_type: String,
    #[serde(default = "default_cms_timeout")]
    pub timeout_secs: u64,
}

fn default_cms_environment() -> String {
    "master".to_string()
}

fn default_include_depth() -> u8 {
    10
}

fn default_settings_content_type() -> String {
    DEFAULT_SETTINGS_CONTENT_TYPE.to_string()
}

fn default_cms_timeout() -> u64 {
    10
}

/// Personalization service settings
#[derive(Debug, Clone, Deserialize)]
pub struct PersonalizationConfig {
    /// Explicit switch; when false no decision source runs and every module
    /// renders baseline
    #[serde(default)]
    pub enabled: bool,
    /// Organization key for the remote experience API
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_personalization_environment")]
    pub environment: String,
    #[serde(default)]
    pub strategy: DecisionStrategy,
    /// Bound on the remote profile call; on expiry the request proceeds with
    /// an empty decision set
    #[serde(default = "default_personalization_timeout")]
    pub timeout_secs: u64,
}

impl Default for PersonalizationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: None,
            environment: default_personalization_environment(),
            strategy: DecisionStrategy::default(),
            timeout_secs: default_personalization_timeout(),
        }
    }
}

fn default_personalization_environment() -> String {
    "main".to_string()
}

fn default_personalization_timeout() -> u64 {
    4
}

/// Draft (preview) mode settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PreviewConfig {
    /// Shared secret required by the draft-mode toggle endpoint; draft mode
    /// is disabled entirely when unset
    #[serde(default)]
    pub secret: Option<String>,
}

/// Complete service configuration, passed explicitly into constructors
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SiteConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub cms: CmsConfig,
    #[serde(default)]
    pub personalization: PersonalizationConfig,
    #[serde(default)]
    pub preview: PreviewConfig,
}

impl SiteConfig {
    /// Load configuration from an optional TOML file, then apply environment
    /// variable overrides.
    ///
    /// Returns `Error::Config` if the file is unreadable/unparsable or if a
    /// required CMS credential is missing after all sources are applied.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        Self::load_with(config_file, |name| std::env::var(name).ok())
    }

    /// [`SiteConfig::load`] with the environment lookup injected; tests pass
    /// a closed lookup so they do not depend on the process environment
    fn load_with(
        config_file: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let mut config = match config_file {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| {
                    Error::Config(format!("cannot read {}: {}", path.display(), e))
                })?;
                toml::from_str::<SiteConfig>(&text)
                    .map_err(|e| Error::Config(format!("invalid {}: {}", path.display(), e)))?
            }
            None => SiteConfig::default(),
        };

        config.apply_env_overrides(&env);
        config.validate()?;
        Ok(config)
    }

    /// Overlay environment variables onto whatever the file provided
    fn apply_env_overrides(&mut self, env: &impl Fn(&str) -> Option<String>) {
        if let Some(v) = env("CONTENTFUL_SPACE_ID") {
            self.cms.space_id = v;
        }
        if let Some(v) = env("CONTENTFUL_ACCESS_TOKEN") {
            self.cms.delivery_token = v;
        }
        if let Some(v) = env("CONTENTFUL_PREVIEW_TOKEN") {
            self.cms.preview_token = Some(v);
        }
        if let Some(v) = env("CONTENTFUL_ENVIRONMENT") {
            self.cms.environment = v;
        }
        if let Some(v) = env("NINETAILED_API_KEY") {
            self.personalization.api_key = Some(v);
            self.personalization.enabled = true;
        }
        if let Some(v) = env("NINETAILED_ENVIRONMENT") {
            self.personalization.environment = v;
        }
        if let Some(v) = env("PREVIEW_SECRET") {
            self.preview.secret = Some(v);
        }
        if let Some(v) = env("EGOWEB_HOST") {
            self.server.host = v;
        }
        if let Some(v) = env("EGOWEB_PORT") {
            if let Ok(port) = v.parse() {
                self.server.port = port;
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if self.cms.space_id.is_empty() {
            return Err(Error::Config(
                "CMS space id must be provided (cms.space_id or CONTENTFUL_SPACE_ID)".to_string(),
            ));
        }
        if self.cms.delivery_token.is_empty() {
            return Err(Error::Config(
                "CMS access token must be provided (cms.delivery_token or CONTENTFUL_ACCESS_TOKEN)"
                    .to_string(),
            ));
        }
        if self.personalization.enabled
            && self.personalization.api_key.is_none()
            && self.personalization.strategy == DecisionStrategy::Edge
        {
            return Err(Error::Config(
                "edge personalization requires an API key (personalization.api_key)".to_string(),
            ));
        }
        Ok(())
    }
}
