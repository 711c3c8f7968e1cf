//! Application configuration.
//!
//! Settings come from an INI file in the platform config directory
//! (`~/.config/radarlayer/radarlayer.ini` on Linux) with environment
//! variables taking precedence. The environment names
//! (`OPENWEATHER_API_KEY`, `TILE_LAYER`, `BASE_URL`) follow the
//! convention existing TopSky proxy setups already use.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

use crate::provider::{TileLayer, DEFAULT_BASE_URL};
use crate::render::RenderConfig;

/// Default bind address for the HTTP server.
pub const DEFAULT_BIND: &str = "0.0.0.0:8000";

/// Default externally visible base URL, advertised in the frame listing.
pub const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:8000";

/// Default per-fetch time budget, in seconds.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;

/// Default whole-request deadline, in seconds.
pub const DEFAULT_REQUEST_DEADLINE_SECS: u64 = 25;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No OpenWeatherMap API key configured (set OPENWEATHER_API_KEY)")]
    MissingApiKey,
    #[error("Unknown tile layer: {0}")]
    UnknownLayer(String),
    #[error("Invalid bind address: {0}")]
    InvalidBind(String),
    #[error("Per-fetch timeout ({fetch_secs}s) must be shorter than the request deadline ({deadline_secs}s)")]
    InvalidTimeouts { fetch_secs: u64, deadline_secs: u64 },
    #[error("Failed to read config file {path}: {message}")]
    File { path: PathBuf, message: String },
}

/// Resolved application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// OpenWeatherMap API key.
    pub api_key: String,
    /// Weather layer to proxy.
    pub layer: TileLayer,
    /// Upstream tile API base URL.
    pub upstream_base_url: String,
    /// Base URL this service is reachable at (goes into the frame listing).
    pub public_base_url: String,
    /// Socket address the HTTP server binds to.
    pub bind_addr: SocketAddr,
    /// Per-fetch time budget.
    pub fetch_timeout: Duration,
    /// Whole-request deadline.
    pub request_deadline: Duration,
}

impl Settings {
    /// Load settings from the default config file location and the
    /// process environment, then validate.
    pub fn load() -> Result<Self, ConfigError> {
        let path = default_config_path();
        Self::load_with(path.as_deref(), |key| std::env::var(key).ok())
    }

    /// Load settings from an explicit file (when it exists) and an
    /// environment lookup. The lookup is injected so tests never touch
    /// process-global state.
    pub fn load_with(
        path: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut builder = SettingsBuilder::default();

        if let Some(path) = path {
            if path.exists() {
                builder.apply_file(path)?;
            }
        }
        builder.apply_env(env);
        builder.build()
    }

    /// The renderer configuration derived from these settings.
    pub fn render_config(&self) -> RenderConfig {
        RenderConfig {
            source_tile_size: 256,
            fetch_timeout: self.fetch_timeout,
            request_deadline: self.request_deadline,
        }
    }

    /// The API key with all but the last four characters masked, for
    /// startup logging.
    pub fn masked_api_key(&self) -> String {
        let visible = self.api_key.len().min(4);
        let masked = self.api_key.len() - visible;
        format!("{}{}", "*".repeat(masked), &self.api_key[masked..])
    }
}

/// Default config file path under the platform config directory.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("radarlayer").join("radarlayer.ini"))
}

#[derive(Default)]
struct SettingsBuilder {
    api_key: Option<String>,
    layer: Option<String>,
    upstream_base_url: Option<String>,
    public_base_url: Option<String>,
    bind: Option<String>,
    fetch_timeout_secs: Option<u64>,
    request_deadline_secs: Option<u64>,
}

impl SettingsBuilder {
    fn apply_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let file = Ini::load_from_file(path).map_err(|e| ConfigError::File {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        if let Some(section) = file.section(Some("upstream")) {
            self.api_key = section.get("api_key").map(str::to_string).or(self.api_key.take());
            self.layer = section.get("layer").map(str::to_string).or(self.layer.take());
            self.upstream_base_url = section
                .get("base_url")
                .map(str::to_string)
                .or(self.upstream_base_url.take());
        }
        if let Some(section) = file.section(Some("server")) {
            self.bind = section.get("bind").map(str::to_string).or(self.bind.take());
            self.public_base_url = section
                .get("public_base_url")
                .map(str::to_string)
                .or(self.public_base_url.take());
        }
        if let Some(section) = file.section(Some("timeouts")) {
            self.fetch_timeout_secs = section
                .get("fetch_secs")
                .and_then(|v| v.parse().ok())
                .or(self.fetch_timeout_secs.take());
            self.request_deadline_secs = section
                .get("deadline_secs")
                .and_then(|v| v.parse().ok())
                .or(self.request_deadline_secs.take());
        }
        Ok(())
    }

    fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(value) = env("OPENWEATHER_API_KEY") {
            self.api_key = Some(value);
        }
        if let Some(value) = env("TILE_LAYER") {
            self.layer = Some(value);
        }
        if let Some(value) = env("BASE_URL") {
            self.public_base_url = Some(value);
        }
        if let Some(value) = env("RADARLAYER_UPSTREAM_URL") {
            self.upstream_base_url = Some(value);
        }
        if let Some(value) = env("RADARLAYER_BIND") {
            self.bind = Some(value);
        }
    }

    fn build(self) -> Result<Settings, ConfigError> {
        let api_key = match self.api_key {
            Some(key) if !key.is_empty() => key,
            _ => return Err(ConfigError::MissingApiKey),
        };

        let layer = match self.layer {
            Some(name) => {
                TileLayer::from_name(&name).ok_or(ConfigError::UnknownLayer(name))?
            }
            None => TileLayer::default(),
        };

        let bind = self.bind.unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind_addr: SocketAddr = bind
            .parse()
            .map_err(|_| ConfigError::InvalidBind(bind.clone()))?;

        let fetch_secs = self.fetch_timeout_secs.unwrap_or(DEFAULT_FETCH_TIMEOUT_SECS);
        let deadline_secs = self
            .request_deadline_secs
            .unwrap_or(DEFAULT_REQUEST_DEADLINE_SECS);
        if fetch_secs == 0 || fetch_secs >= deadline_secs {
            return Err(ConfigError::InvalidTimeouts { fetch_secs, deadline_secs });
        }

        Ok(Settings {
            api_key,
            layer,
            upstream_base_url: self
                .upstream_base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            public_base_url: self
                .public_base_url
                .unwrap_or_else(|| DEFAULT_PUBLIC_BASE_URL.to_string()),
            bind_addr,
            fetch_timeout: Duration::from_secs(fetch_secs),
            request_deadline: Duration::from_secs(deadline_secs),
        })
    }
}
