//! Configuration for the `cra` tools: API endpoint, cache location and logging.
//!
//! ```toml
//! [api]
//! base_url = "https://api.cloudylogic.com"
//! timeout_ms = 10000
//!
//! [cache]
//! dir = "/var/cache/cra"
//!
//! [logging]
//! level = "info"
//! json = false
//! stderr = true
//! ```
//!
//! Every section is optional. Environment variables (`CRA_API_URL`, `CRA_CACHE_DIR`, `CRA_LOG`)
//! override the file via [`CraConfig::apply_env_overrides`].

use cra_api::{Endpoint, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
use cra_cache::CacheConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Once};
use std::time::Duration;
use thiserror::Error;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::prelude::*;

pub const ENV_API_URL: &str = "CRA_API_URL";
pub const ENV_CACHE_DIR: &str = "CRA_CACHE_DIR";
pub const ENV_LOG: &str = "CRA_LOG";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CraConfig {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub cache: CacheSection,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiConfig {
    /// Root URL of the REST server; object URLs are `<base_url>/<kind>/`.
    #[serde(default = "ApiConfig::default_base_url")]
    pub base_url: String,

    /// Per-request timeout in milliseconds.
    #[serde(default = "ApiConfig::default_timeout_ms")]
    pub timeout_ms: u64,
}

impl ApiConfig {
    fn default_base_url() -> String {
        DEFAULT_BASE_URL.to_owned()
    }

    fn default_timeout_ms() -> u64 {
        DEFAULT_TIMEOUT.as_millis() as u64
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.max(1))
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: Self::default_base_url(),
            timeout_ms: Self::default_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheSection {
    /// Cache root; `~/.cra/cache` when unset.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// A simple level (`info`, `debug`, ...) or a full `EnvFilter` directive string.
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,

    /// Emit logs as JSON lines.
    #[serde(default)]
    pub json: bool,

    #[serde(default = "LoggingConfig::default_stderr")]
    pub stderr: bool,

    /// Append logs to this file as well. Ignored if it cannot be opened.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_owned()
    }

    fn default_stderr() -> bool {
        true
    }

    pub(crate) fn normalize_level_directives(input: &str) -> String {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Self::default_level();
        }

        match trimmed.to_ascii_lowercase().as_str() {
            "trace" => "trace".to_owned(),
            "debug" => "debug".to_owned(),
            "info" => "info".to_owned(),
            "warn" | "warning" => "warn".to_owned(),
            "error" => "error".to_owned(),
            "off" | "none" => "off".to_owned(),
            _ => trimmed.to_owned(),
        }
    }

    /// The effective filter: the configured level, merged with `RUST_LOG` when that is set.
    pub fn env_filter(&self) -> tracing_subscriber::EnvFilter {
        let config_directives = Self::normalize_level_directives(&self.level);
        let fallback = || {
            tracing_subscriber::EnvFilter::try_new(&config_directives).unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::default()
                    .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
            })
        };

        match std::env::var("RUST_LOG")
            .ok()
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
        {
            Some(env_directives) => {
                tracing_subscriber::EnvFilter::try_new(format!("{config_directives},{env_directives}"))
                    .or_else(|_| tracing_subscriber::EnvFilter::try_new(&env_directives))
                    .unwrap_or_else(|_| fallback())
            }
            None => fallback(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            json: false,
            stderr: Self::default_stderr(),
            file: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse toml config: {0}")]
    Toml(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        // The `Display` form quotes the offending source line; keep only the message.
        ConfigError::Toml(err.message().to_owned())
    }
}

impl CraConfig {
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::load_from_str(&text)
    }

    pub fn load_from_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Like [`Self::load_from_path`], but a missing file yields the defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        match Self::load_from_path(path) {
            Err(ConfigError::Io { source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// `~/.cra/config.toml`, if a home directory is known.
    pub fn default_path() -> Option<PathBuf> {
        std::env::var_os("HOME")
            .or_else(|| std::env::var_os("USERPROFILE"))
            .map(|home| PathBuf::from(home).join(".cra").join("config.toml"))
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|name| std::env::var(name).ok());
    }

    /// Applies overrides from `lookup`; empty values are ignored.
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(url) = lookup(ENV_API_URL) {
            self.api.base_url = url;
        }
        if let Some(dir) = lookup(ENV_CACHE_DIR) {
            self.cache.dir = Some(PathBuf::from(dir));
        }
        if let Some(level) = lookup(ENV_LOG) {
            self.logging.level = level;
        }
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            cache_root_override: self.cache.dir.clone(),
        }
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.api.base_url.clone(), self.api.timeout())
    }
}

static TRACING_INIT: Once = Once::new();

/// Installs the global `tracing` subscriber described by `config`.
///
/// Only the first call in a process has any effect; it returns whether a subscriber was
/// installed (another one may already have been set by the host).
pub fn init_tracing(config: &LoggingConfig) -> bool {
    let mut installed = false;

    TRACING_INIT.call_once(|| {
        let filter = config.env_filter();
        let writer = make_writer(config);

        let layer: Box<dyn tracing_subscriber::Layer<_> + Send + Sync> = if config.json {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(writer)
                .with_ansi(false)
                .boxed()
        } else {
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .boxed()
        };

        let subscriber = tracing_subscriber::registry().with(filter).with(layer);
        installed = tracing::subscriber::set_global_default(subscriber).is_ok();
    });

    installed
}

fn make_writer(config: &LoggingConfig) -> BoxMakeWriter {
    let file = config.file.as_ref().and_then(|path| {
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .ok()
    });

    let stderr = if !config.stderr {
        None
    } else if cfg!(debug_assertions) {
        // Keeps `cargo test` output captured.
        Some(BoxMakeWriter::new(
            tracing_subscriber::fmt::writer::TestWriter::with_stderr,
        ))
    } else {
        Some(BoxMakeWriter::new(std::io::stderr))
    };

    match (stderr, file) {
        (Some(stderr), Some(file)) => BoxMakeWriter::new(stderr.and(Arc::new(file))),
        (Some(stderr), None) => stderr,
        (None, Some(file)) => BoxMakeWriter::new(Arc::new(file)),
        (None, None) => BoxMakeWriter::new(std::io::sink),
    }
}
