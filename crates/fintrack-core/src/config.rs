//! Configuration loading
//!
//! ## Configuration Resolution
//!
//! 1. An explicit path (`--config`), which must exist
//! 2. The override file in the data dir (~/.local/share/fintrack/config.toml)
//! 3. Embedded defaults (compiled into binary)
//!
//! Files are applied on top of the embedded defaults, so an override only
//! needs the keys it changes. `FINTRACK_*` environment variables win over
//! every file.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::aggregate::DEFAULT_TOP_N;
use crate::categorize::KeywordMap;
use crate::error::{Error, Result};

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/defaults.toml");

pub const ENV_TOP_N: &str = "FINTRACK_TOP_N";
pub const ENV_MAX_UPLOAD_MB: &str = "FINTRACK_MAX_UPLOAD_MB";
pub const ENV_ALLOWED_ORIGINS: &str = "FINTRACK_ALLOWED_ORIGINS";

const DEFAULT_MAX_UPLOAD_MB: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Size of the top-categories view
    pub top_n: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    pub max_upload_mb: usize,
    /// CORS origins; empty means same-origin only
    pub allowed_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            max_upload_mb: DEFAULT_MAX_UPLOAD_MB,
            allowed_origins: Vec::new(),
        }
    }
}

impl ServerSettings {
    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

/// Resolved application configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub pipeline: PipelineSettings,
    pub server: ServerSettings,
    /// Built-in keywords merged with the `[categories]` tables
    pub keywords: KeywordMap,
    /// File the configuration was read from, if any
    pub source: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pipeline: PipelineSettings::default(),
            server: ServerSettings::default(),
            keywords: KeywordMap::builtin(),
            source: None,
        }
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("fintrack").join("config.toml"))
}

/// Raw config structure for TOML parsing
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    pipeline: Option<RawPipeline>,
    server: Option<RawServer>,
    categories: Option<HashMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct RawPipeline {
    top_n: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct RawServer {
    max_upload_mb: Option<usize>,
    allowed_origins: Option<Vec<String>>,
}

impl Config {
    /// Embedded defaults only
    pub fn embedded() -> Result<Self> {
        let mut config = Self::default();
        config.apply_toml(DEFAULT_CONFIG)?;
        Ok(config)
    }

    /// Load configuration (explicit path, then override file, then
    /// embedded defaults), without environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = Self::embedded()?;

        let override_path = match path {
            Some(p) if !p.exists() => {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            Some(p) => Some(p.to_path_buf()),
            None => default_config_path().filter(|p| p.exists()),
        };

        if let Some(p) = override_path {
            let content = fs::read_to_string(&p)
                .map_err(|e| Error::Config(format!("Failed to read {}: {}", p.display(), e)))?;
            config.apply_toml(&content)?;
            debug!("Loaded config from {}", p.display());
            config.source = Some(p);
        }

        Ok(config)
    }

    /// Load configuration and apply `FINTRACK_*` environment overrides
    pub fn load_with_env(path: Option<&Path>) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env()?;
        Ok(config)
    }

    /// Apply a TOML document on top of the current values
    pub fn apply_toml(&mut self, content: &str) -> Result<()> {
        let raw: RawConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid config TOML: {}", e)))?;

        if let Some(pipeline) = raw.pipeline {
            if let Some(top_n) = pipeline.top_n {
                self.pipeline.top_n = top_n;
            }
        }
        if let Some(server) = raw.server {
            if let Some(mb) = server.max_upload_mb {
                self.server.max_upload_mb = mb;
            }
            if let Some(origins) = server.allowed_origins {
                self.server.allowed_origins = origins;
            }
        }
        if let Some(categories) = raw.categories {
            self.keywords.extend(categories);
        }

        self.validate()
    }

    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from a key lookup (the process environment in
    /// production)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_TOP_N) {
            self.pipeline.top_n = value
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("{} must be a number, got '{}'", ENV_TOP_N, value)))?;
        }
        if let Some(value) = lookup(ENV_MAX_UPLOAD_MB) {
            self.server.max_upload_mb = value.trim().parse().map_err(|_| {
                Error::Config(format!(
                    "{} must be a number, got '{}'",
                    ENV_MAX_UPLOAD_MB, value
                ))
            })?;
        }
        if let Some(value) = lookup(ENV_ALLOWED_ORIGINS) {
            self.server.allowed_origins = value
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        self.validate()
    }

    fn validate(&self) -> Result<()> {
        if self.pipeline.top_n == 0 {
            return Err(Error::Config("top_n must be at least 1".to_string()));
        }
        if self.server.max_upload_mb == 0 {
            return Err(Error::Config("max_upload_mb must be at least 1".to_string()));
        }
        Ok(())
    }
}
