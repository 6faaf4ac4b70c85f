//! Layered configuration loader.
//!
//! Three layers with precedence:
//! 1. Default config (hardcoded sensible defaults)
//! 2. File config (`config.toml` in the modelcall home, or an explicit path)
//! 3. Environment overrides (`MODELCALL_*` variables, plus `GEMINI_API_KEY`)
//!
//! ## Example
//!
//! ```no_run
//! use modelcall_core::config_loader::ConfigLoader;
//!
//! let config = ConfigLoader::new().with_env_prefix("MODELCALL").load()?;
//! # Ok::<(), modelcall_core::config_loader::ConfigLoadError>(())
//! ```

use std::collections::HashMap;
use std::env;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

use crate::DEFAULT_PROVIDER;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 16 * 1024;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Environment variable consulted for the API key when no prefixed one is set.
pub const API_KEY_FALLBACK_VAR: &str = "GEMINI_API_KEY";

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("I/O error loading config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Config validation error: {0}")]
    Validation(String),

    #[error("Invalid value for ${var}: '{value}' (expected: {expected})")]
    InvalidEnvValue {
        var: String,
        value: String,
        expected: String,
    },
}

/// Fully resolved settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelcallConfig {
    /// Provider the session starts on and the catalog is fetched for.
    pub provider: String,
    pub api_key: Option<String>,
    pub base_url: String,
    /// Models requested per catalog page.
    pub page_size: u32,
    /// Cap on backend output handed back to the caller.
    pub max_output_bytes: usize,
    pub request_timeout_secs: u64,
}

impl Default for ModelcallConfig {
    fn default() -> Self {
        Self {
            provider: DEFAULT_PROVIDER.to_string(),
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

/// One layer; every field is optional so layers can be merged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigLayer {
    pub provider: Option<String>,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub page_size: Option<u32>,
    pub max_output_bytes: Option<usize>,
    pub request_timeout_secs: Option<u64>,
}

impl ConfigLayer {
    /// Overlay `other` onto `self`; set fields in `other` win.
    pub fn merge(&mut self, other: ConfigLayer) {
        if other.provider.is_some() {
            self.provider = other.provider;
        }
        if other.api_key.is_some() {
            self.api_key = other.api_key;
        }
        if other.base_url.is_some() {
            self.base_url = other.base_url;
        }
        if other.page_size.is_some() {
            self.page_size = other.page_size;
        }
        if other.max_output_bytes.is_some() {
            self.max_output_bytes = other.max_output_bytes;
        }
        if other.request_timeout_secs.is_some() {
            self.request_timeout_secs = other.request_timeout_secs;
        }
    }

    fn apply_to(self, config: &mut ModelcallConfig) {
        if let Some(provider) = self.provider {
            config.provider = provider;
        }
        if self.api_key.is_some() {
            config.api_key = self.api_key;
        }
        if let Some(base_url) = self.base_url {
            config.base_url = base_url;
        }
        if let Some(page_size) = self.page_size {
            config.page_size = page_size;
        }
        if let Some(max_output_bytes) = self.max_output_bytes {
            config.max_output_bytes = max_output_bytes;
        }
        if let Some(timeout) = self.request_timeout_secs {
            config.request_timeout_secs = timeout;
        }
    }
}

/// Builder for layered configuration loading.
pub struct ConfigLoader {
    home: Option<PathBuf>,
    config_file: Option<PathBuf>,
    env_prefix: String,
    env: Option<HashMap<String, String>>,
    skip_file: bool,
    skip_env: bool,
}

impl ConfigLoader {
    /// Defaults: home auto-detected, prefix `MODELCALL`, all layers enabled.
    pub fn new() -> Self {
        Self {
            home: None,
            config_file: None,
            env_prefix: "MODELCALL".to_string(),
            env: None,
            skip_file: false,
            skip_env: false,
        }
    }

    /// Directory holding `config.toml`.
    pub fn with_home(mut self, path: PathBuf) -> Self {
        self.home = Some(path);
        self
    }

    /// Read this file instead of `<home>/config.toml`. Unlike the default
    /// location, an explicit file must exist.
    pub fn with_config_file(mut self, path: PathBuf) -> Self {
        self.config_file = Some(path);
        self
    }

    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Use `vars` instead of the process environment.
    pub fn with_env_vars(mut self, vars: HashMap<String, String>) -> Self {
        self.env = Some(vars);
        self
    }

    pub fn skip_file_layer(mut self) -> Self {
        self.skip_file = true;
        self
    }

    pub fn skip_env_layer(mut self) -> Self {
        self.skip_env = true;
        self
    }

    /// Load with precedence default < file < environment.
    pub fn load(self) -> Result<ModelcallConfig, ConfigLoadError> {
        let mut layer = ConfigLayer::default();

        if !self.skip_file {
            layer.merge(self.file_layer()?);
        }

        if !self.skip_env {
            layer.merge(self.env_layer()?);
        }

        let mut config = ModelcallConfig::default();
        layer.apply_to(&mut config);
        Self::validate(&config)?;
        Ok(config)
    }

    fn var(&self, name: &str) -> Option<String> {
        let value = match &self.env {
            Some(vars) => vars.get(name).cloned(),
            None => env::var(name).ok(),
        };
        value.filter(|v| !v.trim().is_empty())
    }

    /// Priority: explicit home, `$MODELCALL_HOME`, `~/.modelcall`.
    fn resolve_home(&self) -> Result<PathBuf, ConfigLoadError> {
        if let Some(path) = &self.home {
            return Ok(path.clone());
        }
        if let Some(path) = self.var("MODELCALL_HOME") {
            return Ok(PathBuf::from(path));
        }
        dirs::home_dir()
            .map(|home| home.join(".modelcall"))
            .ok_or_else(|| ConfigLoadError::Validation("Cannot determine home directory".to_string()))
    }

    fn file_layer(&self) -> Result<ConfigLayer, ConfigLoadError> {
        match &self.config_file {
            Some(path) => Self::read_layer(path, true),
            None => Self::read_layer(&self.resolve_home()?.join("config.toml"), false),
        }
    }

    /// Parse a TOML layer. A missing file is an empty layer unless `required`.
    pub fn read_layer(path: &Path, required: bool) -> Result<ConfigLayer, ConfigLoadError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !required => {
                tracing::debug!("config not found at {}, using defaults", path.display());
                return Ok(ConfigLayer::default());
            }
            Err(source) => {
                return Err(ConfigLoadError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        Ok(toml::from_str(&contents)?)
    }

    /// Supported variables (with the default prefix):
    /// `MODELCALL_PROVIDER`, `MODELCALL_API_KEY` (falling back to
    /// `GEMINI_API_KEY`), `MODELCALL_BASE_URL`, `MODELCALL_PAGE_SIZE`,
    /// `MODELCALL_MAX_OUTPUT_BYTES`, `MODELCALL_REQUEST_TIMEOUT_SECS`.
    fn env_layer(&self) -> Result<ConfigLayer, ConfigLoadError> {
        let prefix = &self.env_prefix;
        let layer = ConfigLayer {
            provider: self.var(&format!("{prefix}_PROVIDER")),
            api_key: self
                .var(&format!("{prefix}_API_KEY"))
                .or_else(|| self.var(API_KEY_FALLBACK_VAR)),
            base_url: self.var(&format!("{prefix}_BASE_URL")),
            page_size: self.parsed_var(&format!("{prefix}_PAGE_SIZE"))?,
            max_output_bytes: self.parsed_var(&format!("{prefix}_MAX_OUTPUT_BYTES"))?,
            request_timeout_secs: self.parsed_var(&format!("{prefix}_REQUEST_TIMEOUT_SECS"))?,
        };
        Ok(layer)
    }

    fn parsed_var<T: std::str::FromStr>(&self, name: &str) -> Result<Option<T>, ConfigLoadError> {
        let Some(value) = self.var(name) else {
            return Ok(None);
        };
        tracing::debug!("Applying env override: {name}={value}");
        value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigLoadError::InvalidEnvValue {
                var: name.to_string(),
                value,
                expected: "a non-negative integer".to_string(),
            })
    }

    fn validate(config: &ModelcallConfig) -> Result<(), ConfigLoadError> {
        if config.page_size == 0 {
            return Err(ConfigLoadError::Validation(
                "page_size must be at least 1".to_string(),
            ));
        }
        if config.max_output_bytes == 0 {
            return Err(ConfigLoadError::Validation(
                "max_output_bytes must be at least 1".to_string(),
            ));
        }
        if !config.base_url.starts_with("http://") && !config.base_url.starts_with("https://") {
            return Err(ConfigLoadError::Validation(format!(
                "base_url must be an http(s) URL, got '{}'",
                config.base_url
            )));
        }
        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn write_config(dir: &TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("config.toml");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn defaults_when_no_layers() {
        let config = ConfigLoader::new()
            .skip_file_layer()
            .skip_env_layer()
            .load()
            .unwrap();
        assert_eq!(config, ModelcallConfig::default());
        assert_eq!(config.provider, "Gemini");
        assert_eq!(config.page_size, 50);
    }

    #[test]
    fn missing_home_config_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let config = ConfigLoader::new()
            .with_home(dir.path().to_path_buf())
            .skip_env_layer()
            .load()
            .unwrap();
        assert_eq!(config, ModelcallConfig::default());
    }

    #[test]
    fn explicit_config_file_must_exist() {
        let dir = TempDir::new().unwrap();
        let err = ConfigLoader::new()
            .with_config_file(dir.path().join("absent.toml"))
            .skip_env_layer()
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigLoadError::Io { .. }));
    }

    #[test]
    fn env_overrides_file_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        write_config(
            &dir,
            r#"
                api_key = "file-key"
                page_size = 10
                max_output_bytes = 2048
            "#,
        );
        let config = ConfigLoader::new()
            .with_home(dir.path().to_path_buf())
            .with_env_vars(vars(&[("MODELCALL_PAGE_SIZE", "25")]))
            .load()
            .unwrap();
        assert_eq!(config.api_key.as_deref(), Some("file-key"));
        assert_eq!(config.page_size, 25);
        assert_eq!(config.max_output_bytes, 2048);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn gemini_api_key_is_fallback() {
        let config = ConfigLoader::new()
            .skip_file_layer()
            .with_env_vars(vars(&[("GEMINI_API_KEY", "gk")]))
            .load()
            .unwrap();
        assert_eq!(config.api_key.as_deref(), Some("gk"));

        let config = ConfigLoader::new()
            .skip_file_layer()
            .with_env_vars(vars(&[("GEMINI_API_KEY", "gk"), ("MODELCALL_API_KEY", "mk")]))
            .load()
            .unwrap();
        assert_eq!(config.api_key.as_deref(), Some("mk"));
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let config = ConfigLoader::new()
            .skip_file_layer()
            .with_env_vars(vars(&[("MODELCALL_PROVIDER", "  ")]))
            .load()
            .unwrap();
        assert_eq!(config.provider, "Gemini");
    }

    #[test]
    fn invalid_numeric_env_value() {
        let err = ConfigLoader::new()
            .skip_file_layer()
            .with_env_vars(vars(&[("MODELCALL_PAGE_SIZE", "many")]))
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigLoadError::InvalidEnvValue { ref var, .. } if var == "MODELCALL_PAGE_SIZE"));
    }

    #[test]
    fn custom_prefix() {
        let config = ConfigLoader::new()
            .skip_file_layer()
            .with_env_prefix("TEST")
            .with_env_vars(vars(&[("TEST_BASE_URL", "http://localhost:9999")]))
            .load()
            .unwrap();
        assert_eq!(config.base_url, "http://localhost:9999");
    }

    #[test]
    fn unknown_file_keys_are_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "colour = \"blue\"\n");
        let err = ConfigLoader::new()
            .with_config_file(path)
            .skip_env_layer()
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigLoadError::TomlParse(_)));
    }

    #[test]
    fn validation_rejects_zero_page_size_and_bad_url() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "page_size = 0\n");
        let err = ConfigLoader::new()
            .with_config_file(path)
            .skip_env_layer()
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigLoadError::Validation(_)));

        let err = ConfigLoader::new()
            .skip_file_layer()
            .with_env_vars(vars(&[("MODELCALL_BASE_URL", "ftp://x")]))
            .load()
            .unwrap_err();
        assert!(err.to_string().contains("base_url"));
    }

    #[test]
    fn merge_prefers_set_fields() {
        let mut base = ConfigLayer {
            provider: Some("A".to_string()),
            page_size: Some(1),
            ..Default::default()
        };
        base.merge(ConfigLayer {
            page_size: Some(2),
            ..Default::default()
        });
        assert_eq!(base.provider.as_deref(), Some("A"));
        assert_eq!(base.page_size, Some(2));
    }
}
