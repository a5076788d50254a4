use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

pub const ID_PLACEHOLDER: &str = "{id}";

/// Settings for one batch run. Every field has a default, so a partial
/// TOML file is enough.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Metadata page URL; `{id}` is replaced with the identifier.
    pub page_url_template: String,
    /// `name` of the `<meta>` tag holding the asset URL.
    pub asset_meta_name: String,
    pub output_dir: PathBuf,
    /// Extension of the written (decompressed) file, without the dot.
    pub extension: String,
    /// First identifier, inclusive.
    pub start: u64,
    /// Last identifier, exclusive.
    pub end: u64,
    pub workers: usize,
    /// Per-request timeout. None means wait forever.
    pub request_timeout_secs: Option<u64>,
    /// Exit non-zero when any identifier failed.
    pub fail_on_error: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            page_url_template: "https://neurovault.org/images/{id}/".to_string(),
            asset_meta_name: "file".to_string(),
            output_dir: PathBuf::from("data"),
            extension: "nii".to_string(),
            start: 40012,
            end: 42211,
            workers: 8,
            request_timeout_secs: None,
            fail_on_error: false,
        }
    }
}

/// Command-line values. Every one that is set wins over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub start: Option<u64>,
    pub end: Option<u64>,
    pub workers: Option<usize>,
    pub output_dir: Option<PathBuf>,
    pub page_url_template: Option<String>,
    pub request_timeout_secs: Option<u64>,
    /// Can only switch the file setting on, never off.
    pub fail_on_error: bool,
}

impl FetchConfig {
    /// Defaults, then the optional TOML file, then `overrides`; the merged
    /// result is validated.
    pub fn resolve(file: Option<&Path>, overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        let mut config = match file {
            Some(path) => FetchConfig::load(path)?,
            None => FetchConfig::default(),
        };
        config.apply(overrides);
        config.validate()?;
        Ok(config)
    }

    pub fn apply(&mut self, overrides: ConfigOverrides) {
        if let Some(start) = overrides.start {
            self.start = start;
        }
        if let Some(end) = overrides.end {
            self.end = end;
        }
        if let Some(workers) = overrides.workers {
            self.workers = workers;
        }
        if let Some(output_dir) = overrides.output_dir {
            self.output_dir = output_dir;
        }
        if let Some(page_url_template) = overrides.page_url_template {
            self.page_url_template = page_url_template;
        }
        if overrides.request_timeout_secs.is_some() {
            self.request_timeout_secs = overrides.request_timeout_secs;
        }
        self.fail_on_error |= overrides.fail_on_error;
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::Invalid("workers must be at least 1".into()));
        }
        if self.start > self.end {
            return Err(ConfigError::Invalid(format!(
                "start ({}) is after end ({})",
                self.start, self.end
            )));
        }
        if !self.page_url_template.contains(ID_PLACEHOLDER) {
            return Err(ConfigError::Invalid(format!(
                "page_url_template must contain {}",
                ID_PLACEHOLDER
            )));
        }
        if self.extension.is_empty() || self.extension.contains('/') {
            return Err(ConfigError::Invalid(format!(
                "bad extension {:?}",
                self.extension
            )));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}
