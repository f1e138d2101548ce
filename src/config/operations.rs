//! Config loading, validation, and utility operations.

use super::model::EngineConfig;
use super::types::{BackendProfile, ExecutionMode, FALLBACK_BACKEND};
use crate::error::{BptError, Result};
use std::path::Path;

impl EngineConfig {
    /// Load config from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            BptError::UserError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Load config from `path` if given, otherwise use defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: EngineConfig = serde_yaml::from_str(yaml)
            .map_err(|e| BptError::UserError(format!("failed to parse config YAML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| BptError::UserError(format!("failed to serialize config to YAML: {}", e)))
    }

    /// Validate config values and return error on invalid values.
    ///
    /// Validation rules:
    /// - `max_workers` must be positive
    /// - `backend_timeout_seconds` must be positive
    /// - every backend needs a non-empty command
    /// - `mode: concurrent` requires the `concurrent` feature
    pub fn validate(&self) -> Result<()> {
        if self.max_workers == 0 {
            return Err(BptError::UserError(
                "config validation failed: max_workers must be greater than 0".to_string(),
            ));
        }

        if self.backend_timeout_seconds == 0 {
            return Err(BptError::UserError(
                "config validation failed: backend_timeout_seconds must be greater than 0"
                    .to_string(),
            ));
        }

        for (key, backend) in &self.backends {
            if backend.command.trim().is_empty() {
                return Err(BptError::UserError(format!(
                    "config validation failed: backend '{}' has an empty command",
                    key
                )));
            }
            if backend.timeout_seconds == Some(0) {
                return Err(BptError::UserError(format!(
                    "config validation failed: backend '{}' timeout_seconds must be greater than 0",
                    key
                )));
            }
        }

        if self.mode == ExecutionMode::Concurrent && !cfg!(feature = "concurrent") {
            return Err(BptError::UserError(
                "config validation failed: mode 'concurrent' requires bpt to be built \
                 with the 'concurrent' feature"
                    .to_string(),
            ));
        }

        Ok(())
    }

    /// Find the backend for a model hint, falling back to `default`.
    pub fn backend_for(&self, model: &str) -> Option<&BackendProfile> {
        self.backends
            .get(model)
            .or_else(|| self.backends.get(FALLBACK_BACKEND))
    }

    /// The model hint to use for an agent whose config names `model`.
    pub fn effective_model<'a>(&'a self, model: &'a str) -> &'a str {
        if model.trim().is_empty() {
            &self.default_model
        } else {
            model
        }
    }
}
