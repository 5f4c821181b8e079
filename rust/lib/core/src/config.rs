use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read loader config {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed loader config {path:?}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("invalid loader config: {0}")]
    Invalid(String),
}

/// Loader configuration shared by the CLI and embedding services.
///
/// Built from defaults or a TOML file; the CLI layers its flags on top:
///
/// ```toml
/// roots = ["addons", "/opt/enterprise"]
/// modules = ["sale"]
/// with_demo = false
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoaderConfig {
    /// Addon roots, searched in order. The first root holding a module wins.
    pub roots: Vec<PathBuf>,

    /// Modules to install.
    pub modules: Vec<String>,

    /// Manifest file name at each module root.
    pub manifest_file: String,

    /// Directory, relative to the module root, holding model sources.
    pub models_dir: String,

    /// Check that declared demo files exist.
    pub with_demo: bool,

    /// Promote warnings to errors.
    pub warnings_as_errors: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            modules: Vec::new(),
            manifest_file: "manifest.toml".to_string(),
            models_dir: "models".to_string(),
            with_demo: true,
            warnings_as_errors: false,
        }
    }
}

impl LoaderConfig {
    /// Load config from a TOML file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: LoaderConfig = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(config)
    }

    /// Reject configurations a load cannot start from.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.roots.is_empty() {
            return Err(ConfigError::Invalid("no addon roots given".into()));
        }
        if self.manifest_file.trim().is_empty() {
            return Err(ConfigError::Invalid("manifest file name is empty".into()));
        }
        if self.models_dir.trim().is_empty() {
            return Err(ConfigError::Invalid("models directory is empty".into()));
        }
        Ok(())
    }
}
