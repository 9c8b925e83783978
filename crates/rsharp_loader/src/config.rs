//! Loader configuration
//!
//! ```toml
//! library = "target/debug/librsharp_ffi.so"
//! symbol_prefix = "rsharp"
//! types = ["String", "RVec_I32", "Box_I32"]
//! strict = true
//! ```

use crate::error::{LoaderError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Prefix the exported functions are published under
pub const DEFAULT_SYMBOL_PREFIX: &str = "rsharp";

/// Which library to open and which destructors to bind from it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Path of the dynamic library
    pub library: PathBuf,

    /// Module path prefix of the exported symbols, `::`-separated
    pub symbol_prefix: String,

    /// Schema names whose destructors are bound
    pub types: Vec<String>,

    /// Fail on a missing symbol or unknown type instead of skipping it
    pub strict: bool,

    /// Require the library to export a matching API version
    pub check_version: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            library: PathBuf::new(),
            symbol_prefix: DEFAULT_SYMBOL_PREFIX.to_string(),
            types: Vec::new(),
            strict: true,
            check_version: true,
        }
    }
}

impl LoaderConfig {
    /// Config for `library` with every other field defaulted
    pub fn new(library: impl Into<PathBuf>) -> Self {
        Self {
            library: library.into(),
            ..Default::default()
        }
    }

    /// Add a schema name to bind
    pub fn with_type(mut self, name: impl Into<String>) -> Self {
        self.types.push(name.into());
        self
    }

    /// Parse a config from TOML
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: LoaderConfig = toml::from_str(content).map_err(|e| LoaderError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read a config file
    ///
    /// A relative `library` path is resolved against the directory holding
    /// the config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&content)?;

        if config.library.is_relative() {
            if let Some(dir) = path.parent() {
                config.library = dir.join(&config.library);
            }
        }

        log::debug!("Loaded loader config from '{}'", path.display());
        Ok(config)
    }

    /// Check the fields that cannot be defaulted
    pub fn validate(&self) -> Result<()> {
        if self.library.as_os_str().is_empty() {
            return Err(LoaderError::config("`library` must be set"));
        }
        if self.types.iter().any(|name| name.is_empty()) {
            return Err(LoaderError::config("empty type name in `types`"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config = LoaderConfig::from_toml_str(r#"library = "libnative.so""#).unwrap();
        assert_eq!(config, LoaderConfig::new("libnative.so"));
        assert_eq!(config.symbol_prefix, "rsharp");
        assert!(config.strict);
        assert!(config.check_version);
    }

    #[test]
    fn test_missing_library_rejected() {
        let err = LoaderConfig::from_toml_str(r#"types = ["String"]"#).unwrap_err();
        assert!(matches!(err, LoaderError::Config(_)));
    }

    #[test]
    fn test_empty_type_name_rejected() {
        let config = LoaderConfig::new("libnative.so").with_type("");
        assert!(matches!(config.validate(), Err(LoaderError::Config(_))));
    }
}
