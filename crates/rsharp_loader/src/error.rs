//! Error types for loading native libraries

use rsharp_core::HandleError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for loader operations
pub type Result<T> = std::result::Result<T, LoaderError>;

/// Errors that can occur while loading a library or binding its destructors
#[derive(Debug, Error)]
pub enum LoaderError {
    /// Failed to load dynamic library
    #[error("Failed to load library '{path}': {message}")]
    Load {
        path: PathBuf,
        message: String,
    },

    /// Library does not export a required symbol
    #[error("Symbol '{symbol}' not found in library '{library}'")]
    SymbolNotFound {
        library: String,
        symbol: String,
    },

    /// A configured schema name has no registered binder
    #[error("Type '{0}' is listed in the config but has no binder")]
    UnknownType(String),

    /// Library was built against another version of the exported functions
    #[error("Version mismatch: library exports version {library_version}, expected {expected_version}")]
    VersionMismatch {
        library_version: u32,
        expected_version: u32,
    },

    /// Invalid or unreadable configuration
    #[error("Invalid loader config: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Handle protocol error
    #[error(transparent)]
    Handle(#[from] HandleError),
}

impl LoaderError {
    /// Create a load error
    pub fn load(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        LoaderError::Load {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a symbol not found error
    pub fn symbol_not_found(library: impl Into<String>, symbol: impl Into<String>) -> Self {
        LoaderError::SymbolNotFound {
            library: library.into(),
            symbol: symbol.into(),
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        LoaderError::Config(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = LoaderError::symbol_not_found("libnative.so", "rsharp__String__drop");
        assert_eq!(
            err.to_string(),
            "Symbol 'rsharp__String__drop' not found in library 'libnative.so'"
        );

        let err: LoaderError = HandleError::Unbound { type_name: "String" }.into();
        assert!(matches!(err, LoaderError::Handle(HandleError::Unbound { .. })));
    }
}
