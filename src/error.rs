//! Error types for registry construction and lookup.

use thiserror::Error;

/// Errors raised by [`BitRegistry`](crate::BitRegistry) construction and lookups.
#[derive(Debug, Error)]
pub enum MaskError {
    /// A definition entry has the wrong shape or reuses a reserved name.
    #[error("invalid definition in '{registry}': {message}")]
    Validation { registry: String, message: String },

    /// No bit is registered under the requested name or number.
    #[error("no mask bit {key} in '{registry}'")]
    KeyNotFound { registry: String, key: String },

    /// Attribute-style lookup of a bit name that does not exist.
    #[error("unknown mask bit name {0}")]
    UnknownAttribute(String),

    /// The definition table has no entry for the requested registry.
    #[error("registry '{0}' not found in definition table")]
    UnknownRegistry(String),

    /// Definition text could not be parsed.
    #[error(transparent)]
    Table(#[from] TableError),
}

impl MaskError {
    pub(crate) fn validation(registry: &str, message: impl Into<String>) -> Self {
        Self::Validation {
            registry: registry.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn key_not_found(registry: &str, key: impl ToString) -> Self {
        Self::KeyNotFound {
            registry: registry.to_string(),
            key: key.to_string(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    pub fn is_key_not_found(&self) -> bool {
        matches!(self, Self::KeyNotFound { .. })
    }
}

/// Errors raised while loading a [`DefinitionTable`](crate::DefinitionTable).
#[derive(Debug, Error)]
pub enum TableError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("unsupported definition file format: {0}")]
    UnsupportedFormat(String),
}
