//! # Zoo Errors

use thiserror::Error;

/// Result type alias for zoo lookups.
pub type ZooResult<T> = Result<T, ZooError>;

/// Errors raised while resolving model names and hyperparameter tables.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ZooError {
    /// No prefab is registered under the name.
    #[error("unknown model: {name:?}")]
    UnknownModel {
        /// The requested name.
        name: String,
    },

    /// The family has no hyperparameter table for the depth.
    #[error("unknown {family} depth {depth}; supported: {supported:?}")]
    UnknownDepth {
        /// The model family.
        family: &'static str,

        /// The requested depth.
        depth: usize,

        /// The depths the family does support.
        supported: &'static [usize],
    },

    /// The config is structurally invalid.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

impl ZooError {
    /// Create an unknown model error.
    #[must_use]
    pub fn unknown_model(name: impl Into<String>) -> Self {
        Self::UnknownModel { name: name.into() }
    }

    /// Create an invalid config error.
    #[must_use]
    pub fn invalid_config(details: impl Into<String>) -> Self {
        Self::InvalidConfig(details.into())
    }
}
