//! Error types for type models and generation config files.
//!
//! Covers file I/O, (de)serialization, invalid models and config entries, and
//! failures of the generation run itself.

use structural_type_core::StructuralError;
use thiserror::Error;

use crate::ValidationError;

/// Errors that can occur while loading models or running a configured
/// generation.
#[derive(Debug, Error)]
pub enum ModelError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing or serialization failure.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// A name replacement pattern does not compile.
    #[error("invalid replacement pattern: {0}")]
    PatternError(#[from] regex::Error),

    /// The model failed validation.
    #[error("invalid type model: {}", describe(.0))]
    InvalidModel(Vec<ValidationError>),

    /// A config entry does not have the `Type#property` form.
    #[error("invalid property reference {0}, expected Type#property")]
    InvalidReference(String),

    /// Resolution, merge or naming failed.
    #[error(transparent)]
    Structural(#[from] StructuralError),
}

fn describe(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Convenience alias for results with [`ModelError`].
pub type Result<T> = std::result::Result<T, ModelError>;
