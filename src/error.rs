//! Error types for Arbor.
//!
//! Generation and morphing are pure computation, so the taxonomy is narrow:
//! bad configuration is fatal to building a population, everything else is
//! defined fallback behavior (see [`crate::morph::MorphController`]).

use thiserror::Error;

/// Errors that can occur while configuring or building particle populations.
#[derive(Error, Debug)]
pub enum ArborError {
    /// A numeric configuration value was non-finite or not strictly positive.
    #[error("Invalid parameter `{name}`: {value} (must be positive and finite)")]
    InvalidParameter {
        /// Dotted path of the offending option, e.g. `tree.height`.
        name: &'static str,
        /// The rejected value.
        value: f32,
    },

    /// A numeric configuration value was non-finite or negative.
    #[error("Invalid parameter `{name}`: {value} (must be finite and non-negative)")]
    NegativeParameter {
        /// Dotted path of the offending option.
        name: &'static str,
        /// The rejected value.
        value: f32,
    },

    /// Failed to parse or serialize a JSON configuration.
    #[error("Configuration JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Failed to read or write a configuration file.
    #[error("Configuration I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type using [`ArborError`].
pub type Result<T> = std::result::Result<T, ArborError>;

/// Fail unless `value` is finite and strictly positive.
pub(crate) fn ensure_positive(name: &'static str, value: f32) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ArborError::InvalidParameter { name, value })
    }
}

/// Fail unless `value` is finite and zero or greater.
pub(crate) fn ensure_non_negative(name: &'static str, value: f32) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ArborError::NegativeParameter { name, value })
    }
}
