//! Error types for poidex.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PoidexError>;

/// Errors returned by index and taxonomy operations.
///
/// Structural violations (a page holding more entries than its capacity, a
/// coordinate with more bits than the curve order) are programming errors and
/// are enforced with assertions instead of surfacing here.
#[derive(Debug, Error)]
pub enum PoidexError {
    /// The POI references a category that is not part of the taxonomy.
    #[error("unknown category: {0}")]
    UnknownCategory(String),

    /// A coordinate was non-finite or outside the supported range.
    #[error("invalid {axis} coordinate: {value}")]
    InvalidCoordinate {
        /// Which axis the offending value belongs to.
        axis: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// A POI with the same id is already indexed.
    #[error("duplicate POI id: {0}")]
    DuplicatePoi(u64),

    /// Bulk loading is only defined for an empty index.
    #[error("bulk load requires an empty index")]
    IndexNotEmpty,

    /// Configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The category list could not be assembled into a taxonomy.
    #[error("invalid taxonomy: {0}")]
    InvalidTaxonomy(String),
}
