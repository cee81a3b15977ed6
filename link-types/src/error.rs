//! Error types for pairlink value types.

use thiserror::Error;

/// Errors produced when building or parsing pairlink types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypesError {
    /// A device identifier string could not be decoded.
    #[error("invalid device id: {0}")]
    InvalidDeviceId(String),
}
