//! Error types for the restoration core

use thiserror::Error;

/// Restoration error types
#[derive(Error, Debug)]
pub enum RestoreError {
    /// Null/empty samples, bad sample rate, bad channel count, or a samples
    /// length that isn't a multiple of the channel count.
    #[error("invalid input: {reason}")]
    InvalidInput {
        /// Human-readable detail
        reason: String,
    },

    /// A request selected a settings mode but didn't supply that mode's
    /// required fields, or selected both/neither mode.
    #[error("invalid configuration: {reason}")]
    InvalidConfiguration {
        /// Human-readable detail
        reason: String,
    },
}

/// Result type for restoration operations
pub type RestoreResult<T> = Result<T, RestoreError>;
