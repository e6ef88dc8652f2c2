//! Error types for the walletkit library

use thiserror::Error;

/// Custom error type for walletkit operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Mnemonic error: {0}")]
    Mnemonic(String),

    #[error("Key derivation error: {0}")]
    KeyDerivation(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Address error: {0}")]
    Address(String),

    /// A derived extended key did not fit the caller's output bound.
    #[error("Extended key of {length} characters exceeds capacity {capacity}")]
    ExtendedKeyOverflow { length: usize, capacity: usize },

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No data")]
    NoData,

    #[error("JSON parse error: {0}")]
    JsonParse(String),

    #[error("Telemetry error: {0}")]
    Telemetry(String),
}

/// Result type for walletkit operations
pub type Result<T> = std::result::Result<T, Error>;
