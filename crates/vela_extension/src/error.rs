//! Extension error types

use thiserror::Error;

/// Extension-related errors
#[derive(Error, Debug)]
pub enum ExtensionError {
    /// An extension's setup hook reported failure; its capabilities are
    /// not installed
    #[error("Extension setup failed: {0}")]
    Setup(String),

    /// An extension bundle's configuration could not be parsed
    #[error("Invalid extension config: {0}")]
    Config(String),
}

impl ExtensionError {
    pub fn setup(message: impl Into<String>) -> Self {
        Self::Setup(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

/// Result type for extension operations
pub type Result<T> = std::result::Result<T, ExtensionError>;
