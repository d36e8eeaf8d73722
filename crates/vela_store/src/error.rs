//! Store error types

use thiserror::Error;

/// Error returned by a fallible reducer. Aborts the dispatch; the bound
/// field keeps its previous value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ActionError {
    message: String,
}

impl ActionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Store-related errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// A reducer rejected the dispatched argument
    #[error("Action failed: {0}")]
    Action(#[from] ActionError),

    /// The handle does not belong to this store
    #[error("Unknown action handle (index {0})")]
    UnknownAction(usize),

    /// The field's backing signal was removed from the graph
    #[error("Field '{0}' is no longer in the graph")]
    FieldRemoved(String),

    /// The dispatched argument did not match the registered reducer
    #[error("Argument type mismatch for action '{0}'")]
    ArgumentType(String),
}

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;
