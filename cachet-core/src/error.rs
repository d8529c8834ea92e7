//! Error types for cachet operations

use crate::RecordId;
use thiserror::Error;

/// Record store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Record not found: id {id}")]
    NotFound { id: RecordId },

    #[error("Name already exists: {name}")]
    DuplicateName { name: String },

    #[error("Store lock poisoned")]
    LockPoisoned,
}

/// Path-expression errors, covering both parsing and evaluation.
///
/// Evaluation failures are hard errors: a key or value expression that cannot
/// be resolved never silently falls back to a default.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExprError {
    #[error("Parse error at position {position}: {message}")]
    Parse { message: String, position: usize },

    #[error("Unknown binding: {name}")]
    UnknownBinding { name: String },

    #[error("Missing field '{segment}' while resolving {path}")]
    MissingField { segment: String, path: String },

    #[error("Cannot traverse into '{segment}' of non-object value while resolving {path}")]
    NonObjectTraversal { segment: String, path: String },
}

/// Cache backend errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache lock poisoned")]
    LockPoisoned,

    #[error("Cache backend error: {reason}")]
    Backend { reason: String },

    #[error("Value codec error: {reason}")]
    Codec { reason: String },
}

/// Dispatcher errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("No binding registered for method '{method}'")]
    UnknownMethod { method: String },

    #[error("Required key argument is null in method '{method}'")]
    NullArgument { method: String },

    #[error("Method '{method}' mutates the store but no business call was supplied")]
    MissingBody { method: String },

    #[error("Key for method '{method}' must be {expected}")]
    KeyShape { method: String, expected: String },

    #[error("Value for method '{method}' must be {expected}")]
    ValueShape { method: String, expected: String },
}

/// Master error type for all cachet errors.
#[derive(Debug, Clone, Error)]
pub enum CachetError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Expression error: {0}")]
    Expr(#[from] ExprError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),
}

/// Result type alias for cachet operations.
pub type CachetResult<T> = Result<T, CachetError>;
