//! Normalized error types for the assignment pipeline.
//!
//! Backend-agnostic errors that hide storage details and give callers
//! actionable categories. A human-review routing is NOT an error: the
//! engine returns a well-formed `Decision` for those.

use std::fmt;

/// Failure of a single store operation. Transient from the engine's point
/// of view: the caller may retry the whole decision, never silently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backing store is unreachable or the connection failed.
    Unavailable { message: String },

    /// A query was attempted and failed.
    Query { message: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable { message } => write!(f, "store unavailable: {message}"),
            Self::Query { message } => write!(f, "store query failed: {message}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Error returned by a decision call. No partial decisions: any of these
/// means no `Decision` was produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// A store operation failed while loading the team snapshot.
    Store(StoreError),

    /// The ticket or similar-ticket input failed validation.
    InvalidInput { message: String },

    /// An internal invariant was violated (bad weight table, inconsistent
    /// snapshot). Indicates a configuration or data bug, not caller error.
    InvariantViolation { message: String },
}

impl EngineError {
    /// Whether retrying the call may succeed without intervention.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Store(_))
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Store(err) => write!(f, "snapshot load failed: {err}"),
            Self::InvalidInput { message } => write!(f, "invalid input: {message}"),
            Self::InvariantViolation { message } => {
                write!(f, "invariant violation: {message}")
            }
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}
