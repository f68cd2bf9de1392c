//! Error types for butterfly-batch library
//!
//! Separates caller mistakes (state, input, lifecycle) from opaque failures
//! reported by the routing engine.

use std::fmt;

/// Opaque failure reported by the routing engine for a single call.
///
/// Inside a batch this is only ever delivered through the completion
/// callback; it never aborts sibling tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineError {
    message: String,
}

impl EngineError {
    /// Create an engine error with a human-readable message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The message reported by the engine
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Engine error: {}", self.message)
    }
}

impl std::error::Error for EngineError {}

/// Main error type for butterfly-batch operations
#[derive(Debug)]
pub enum Error {
    /// Operation invalid in the current state (e.g. enqueue while processing)
    State(String),

    /// Operation requires a loaded graph, or the queue was released by an unload
    NotLoaded,

    /// Profile name not registered with the graph
    ProfileNotFound(String),

    /// Invalid configuration or parameters
    InvalidInput(String),

    /// Failure reported by the routing engine on a direct call
    Engine(EngineError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::State(msg) => {
                write!(f, "Invalid state: {msg}")
            }
            Error::NotLoaded => {
                write!(f, "Graph is not loaded")
            }
            Error::ProfileNotFound(profile) => {
                write!(f, "Profile '{profile}' is not registered with this graph")
            }
            Error::InvalidInput(msg) => {
                write!(f, "Invalid input: {msg}")
            }
            Error::Engine(err) => {
                write!(f, "{err}")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Engine(err) => Some(err),
            _ => None,
        }
    }
}

impl From<EngineError> for Error {
    fn from(err: EngineError) -> Self {
        Error::Engine(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::InvalidInput(err.to_string())
    }
}

/// Convenience result type for butterfly-batch operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_error_messages() {
        assert_eq!(Error::NotLoaded.to_string(), "Graph is not loaded");
        assert_eq!(
            Error::State("queue is processing".to_string()).to_string(),
            "Invalid state: queue is processing"
        );
        assert_eq!(
            Error::ProfileNotFound("car".to_string()).to_string(),
            "Profile 'car' is not registered with this graph"
        );
    }

    #[test]
    fn test_engine_error_is_source() {
        let err: Error = EngineError::new("node 7 not found").into();
        assert_eq!(err.to_string(), "Engine error: node 7 not found");
        let source = err.source().expect("engine error should be the source");
        assert_eq!(source.to_string(), "Engine error: node 7 not found");
    }

    #[test]
    fn test_only_engine_errors_have_a_source() {
        assert!(Error::NotLoaded.source().is_none());
        assert!(Error::InvalidInput("bad radius".to_string()).source().is_none());
    }

    #[test]
    fn test_json_error_maps_to_invalid_input() {
        let parse = serde_json::from_str::<Vec<f64>>("[1, oops]").unwrap_err();
        match Error::from(parse) {
            Error::InvalidInput(msg) => assert!(msg.contains("line 1")),
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
    }
}
