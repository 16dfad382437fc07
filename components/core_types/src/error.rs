//! Runtime error types and the fatal/recoverable split.
//!
//! Errors carry a class that decides propagation: resolution errors stay
//! local to the `require` call that raised them, every other class
//! terminates the run loop.

use std::fmt;

/// The class of a runtime error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A module name could not be resolved to source
    Resolution,
    /// The engine reported a script-level failure
    Execution,
    /// The global deadline elapsed before the run drained
    Timeout,
    /// The host asked the run to stop
    Cancelled,
    /// The runtime was driven outside its contract
    Internal,
}

/// An error raised by the runtime or the embedded engine.
///
/// # Examples
///
/// ```
/// use core_types::{ErrorKind, ScriptError};
///
/// let err = ScriptError::timeout();
/// assert_eq!(err.kind(), ErrorKind::Timeout);
/// assert_eq!(err.to_string(), "script timed out");
/// assert!(err.is_fatal());
/// ```
#[derive(Debug, Clone)]
pub struct ScriptError {
    kind: ErrorKind,
    message: String,
}

/// Result type for runtime operations.
pub type ScriptResult<T> = Result<T, ScriptError>;

impl ScriptError {
    /// Creates an error of an arbitrary class.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        ScriptError {
            kind,
            message: message.into(),
        }
    }

    /// A module resolution failure, recoverable by the requiring script.
    pub fn resolution(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Resolution, message)
    }

    /// A script-level failure reported by the engine.
    pub fn execution(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Execution, message)
    }

    /// The distinguished deadline failure.
    pub fn timeout() -> Self {
        Self::new(ErrorKind::Timeout, "script timed out")
    }

    /// A host-issued cancellation carrying the host's cause.
    pub fn cancelled(cause: impl Into<String>) -> Self {
        Self::new(ErrorKind::Cancelled, cause)
    }

    /// A violation of the runtime's own contract.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// The class of this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether this error terminates the run loop when it propagates out
    /// of a task or the entry module.
    ///
    /// Resolution errors are local to one `require` call; the script may
    /// catch them and carry on.
    pub fn is_fatal(&self) -> bool {
        self.kind != ErrorKind::Resolution
    }
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ScriptError {}
