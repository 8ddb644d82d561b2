use backtrace::Backtrace;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::result::Result;

use crate::common::{atomic, Atomic};

/// Error kinds for graph store operations
///
/// This enum represents all possible error types that can occur during graph
/// store operations. Each error kind describes a specific category of failure,
/// enabling precise error handling.
///
/// # Examples
///
/// ```rust,ignore
/// use geograph::errors::{GraphError, ErrorKind, GraphResult};
///
/// fn example() -> GraphResult<()> {
///     Err(GraphError::new("Vertex not found", ErrorKind::VertexNotFound))
/// }
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ErrorKind {
    /// The requested vertex does not exist
    VertexNotFound,
    /// The requested edge does not exist
    EdgeNotFound,
    /// A single-edge lookup matched more than one edge
    AmbiguousEdge,
    /// The operation is not valid in the current context
    InvalidOperation,
    /// Error in transaction handling (begin, commit, rollback)
    TransactionError,
    /// Error from the storage backend
    BackendError,
    /// Store has already been closed
    StoreAlreadyClosed,

    // Extension errors - allows external crates to plug in their own error types.
    // The String contains the extension name/category (e.g., "spatial").
    /// Error from an extension module (e.g., spatial)
    Extension(String),

    /// Internal error (usually indicates a bug)
    InternalError,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::VertexNotFound => write!(f, "Vertex not found"),
            ErrorKind::EdgeNotFound => write!(f, "Edge not found"),
            ErrorKind::AmbiguousEdge => write!(f, "Ambiguous edge"),
            ErrorKind::InvalidOperation => write!(f, "Invalid operation"),
            ErrorKind::TransactionError => write!(f, "Transaction error"),
            ErrorKind::BackendError => write!(f, "Backend error"),
            ErrorKind::StoreAlreadyClosed => write!(f, "Store already closed"),
            ErrorKind::Extension(name) => write!(f, "{} error", name),
            ErrorKind::InternalError => write!(f, "Internal error"),
        }
    }
}

/// Custom graph store error type.
///
/// `GraphError` encapsulates error information including the error message,
/// kind, and optional cause. It supports error chaining and backtraces for
/// debugging.
///
/// # Examples
///
/// ```rust,ignore
/// use geograph::errors::{GraphError, ErrorKind};
///
/// // Create a simple error
/// let err = GraphError::new("Vertex not found", ErrorKind::VertexNotFound);
///
/// // Create an error with a cause
/// let cause = GraphError::new("Backend failed", ErrorKind::BackendError);
/// let err = GraphError::new_with_cause("Commit failed", ErrorKind::TransactionError, cause);
/// ```
///
/// # Type alias
///
/// The `GraphResult<T>` type alias is equivalent to `Result<T, GraphError>`
/// and is used throughout the codebase for operations that can fail.
#[derive(Clone)]
pub struct GraphError {
    message: String,
    error_kind: ErrorKind,
    cause: Option<Box<GraphError>>,
    backtrace: Atomic<Backtrace>,
}

impl GraphError {
    /// Creates a new `GraphError` with the specified message and error kind.
    ///
    /// # Arguments
    ///
    /// * `message` - A description of the error
    /// * `error_kind` - The category of error
    ///
    /// # Returns
    ///
    /// A new `GraphError` instance.
    pub fn new(message: &str, error_kind: ErrorKind) -> Self {
        GraphError {
            message: message.to_string(),
            error_kind,
            cause: None,
            backtrace: atomic(Backtrace::new()),
        }
    }

    /// Creates a new `GraphError` with a cause error.
    ///
    /// This creates an error chain where the cause error is preserved for
    /// debugging.
    ///
    /// # Arguments
    ///
    /// * `message` - A description of the error
    /// * `error_kind` - The category of error
    /// * `cause` - The underlying error that caused this error
    ///
    /// # Returns
    ///
    /// A new `GraphError` instance with the cause error attached.
    pub fn new_with_cause(message: &str, error_kind: ErrorKind, cause: GraphError) -> Self {
        GraphError {
            message: message.to_string(),
            error_kind,
            cause: Some(Box::new(cause)),
            backtrace: atomic(Backtrace::new()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.error_kind
    }

    pub fn cause(&self) -> Option<&Box<GraphError>> {
        self.cause.as_ref()
    }
}

impl Display for GraphError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Debug for GraphError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // print error message with stack trace followed by cause
        match &self.cause {
            Some(cause) => write!(f, "{}\nCaused by: {:?}", self.message, cause),
            None => write!(f, "{}\n{:?}", self.message, self.backtrace.read()),
        }
    }
}

impl Error for GraphError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.cause {
            Some(cause) => Some(cause.as_ref()),
            None => None,
        }
    }
}

/// A result type alias for graph store operations.
///
/// `GraphResult<T>` is shorthand for `Result<T, GraphError>`.
/// All fallible graph store operations return this type.
pub type GraphResult<T> = Result<T, GraphError>;

// From trait implementations for automatic error conversion
impl From<std::io::Error> for GraphError {
    fn from(err: std::io::Error) -> Self {
        GraphError::new(&format!("IO error: {}", err), ErrorKind::BackendError)
    }
}

impl From<std::fmt::Error> for GraphError {
    fn from(err: std::fmt::Error) -> Self {
        GraphError::new(
            &format!("Formatting error: {}", err),
            ErrorKind::InternalError,
        )
    }
}

impl From<String> for GraphError {
    fn from(msg: String) -> Self {
        GraphError::new(&msg, ErrorKind::InternalError)
    }
}

impl From<&str> for GraphError {
    fn from(msg: &str) -> Self {
        GraphError::new(msg, ErrorKind::InternalError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_error_new_creates_error() {
        let error = GraphError::new("An error occurred", ErrorKind::BackendError);
        assert_eq!(error.message(), "An error occurred");
        assert_eq!(error.kind(), &ErrorKind::BackendError);
        assert!(error.cause().is_none());
    }

    #[test]
    fn graph_error_new_with_cause_creates_error() {
        let cause = GraphError::new("Backend failed", ErrorKind::BackendError);
        let error =
            GraphError::new_with_cause("Commit failed", ErrorKind::TransactionError, cause);
        assert_eq!(error.message(), "Commit failed");
        assert_eq!(error.kind(), &ErrorKind::TransactionError);
        assert!(error.cause().is_some());
    }

    #[test]
    fn graph_error_display_formats_correctly() {
        let error = GraphError::new("An error occurred", ErrorKind::BackendError);
        assert_eq!(format!("{}", error), "An error occurred");
    }

    #[test]
    fn graph_error_debug_formats_with_cause() {
        let cause = GraphError::new("root cause", ErrorKind::BackendError);
        let error = GraphError::new_with_cause("wrapper", ErrorKind::TransactionError, cause);
        let formatted = format!("{:?}", error);
        assert!(formatted.contains("wrapper"));
        assert!(formatted.contains("Caused by:"));
    }

    #[test]
    fn graph_error_source_returns_cause() {
        let cause = GraphError::new("root cause", ErrorKind::BackendError);
        let error = GraphError::new_with_cause("wrapper", ErrorKind::TransactionError, cause);
        assert!(error.source().is_some());

        let error = GraphError::new("no cause", ErrorKind::BackendError);
        assert!(error.source().is_none());
    }

    #[test]
    fn test_error_kind_equality() {
        let error1 = GraphError::new("Error 1", ErrorKind::VertexNotFound);
        let error2 = GraphError::new("Error 2", ErrorKind::VertexNotFound);
        let error3 = GraphError::new("Error 3", ErrorKind::EdgeNotFound);

        assert_eq!(error1.kind(), error2.kind());
        assert_ne!(error1.kind(), error3.kind());
    }

    #[test]
    fn test_extension_errors() {
        // Extensions can use the Extension variant with their own name
        let spatial_ext = GraphError::new(
            "Spatial index error",
            ErrorKind::Extension("spatial".to_string()),
        );
        assert_eq!(
            spatial_ext.kind(),
            &ErrorKind::Extension("spatial".to_string())
        );

        // Display should show the extension name
        let display = format!("{}", ErrorKind::Extension("spatial".to_string()));
        assert_eq!(display, "spatial error");
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::other("io failed");
        let graph_err: GraphError = io_err.into();
        assert_eq!(graph_err.kind(), &ErrorKind::BackendError);
        assert!(graph_err.message().contains("IO error"));
    }

    #[test]
    fn test_from_str_and_string() {
        let err: GraphError = "plain error".into();
        assert_eq!(err.kind(), &ErrorKind::InternalError);
        assert_eq!(err.message(), "plain error");

        let err: GraphError = String::from("owned error").into();
        assert_eq!(err.message(), "owned error");
    }

    #[test]
    fn test_error_chain_with_different_kinds() {
        let root_cause = GraphError::new("Edge missing", ErrorKind::EdgeNotFound);
        let mid_level =
            GraphError::new_with_cause("Failed to unlink", ErrorKind::InvalidOperation, root_cause);
        let top_level =
            GraphError::new_with_cause("Rollback required", ErrorKind::TransactionError, mid_level);

        assert_eq!(top_level.kind(), &ErrorKind::TransactionError);
        if let Some(cause) = top_level.cause() {
            assert_eq!(cause.kind(), &ErrorKind::InvalidOperation);
        }
    }
}
