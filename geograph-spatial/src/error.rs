//! Error and result types for spatial indexing operations.

use geograph::errors::{ErrorKind, GraphError};
use geograph::store::VertexId;
use thiserror::Error;

/// Errors that can occur in spatial indexing operations.
#[derive(Debug, Error)]
pub enum SpatialError {
    /// The geometry vertex is not reachable from this layer's index root.
    #[error("Geometry node {0} is not indexed in this layer")]
    NotIndexed(VertexId),

    /// A structural invariant of the index was observed violated. Fatal;
    /// callers should treat the layer as corrupt.
    #[error("Index invariant violated: {0}")]
    InternalInvariant(String),

    /// A mutation was attempted on a read-only dynamic sub-layer.
    #[error("Layer '{0}' is a read-only view; mutate the base layer instead")]
    ReadOnlyView(String),

    /// A dynamic-layer predicate could not be parsed.
    #[error("Invalid layer query: {0}")]
    InvalidQuery(String),

    /// A persisted property did not have the shape the encoder expects.
    #[error("Unrecognised '{property}' property: expected {expected}, found {found}")]
    EncoderMismatch {
        property: String,
        expected: String,
        found: String,
    },

    /// Transaction or storage failure from the host store.
    #[error("Host store error: {0}")]
    Store(#[from] GraphError),
}

impl From<SpatialError> for GraphError {
    fn from(err: SpatialError) -> Self {
        match err {
            SpatialError::Store(graph_err) => graph_err,
            other => GraphError::new(
                &other.to_string(),
                ErrorKind::Extension("spatial".to_string()),
            ),
        }
    }
}

/// Result type for spatial operations.
pub type SpatialResult<T> = Result<T, SpatialError>;
