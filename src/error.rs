//! Unified error type.

use std::sync::Arc;

use crate::params::BindError;

/// A factory failure, shared so a cached singleton error can be handed to
/// every caller that resolves it.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// The error type returned by gantry's fallible operations.
///
/// Routing and container failures are returned as values from the operation
/// that produced them. Handlers that want a failure to become an HTTP
/// response return `Result<T, Error>`, which maps each kind to a status code.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no url registered")]
    NoRoutesRegistered,

    #[error("no match found")]
    NoMatch,

    #[error("an object named `{0}` has not been registered")]
    ObjectNotFound(String),

    #[error("an object named `{0}` has already been registered")]
    ObjectAlreadyExists(String),

    #[error("the registered object cannot be cast to the type requested for `{0}`")]
    InvalidCast(String),

    #[error("the `{0}` parameter is required for scoped services")]
    MissingRequiredParameter(&'static str),

    #[error("factory for `{name}` failed: {source}")]
    Factory {
        name: String,
        #[source]
        source: SharedError,
    },

    #[error("invalid socket address `{0}`")]
    InvalidAddress(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("route values: {0}")]
    Bind(#[from] BindError),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// True for the two routing failures that mean "nothing handles this".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NoMatch | Self::NoRoutesRegistered)
    }
}
