use thiserror::Error;

use crate::remote::RemoteError;

/// Failure classes the editor reports to the view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Validation,
    TransientNetwork,
    Precondition,
    Other,
}

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("{0}")]
    Validation(String),
    #[error("Network error: {0}")]
    Network(RemoteError),
    #[error("No unit is loaded")]
    NoUnitLoaded,
    #[error(transparent)]
    Remote(RemoteError),
}

impl EditorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Network(_) => ErrorKind::TransientNetwork,
            Self::NoUnitLoaded => ErrorKind::Precondition,
            Self::Remote(_) => ErrorKind::Other,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

impl From<RemoteError> for EditorError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::NotFound(path) => Self::NotFound(path),
            RemoteError::BadRequest(message) | RemoteError::Invalid(message) => {
                Self::Validation(message)
            }
            err if err.is_transient() => Self::Network(err),
            err => Self::Remote(err),
        }
    }
}
