//! Authorization errors.

use thiserror::Error;

use crate::store::StoreError;

/// Infrastructure faults from an authorizer backend.
///
/// "No rule matched" is not an error: it is [`Resolution::NoMatch`](crate::acl::Resolution).
#[derive(Debug, Error)]
pub enum AuthzError {
    #[error("{backend}: failed to connect: {source}")]
    Connection {
        backend: String,
        #[source]
        source: StoreError,
    },

    #[error("{backend}: backend error: {source}")]
    Backend {
        backend: String,
        #[source]
        source: StoreError,
    },
}

impl AuthzError {
    pub fn connection(backend: impl Into<String>, source: StoreError) -> Self {
        Self::Connection {
            backend: backend.into(),
            source,
        }
    }

    pub fn backend(backend: impl Into<String>, source: StoreError) -> Self {
        Self::Backend {
            backend: backend.into(),
            source,
        }
    }

    /// Name of the backend that failed.
    pub fn backend_name(&self) -> &str {
        match self {
            Self::Connection { backend, .. } | Self::Backend { backend, .. } => backend,
        }
    }
}
