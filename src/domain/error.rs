//! Error taxonomy for the knowledge base core.
//!
//! Every component boundary in this crate returns [`Result`]. The variants here are a
//! closed set of *kinds* (not per-component types) so that callers at the HTTP edge can
//! translate any failure into a response class without knowing which component produced it.

use thiserror::Error;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// A closed taxonomy of failure kinds shared by every component in this crate.
#[derive(Error, Debug)]
pub enum Error {
    /// Bad input: unsupported file type, empty query, illegal UUID. Never retried.
    #[error("validation error: {message}")]
    Validation {
        /// Human-readable description of what was invalid.
        message: String,
    },

    /// A referenced KB, document, or chunk does not exist.
    #[error("not found: {resource}")]
    NotFound {
        /// Description of the missing resource.
        resource: String,
    },

    /// The caller was not permitted to perform the operation. The core never decides this
    /// itself; it only propagates a `permitted: bool` handed to it by the auth layer.
    #[error("permission denied: {message}")]
    PermissionDenied {
        /// Description of the denied operation.
        message: String,
    },

    /// A network/backend failure that is recoverable with a retry budget. Surfaced once that
    /// budget is exhausted.
    #[error("transient error in {component}: {message}")]
    Transient {
        /// The component that raised the error (embedding, vector_store, keyword_index, cache, object_store).
        component: &'static str,
        /// Description of the failure.
        message: String,
    },

    /// Divergence between the catalog and the vector store, or a dimension mismatch.
    #[error("data integrity error: {message}")]
    DataIntegrity {
        /// Description of the inconsistency.
        message: String,
    },

    /// Missing configuration (API key, bucket, connection string). Fails fast at startup.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the misconfiguration.
        message: String,
    },

    /// No parser is registered for the document's file extension.
    #[error("unsupported file type: {extension}")]
    UnsupportedFileType {
        /// The offending extension.
        extension: String,
    },

    /// The parser recognized the file type but the bytes could not be decoded.
    #[error("parse error: {message}")]
    ParseError {
        /// Description of the parse failure.
        message: String,
    },

    /// The document's blob is absent from the object store.
    #[error("blob missing: {path}")]
    BlobMissing {
        /// The blob path that could not be found.
        path: String,
    },

    /// Parsing succeeded but produced no extractable text.
    #[error("empty extraction for document {document_id}")]
    EmptyExtraction {
        /// The document that produced no text.
        document_id: uuid::Uuid,
    },

    /// The embedding provider returned a vector whose dimension does not match the KB's
    /// configured dimension.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    EmbeddingDimensionMismatch {
        /// Dimension configured on the KB.
        expected: usize,
        /// Dimension actually returned.
        actual: usize,
    },

    /// Catch-all for unexpected internal failures that do not fit another kind.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal failure.
        message: String,
    },

    /// I/O failure (filesystem object store, local catalog persistence).
    #[error("I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// JSON (de)serialization failure.
    #[error("JSON error: {source}")]
    Json {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },
}

impl Error {
    /// Construct a [`Error::Validation`].
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Construct a [`Error::NotFound`].
    pub fn not_found<S: Into<String>>(resource: S) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Construct a [`Error::PermissionDenied`].
    pub fn permission_denied<S: Into<String>>(message: S) -> Self {
        Self::PermissionDenied {
            message: message.into(),
        }
    }

    /// Construct a [`Error::Transient`].
    pub fn transient<S: Into<String>>(component: &'static str, message: S) -> Self {
        Self::Transient {
            component,
            message: message.into(),
        }
    }

    /// Construct a [`Error::DataIntegrity`].
    pub fn data_integrity<S: Into<String>>(message: S) -> Self {
        Self::DataIntegrity {
            message: message.into(),
        }
    }

    /// Construct a [`Error::Config`].
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Construct a [`Error::ParseError`].
    pub fn parse_error<S: Into<String>>(message: S) -> Self {
        Self::ParseError {
            message: message.into(),
        }
    }

    /// Construct a [`Error::Internal`].
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether this error kind is eligible for the caller to retry against the same backend.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Transient { .. })
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            return Self::transient("http", err.to_string());
        }
        if let Some(status) = err.status() {
            if status.as_u16() == 429 || status.is_server_error() {
                return Self::transient("http", err.to_string());
            }
        }
        Self::Internal {
            message: err.to_string(),
        }
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Self::Config {
            message: err.to_string(),
        }
    }
}

impl From<uuid::Error> for Error {
    fn from(err: uuid::Error) -> Self {
        Self::Validation {
            message: format!("invalid uuid: {err}"),
        }
    }
}
