//! Resource error types.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = ResourceError> = std::result::Result<T, E>;

// ============================================================================
// ResourceError
// ============================================================================

/// Errors raised while building, resolving or serving resources.
///
/// Validation errors surface immediately from the mutating call. Resolution
/// errors (file reads, content functions, processors) surface only when
/// content is actually requested.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("{0}")]
    Invalid(String),

    #[error("no resource at `{0}`")]
    NotFound(String),

    /// Etag-only placeholder that no cache could fill in.
    #[error("content for `{path}` (etag `{etag}`) is not available")]
    Unavailable { path: String, etag: String },

    #[error("IO error when reading `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("content of `{path}` failed: {message}")]
    Content { path: String, message: String },

    #[error("processor failed for `{path}`: {message}")]
    Processor { path: String, message: String },

    #[error("`{0}` is served by a backend, it has no content of its own")]
    Proxied(String),

    #[error("cannot combine `{path}`: {message}")]
    Combine { path: String, message: String },

    #[error("{0}")]
    Glob(String),

    #[error("serialization error")]
    Json(#[from] serde_json::Error),
}

impl ResourceError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }

    /// Error for a failing content function.
    pub fn content(path: impl Into<String>, message: impl ToString) -> Self {
        Self::Content {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Underlying IO error kind, if this error came from the filesystem.
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            Self::Io { source, .. } => Some(source.kind()),
            _ => None,
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Invalid(_) => "INVALID",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Unavailable { .. } => "UNAVAILABLE",
            Self::Io { source, .. } => match source.kind() {
                io::ErrorKind::NotFound => "ENOENT",
                io::ErrorKind::PermissionDenied => "EACCES",
                _ => "EIO",
            },
            Self::Content { .. } => "CONTENT",
            Self::Processor { .. } => "PROCESSOR",
            Self::Proxied(_) => "PROXIED",
            Self::Combine { .. } => "COMBINE",
            Self::Glob(_) => "GLOB",
            Self::Json(_) => "JSON",
        }
    }

    /// True for conditions that mean "nothing to serve" rather than a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Unavailable { .. })
    }
}
