// Error types for the distribution engine

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by a [`crate::dists::http::Transport`].
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Request to {url} failed")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Request to {url} timed out")]
    Timeout { url: String },

    /// The run was asked to stop while bytes were still arriving.
    #[error("Download from {url} was interrupted")]
    Interrupted { url: String },

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl TransportError {
    pub(crate) fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout {
                url: url.to_string(),
            }
        } else {
            TransportError::Request {
                url: url.to_string(),
                source: err,
            }
        }
    }

    /// Whether running the same request again could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Timeout { .. } | TransportError::Interrupted { .. } => true,
            TransportError::Status { status, .. } => *status >= 500 || *status == 429,
            TransportError::Request { source, .. } => source.is_connect() || source.is_timeout(),
            TransportError::Io(_) => false,
        }
    }
}

/// Errors raised while resolving or materializing distributions.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to fetch version catalog from {url}")]
    CatalogFetch {
        url: String,
        #[source]
        source: TransportError,
    },

    #[error("Failed to parse version catalog from {url}")]
    CatalogParse {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to download {name} from {url}")]
    Download {
        name: String,
        url: String,
        #[source]
        source: TransportError,
    },

    #[error("Failed to {action} {} for {name}", .path.display())]
    Filesystem {
        name: String,
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to extract {name}")]
    Extract {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Gradle home for {name} is incomplete: {} is missing", .expected.display())]
    MissingHome { name: String, expected: PathBuf },

    #[error("{} exists but is not a Gradle home (no bin/gradle); remove it to let {name} be linked", .path.display())]
    InvalidHome { name: String, path: PathBuf },

    /// A catalog version that cannot name a cache directory.
    #[error("Version {version:?} is not a valid distribution version")]
    InvalidVersion { version: String },

    #[error("Invalid URL {url}: {message}")]
    Url { url: String, message: String },

    #[error("Invalid configuration in {}: {message}", .path.display())]
    Config { path: PathBuf, message: String },
}

impl Error {
    pub(crate) fn fs(
        name: impl Into<String>,
        action: &'static str,
        path: impl Into<PathBuf>,
        source: io::Error,
    ) -> Self {
        Error::Filesystem {
            name: name.into(),
            action,
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        let timeout = TransportError::Timeout {
            url: "https://example.com".into(),
        };
        let interrupted = TransportError::Interrupted {
            url: "https://example.com".into(),
        };
        let not_found = TransportError::Status {
            url: "https://example.com".into(),
            status: 404,
        };
        let unavailable = TransportError::Status {
            url: "https://example.com".into(),
            status: 503,
        };

        assert!(timeout.is_retryable());
        assert!(interrupted.is_retryable());
        assert!(!not_found.is_retryable());
        assert!(unavailable.is_retryable());
    }

    #[test]
    fn test_filesystem_message_names_target() {
        let err = Error::fs(
            "gradle-7.3-bin",
            "create symlink",
            "/cache/gradle-7.3",
            io::Error::from(io::ErrorKind::PermissionDenied),
        );
        assert_eq!(
            err.to_string(),
            "Failed to create symlink /cache/gradle-7.3 for gradle-7.3-bin"
        );
    }
}
