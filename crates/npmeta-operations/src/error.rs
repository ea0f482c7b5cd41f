//! Error types for npmeta operations.

use miette::Diagnostic;
use npmeta_config::error::ConfigError;
use npmeta_dl::FetchError;
use npmeta_registry::{RegistryError, StoreError};
use npmeta_utils::error::LockError;
use thiserror::Error;
use ureq::http::StatusCode;

/// Coarse classification of an ingestion failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The locator resolved to nothing.
    NotFound,
    /// The fetch failed for any other reason.
    TransientFetch,
    /// The tarball or its manifest could not be used.
    Corrupt,
    /// The manifest lacks a name or version.
    InvalidManifest,
    /// Reading or writing the document failed.
    StoreError,
    /// The version is already published and republishing is disabled.
    Conflict,
    Other,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::TransientFetch => "transient_fetch",
            ErrorKind::Corrupt => "corrupt",
            ErrorKind::InvalidManifest => "invalid_manifest",
            ErrorKind::StoreError => "store_error",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Other => "other",
        }
    }
}

/// Failure of a single ingestion.
///
/// Each stage's error is wrapped as-is; [`IngestError::kind`] derives the
/// classification from it.
#[derive(Error, Diagnostic, Debug)]
pub enum IngestError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Registry(#[from] RegistryError),

    #[error("Invalid manifest in {locator}: `{field}` is missing or empty")]
    #[diagnostic(
        code(npmeta::invalid_manifest),
        help("package.json must declare a non-empty `name` and `version`")
    )]
    InvalidManifest {
        locator: String,
        field: &'static str,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error("{name}@{version} is already published")]
    #[diagnostic(
        code(npmeta::version_exists),
        help("Bump the version, or set `allow_republish = true` to overwrite")
    )]
    VersionExists { name: String, version: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Lock(#[from] LockError),

    #[error("Invalid request: {0}")]
    #[diagnostic(
        code(npmeta::invalid_request),
        help(r#"The request body must be JSON like {{"key": "<locator>"}}"#)
    )]
    InvalidRequest(String),

    #[error("Ingestion task failed: {0}")]
    #[diagnostic(code(npmeta::join))]
    Join(String),
}

impl IngestError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            IngestError::Fetch(err) if err.is_not_found() => ErrorKind::NotFound,
            IngestError::Fetch(_) => ErrorKind::TransientFetch,
            IngestError::Registry(err) if err.is_corrupt() => ErrorKind::Corrupt,
            IngestError::InvalidManifest { .. } => ErrorKind::InvalidManifest,
            IngestError::Store(_) => ErrorKind::StoreError,
            IngestError::VersionExists { .. } => ErrorKind::Conflict,
            IngestError::Registry(_)
            | IngestError::Lock(_)
            | IngestError::InvalidRequest(_)
            | IngestError::Join(_) => ErrorKind::Other,
        }
    }

    /// HTTP status reported for this failure.
    pub fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Corrupt | ErrorKind::InvalidManifest => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::TransientFetch | ErrorKind::StoreError | ErrorKind::Other => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

pub type IngestResult<T> = std::result::Result<T, IngestError>;

/// Top-level error for commands driving the operations.
#[derive(Error, Diagnostic, Debug)]
pub enum NpmetaError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error("Error while {action}")]
    #[diagnostic(code(npmeta::io), help("Check file permissions and disk space"))]
    IoError {
        action: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    #[diagnostic(code(npmeta::json))]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    #[diagnostic(code(npmeta::error))]
    Custom(String),
}

pub type NpmetaResult<T> = std::result::Result<T, NpmetaError>;

/// Trait for adding context to IO errors.
pub trait ErrorContext<T> {
    fn with_context<C>(self, context: C) -> NpmetaResult<T>
    where
        C: FnOnce() -> String;
}

impl<T> ErrorContext<T> for std::io::Result<T> {
    fn with_context<C>(self, context: C) -> NpmetaResult<T>
    where
        C: FnOnce() -> String,
    {
        self.map_err(|err| {
            NpmetaError::IoError {
                action: context(),
                source: err,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_kinds() {
        let err = IngestError::from(FetchError::NotFound {
            locator: "foo.tgz".to_string(),
        });
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

        let err = IngestError::from(FetchError::HttpError {
            status: 503,
            locator: "foo.tgz".to_string(),
        });
        assert_eq!(err.kind(), ErrorKind::TransientFetch);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_registry_kinds() {
        let err = IngestError::from(RegistryError::ManifestNotFound);
        assert_eq!(err.kind(), ErrorKind::Corrupt);
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

        let err = IngestError::from(RegistryError::ArchiveRead {
            source: std::io::Error::other("short read"),
        });
        assert_eq!(err.kind(), ErrorKind::Other);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_remaining_kinds() {
        let err = IngestError::InvalidManifest {
            locator: "k".to_string(),
            field: "version",
        };
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            err.to_string(),
            "Invalid manifest in k: `version` is missing or empty"
        );

        let err = IngestError::VersionExists {
            name: "foo".to_string(),
            version: "1.0.0".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(err.status_code(), StatusCode::CONFLICT);

        let err = IngestError::from(StoreError::Custom("disk gone".to_string()));
        assert_eq!(err.kind(), ErrorKind::StoreError);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let err = IngestError::from(LockError::Timeout {
            name: "foo".to_string(),
        });
        assert_eq!(err.kind(), ErrorKind::Other);

        let err = IngestError::InvalidRequest("empty key".to_string());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_error_kind_as_str() {
        assert_eq!(ErrorKind::NotFound.as_str(), "not_found");
        assert_eq!(ErrorKind::InvalidManifest.as_str(), "invalid_manifest");
    }
}
