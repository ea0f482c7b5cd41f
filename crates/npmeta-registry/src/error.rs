//! Error types for the registry crate.
//!
//! [`RegistryError`] covers tarball extraction and manifest parsing.
//! [`StoreError`] covers document persistence.

use miette::Diagnostic;
use thiserror::Error;

/// Errors raised while turning tarball bytes into a manifest.
#[derive(Error, Diagnostic, Debug)]
pub enum RegistryError {
    #[error("Corrupt tarball: {0}")]
    #[diagnostic(
        code(npmeta_registry::corrupt_tarball),
        help("The tarball must be a gzip-compressed tar archive")
    )]
    CorruptTarball(String),

    #[error("Corrupt tarball: could not find */package.json")]
    #[diagnostic(
        code(npmeta_registry::manifest_not_found),
        help("Packages must contain a single top-level directory holding package.json")
    )]
    ManifestNotFound,

    #[error("Corrupt tarball: package.json is {size} bytes, over the {limit} byte limit")]
    #[diagnostic(
        code(npmeta_registry::manifest_too_large),
        help("Raise `max_manifest_size` if this manifest is legitimate")
    )]
    ManifestTooLarge { size: u64, limit: u64 },

    #[error("Malformed package.json: {source}")]
    #[diagnostic(
        code(npmeta_registry::malformed_manifest),
        help("package.json must be valid JSON")
    )]
    MalformedManifest {
        #[source]
        source: serde_json::Error,
    },

    #[error("Malformed package.json: expected a JSON object")]
    #[diagnostic(code(npmeta_registry::manifest_not_object))]
    ManifestNotObject,

    #[error("Error while reading archive entries: {source}")]
    #[diagnostic(code(npmeta_registry::archive_read))]
    ArchiveRead {
        #[source]
        source: std::io::Error,
    },
}

impl RegistryError {
    /// Whether the input itself is unusable, as opposed to a read failure
    /// while scanning it.
    pub fn is_corrupt(&self) -> bool {
        !matches!(self, RegistryError::ArchiveRead { .. })
    }
}

/// Errors raised by [`MetadataStore`](crate::MetadataStore) backends.
#[derive(Error, Diagnostic, Debug)]
pub enum StoreError {
    #[error("Error while {action}: {source}")]
    #[diagnostic(
        code(npmeta_registry::store::io),
        help("Check permissions and free space of the store directory")
    )]
    IoError {
        action: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Stored document for `{name}` is unreadable: {source}")]
    #[diagnostic(
        code(npmeta_registry::store::decode),
        help("The document file may have been edited by hand or truncated")
    )]
    Decode {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize document for `{name}`: {source}")]
    #[diagnostic(code(npmeta_registry::store::encode))]
    Encode {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Timed out while {action}")]
    #[diagnostic(
        code(npmeta_registry::store::timeout),
        help("The store did not respond before the ingestion deadline")
    )]
    Timeout { action: String },

    #[error("Store task failed: {0}")]
    #[diagnostic(code(npmeta_registry::store::join))]
    Join(String),

    #[error("{0}")]
    #[diagnostic(code(npmeta_registry::store::custom))]
    Custom(String),
}

/// A specialized Result type for extraction and parsing.
pub type Result<T> = std::result::Result<T, RegistryError>;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Extension trait for adding context to I/O errors.
///
/// Converts `std::io::Result` into [`StoreResult`] with a description of the
/// action that failed.
pub trait ErrorContext<T> {
    fn with_context<C>(self, context: C) -> StoreResult<T>
    where
        C: FnOnce() -> String;
}

impl<T> ErrorContext<T> for std::io::Result<T> {
    fn with_context<C>(self, context: C) -> StoreResult<T>
    where
        C: FnOnce() -> String,
    {
        self.map_err(|err| {
            StoreError::IoError {
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
    fn test_error_display() {
        let err = RegistryError::ManifestNotFound;
        assert_eq!(
            err.to_string(),
            "Corrupt tarball: could not find */package.json"
        );

        let err = RegistryError::CorruptTarball("empty data".to_string());
        assert_eq!(err.to_string(), "Corrupt tarball: empty data");
    }

    #[test]
    fn test_is_corrupt() {
        assert!(RegistryError::ManifestNotFound.is_corrupt());
        assert!(RegistryError::ManifestNotObject.is_corrupt());
        assert!(RegistryError::CorruptTarball("x".into()).is_corrupt());

        let err = RegistryError::ArchiveRead {
            source: std::io::Error::other("unexpected end of file"),
        };
        assert!(!err.is_corrupt());
    }

    #[test]
    fn test_with_context() {
        let result: std::io::Result<()> = Err(std::io::Error::other("disk full"));
        let err = result
            .with_context(|| "writing foo.json".to_string())
            .unwrap_err();
        assert_eq!(err.to_string(), "Error while writing foo.json: disk full");
    }
}
