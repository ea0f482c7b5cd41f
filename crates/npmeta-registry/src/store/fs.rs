use std::{
    fs,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use npmeta_utils::time::Deadline;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use tracing::{debug, trace};

use super::MetadataStore;
use crate::{
    document::PackageDocument,
    error::{ErrorContext, StoreError, StoreResult},
};

/// Characters escaped in document file names. Keeps common package name
/// characters readable while turning `/` in scoped names into `%2F`.
const FILE_NAME_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'@');

/// Stores one JSON document per package under `root`.
///
/// Writes go to a uniquely named `.part` file in `root` and are renamed into
/// place, so readers never observe a partially written document.
#[derive(Clone, Debug)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the document file for `name`.
    ///
    /// # Examples
    ///
    /// ```
    /// use npmeta_registry::FsStore;
    ///
    /// let store = FsStore::new("/var/lib/npmeta");
    /// assert!(store.document_path("@types/node").ends_with("@types%2Fnode.json"));
    /// ```
    pub fn document_path(&self, name: &str) -> PathBuf {
        let encoded = utf8_percent_encode(name, FILE_NAME_SET).to_string();
        // `.` and `..` would otherwise name the store directory or its parent
        let encoded = match encoded.as_str() {
            "." => "%2E".to_string(),
            ".." => "%2E%2E".to_string(),
            _ => encoded,
        };
        self.root.join(format!("{encoded}.json"))
    }

    fn read_document(path: &Path, name: &str) -> StoreResult<Option<PackageDocument>> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(StoreError::IoError {
                    action: format!("reading {}", path.display()),
                    source: err,
                })
            }
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| {
                StoreError::Decode {
                    name: name.to_string(),
                    source,
                }
            })
    }

    fn write_document(root: &Path, path: &Path, document: &PackageDocument) -> StoreResult<()> {
        fs::create_dir_all(root)
            .with_context(|| format!("creating store directory {}", root.display()))?;

        // Each write gets its own temp file, so concurrent writers of one
        // document never share a partial file.
        let part = tempfile::Builder::new()
            .prefix(".npmeta-")
            .suffix(".part")
            .tempfile_in(root)
            .with_context(|| format!("creating temp file in {}", root.display()))?;

        let mut writer = BufWriter::new(part.as_file());
        serde_json::to_writer_pretty(&mut writer, document).map_err(|source| {
            StoreError::Encode {
                name: document.name.clone(),
                source,
            }
        })?;
        writer
            .flush()
            .with_context(|| format!("writing {}", part.path().display()))?;
        drop(writer);
        part.as_file()
            .sync_all()
            .with_context(|| format!("syncing {}", part.path().display()))?;

        let part_path = part.path().to_path_buf();
        part.persist(path)
            .map_err(|err| err.error)
            .with_context(|| {
                format!("renaming {} to {}", part_path.display(), path.display())
            })?;

        trace!(path = %path.display(), "document written");
        Ok(())
    }
}

#[async_trait]
impl MetadataStore for FsStore {
    async fn get(&self, name: &str, deadline: Deadline) -> StoreResult<Option<PackageDocument>> {
        let path = self.document_path(name);
        debug!(name, path = %path.display(), "loading package document");

        let owned = name.to_string();
        let read = tokio::task::spawn_blocking(move || Self::read_document(&path, &owned));

        deadline
            .run(read)
            .await
            .map_err(|_| {
                StoreError::Timeout {
                    action: format!("loading document for `{name}`"),
                }
            })?
            .map_err(|err| StoreError::Join(err.to_string()))?
    }

    /// Refuses to start once the deadline has passed. A write already in
    /// progress is always awaited to completion.
    async fn put(&self, document: &PackageDocument, deadline: Deadline) -> StoreResult<()> {
        if deadline.is_expired() {
            return Err(StoreError::Timeout {
                action: format!("storing document for `{}`", document.name),
            });
        }

        let root = self.root.clone();
        let path = self.document_path(&document.name);
        debug!(name = %document.name, path = %path.display(), "storing package document");

        let document = document.clone();
        tokio::task::spawn_blocking(move || Self::write_document(&root, &path, &document))
            .await
            .map_err(|err| StoreError::Join(err.to_string()))?
    }
}
