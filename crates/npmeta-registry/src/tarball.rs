//! Manifest extraction from package tarballs.

use std::io::Read;

use flate2::bufread::GzDecoder;
use tracing::trace;

use crate::error::{RegistryError, Result};

/// Magic bytes opening every gzip stream.
pub const GZIP_MAGIC_BYTES: [u8; 2] = [0x1f, 0x8b];

pub const MANIFEST_FILE_NAME: &str = "package.json";

/// Returns the contents of the first `*/package.json` entry in a `.tgz`.
///
/// Entries are scanned in archive order and the top-level directory name is
/// not checked, so `package/package.json` and `foo-1.0.0/package.json` both
/// match while `package.json` or `a/b/package.json` do not.
///
/// # Errors
///
/// * [`RegistryError::CorruptTarball`] for empty input or a missing or
///   unreadable gzip header
/// * [`RegistryError::ManifestNotFound`] if the archive ends without a match
/// * [`RegistryError::ManifestTooLarge`] if the match exceeds `max_size`
/// * [`RegistryError::ArchiveRead`] for any read failure while scanning
pub fn extract_manifest(tarball: &[u8], max_size: u64) -> Result<Vec<u8>> {
    if tarball.is_empty() {
        return Err(RegistryError::CorruptTarball(
            "can not extract package.json from empty data".to_string(),
        ));
    }
    if !tarball.starts_with(&GZIP_MAGIC_BYTES) {
        return Err(RegistryError::CorruptTarball(
            "data is not gzip-compressed".to_string(),
        ));
    }

    let decoder = GzDecoder::new(tarball);
    if decoder.header().is_none() {
        return Err(RegistryError::CorruptTarball(
            "gzip header could not be read".to_string(),
        ));
    }

    let mut archive = tar::Archive::new(decoder);
    let entries = archive
        .entries()
        .map_err(|source| RegistryError::ArchiveRead { source })?;

    for entry in entries {
        let mut entry = entry.map_err(|source| RegistryError::ArchiveRead { source })?;

        if !is_manifest_path(&entry.path_bytes()) {
            continue;
        }

        let size = entry.size();
        if size > max_size {
            return Err(RegistryError::ManifestTooLarge {
                size,
                limit: max_size,
            });
        }

        trace!(size, "found package manifest");

        let mut manifest = Vec::with_capacity(usize::try_from(size).unwrap_or_default());
        entry
            .read_to_end(&mut manifest)
            .map_err(|source| RegistryError::ArchiveRead { source })?;
        return Ok(manifest);
    }

    Err(RegistryError::ManifestNotFound)
}

/// `<anything>/package.json` with exactly one leading segment.
fn is_manifest_path(path: &[u8]) -> bool {
    let mut segments = path.split(|byte| *byte == b'/');
    matches!(
        (segments.next(), segments.next(), segments.next()),
        (Some(_), Some(file), None) if file == MANIFEST_FILE_NAME.as_bytes()
    )
}
