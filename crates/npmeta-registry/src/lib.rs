//! Package metadata handling for npmeta.
//!
//! This crate turns tarball bytes into version metadata and persists the
//! per-package aggregate document.
//!
//! # Overview
//!
//! - [`extract_manifest`] pulls `*/package.json` out of a gzip-compressed tarball
//! - [`parse_manifest`] parses it, keeping every field, and records the
//!   distribution locator under `dist.tarball`
//! - [`PackageDocument`] maps version strings to version metadata
//! - [`MetadataStore`] persists documents; [`FsStore`] and [`MemoryStore`] are
//!   the provided backends
//!
//! # Example
//!
//! ```no_run
//! use npmeta_registry::{extract_manifest, parse_manifest, PackageDocument};
//!
//! fn version_entry(tarball: &[u8], locator: &str) -> npmeta_registry::Result<PackageDocument> {
//!     let raw = extract_manifest(tarball, 4 * 1024 * 1024)?;
//!     let manifest = parse_manifest(&raw, locator)?;
//!     let mut document = PackageDocument::new(manifest.name.clone());
//!     let version = manifest.version.clone();
//!     document.insert_version(version, manifest.into_version_metadata());
//!     Ok(document)
//! }
//! ```

pub mod document;
pub mod error;
pub mod manifest;
pub mod store;
pub mod tarball;

pub use document::PackageDocument;
pub use error::{ErrorContext, RegistryError, Result, StoreError, StoreResult};
pub use manifest::{parse_manifest, Manifest};
pub use store::{FsStore, MemoryStore, MetadataStore};
pub use tarball::{extract_manifest, GZIP_MAGIC_BYTES, MANIFEST_FILE_NAME};
