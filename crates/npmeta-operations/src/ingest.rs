//! The ingestion pipeline: fetch, extract, parse, then merge into the
//! package document under the package's lock.

use std::sync::Arc;

use npmeta_registry::{extract_manifest, parse_manifest, PackageDocument};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::{
    context::NpmetaContext,
    error::{IngestError, IngestResult},
    types::{FailedInfo, IngestReport, IngestedInfo},
};

/// Ingests the tarball at `locator` into its package document.
///
/// Fetching, extraction and parsing happen without any lock held. The
/// package lock is taken only around the read-merge-write of the document,
/// so ingestions of the same package are serialized while different packages
/// proceed independently.
///
/// The document is read once and, on success, written once. Any failure
/// before the write leaves the stored document untouched. Once the write has
/// started, it completes and only then releases the lock, even if the
/// returned future is dropped.
///
/// # Errors
///
/// * [`IngestError::Fetch`] if the tarball could not be fetched
/// * [`IngestError::Registry`] if the tarball or its manifest is unusable
/// * [`IngestError::InvalidManifest`] if the manifest lacks a name or version
/// * [`IngestError::Lock`] if the package lock was not acquired in time
/// * [`IngestError::VersionExists`] if republishing is disabled and the
///   version is already present
/// * [`IngestError::Store`] if the document could not be read or written
pub async fn ingest(ctx: &NpmetaContext, locator: &str) -> IngestResult<IngestedInfo> {
    let options = ctx.options();
    let deadline = ctx.deadline();

    debug!(locator, "ingesting tarball");
    let tarball = ctx.fetcher().fetch(locator, deadline).await?;

    let max_manifest_size = options.max_manifest_size;
    let raw = tokio::task::spawn_blocking(move || extract_manifest(&tarball, max_manifest_size))
        .await
        .map_err(|err| IngestError::Join(err.to_string()))??;

    let manifest = parse_manifest(&raw, locator)?;
    for (field, value) in [("name", &manifest.name), ("version", &manifest.version)] {
        if value.is_empty() {
            return Err(IngestError::InvalidManifest {
                locator: locator.to_string(),
                field,
            });
        }
    }

    let name = manifest.name.clone();
    let version = manifest.version.clone();
    let metadata = manifest.into_version_metadata();

    let lock = ctx.locks().acquire_until(&name, deadline).await?;

    let mut document = ctx
        .store()
        .get(&name, deadline)
        .await?
        .unwrap_or_else(|| PackageDocument::new(name.as_str()));

    if !options.allow_republish && document.contains_version(&version) {
        return Err(IngestError::VersionExists {
            name,
            version,
        });
    }

    let replaced = document.insert_version(version.as_str(), metadata).is_some();

    // The write runs in its own task that owns the lock, so dropping this
    // future mid-write cannot release the lock before the write lands.
    let store = ctx.store().clone();
    let write = tokio::spawn(async move {
        let result = store.put(&document, deadline).await;
        drop(lock);
        result
    });
    write
        .await
        .map_err(|err| IngestError::Join(err.to_string()))??;

    info!(
        name,
        version,
        locator,
        replaced,
        "ingested package version"
    );

    Ok(IngestedInfo {
        name,
        version,
        locator: locator.to_string(),
        replaced,
    })
}

/// Ingests many locators concurrently, bounded by the context's
/// `parallel_limit`.
///
/// Individual failures are collected into the report rather than aborting
/// the batch.
pub async fn ingest_many(ctx: &NpmetaContext, locators: Vec<String>) -> IngestResult<IngestReport> {
    debug!(count = locators.len(), "performing batch ingestion");
    let semaphore = Arc::new(Semaphore::new(ctx.options().parallel_limit.max(1)));

    let mut handles = Vec::with_capacity(locators.len());
    for locator in locators {
        let permit = semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|err| IngestError::Join(err.to_string()))?;
        let ctx = ctx.clone();

        let handle = tokio::spawn(async move {
            let result = ingest(&ctx, &locator).await;
            drop(permit);
            (locator, result)
        });
        handles.push(handle);
    }

    let mut report = IngestReport::default();
    for handle in handles {
        let (locator, result) = handle
            .await
            .map_err(|err| IngestError::Join(format!("Join handle error: {err}")))?;

        match result {
            Ok(info) => report.ingested.push(info),
            Err(err) => {
                warn!(locator, error = %err, "ingestion failed");
                report.failed.push(FailedInfo {
                    kind: err.kind(),
                    status: err.status_code().as_u16(),
                    error: err.to_string(),
                    locator,
                });
            }
        }
    }

    Ok(report)
}
