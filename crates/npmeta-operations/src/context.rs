use std::sync::Arc;

use npmeta_config::config::Config;
use npmeta_dl::{http_client::ClientConfig, FileFetcher, Fetcher, HttpFetcher, LocatorFetcher};
use npmeta_registry::{FsStore, MetadataStore};
use npmeta_utils::{lock::PackageLocks, time::Deadline};
use tracing::debug;

use crate::{error::NpmetaResult, types::IngestOptions};

/// Shared state for ingestions: the fetcher, the document store, the
/// per-package locks and the options every ingestion runs with.
///
/// Cloning is cheap; all clones share one lock registry, so same-name
/// ingestions are serialized across every clone.
#[derive(Clone)]
pub struct NpmetaContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    fetcher: Arc<dyn Fetcher>,
    store: Arc<dyn MetadataStore>,
    locks: PackageLocks,
    options: IngestOptions,
}

impl NpmetaContext {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        store: Arc<dyn MetadataStore>,
        options: IngestOptions,
    ) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                fetcher,
                store,
                locks: PackageLocks::new(),
                options,
            }),
        }
    }

    /// Builds a context backed by a [`LocatorFetcher`] and an [`FsStore`].
    ///
    /// `client` carries the HTTP settings given on the command line; its body
    /// limit and, when unset, its user agent are taken from `config`.
    pub fn from_config(config: &Config, mut client: ClientConfig) -> NpmetaResult<Self> {
        client.max_body_size = config.max_tarball_size();
        if client.user_agent.is_none() {
            client.user_agent = config.user_agent.clone();
        }

        let store_path = config.get_store_path()?;
        let tarball_path = config.get_tarball_path()?;
        debug!(
            store = %store_path.display(),
            tarballs = %tarball_path.display(),
            "creating context"
        );

        let fetcher = LocatorFetcher::new(
            HttpFetcher::new(&client),
            FileFetcher::new(Some(tarball_path)),
        );

        Ok(Self::new(
            Arc::new(fetcher),
            Arc::new(FsStore::new(store_path)),
            IngestOptions::from_config(config)?,
        ))
    }

    pub fn fetcher(&self) -> &Arc<dyn Fetcher> {
        &self.inner.fetcher
    }

    pub fn store(&self) -> &Arc<dyn MetadataStore> {
        &self.inner.store
    }

    pub fn locks(&self) -> &PackageLocks {
        &self.inner.locks
    }

    pub fn options(&self) -> &IngestOptions {
        &self.inner.options
    }

    /// A fresh deadline for one ingestion.
    pub fn deadline(&self) -> Deadline {
        Deadline::from_timeout(self.inner.options.timeout)
    }
}
