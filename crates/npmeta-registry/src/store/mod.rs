//! Document persistence.

mod fs;
mod memory;

use async_trait::async_trait;
use npmeta_utils::time::Deadline;

pub use self::{fs::FsStore, memory::MemoryStore};
use crate::{document::PackageDocument, error::StoreResult};

/// Persistence for package aggregate documents.
///
/// `put` must replace the whole document atomically: a concurrent `get` sees
/// either the previous document or the new one, never a mix.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Loads the document for `name`, `None` if nothing was stored yet.
    async fn get(&self, name: &str, deadline: Deadline) -> StoreResult<Option<PackageDocument>>;

    /// Stores `document` under its name, replacing any previous one.
    async fn put(&self, document: &PackageDocument, deadline: Deadline) -> StoreResult<()>;
}
