use std::{
    collections::HashMap,
    sync::{PoisonError, RwLock},
};

use async_trait::async_trait;
use npmeta_utils::time::Deadline;

use super::MetadataStore;
use crate::{document::PackageDocument, error::StoreResult};

/// Keeps documents in process memory. Contents are lost on drop.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RwLock<HashMap<String, PackageDocument>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Names of all stored packages, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self
            .documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}

#[async_trait]
impl MetadataStore for MemoryStore {
    async fn get(&self, name: &str, _deadline: Deadline) -> StoreResult<Option<PackageDocument>> {
        Ok(self
            .documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned())
    }

    async fn put(&self, document: &PackageDocument, _deadline: Deadline) -> StoreResult<()> {
        self.documents
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(document.name.clone(), document.clone());
        Ok(())
    }
}
