use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The aggregate metadata document for one package.
///
/// Serialized as `{"name": ..., "versions": {<version>: <metadata>}}`.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct PackageDocument {
    pub name: String,
    #[serde(default)]
    pub versions: BTreeMap<String, Value>,
}

impl PackageDocument {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            versions: BTreeMap::new(),
        }
    }

    /// Sets the metadata for `version`, returning the entry it replaced.
    pub fn insert_version(&mut self, version: impl Into<String>, metadata: Value) -> Option<Value> {
        self.versions.insert(version.into(), metadata)
    }

    pub fn version(&self, version: &str) -> Option<&Value> {
        self.versions.get(version)
    }

    pub fn contains_version(&self, version: &str) -> bool {
        self.versions.contains_key(version)
    }
}
