use std::time::Duration;

use npmeta_config::{
    config::{Config, DEFAULT_INGEST_TIMEOUT, DEFAULT_MAX_MANIFEST_SIZE, DEFAULT_PARALLEL_LIMIT},
    error::Result as ConfigResult,
};
use npmeta_utils::time::parse_duration;
use serde::Serialize;

use crate::error::ErrorKind;

/// Options applied to every ingestion run through a context.
#[derive(Clone, Debug)]
pub struct IngestOptions {
    /// Bound on a whole ingestion; `None` never times out.
    pub timeout: Option<Duration>,
    /// Overwrite an already ingested version instead of rejecting it.
    pub allow_republish: bool,
    pub max_manifest_size: u64,
    /// Concurrent ingestions in a batch.
    pub parallel_limit: usize,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            timeout: parse_duration(DEFAULT_INGEST_TIMEOUT),
            allow_republish: true,
            max_manifest_size: DEFAULT_MAX_MANIFEST_SIZE,
            parallel_limit: DEFAULT_PARALLEL_LIMIT as usize,
        }
    }
}

impl IngestOptions {
    pub fn from_config(config: &Config) -> ConfigResult<Self> {
        Ok(Self {
            timeout: config.ingest_timeout()?,
            allow_republish: config.allow_republish(),
            max_manifest_size: config.max_manifest_size(),
            parallel_limit: config.parallel_limit(),
        })
    }
}

/// Info about a successfully ingested version.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IngestedInfo {
    pub name: String,
    pub version: String,
    pub locator: String,
    /// An entry for this version already existed and was overwritten.
    pub replaced: bool,
}

/// Info about a failed ingestion.
#[derive(Clone, Debug, Serialize)]
pub struct FailedInfo {
    pub locator: String,
    #[serde(serialize_with = "serialize_kind")]
    pub kind: ErrorKind,
    pub status: u16,
    pub error: String,
}

fn serialize_kind<S: serde::Serializer>(kind: &ErrorKind, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(kind.as_str())
}

/// Report returned after a batch ingestion completes.
///
/// Entries keep the order of the input locators.
#[derive(Debug, Default, Serialize)]
pub struct IngestReport {
    pub ingested: Vec<IngestedInfo>,
    pub failed: Vec<FailedInfo>,
}

impl IngestReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}
