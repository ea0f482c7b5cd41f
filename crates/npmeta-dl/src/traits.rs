use async_trait::async_trait;
use npmeta_utils::time::Deadline;

use crate::error::FetchResult;

/// Resolves a locator to the raw bytes of a package tarball.
///
/// Implementations map a missing tarball to
/// [`FetchError::NotFound`](crate::FetchError::NotFound) and every other
/// failure to one of the remaining variants. They never retry.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, locator: &str, deadline: Deadline) -> FetchResult<Vec<u8>>;
}
