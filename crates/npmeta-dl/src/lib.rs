//! Tarball retrieval for npmeta.
//!
//! A locator is resolved either over HTTP(S) with a shared `ureq` agent or
//! from the local filesystem. Every fetcher honours the caller's
//! [`Deadline`](npmeta_utils::time::Deadline).

pub mod error;
pub mod fetch;
pub mod http_client;
pub mod traits;

pub use error::{FetchError, FetchResult};
pub use fetch::{FileFetcher, HttpFetcher, LocatorFetcher, LocatorKind};
pub use traits::Fetcher;
