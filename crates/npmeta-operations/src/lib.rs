pub mod context;
pub mod error;
pub mod types;

pub mod ingest;
pub mod metadata;
pub mod request;

pub use context::NpmetaContext;
pub use error::{ErrorKind, IngestError, IngestResult, NpmetaError, NpmetaResult};
pub use types::*;
