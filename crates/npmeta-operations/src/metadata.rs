use npmeta_registry::PackageDocument;
use tracing::debug;

use crate::{context::NpmetaContext, error::IngestResult};

/// Loads the stored aggregate document for `name`.
pub async fn package_document(
    ctx: &NpmetaContext,
    name: &str,
) -> IngestResult<Option<PackageDocument>> {
    debug!(name, "reading package document");
    Ok(ctx.store().get(name, ctx.deadline()).await?)
}
