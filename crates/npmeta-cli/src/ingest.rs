use nu_ansi_term::Color::{Blue, Cyan, Green, LightRed, Red};
use npmeta_operations::{ingest::ingest_many, NpmetaContext, NpmetaError, NpmetaResult};
use tracing::{debug, error, info};

use crate::utils::Colored;

pub async fn ingest_locators(
    ctx: &NpmetaContext,
    locators: Vec<String>,
    json: bool,
) -> NpmetaResult<()> {
    debug!(count = locators.len(), "starting ingestion");
    let total = locators.len();

    let report = ingest_many(ctx, locators).await?;

    if json {
        info!("{}", serde_json::to_string(&report)?);
    } else {
        for ingested in &report.ingested {
            let action = if ingested.replaced {
                "Replaced"
            } else {
                "Ingested"
            };
            info!(
                "{} {}@{} from {}",
                action,
                Colored(Blue, &ingested.name),
                Colored(LightRed, &ingested.version),
                Colored(Cyan, &ingested.locator)
            );
        }
        for failed in &report.failed {
            error!(
                "{} [{}]: {}",
                Colored(Cyan, &failed.locator),
                Colored(Red, failed.status),
                failed.error
            );
        }

        info!(
            "{} of {} tarballs ingested",
            Colored(Green, report.ingested.len()),
            total
        );
    }

    if report.is_success() {
        Ok(())
    } else {
        Err(NpmetaError::Custom(format!(
            "{} of {total} ingestions failed",
            report.failed.len()
        )))
    }
}
