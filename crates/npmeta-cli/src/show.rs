use nu_ansi_term::Color::{Blue, Cyan, LightRed};
use npmeta_operations::{metadata::package_document, NpmetaContext, NpmetaError, NpmetaResult};
use tracing::info;

use crate::utils::Colored;

pub async fn show_package(ctx: &NpmetaContext, name: &str, json: bool) -> NpmetaResult<()> {
    let Some(document) = package_document(ctx, name).await? else {
        return Err(NpmetaError::Custom(format!(
            "Package {name} has not been ingested"
        )));
    };

    if json {
        info!("{}", serde_json::to_string_pretty(&document)?);
        return Ok(());
    }

    info!(
        "{} ({} versions)",
        Colored(Blue, &document.name),
        document.versions.len()
    );
    for (version, metadata) in &document.versions {
        let tarball = metadata
            .get("dist")
            .and_then(|dist| dist.get("tarball"))
            .and_then(|tarball| tarball.as_str())
            .unwrap_or("-");
        info!(
            "  - {} {}",
            Colored(LightRed, version),
            Colored(Cyan, tarball)
        );
    }

    Ok(())
}
