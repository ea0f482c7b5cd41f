use std::{fs::File, io::Read, sync::Arc};

use npmeta_operations::{
    error::ErrorContext, request::handle_index, IngestError, NpmetaContext, NpmetaResult,
};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::utils::read_lines;

/// Serves index requests read from `input` (stdin when `None`).
///
/// Requests run concurrently up to the configured parallel limit; responses
/// are printed one per line in request order.
pub async fn serve_index_requests(ctx: &NpmetaContext, input: Option<String>) -> NpmetaResult<()> {
    let reader: Box<dyn Read> = match input {
        Some(path) => {
            Box::new(File::open(&path).with_context(|| format!("opening {path}"))?)
        }
        None => Box::new(std::io::stdin()),
    };
    let requests = read_lines(reader)?;
    debug!(count = requests.len(), "handling index requests");

    let semaphore = Arc::new(Semaphore::new(ctx.options().parallel_limit.max(1)));
    let mut handles = Vec::with_capacity(requests.len());
    for body in requests {
        let permit = semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|err| IngestError::Join(err.to_string()))?;
        let ctx = ctx.clone();

        handles.push(tokio::spawn(async move {
            let response = handle_index(&ctx, body.as_bytes()).await;
            drop(permit);
            response
        }));
    }

    let mut failures = 0;
    for handle in handles {
        let response = handle
            .await
            .map_err(|err| IngestError::Join(format!("Join handle error: {err}")))?;
        if !response.is_success() {
            failures += 1;
        }
        info!("{}", serde_json::to_string(&response)?);
    }

    if failures > 0 {
        warn!(failures, "some index requests failed");
    }

    Ok(())
}
