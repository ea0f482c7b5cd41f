//! The index request boundary: decoding request bodies and mapping
//! ingestion outcomes onto response statuses.

use serde::{Deserialize, Serialize};
use tracing::debug;
use ureq::http::StatusCode;

use crate::{
    context::NpmetaContext,
    error::{IngestError, IngestResult},
    ingest::ingest,
    types::IngestedInfo,
};

/// Body of an index request: `{"key": "<locator>"}`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct IndexRequest {
    pub key: String,
}

impl IndexRequest {
    /// Decodes a request body.
    ///
    /// Unknown fields are ignored; an unparseable body or an empty key is an
    /// [`IngestError::InvalidRequest`].
    pub fn from_slice(body: &[u8]) -> IngestResult<Self> {
        let request: Self = serde_json::from_slice(body)
            .map_err(|err| IngestError::InvalidRequest(err.to_string()))?;

        if request.key.trim().is_empty() {
            return Err(IngestError::InvalidRequest("`key` is empty".to_string()));
        }

        Ok(request)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IndexResponse {
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IndexResponse {
    pub fn ok(info: &IngestedInfo) -> Self {
        Self {
            status: StatusCode::OK.as_u16(),
            name: Some(info.name.clone()),
            version: Some(info.version.clone()),
            error: None,
        }
    }

    pub fn from_error(err: &IngestError) -> Self {
        Self {
            status: err.status_code().as_u16(),
            name: None,
            version: None,
            error: Some(err.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == StatusCode::OK.as_u16()
    }
}

/// Decodes `body`, runs the ingestion and maps the outcome to a response.
pub async fn handle_index(ctx: &NpmetaContext, body: &[u8]) -> IndexResponse {
    let result = match IndexRequest::from_slice(body) {
        Ok(request) => ingest(ctx, &request.key).await,
        Err(err) => Err(err),
    };

    match result {
        Ok(info) => IndexResponse::ok(&info),
        Err(err) => {
            debug!(status = err.status_code().as_u16(), error = %err, "index request failed");
            IndexResponse::from_error(&err)
        }
    }
}
