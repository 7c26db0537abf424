//! `POST /api/convert`: run one conversion job synchronously.

use {
    axum::{Json, body::Bytes, extract::State, http::StatusCode, response::IntoResponse},
    mediaferry_media::{JobSpecification, cleanup},
    serde::Deserialize,
    tracing::{debug, error},
};

use crate::{
    error::{ApiError, ConvertResponse},
    server::AppState,
};

#[derive(Debug, Deserialize)]
pub struct ConvertRequest {
    pub url: String,
    pub format: String,
    #[serde(default)]
    pub quality: Option<String>,
}

pub async fn convert_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ConvertResponse>, ApiError> {
    // Parsed by hand so malformed bodies get the JSON error shape, not axum's.
    let req: ConvertRequest = serde_json::from_slice(&body).map_err(|e| {
        debug!(error = %e, "rejecting malformed convert request");
        ApiError::bad_request("invalid request")
    })?;

    let spec = JobSpecification::new(&req.url, &req.format, req.quality.as_deref())?;
    let job = state.gateway.pipeline.run(spec).await?;

    let Some(artifact) = job.artifact else {
        error!(job_id = %job.id, "succeeded job without artifact");
        return Err(ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "converted file missing".into(),
        });
    };

    if let Some(ttl) = state.gateway.unclaimed_ttl {
        cleanup::schedule_deletion(artifact.path.clone(), ttl);
    }

    Ok(Json(ConvertResponse {
        message: "Conversion successful".into(),
        file_path: artifact.retrieval_path(),
        error: None,
    }))
}

/// `GET /health`
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": state.gateway.version,
    }))
}
