use axum::{
    Json,
    body::Body,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use std::collections::HashMap;
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

use super::{
    models::{CancelResponse, HealthResponse, SearchRequest, SubmitResponse, TaskQuery},
    state::AppState,
    utils::{is_plain_segment, parse_content_type, video_mime},
};
use crate::api::error::ApiError;

/// Canned completed task returned for the `test` id, for front-end work
const STATUS_SAMPLE: &str = include_str!("../../assets/status_sample.json");

const INDEX_HTML: &str = include_str!("../../assets/index.html");

/// Job submission endpoint (POST /scrape-and-download/)
///
/// Responds with the task id as soon as the task is registered. The job
/// itself runs in the background; an invalid request still gets an id, whose
/// task is already `failed`.
pub async fn submit_job(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Body,
) -> Result<impl IntoResponse, ApiError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::InvalidPayload("missing Content-Type header".into()))?;
    parse_content_type(content_type)?;

    // Decompression already happened in RequestDecompressionLayer.
    let body_bytes = read_body(body, state.config.server.max_payload_bytes.as_usize()).await?;
    let request: SearchRequest = serde_json::from_slice(&body_bytes)?;

    let id = state
        .orchestrator
        .submit(&request.search_type, &request.search_query, request.max_videos)
        .await;

    Ok((StatusCode::OK, Json(SubmitResponse { id })))
}

/// Collect the body, giving up as soon as it grows past `max_size`
async fn read_body(body: Body, max_size: usize) -> Result<Vec<u8>, ApiError> {
    let collected = Limited::new(body, max_size)
        .collect()
        .await
        .map_err(|err| {
            if err.is::<LengthLimitError>() {
                ApiError::PayloadTooLarge(max_size)
            } else {
                ApiError::Internal(err.to_string())
            }
        })?;

    Ok(collected.to_bytes().to_vec())
}

/// Task status endpoint (GET /get-status/?id=...)
pub async fn get_status(
    State(state): State<AppState>,
    Query(query): Query<TaskQuery>,
) -> Result<Response, ApiError> {
    if query.id == "test" {
        let sample: serde_json::Value = serde_json::from_str(STATUS_SAMPLE)
            .map_err(|e| ApiError::Internal(format!("bad status sample: {e}")))?;
        return Ok(Json(sample).into_response());
    }

    let task = state
        .registry
        .get(&query.id)
        .await
        .ok_or_else(|| ApiError::NotFound(query.id.clone()))?;

    Ok(Json(task).into_response())
}

/// Cancel a running job (POST /cancel/?id=...)
pub async fn cancel_job(
    State(state): State<AppState>,
    Query(query): Query<TaskQuery>,
) -> Result<impl IntoResponse, ApiError> {
    state.orchestrator.cancel(&query.id).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(CancelResponse {
            id: query.id,
            status: "cancelling".to_string(),
        }),
    ))
}

/// Health check endpoint (GET /health)
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let mut components = HashMap::new();
    components.insert("api".to_string(), "healthy".to_string());
    components.insert(
        "registry".to_string(),
        format!("{} tasks", state.registry.len().await),
    );
    components.insert(
        "jobs".to_string(),
        format!("{} running", state.orchestrator.running().await),
    );

    let response = HealthResponse {
        status: "healthy".to_string(),
        components,
        version: env!("CARGO_PKG_VERSION").to_string(),
        metrics: state.metrics.snapshot(),
    };

    (StatusCode::OK, Json(response))
}

/// Static search form (GET /)
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Download a saved video as an attachment (GET /videos/{subfolder}/{filename})
pub async fn download_video(
    State(state): State<AppState>,
    Path((subfolder, filename)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    serve_file(&state, &subfolder, &filename, true).await
}

/// Stream a saved video for inline playback (GET /stream/videos/{subfolder}/{filename})
pub async fn stream_video(
    State(state): State<AppState>,
    Path((subfolder, filename)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    serve_file(&state, &subfolder, &filename, false).await
}

async fn serve_file(
    state: &AppState,
    subfolder: &str,
    filename: &str,
    attachment: bool,
) -> Result<Response, ApiError> {
    if !is_plain_segment(subfolder) || !is_plain_segment(filename) {
        warn!(subfolder, filename, "Rejected file path");
        return Err(ApiError::FileNotFound);
    }

    let path = state.config.server.videos_dir.join(subfolder).join(filename);
    let file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "File not served");
            return Err(ApiError::FileNotFound);
        }
    };
    let metadata = file
        .metadata()
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    if !metadata.is_file() {
        return Err(ApiError::FileNotFound);
    }

    let content_type = if attachment {
        video_mime(filename)
    } else {
        "video/mp4".parse().unwrap_or(mime::APPLICATION_OCTET_STREAM)
    };

    let mut response = Body::from_stream(ReaderStream::new(file)).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(metadata.len()));
    if let Ok(value) = HeaderValue::from_str(content_type.as_ref()) {
        headers.insert(header::CONTENT_TYPE, value);
    }
    if attachment {
        let disposition = format!("attachment; filename=\"{}\"", filename.replace('"', ""));
        if let Ok(value) = HeaderValue::from_str(&disposition) {
            headers.insert(header::CONTENT_DISPOSITION, value);
        }
    }

    Ok(response)
}
