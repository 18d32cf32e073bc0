use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use vcl_ledger::{ChainReport, IssueRequest, Ledger};
use vcl_types::{Block, Certificate, VerificationResult};

use crate::error::{ServerError, ServerResult};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<Ledger>,
}

impl AppState {
    pub fn new(ledger: Ledger) -> Self {
        Self {
            ledger: Arc::new(ledger),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub latest_block: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingRequest {
    pub video_hash: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountResponse {
    pub camera_id: String,
    pub count: u64,
}

/// Health check handler. Reports the chain head so a probe also exercises
/// the store.
pub async fn health_handler(State(state): State<AppState>) -> ServerResult<Json<HealthResponse>> {
    let latest = state.ledger.latest_block().await?;
    Ok(Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        latest_block: latest.map(|b| b.block_number),
    }))
}

pub async fn issue_certificate(
    State(state): State<AppState>,
    Json(request): Json<IssueRequest>,
) -> ServerResult<(StatusCode, Json<Certificate>)> {
    let certificate = state.ledger.issue(request).await?;
    Ok((StatusCode::CREATED, Json(certificate)))
}

pub async fn get_certificate(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ServerResult<Json<Certificate>> {
    state
        .ledger
        .certificate(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ServerError::NotFound(format!("certificate {id}")))
}

/// Verification outcomes, `NOT_FOUND` included, are returned with 200.
pub async fn verify_certificate(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ServerResult<Json<VerificationResult>> {
    Ok(Json(state.ledger.verify_certificate(&id).await?))
}

pub async fn verify_recording(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<RecordingRequest>,
) -> ServerResult<Json<VerificationResult>> {
    Ok(Json(
        state.ledger.verify_recording(&id, &body.video_hash).await?,
    ))
}

pub async fn camera_certificates(
    State(state): State<AppState>,
    Path(camera_id): Path<String>,
) -> ServerResult<Json<Vec<Certificate>>> {
    Ok(Json(state.ledger.certificates_by_camera(&camera_id).await?))
}

pub async fn camera_certificate_count(
    State(state): State<AppState>,
    Path(camera_id): Path<String>,
) -> ServerResult<Json<CountResponse>> {
    let count = state.ledger.certificate_count(&camera_id).await?;
    Ok(Json(CountResponse { camera_id, count }))
}

pub async fn camera_latest_certificate(
    State(state): State<AppState>,
    Path(camera_id): Path<String>,
) -> ServerResult<Json<Certificate>> {
    state
        .ledger
        .last_certificate(&camera_id)
        .await?
        .map(Json)
        .ok_or_else(|| ServerError::NotFound(format!("certificates for camera {camera_id}")))
}

pub async fn verify_chain(State(state): State<AppState>) -> ServerResult<Json<ChainReport>> {
    Ok(Json(state.ledger.verify_chain().await?))
}

pub async fn get_block(
    State(state): State<AppState>,
    Path(block_number): Path<u64>,
) -> ServerResult<Json<Block>> {
    state
        .ledger
        .block(block_number)
        .await?
        .map(Json)
        .ok_or_else(|| ServerError::NotFound(format!("block {block_number}")))
}
