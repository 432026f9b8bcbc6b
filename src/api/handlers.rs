//! HTTP handlers for the Humyze API

use axum::{
    extract::{rejection::JsonRejection, Multipart, Path, State},
    http::{header, HeaderMap},
    response::IntoResponse,
    Json,
};
use std::time::Instant;
use tracing::{info, warn};

use super::error::ApiError;
use super::AppState;
use crate::models::{
    AuthUser, DetectRequest, HumanizeRequest, HumanizeResponse, NewReport, Report, ReportView,
};
use crate::services::detection::InFlightGuard;
use crate::services::{bearer_token, extract_document_text, render_report, ExtractError};

/// Health check endpoint
pub async fn health() -> &'static str {
    "OK"
}

async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<AuthUser, ApiError> {
    let header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    let token = bearer_token(header)?;
    Ok(state.auth.authenticate(token).await?)
}

fn require_text(text: &str) -> Result<(), ApiError> {
    if text.trim().is_empty() {
        return Err(ApiError::InvalidRequest("No text provided".to_string()));
    }
    Ok(())
}

fn claim(state: &AppState, report_id: &str) -> Result<Option<InFlightGuard>, ApiError> {
    let Some(registry) = &state.in_flight else {
        return Ok(None);
    };
    registry.try_claim(report_id).map(Some).ok_or_else(|| {
        warn!(report_id, "humanize.rejected_in_flight");
        ApiError::Conflict(format!(
            "Humanization already in progress for report {}",
            report_id
        ))
    })
}

async fn load_report(state: &AppState, user: &AuthUser, id: &str) -> Result<Report, ApiError> {
    state
        .store
        .get(&user.id, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(id.to_string()))
}

async fn classify_and_store(
    state: &AppState,
    user: &AuthUser,
    text: &str,
    file_name: Option<String>,
    file_url: Option<String>,
) -> Result<Report, ApiError> {
    let t0 = Instant::now();
    let classification = state.analyzer.classify(text).await?;
    let new_report =
        NewReport::from_classification(&user.id, text, file_name, file_url, classification);
    let report = state.store.insert(new_report).await?;

    info!(
        report_id = %report.id,
        user_id = %user.id,
        ai_score = report.ai_score.unwrap_or_default(),
        elapsed_ms = t0.elapsed().as_millis() as u64,
        "detect.stored"
    );
    Ok(report)
}

/// Classify posted text and persist a report owned by the caller.
pub async fn detect_ai(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<DetectRequest>, JsonRejection>,
) -> Result<Json<Report>, ApiError> {
    let user = authenticate(&state, &headers).await?;
    let Json(req) = payload?;
    require_text(&req.text)?;

    let report = classify_and_store(&state, &user, &req.text, req.file_name, req.file_url).await?;
    Ok(Json(report))
}

/// Rewrite posted text; attach it to `report_id` or create a new report.
pub async fn humanize_text(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<HumanizeRequest>, JsonRejection>,
) -> Result<Json<HumanizeResponse>, ApiError> {
    let user = authenticate(&state, &headers).await?;
    let Json(req) = payload?;
    require_text(&req.text)?;

    let report = match req.report_id.as_deref() {
        Some(id) => {
            load_report(&state, &user, id).await?;
            let _guard = claim(&state, id)?;
            let rewritten = state.analyzer.rewrite(&req.text).await?;
            state
                .store
                .set_humanized(&user.id, id, &rewritten)
                .await?
                .ok_or_else(|| ApiError::NotFound(id.to_string()))?
        }
        None => {
            let rewritten = state.analyzer.rewrite(&req.text).await?;
            state
                .store
                .insert(NewReport::humanized_only(&user.id, &req.text, &rewritten))
                .await?
        }
    };

    info!(report_id = %report.id, user_id = %user.id, "humanize.stored");

    let rewritten_text = report.humanized_text.clone().unwrap_or_default();
    Ok(Json(HumanizeResponse {
        rewritten_text,
        report,
    }))
}

/// Multipart upload (`file` field): extract text, then classify and store.
pub async fn upload_report(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<Report>, ApiError> {
    let user = authenticate(&state, &headers).await?;

    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload.txt").to_string();
        let bytes = field.bytes().await?;
        upload = Some((file_name, bytes.to_vec()));
    }

    let (file_name, bytes) =
        upload.ok_or_else(|| ApiError::InvalidRequest("No file uploaded".to_string()))?;
    info!(file_name = %file_name, bytes = bytes.len(), "upload.received");

    let name = file_name.clone();
    let text = tokio::task::spawn_blocking(move || extract_document_text(&name, &bytes))
        .await
        .map_err(|_| ExtractError::Aborted(file_name.clone()))??;

    let report = classify_and_store(&state, &user, &text, Some(file_name), None).await?;
    Ok(Json(report))
}

pub async fn list_reports(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Report>>, ApiError> {
    let user = authenticate(&state, &headers).await?;
    Ok(Json(state.store.list(&user.id).await?))
}

pub async fn get_report(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Report>, ApiError> {
    let user = authenticate(&state, &headers).await?;
    Ok(Json(load_report(&state, &user, &id).await?))
}

/// Humanized text verbatim, or the original partitioned into highlight segments.
pub async fn report_view(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<ReportView>, ApiError> {
    let user = authenticate(&state, &headers).await?;
    let report = load_report(&state, &user, &id).await?;
    Ok(Json(render_report(&report)))
}

/// Humanize a stored report's original text.
pub async fn humanize_report(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Report>, ApiError> {
    let user = authenticate(&state, &headers).await?;
    let report = load_report(&state, &user, &id).await?;
    let _guard = claim(&state, &id)?;

    let rewritten = state.analyzer.rewrite(&report.original_text).await?;
    let updated = state
        .store
        .set_humanized(&user.id, &id, &rewritten)
        .await?
        .ok_or_else(|| ApiError::NotFound(id.clone()))?;

    info!(report_id = %id, user_id = %user.id, "humanize.stored");
    Ok(Json(updated))
}

/// Plain-text download: the rewrite if present, otherwise the original.
pub async fn download_report(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user = authenticate(&state, &headers).await?;
    let report = load_report(&state, &user, &id).await?;

    let disposition = format!(
        "attachment; filename=\"{}\"",
        report.download_file_name().replace('"', "")
    );
    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        report.download_text().to_string(),
    ))
}
