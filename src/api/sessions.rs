/// Therapy-session endpoints, including the video analysis flow
use crate::{
    auth::AuthAccount,
    context::AppContext,
    db::models::TherapySession,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Multipart, Path, State},
    routing::{get, patch, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Build therapy-session and video-analysis routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/video/analyze", post(analyze_video))
        .route(
            "/patients/:patient_id/therapy-sessions",
            post(create_session).get(list_sessions),
        )
        .route(
            "/patients/:patient_id/therapy-sessions/analyze",
            post(analyze_and_save),
        )
        .route(
            "/patients/:patient_id/therapy-sessions/:session_id",
            get(get_session),
        )
        .route(
            "/patients/:patient_id/therapy-sessions/:session_id/observations",
            patch(update_observations),
        )
}

#[derive(Debug, Deserialize)]
struct SessionCreate {
    date: DateTime<Utc>,
    /// Raw JSON text of the analysis results
    results: String,
    observations: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ObservationsUpdate {
    observations: String,
}

/// Session view with the stored JSON parsed back into a structure
#[derive(Debug, Serialize)]
struct SessionResponse {
    id: i64,
    patient_id: i64,
    date: DateTime<Utc>,
    results: serde_json::Value,
    observations: Option<String>,
}

impl From<TherapySession> for SessionResponse {
    fn from(session: TherapySession) -> Self {
        // Results were stored as JSON text; sessions written before the
        // analysis pipeline may hold bare strings, so fall back instead
        // of failing the read.
        let results = serde_json::from_str(&session.results)
            .unwrap_or(serde_json::Value::String(session.results));

        Self {
            id: session.id,
            patient_id: session.patient_id,
            date: session.date,
            results,
            observations: session.observations,
        }
    }
}

async fn create_session(
    State(ctx): State<AppContext>,
    AuthAccount(account): AuthAccount,
    Path(patient_id): Path<i64>,
    Json(req): Json<SessionCreate>,
) -> ApiResult<Json<SessionResponse>> {
    ctx.patients.require_owned(account.id, patient_id).await?;

    let session = ctx
        .sessions
        .create(patient_id, req.date, &req.results, req.observations.as_deref())
        .await?;
    Ok(Json(session.into()))
}

async fn list_sessions(
    State(ctx): State<AppContext>,
    AuthAccount(account): AuthAccount,
    Path(patient_id): Path<i64>,
) -> ApiResult<Json<Vec<SessionResponse>>> {
    ctx.patients.require_owned(account.id, patient_id).await?;

    let sessions = ctx.sessions.list(patient_id).await?;
    Ok(Json(sessions.into_iter().map(Into::into).collect()))
}

async fn get_session(
    State(ctx): State<AppContext>,
    AuthAccount(account): AuthAccount,
    Path((patient_id, session_id)): Path<(i64, i64)>,
) -> ApiResult<Json<SessionResponse>> {
    ctx.patients.require_owned(account.id, patient_id).await?;

    let session = ctx
        .sessions
        .get(patient_id, session_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Therapy session not found".to_string()))?;

    Ok(Json(session.into()))
}

/// Pull the uploaded video bytes out of the multipart body
async fn read_upload(mut multipart: Multipart) -> ApiResult<Vec<u8>> {
    let mut video: Option<Vec<u8>> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() == Some("file") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::Validation(format!("Invalid upload: {}", e)))?;
            video = Some(bytes.to_vec());
        }
    }

    let video = video.ok_or_else(|| ApiError::Validation("Missing 'file' field".to_string()))?;
    if video.is_empty() {
        return Err(ApiError::Validation("Uploaded file is empty".to_string()));
    }

    Ok(video)
}

/// Spool the video to disk and run it through the analysis model.
/// The model client reads from a path; the temp file never outlives the
/// request.
async fn spool_and_analyze(ctx: &AppContext, video: Vec<u8>) -> ApiResult<serde_json::Value> {
    let temp_dir = ctx.temp_dir();
    tokio::fs::create_dir_all(&temp_dir).await?;
    let temp_path = temp_dir.join(format!("{}.mp4", uuid::Uuid::new_v4()));
    tokio::fs::write(&temp_path, &video).await?;

    let analysis = ctx.analyzer.analyze(&temp_path).await;

    // Best-effort cleanup before propagating any analysis failure.
    if let Err(e) = tokio::fs::remove_file(&temp_path).await {
        tracing::warn!(path = %temp_path.display(), "failed to remove temp upload: {}", e);
    }

    analysis
}

/// One-off analysis of an uploaded video, nothing persisted
async fn analyze_video(
    State(ctx): State<AppContext>,
    AuthAccount(_account): AuthAccount,
    multipart: Multipart,
) -> ApiResult<Json<serde_json::Value>> {
    let video = read_upload(multipart).await?;
    let analysis = spool_and_analyze(&ctx, video).await?;

    Ok(Json(analysis))
}

/// Upload a session video, run it through the analysis model, and store
/// the resulting emotion data as a new therapy session.
async fn analyze_and_save(
    State(ctx): State<AppContext>,
    AuthAccount(account): AuthAccount,
    Path(patient_id): Path<i64>,
    multipart: Multipart,
) -> ApiResult<Json<SessionResponse>> {
    ctx.patients.require_owned(account.id, patient_id).await?;

    let video = read_upload(multipart).await?;
    let analysis = spool_and_analyze(&ctx, video).await?;

    let results = serde_json::to_string(&analysis)
        .map_err(|e| ApiError::Internal(format!("Failed to serialize results: {}", e)))?;

    let session = ctx.sessions.create(patient_id, Utc::now(), &results, None).await?;
    Ok(Json(session.into()))
}

async fn update_observations(
    State(ctx): State<AppContext>,
    AuthAccount(account): AuthAccount,
    Path((patient_id, session_id)): Path<(i64, i64)>,
    Json(req): Json<ObservationsUpdate>,
) -> ApiResult<Json<SessionResponse>> {
    ctx.patients.require_owned(account.id, patient_id).await?;

    let session = ctx
        .sessions
        .update_observations(patient_id, session_id, &req.observations)
        .await?;
    Ok(Json(session.into()))
}
