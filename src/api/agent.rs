/// Conversational agent endpoints (pass-through to the agent service)
use crate::{
    auth::AuthAccount,
    context::AppContext,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;

/// Build agent routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/agent/chat", post(send_message))
        .route("/agent/chat/:patient_id", get(chat_history))
        .route("/agent/analyze/:patient_id", post(analyze_patient))
}

#[derive(Debug, Deserialize)]
struct AgentMessageRequest {
    message: String,
    patient_id: i64,
    emotion_data: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    /// Comma-separated session ids
    session_ids: Option<String>,
}

impl HistoryQuery {
    fn parsed_ids(&self) -> Result<Vec<i64>, ApiError> {
        self.session_ids
            .as_deref()
            .unwrap_or("")
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(|s| {
                s.trim()
                    .parse::<i64>()
                    .map_err(|_| ApiError::Validation("Invalid session id".to_string()))
            })
            .collect()
    }
}

/// Forward a chat message for one of the caller's patients
async fn send_message(
    State(ctx): State<AppContext>,
    AuthAccount(account): AuthAccount,
    Json(req): Json<AgentMessageRequest>,
) -> ApiResult<Json<Value>> {
    ctx.patients.require_owned(account.id, req.patient_id).await?;

    let response = ctx
        .agent
        .send_message(
            &req.message,
            account.id,
            req.patient_id,
            req.emotion_data.as_ref(),
        )
        .await?;

    Ok(Json(response))
}

/// Fetch chat history for a patient
async fn chat_history(
    State(ctx): State<AppContext>,
    AuthAccount(account): AuthAccount,
    Path(patient_id): Path<i64>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<Value>> {
    ctx.patients.require_owned(account.id, patient_id).await?;

    let session_ids = query.parsed_ids()?;
    let response = ctx.agent.chat_history(patient_id, &session_ids).await?;
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
struct AnalyzeRequest {
    emotion_data: Option<Value>,
}

/// Request recommendations for a patient's emotion data
async fn analyze_patient(
    State(ctx): State<AppContext>,
    AuthAccount(account): AuthAccount,
    Path(patient_id): Path<i64>,
    Json(req): Json<AnalyzeRequest>,
) -> ApiResult<Json<Value>> {
    ctx.patients.require_owned(account.id, patient_id).await?;

    let emotion_data = req
        .emotion_data
        .ok_or_else(|| ApiError::Validation("Emotion data is required".to_string()))?;

    let response = ctx.agent.analyze_patient(patient_id, &emotion_data).await?;
    Ok(Json(response))
}
