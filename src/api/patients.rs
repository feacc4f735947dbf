/// Patient CRUD and note endpoints
use crate::{
    auth::AuthAccount,
    context::AppContext,
    db::models::{Patient, PatientNote},
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use validator::Validate;

/// Build patient routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/patients", post(create_patient).get(list_patients))
        .route("/patients/:patient_id", get(get_patient))
        .route(
            "/patients/:patient_id/notes",
            post(create_note).get(list_notes),
        )
}

#[derive(Debug, Deserialize, Validate)]
struct PatientCreate {
    #[validate(length(min = 1, max = 200))]
    name: String,
    #[validate(range(min = 0, max = 130))]
    age: i64,
}

#[derive(Debug, Deserialize)]
struct PatientQuery {
    search: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
struct NoteCreate {
    #[validate(length(min = 1))]
    text: String,
}

async fn create_patient(
    State(ctx): State<AppContext>,
    AuthAccount(account): AuthAccount,
    Json(req): Json<PatientCreate>,
) -> ApiResult<Json<Patient>> {
    req.validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let patient = ctx.patients.create(account.id, &req.name, req.age).await?;
    Ok(Json(patient))
}

async fn list_patients(
    State(ctx): State<AppContext>,
    AuthAccount(account): AuthAccount,
    Query(query): Query<PatientQuery>,
) -> ApiResult<Json<Vec<Patient>>> {
    let patients = ctx
        .patients
        .list(account.id, query.search.as_deref())
        .await?;
    Ok(Json(patients))
}

async fn get_patient(
    State(ctx): State<AppContext>,
    AuthAccount(account): AuthAccount,
    Path(patient_id): Path<i64>,
) -> ApiResult<Json<Patient>> {
    let patient = ctx
        .patients
        .get(account.id, patient_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Patient not found".to_string()))?;

    Ok(Json(patient))
}

async fn create_note(
    State(ctx): State<AppContext>,
    AuthAccount(account): AuthAccount,
    Path(patient_id): Path<i64>,
    Json(req): Json<NoteCreate>,
) -> ApiResult<Json<PatientNote>> {
    req.validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let note = ctx
        .patients
        .add_note(account.id, patient_id, &req.text)
        .await?;
    Ok(Json(note))
}

async fn list_notes(
    State(ctx): State<AppContext>,
    AuthAccount(account): AuthAccount,
    Path(patient_id): Path<i64>,
) -> ApiResult<Json<Vec<PatientNote>>> {
    let notes = ctx.patients.list_notes(account.id, patient_id).await?;
    Ok(Json(notes))
}
