use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::models::PatientRecord;

/// `GET /api/patient/:name`: direct directory lookup, no session involved.
pub async fn lookup(
    State(ctx): State<ApiContext>,
    Path(name): Path<String>,
) -> Result<Json<PatientRecord>, ApiError> {
    ctx.core
        .orchestrator
        .get_patient(&name)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No discharge report for \"{name}\"")))
}

/// `POST /api/patient`: add a discharge report to the directory and its store.
pub async fn create(
    State(ctx): State<ApiContext>,
    Json(record): Json<PatientRecord>,
) -> Result<(StatusCode, Json<PatientRecord>), ApiError> {
    ctx.core.orchestrator.directory().add(record.clone())?;
    Ok((StatusCode::CREATED, Json(record)))
}
