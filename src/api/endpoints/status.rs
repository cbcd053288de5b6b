use axum::extract::State;
use axum::Json;

use crate::api::types::{ApiContext, StatusResponse};

/// `GET /api/status`: counters for monitoring.
pub async fn check(State(ctx): State<ApiContext>) -> Json<StatusResponse> {
    let status = ctx.core.get_status();
    Json(StatusResponse {
        status: "ok",
        version: crate::config::APP_VERSION,
        patient_count: status.patient_count,
        knowledge_chunk_count: status.knowledge_chunk_count,
        active_session_count: status.active_session_count,
        knowledge_available: status.knowledge_available,
    })
}
