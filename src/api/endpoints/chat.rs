//! `POST /api/chat`: route the message, then generate the reply for the
//! chosen role.

use axum::extract::State;
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, ChatRequest, ChatResponse};
use crate::generation::generate_reply;

pub async fn send(
    State(ctx): State<ApiContext>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let generator = ctx.core.generator.clone();
    let message = req.message.trim().to_string();

    // The session stays locked until the reply is recorded
    let (decision, reply) = ctx
        .core
        .orchestrator
        .handle_turn(
            &req.session_id,
            &req.message,
            req.patient_name.as_deref(),
            move |decision, history| async move {
                generate_reply(generator.as_deref(), &decision, &message, &history).await
            },
        )
        .await?;

    let mut sources: Vec<String> = Vec::new();
    for item in &decision.evidence {
        if !sources.contains(&item.label) {
            sources.push(item.label.clone());
        }
    }

    Ok(Json(ChatResponse {
        response: reply,
        agent: decision.role.agent_name(),
        handoff: decision.handoff,
        session_id: decision.session_id,
        patient_data: decision.patient,
        sources,
        evidence: decision.evidence,
    }))
}
