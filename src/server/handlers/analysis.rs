use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::errors::ApiError;
use crate::graph::nodes::fields;
use crate::graph::WorkflowState;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AnalysisRequest {
    pub packet: Value,
}

/// Run the packet analysis workflow: fan out to the analyzers, join at the
/// verdict node, return the merged state.
pub async fn handle_analysis(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AnalysisRequest>,
) -> Result<Json<Value>, ApiError> {
    if !request.packet.is_object() {
        return Err(ApiError::BadRequest(
            "packet must be a JSON object".to_string(),
        ));
    }

    let mut initial = WorkflowState::new();
    initial.set(fields::PACKET, request.packet);
    initial.set(fields::XSS_REPORT, json!(""));
    initial.set(fields::SQLI_REPORT, json!(""));
    initial.set(fields::THREAT_DETECTED, json!(false));

    let ctx = state.node_context();
    let final_state = state.analysis_graph.run(initial, &ctx).await?;

    tracing::info!(
        threat_detected = final_state.get_bool(fields::THREAT_DETECTED).unwrap_or(false),
        "analysis run finished"
    );

    Ok(Json(json!({ "response": final_state })))
}
