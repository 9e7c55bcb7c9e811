use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::criteria::CriteriaRecord;
use crate::errors::ApiError;
use crate::graph::nodes::fields;
use crate::graph::WorkflowState;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

/// Run the criteria workflow for a usage description.
///
/// The store is snapshotted into the initial state; the run works on that
/// snapshot only, and the store is swapped once afterwards when the run
/// actually produced a new record list.
pub async fn handle_query(
    State(state): State<Arc<AppState>>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<Value>, ApiError> {
    let description = request.query.trim().to_string();
    if description.is_empty() {
        return Err(ApiError::BadRequest("query must not be empty".to_string()));
    }
    let max_len = state.config.app.max_input_length;
    if description.len() > max_len {
        return Err(ApiError::BadRequest(format!(
            "query exceeds maximum length of {max_len}"
        )));
    }

    let before = state.criteria.snapshot();
    tracing::info!(criteria_count = before.len(), "starting criteria run");

    let mut initial = WorkflowState::new();
    initial.set(fields::DESCRIPTION, json!(description));
    initial.set(
        fields::CRITERIA,
        serde_json::to_value(&before).map_err(ApiError::internal)?,
    );
    initial.set(fields::APPROVED, json!(false));

    let ctx = state.node_context();
    let final_state = state.criteria_graph.run(initial, &ctx).await?;

    let after: Vec<CriteriaRecord> = final_state
        .get(fields::CRITERIA)
        .cloned()
        .and_then(|value| serde_json::from_value(value).ok())
        .unwrap_or_else(|| before.clone());
    if after != before {
        tracing::info!(criteria_count = after.len(), "criteria store updated");
        state.criteria.replace(after);
    }

    tracing::info!(
        selected = final_state.get_str(fields::SELECTED_TITLE).unwrap_or("-"),
        approved = final_state.get_bool(fields::APPROVED).unwrap_or(false),
        "criteria run finished"
    );

    Ok(Json(json!({ "response": final_state })))
}
