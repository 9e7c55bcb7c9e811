// Workflow state
// Field-name -> value map shared by a run, plus the per-workflow schema

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::node::GraphError;

/// State carried through a workflow run.
///
/// Fields are declared per workflow type by a [`StateSchema`]; the map itself
/// stays untyped so nodes can exchange partial updates without every workflow
/// defining its own struct. Nodes receive a read-only snapshot and publish
/// writes through a [`StateUpdate`], which the runtime merges at the step
/// barrier.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkflowState {
    fields: BTreeMap<String, Value>,
}

impl WorkflowState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }

    pub fn get_bool(&self, field: &str) -> Option<bool> {
        self.fields.get(field).and_then(Value::as_bool)
    }

    /// True when the field is present and not JSON null.
    pub fn has(&self, field: &str) -> bool {
        matches!(self.fields.get(field), Some(value) if !value.is_null())
    }

    pub fn set(&mut self, field: impl Into<String>, value: Value) {
        self.fields.insert(field.into(), value);
    }

    /// Merge a node's partial update into the state. Entries apply in the
    /// order they were written, so overlapping writes within one update are
    /// last-writer-wins by write order.
    pub fn apply(&mut self, update: StateUpdate) {
        for (field, value) in update.entries {
            self.fields.insert(field, value);
        }
    }
}

/// Buffered partial write set produced by a node invocation.
#[derive(Debug, Clone, Default)]
pub struct StateUpdate {
    entries: Vec<(String, Value)>,
}

impl StateUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: impl Into<String>, value: Value) -> Self {
        self.entries.push((field.into(), value));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Declared field set for one workflow type.
///
/// Required fields must be present (and non-null) in the initial state;
/// the check runs once at run start instead of ad hoc presence checks inside
/// each node. Optional fields document which node owns which write.
#[derive(Debug, Clone, Default)]
pub struct StateSchema {
    required: Vec<&'static str>,
    optional: Vec<&'static str>,
}

impl StateSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self, field: &'static str) -> Self {
        self.required.push(field);
        self
    }

    pub fn optional(mut self, field: &'static str) -> Self {
        self.optional.push(field);
        self
    }

    pub fn ensure(&self, workflow: &str, state: &WorkflowState) -> Result<(), GraphError> {
        for field in &self.required {
            if !state.has(field) {
                return Err(GraphError::MissingState {
                    workflow: workflow.to_string(),
                    field: field.to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn declared_fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.required.iter().chain(self.optional.iter()).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn apply_merges_in_write_order() {
        let mut state = WorkflowState::new();
        state.set("a", json!(1));

        let update = StateUpdate::new()
            .set("a", json!(2))
            .set("b", json!("x"))
            .set("a", json!(3));
        state.apply(update);

        assert_eq!(state.get("a"), Some(&json!(3)));
        assert_eq!(state.get_str("b"), Some("x"));
    }

    #[test]
    fn empty_update_leaves_state_untouched() {
        let mut state = WorkflowState::new();
        state.set("a", json!(1));

        state.apply(StateUpdate::new());

        assert_eq!(state.get("a"), Some(&json!(1)));
    }

    #[test]
    fn has_treats_null_as_absent() {
        let mut state = WorkflowState::new();
        state.set("feedback", Value::Null);

        assert!(!state.has("feedback"));
        assert!(!state.has("missing"));

        state.set("feedback", json!("too broad"));
        assert!(state.has("feedback"));
    }

    #[test]
    fn schema_rejects_missing_required_field() {
        let schema = StateSchema::new().required("description").optional("feedback");

        let mut state = WorkflowState::new();
        state.set("feedback", json!("x"));

        let err = schema.ensure("criteria", &state).unwrap_err();
        match err {
            GraphError::MissingState { workflow, field } => {
                assert_eq!(workflow, "criteria");
                assert_eq!(field, "description");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn schema_accepts_complete_state() {
        let schema = StateSchema::new().required("description");

        let mut state = WorkflowState::new();
        state.set("description", json!("monitor my database servers"));

        assert!(schema.ensure("criteria", &state).is_ok());
    }

    #[test]
    fn state_serializes_as_plain_object() {
        let mut state = WorkflowState::new();
        state.set("approved", json!(false));
        state.set("description", json!("web traffic"));

        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(
            value,
            json!({"approved": false, "description": "web traffic"})
        );
    }
}
