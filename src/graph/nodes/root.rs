// Analysis root node
// Validates the packet and fans out to the specialist analyzers

use async_trait::async_trait;

use crate::graph::node::{GraphError, Node, NodeContext, NodeResult};
use crate::graph::state::WorkflowState;

use super::fields;

pub struct RootNode;

impl RootNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RootNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for RootNode {
    fn id(&self) -> &'static str {
        "root"
    }

    fn name(&self) -> &'static str {
        "Analysis Root"
    }

    async fn run(
        &self,
        state: &WorkflowState,
        _ctx: &NodeContext,
    ) -> Result<NodeResult, GraphError> {
        let packet = state
            .get(fields::PACKET)
            .and_then(|value| value.as_object())
            .ok_or_else(|| GraphError::node(self.id(), "packet missing from state"))?;
        if packet.is_empty() {
            return Err(GraphError::node(self.id(), "packet must not be empty"));
        }

        tracing::debug!("dispatching packet to analyzers");
        Ok(NodeResult::fan_out(["xss", "sqli"]))
    }
}
