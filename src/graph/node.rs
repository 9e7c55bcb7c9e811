// Node trait and types
// Base abstraction for graph nodes

use async_trait::async_trait;
use thiserror::Error;

use crate::llm::CompletionService;

use super::state::{StateUpdate, WorkflowState};

/// Services available to nodes during a run.
///
/// Handed to the runtime at run start; no process-wide singletons.
#[derive(Clone)]
pub struct NodeContext {
    /// Completion service for outbound model calls.
    pub llm: CompletionService,
}

/// Routing decision attached to a node's result.
///
/// Every control-flow outcome a node can produce is one of these variants,
/// so the runtime (and its tests) can enumerate them exhaustively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Next {
    /// Follow the node's statically configured edge.
    Edge,
    /// Jump to a node chosen at runtime.
    Goto(String),
    /// Run several nodes concurrently against the current snapshot.
    FanOut(Vec<String>),
    /// Stop the run and return the merged state.
    End,
}

/// Output of one node invocation: a partial state update plus where to go.
#[derive(Debug, Clone)]
pub struct NodeResult {
    pub update: StateUpdate,
    pub next: Next,
}

impl NodeResult {
    pub fn edge() -> Self {
        Self {
            update: StateUpdate::new(),
            next: Next::Edge,
        }
    }

    pub fn goto(target: impl Into<String>) -> Self {
        Self {
            update: StateUpdate::new(),
            next: Next::Goto(target.into()),
        }
    }

    pub fn fan_out<I, S>(targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            update: StateUpdate::new(),
            next: Next::FanOut(targets.into_iter().map(Into::into).collect()),
        }
    }

    pub fn end() -> Self {
        Self {
            update: StateUpdate::new(),
            next: Next::End,
        }
    }

    pub fn with_update(mut self, update: StateUpdate) -> Self {
        self.update = update;
        self
    }
}

/// Run-time graph failure.
///
/// Only `RecursionLimitExceeded` and `MissingState` abort a run from the
/// runtime itself; a `Node` error fails that branch's contribution and the
/// run continues with whatever the surviving branches routed to.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("recursion limit of {limit} node invocations exceeded entering '{node_id}'")]
    RecursionLimitExceeded { node_id: String, limit: usize },

    #[error("workflow '{workflow}' is missing required state field '{field}'")]
    MissingState { workflow: String, field: String },

    #[error("no static edge configured out of node '{0}'")]
    NoStaticEdge(String),

    #[error("routing target '{target}' from node '{node_id}' is not in the graph")]
    UnknownTarget { node_id: String, target: String },

    #[error("node '{node_id}' failed: {message}")]
    Node { node_id: String, message: String },
}

impl GraphError {
    pub fn node(node_id: impl Into<String>, message: impl std::fmt::Display) -> Self {
        GraphError::Node {
            node_id: node_id.into(),
            message: message.to_string(),
        }
    }
}

/// Node trait - all graph nodes implement this
#[async_trait]
pub trait Node: Send + Sync {
    /// Unique identifier for this node
    fn id(&self) -> &'static str;

    /// Human-readable name for display
    fn name(&self) -> &'static str {
        self.id()
    }

    /// Execute the node against a read-only snapshot of the run state.
    async fn run(
        &self,
        state: &WorkflowState,
        ctx: &NodeContext,
    ) -> Result<NodeResult, GraphError>;
}
