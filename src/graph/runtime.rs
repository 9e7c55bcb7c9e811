// Graph runtime - petgraph based
// Frontier-stepped executor with fan-out/join barriers and a recursion budget

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures_util::future::join_all;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use thiserror::Error;
use uuid::Uuid;

use super::node::{GraphError, Next, Node, NodeContext, NodeResult};
use super::state::{StateSchema, WorkflowState};

/// Default number of node invocations allowed per run. Small on purpose:
/// it bounds the worst-case latency of the generator/QA retry cycle.
pub const DEFAULT_RECURSION_LIMIT: usize = 10;

/// Edge classification in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    /// The node's single static successor.
    Next,
    /// A declared fan-out arm; arms of one source must share a join node.
    FanOut,
}

/// Graph shape error, detected at build time before any run starts.
#[derive(Debug, Error)]
pub enum GraphConfigError {
    #[error("duplicate node id '{0}'")]
    DuplicateNode(String),

    #[error("entry node is not set")]
    MissingEntry,

    #[error("unknown node '{node}' referenced by {context}")]
    UnknownNode { node: String, context: String },

    #[error("node '{0}' has more than one static successor")]
    MultipleStaticEdges(String),

    #[error("fan-out from '{0}' declares no targets")]
    EmptyFanOut(String),

    #[error("fan-out target '{target}' of '{source_node}' has no static successor to join on")]
    MissingJoin { source_node: String, target: String },

    #[error("fan-out from '{source_node}' has no single join: targets route to {joins:?}")]
    DivergentJoin { source_node: String, joins: Vec<String> },

    #[error("recursion limit must be at least 1")]
    ZeroRecursionLimit,
}

/// Executable workflow graph.
///
/// A run advances in steps. Every node in the current frontier executes
/// concurrently against a read-only snapshot of the state taken at step
/// entry; their updates are buffered and merged only once the whole step has
/// returned (the join barrier), in frontier order. Branches therefore never
/// observe each other's in-flight writes, and branch completion order cannot
/// affect the merged result as long as branches own disjoint fields.
///
/// The recursion budget charges one unit per node invocation and is checked
/// for the whole step before any of its nodes start, so a step that would
/// cross the limit fails without leaving in-flight work behind.
pub struct GraphRuntime {
    graph: DiGraph<Arc<dyn Node>, EdgeKind>,
    node_indices: HashMap<String, NodeIndex>,
    entry: String,
    recursion_limit: usize,
    schema: StateSchema,
    workflow: &'static str,
}

impl std::fmt::Debug for GraphRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphRuntime")
            .field("entry", &self.entry)
            .field("recursion_limit", &self.recursion_limit)
            .field("workflow", &self.workflow)
            .field("nodes", &self.node_indices.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl GraphRuntime {
    pub fn workflow(&self) -> &'static str {
        self.workflow
    }

    pub fn recursion_limit(&self) -> usize {
        self.recursion_limit
    }

    pub fn node_ids(&self) -> Vec<&str> {
        self.node_indices.keys().map(String::as_str).collect()
    }

    /// Execute the graph to completion.
    ///
    /// Returns the merged state once any branch ends the run (after its step
    /// siblings have been awaited) or once the frontier drains. Fatal errors
    /// are the schema check at run start and recursion budget exhaustion; a
    /// branch whose node fails contributes an empty update and no successors.
    pub async fn run(
        &self,
        initial: WorkflowState,
        ctx: &NodeContext,
    ) -> Result<WorkflowState, GraphError> {
        self.schema.ensure(self.workflow, &initial)?;

        let run_id = Uuid::new_v4();
        let mut state = initial;
        let mut visited = 0usize;
        let mut frontier = vec![self.node_indices[&self.entry]];
        let mut step = 0usize;

        while !frontier.is_empty() {
            // Charge the whole step before dispatching any of it.
            for &idx in &frontier {
                visited += 1;
                if visited > self.recursion_limit {
                    let node_id = self.graph[idx].id().to_string();
                    tracing::warn!(
                        workflow = self.workflow,
                        %run_id,
                        node = %node_id,
                        "recursion limit reached, aborting run"
                    );
                    return Err(GraphError::RecursionLimitExceeded {
                        node_id,
                        limit: self.recursion_limit,
                    });
                }
            }

            let snapshot = Arc::new(state.clone());
            let branches = frontier.iter().map(|&idx| {
                let node = Arc::clone(&self.graph[idx]);
                let snapshot = Arc::clone(&snapshot);
                async move {
                    tracing::debug!(node = node.id(), "executing node");
                    (idx, node.run(snapshot.as_ref(), ctx).await)
                }
            });

            // Step barrier: every branch returns before any update lands.
            let results = join_all(branches).await;

            let mut next_frontier: Vec<NodeIndex> = Vec::new();
            let mut finished = false;

            for (idx, outcome) in results {
                let node_id = self.graph[idx].id();
                match outcome {
                    Ok(NodeResult { update, next }) => {
                        state.apply(update);
                        match next {
                            Next::End => finished = true,
                            Next::Edge => next_frontier.push(self.static_successor(idx)?),
                            Next::Goto(target) => {
                                next_frontier.push(self.resolve(node_id, &target)?)
                            }
                            Next::FanOut(targets) => {
                                for target in targets {
                                    next_frontier.push(self.resolve(node_id, &target)?);
                                }
                            }
                        }
                    }
                    Err(err) => {
                        // Recoverable branch failure: empty update, no successors.
                        tracing::warn!(
                            workflow = self.workflow,
                            %run_id,
                            node = node_id,
                            "branch failed, contributing no update: {err}"
                        );
                    }
                }
            }

            if finished {
                tracing::debug!(
                    workflow = self.workflow,
                    %run_id,
                    steps = step + 1,
                    visited,
                    "run complete"
                );
                return Ok(state);
            }

            let mut seen = HashSet::new();
            next_frontier.retain(|idx| seen.insert(*idx));
            frontier = next_frontier;
            step += 1;
        }

        tracing::debug!(workflow = self.workflow, %run_id, visited, "frontier drained");
        Ok(state)
    }

    fn resolve(&self, node_id: &str, target: &str) -> Result<NodeIndex, GraphError> {
        self.node_indices
            .get(target)
            .copied()
            .ok_or_else(|| GraphError::UnknownTarget {
                node_id: node_id.to_string(),
                target: target.to_string(),
            })
    }

    fn static_successor(&self, idx: NodeIndex) -> Result<NodeIndex, GraphError> {
        self.graph
            .edges_directed(idx, Direction::Outgoing)
            .find(|edge| *edge.weight() == EdgeKind::Next)
            .map(|edge| edge.target())
            .ok_or_else(|| GraphError::NoStaticEdge(self.graph[idx].id().to_string()))
    }
}

/// Builder for constructing graphs fluently.
///
/// Shape invariants are enforced in [`GraphBuilder::build`], so a runtime
/// that builds successfully cannot hit a configuration hole mid-run: the
/// entry exists, edges resolve, no node has two static successors, and every
/// fan-out group converges on exactly one join node.
pub struct GraphBuilder {
    workflow: &'static str,
    nodes: Vec<Arc<dyn Node>>,
    entry: Option<String>,
    edges: Vec<(String, String)>,
    fan_outs: Vec<(String, Vec<String>)>,
    schema: StateSchema,
    recursion_limit: usize,
}

impl GraphBuilder {
    pub fn new(workflow: &'static str) -> Self {
        Self {
            workflow,
            nodes: Vec::new(),
            entry: None,
            edges: Vec::new(),
            fan_outs: Vec::new(),
            schema: StateSchema::new(),
            recursion_limit: DEFAULT_RECURSION_LIMIT,
        }
    }

    pub fn node(mut self, node: Arc<dyn Node>) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn entry(mut self, node_id: impl Into<String>) -> Self {
        self.entry = Some(node_id.into());
        self
    }

    pub fn edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.edges.push((from.into(), to.into()));
        self
    }

    pub fn fan_out<I, S>(mut self, from: impl Into<String>, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fan_outs
            .push((from.into(), targets.into_iter().map(Into::into).collect()));
        self
    }

    pub fn schema(mut self, schema: StateSchema) -> Self {
        self.schema = schema;
        self
    }

    pub fn recursion_limit(mut self, limit: usize) -> Self {
        self.recursion_limit = limit;
        self
    }

    pub fn build(self) -> Result<GraphRuntime, GraphConfigError> {
        if self.recursion_limit == 0 {
            return Err(GraphConfigError::ZeroRecursionLimit);
        }

        let mut graph: DiGraph<Arc<dyn Node>, EdgeKind> = DiGraph::new();
        let mut node_indices: HashMap<String, NodeIndex> = HashMap::new();

        for node in self.nodes {
            let id = node.id().to_string();
            if node_indices.contains_key(&id) {
                return Err(GraphConfigError::DuplicateNode(id));
            }
            let idx = graph.add_node(node);
            node_indices.insert(id, idx);
        }

        let entry = self.entry.ok_or(GraphConfigError::MissingEntry)?;
        lookup(&node_indices, &entry, "the entry point")?;

        for (from, to) in &self.edges {
            let from_idx = lookup(&node_indices, from, "a static edge source")?;
            let to_idx = lookup(&node_indices, to, "a static edge target")?;
            graph.add_edge(from_idx, to_idx, EdgeKind::Next);
        }

        for (source, targets) in &self.fan_outs {
            let source_idx = lookup(&node_indices, source, "a fan-out source")?;
            if targets.is_empty() {
                return Err(GraphConfigError::EmptyFanOut(source.clone()));
            }
            for target in targets {
                let target_idx = lookup(&node_indices, target, "a fan-out target")?;
                graph.add_edge(source_idx, target_idx, EdgeKind::FanOut);
            }
        }

        for idx in graph.node_indices() {
            let static_out = graph
                .edges_directed(idx, Direction::Outgoing)
                .filter(|edge| *edge.weight() == EdgeKind::Next)
                .count();
            if static_out > 1 {
                return Err(GraphConfigError::MultipleStaticEdges(
                    graph[idx].id().to_string(),
                ));
            }
        }

        // Every fan-out group must converge: the join node is the unique
        // common static successor of all its arms.
        for idx in graph.node_indices() {
            let arms: Vec<NodeIndex> = graph
                .edges_directed(idx, Direction::Outgoing)
                .filter(|edge| *edge.weight() == EdgeKind::FanOut)
                .map(|edge| edge.target())
                .collect();
            if arms.is_empty() {
                continue;
            }

            let source = graph[idx].id().to_string();
            let mut joins: Vec<String> = Vec::new();
            for arm in arms {
                let join = graph
                    .edges_directed(arm, Direction::Outgoing)
                    .find(|edge| *edge.weight() == EdgeKind::Next)
                    .map(|edge| graph[edge.target()].id().to_string())
                    .ok_or_else(|| GraphConfigError::MissingJoin {
                        source_node: source.clone(),
                        target: graph[arm].id().to_string(),
                    })?;
                joins.push(join);
            }
            joins.sort();
            joins.dedup();
            if joins.len() != 1 {
                return Err(GraphConfigError::DivergentJoin { source_node: source, joins });
            }
        }

        Ok(GraphRuntime {
            graph,
            node_indices,
            entry,
            recursion_limit: self.recursion_limit,
            schema: self.schema,
            workflow: self.workflow,
        })
    }
}

fn lookup(
    node_indices: &HashMap<String, NodeIndex>,
    node: &str,
    context: &str,
) -> Result<NodeIndex, GraphConfigError> {
    node_indices
        .get(node)
        .copied()
        .ok_or_else(|| GraphConfigError::UnknownNode {
            node: node.to_string(),
            context: context.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct StubNode(&'static str);

    #[async_trait]
    impl Node for StubNode {
        fn id(&self) -> &'static str {
            self.0
        }

        async fn run(
            &self,
            _state: &WorkflowState,
            _ctx: &NodeContext,
        ) -> Result<NodeResult, GraphError> {
            Ok(NodeResult::end())
        }
    }

    fn builder() -> GraphBuilder {
        GraphBuilder::new("test")
            .node(Arc::new(StubNode("root")))
            .node(Arc::new(StubNode("left")))
            .node(Arc::new(StubNode("right")))
            .node(Arc::new(StubNode("join")))
            .entry("root")
    }

    #[test]
    fn build_accepts_converging_fan_out() {
        let runtime = builder()
            .fan_out("root", ["left", "right"])
            .edge("left", "join")
            .edge("right", "join")
            .build()
            .unwrap();

        let mut ids = runtime.node_ids();
        ids.sort();
        assert_eq!(ids, ["join", "left", "right", "root"]);
    }

    #[test]
    fn build_rejects_divergent_fan_out() {
        let err = builder()
            .node(Arc::new(StubNode("other")))
            .fan_out("root", ["left", "right"])
            .edge("left", "join")
            .edge("right", "other")
            .build()
            .unwrap_err();

        match err {
            GraphConfigError::DivergentJoin { source_node: source, joins } => {
                assert_eq!(source, "root");
                assert_eq!(joins, ["join", "other"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn build_rejects_fan_out_arm_without_join_edge() {
        let err = builder()
            .fan_out("root", ["left", "right"])
            .edge("left", "join")
            .build()
            .unwrap_err();

        assert!(matches!(err, GraphConfigError::MissingJoin { .. }));
    }

    #[test]
    fn build_rejects_duplicate_node_ids() {
        let err = GraphBuilder::new("test")
            .node(Arc::new(StubNode("a")))
            .node(Arc::new(StubNode("a")))
            .entry("a")
            .build()
            .unwrap_err();

        assert!(matches!(err, GraphConfigError::DuplicateNode(id) if id == "a"));
    }

    #[test]
    fn build_rejects_missing_or_unknown_entry() {
        let err = GraphBuilder::new("test")
            .node(Arc::new(StubNode("a")))
            .build()
            .unwrap_err();
        assert!(matches!(err, GraphConfigError::MissingEntry));

        let err = GraphBuilder::new("test")
            .node(Arc::new(StubNode("a")))
            .entry("nope")
            .build()
            .unwrap_err();
        assert!(matches!(err, GraphConfigError::UnknownNode { .. }));
    }

    #[test]
    fn build_rejects_second_static_edge() {
        let err = builder()
            .edge("root", "left")
            .edge("root", "right")
            .build()
            .unwrap_err();

        assert!(matches!(err, GraphConfigError::MultipleStaticEdges(id) if id == "root"));
    }

    #[test]
    fn build_rejects_zero_recursion_limit() {
        let err = builder().recursion_limit(0).build().unwrap_err();
        assert!(matches!(err, GraphConfigError::ZeroRecursionLimit));
    }
}
