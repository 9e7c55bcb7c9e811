// Graph module
// Directed workflow execution: node contract, state, frontier runtime,
// and the concrete criteria/analysis graphs

pub mod builder;
pub mod node;
pub mod nodes;
pub mod runtime;
pub mod state;

pub use builder::{build_analysis_graph, build_criteria_graph};
pub use node::{GraphError, Next, Node, NodeContext, NodeResult};
pub use runtime::{GraphBuilder, GraphConfigError, GraphRuntime, DEFAULT_RECURSION_LIMIT};
pub use state::{StateSchema, StateUpdate, WorkflowState};
