// Graph builder
// Wires the two concrete workflows out of their nodes

use std::sync::Arc;

use super::nodes::{
    fields, GeneratorNode, MatcherNode, QaNode, RootNode, SqliNode, VerdictNode, XssNode,
};
use super::runtime::{GraphBuilder, GraphConfigError, GraphRuntime};
use super::state::StateSchema;

/// Criteria workflow: match an existing profile or generate a new one and
/// iterate through QA until approved or the budget runs out.
///
/// All routing here is dynamic (`Goto`), including the generator/QA cycle,
/// so the graph declares no static edges.
pub fn build_criteria_graph(recursion_limit: usize) -> Result<GraphRuntime, GraphConfigError> {
    GraphBuilder::new("criteria")
        .node(Arc::new(MatcherNode::new()))
        .node(Arc::new(GeneratorNode::new()))
        .node(Arc::new(QaNode::new()))
        .entry("matcher")
        .recursion_limit(recursion_limit)
        .schema(
            StateSchema::new()
                .required(fields::DESCRIPTION)
                .required(fields::CRITERIA)
                .optional(fields::SELECTED_TITLE)
                .optional(fields::SENT_FROM)
                .optional(fields::FEEDBACK)
                .optional(fields::APPROVED),
        )
        .build()
}

/// Analysis workflow: fan the packet out to the specialist analyzers, then
/// join at the verdict node.
pub fn build_analysis_graph(recursion_limit: usize) -> Result<GraphRuntime, GraphConfigError> {
    GraphBuilder::new("analysis")
        .node(Arc::new(RootNode::new()))
        .node(Arc::new(XssNode::new()))
        .node(Arc::new(SqliNode::new()))
        .node(Arc::new(VerdictNode::new()))
        .entry("root")
        .recursion_limit(recursion_limit)
        .fan_out("root", ["xss", "sqli"])
        .edge("xss", "verdict")
        .edge("sqli", "verdict")
        .schema(
            StateSchema::new()
                .required(fields::PACKET)
                .optional(fields::XSS_REPORT)
                .optional(fields::SQLI_REPORT)
                .optional(fields::THREAT_DETECTED)
                .optional(fields::SUMMARY),
        )
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::runtime::DEFAULT_RECURSION_LIMIT;

    #[test]
    fn criteria_graph_builds() {
        let runtime = build_criteria_graph(DEFAULT_RECURSION_LIMIT).unwrap();
        assert_eq!(runtime.workflow(), "criteria");
        assert_eq!(runtime.recursion_limit(), DEFAULT_RECURSION_LIMIT);

        let mut ids = runtime.node_ids();
        ids.sort();
        assert_eq!(ids, ["generator", "matcher", "qa"]);
    }

    #[test]
    fn analysis_graph_builds_with_converging_fan_out() {
        let runtime = build_analysis_graph(DEFAULT_RECURSION_LIMIT).unwrap();
        assert_eq!(runtime.workflow(), "analysis");

        let mut ids = runtime.node_ids();
        ids.sort();
        assert_eq!(ids, ["root", "sqli", "verdict", "xss"]);
    }
}
