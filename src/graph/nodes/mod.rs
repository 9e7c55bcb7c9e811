// Graph nodes module
// Individual node implementations for the criteria and analysis workflows

pub mod generator;
pub mod matcher;
pub mod qa;
pub mod root;
pub mod sqli;
pub mod verdict;
pub mod xss;

pub use generator::GeneratorNode;
pub use matcher::MatcherNode;
pub use qa::QaNode;
pub use root::RootNode;
pub use sqli::SqliNode;
pub use verdict::VerdictNode;
pub use xss::XssNode;

use crate::criteria::CriteriaRecord;

use super::node::GraphError;
use super::state::WorkflowState;

/// State field names shared by nodes, graph builders and HTTP handlers.
pub mod fields {
    // criteria workflow
    pub const DESCRIPTION: &str = "description";
    pub const CRITERIA: &str = "criteria";
    pub const SELECTED_TITLE: &str = "selected_title";
    pub const SENT_FROM: &str = "sent_from";
    pub const FEEDBACK: &str = "feedback";
    pub const APPROVED: &str = "approved";

    // analysis workflow
    pub const PACKET: &str = "packet";
    pub const XSS_REPORT: &str = "xss_report";
    pub const SQLI_REPORT: &str = "sqli_report";
    pub const THREAT_DETECTED: &str = "threat_detected";
    pub const SUMMARY: &str = "summary";
}

/// Decode the in-state criteria list (the run's snapshot of the store).
pub(crate) fn criteria_in_state(
    node_id: &str,
    state: &WorkflowState,
) -> Result<Vec<CriteriaRecord>, GraphError> {
    let value = state
        .get(fields::CRITERIA)
        .cloned()
        .ok_or_else(|| GraphError::node(node_id, "criteria list missing from state"))?;
    serde_json::from_value(value)
        .map_err(|err| GraphError::node(node_id, format!("criteria list in state is malformed: {err}")))
}
