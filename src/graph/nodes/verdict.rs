// Verdict node
// Join point of the analysis fan-out: weighs both analyzer reports and
// decides whether the packet carries a threat

use async_trait::async_trait;
use serde_json::json;

use crate::graph::node::{GraphError, Node, NodeContext, NodeResult};
use crate::graph::state::{StateUpdate, WorkflowState};
use crate::llm::{ModelRole, OutputSchema};

use super::fields;

const TEMPLATE: &str = "You are a security decision agent. Below are the analyses from \
specialized packet analysis agents. Each agent provides explicit feedback on whether it \
determined a specific malicious request. Analyze the following output responses to make a \
final decision on whether a threat is present in the packet.

XSS AGENT ANALYSIS FINDINGS:
{xss_report}
SQL INJECTION AGENT ANALYSIS FINDINGS:
{sqli_report}

Your task is to analyze these findings and provide a structured response.

Remember:
- Be conservative in threat detection - only flag clear security threats with strong supporting evidence
- If one agent determines that a threat exists, that is enough for you to flag it as such
- If an agent's report says to ignore it for the final evaluation, discount that report entirely
- Provide comprehensive details supporting your decision
- Include specific evidence from agent findings when explaining threats
- Make clear, decisive determinations based on the available information

{format_instructions}";

pub struct VerdictNode;

impl VerdictNode {
    pub fn new() -> Self {
        Self
    }

    fn schema() -> OutputSchema {
        OutputSchema::new()
            .field(
                "threat_detected",
                "A boolean value: true if any security threat is detected, false if the packet appears safe",
            )
            .field(
                "details",
                "Comprehensive analysis summarizing all detected threats and their severity levels from the parallel agent analysis, or confirmation of packet safety if no threats detected",
            )
    }
}

impl Default for VerdictNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for VerdictNode {
    fn id(&self) -> &'static str {
        "verdict"
    }

    fn name(&self) -> &'static str {
        "Threat Verdict"
    }

    async fn run(
        &self,
        state: &WorkflowState,
        ctx: &NodeContext,
    ) -> Result<NodeResult, GraphError> {
        let xss_report = state.get_str(fields::XSS_REPORT).unwrap_or_default();
        let sqli_report = state.get_str(fields::SQLI_REPORT).unwrap_or_default();
        if xss_report.is_empty() || sqli_report.is_empty() {
            tracing::warn!("not all analyzers provided a report");
        }

        let schema = Self::schema();
        let prompt = TEMPLATE
            .replace("{xss_report}", xss_report)
            .replace("{sqli_report}", sqli_report)
            .replace("{format_instructions}", &schema.format_instructions());

        let raw = match ctx.llm.complete(ModelRole::Reasoning, &prompt).await {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!("verdict completion failed, ending run without verdict: {err}");
                return Ok(NodeResult::end());
            }
        };

        match schema
            .parse(&raw)
            .and_then(|output| Ok((output.boolean("threat_detected")?, output.text("details"))))
        {
            Ok((threat_detected, details)) => {
                tracing::info!(threat_detected, "verdict reached");
                let update = StateUpdate::new()
                    .set(fields::THREAT_DETECTED, json!(threat_detected))
                    .set(fields::SUMMARY, json!(details));
                Ok(NodeResult::end().with_update(update))
            }
            Err(err) => {
                tracing::warn!("verdict output failed to parse, ending run without verdict: {err}");
                Ok(NodeResult::end())
            }
        }
    }
}
