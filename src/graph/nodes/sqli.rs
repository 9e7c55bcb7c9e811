// SQL injection analyzer node
// Examines the packet payload for injection patterns; owns the sqli_report
// state field

use async_trait::async_trait;
use serde_json::json;

use crate::graph::node::{GraphError, Node, NodeContext, NodeResult};
use crate::graph::state::{StateUpdate, WorkflowState};
use crate::llm::{ModelRole, OutputSchema};

use super::fields;

const TEMPLATE: &str = "You are a SQL Injection Analysis Expert Agent, specialized in \
detecting SQL injection attacks within network packets. You are part of a multi-agent \
system where each agent has a specific focus - your expertise is exclusively in identifying \
attempts to manipulate or exploit database queries through injection.

You will receive a network packet. Your task:
Analyze the packet's payload field for SQL injection patterns. Look for:
- Classic SQL injection patterns ('OR '1'='1)
- UNION-based injection attempts
- Batch/Stacked queries (multiple queries with semicolons)
- Time-based blind injection patterns
- Boolean-based blind injection patterns
- Error-based injection attempts
- Database command execution attempts
- Comment injection (--, #, /**/)
- Database function calls (SELECT, INSERT, UPDATE, DELETE)

Here is the packet information:
{packet}

Examine the packet carefully for SQL injection patterns:
1. sql_detected: Must be exactly \"YES\" if a SQL injection attack is detected, or \"NO\" if not
2. details: If YES, describe the injection attempt found, its technique, and what it targets; \
if NO, briefly confirm that no SQL injection patterns were detected

Remember:
- Focus only on SQL injection patterns
- Ignore other security concerns
- Check for both obvious and obfuscated attempts
- Consider encoded payloads hiding injection fragments

{format_instructions}";

const DEGRADED_REPORT: &str = "Error invoking the SQL injection analyzer. Ignore the SQL \
injection analyzer's report for the final evaluation.";

pub struct SqliNode;

impl SqliNode {
    pub fn new() -> Self {
        Self
    }

    fn schema() -> OutputSchema {
        OutputSchema::new()
            .field(
                "sql_detected",
                "Either 'YES' if SQL injection is detected or 'NO' if not",
            )
            .field(
                "details",
                "Detailed analysis of the packet's potential SQL injection vulnerabilities",
            )
    }
}

impl Default for SqliNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for SqliNode {
    fn id(&self) -> &'static str {
        "sqli"
    }

    fn name(&self) -> &'static str {
        "SQL Injection Analyzer"
    }

    async fn run(
        &self,
        state: &WorkflowState,
        ctx: &NodeContext,
    ) -> Result<NodeResult, GraphError> {
        let packet = state
            .get(fields::PACKET)
            .ok_or_else(|| GraphError::node(self.id(), "packet missing from state"))?;
        let packet_text = serde_json::to_string_pretty(packet)
            .map_err(|err| GraphError::node(self.id(), err))?;

        let schema = Self::schema();
        let prompt = TEMPLATE
            .replace("{packet}", &packet_text)
            .replace("{format_instructions}", &schema.format_instructions());

        let report = match ctx.llm.complete(ModelRole::Chat, &prompt).await {
            Ok(raw) => match schema.parse(&raw) {
                Ok(output) => {
                    if let Ok(flag) = output.enumerated("sql_detected", &["YES", "NO"]) {
                        tracing::info!(detected = flag, "sql injection analysis complete");
                    }
                    output.text("details")
                }
                Err(err) => {
                    tracing::warn!("sqli analyzer output failed to parse: {err}");
                    DEGRADED_REPORT.to_string()
                }
            },
            Err(err) => {
                tracing::warn!("sqli analyzer completion failed: {err}");
                DEGRADED_REPORT.to_string()
            }
        };

        Ok(NodeResult::edge()
            .with_update(StateUpdate::new().set(fields::SQLI_REPORT, json!(report))))
    }
}
