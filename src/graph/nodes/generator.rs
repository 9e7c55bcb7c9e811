// Criteria generator node
// Builds a new monitoring profile from the user description, folding in QA
// feedback on retry cycles

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::criteria::CriteriaRecord;
use crate::graph::node::{GraphError, Node, NodeContext, NodeResult};
use crate::graph::state::{StateUpdate, WorkflowState};
use crate::llm::{ModelRole, OutputSchema};

use super::fields;

const TEMPLATE: &str = "You are a network security expert tasked with creating monitoring \
criteria for specific network usage patterns.

Here is an example of a well-structured monitoring criteria:

{\"title\": \"backend_infrastructure\",
\"description\": \"This use case is for when the network is used to manage backend servers and databases. This use case is appropriate for ensuring that database and backend API server requests are validated and not coming from unauthorized or foreign locations.\",
\"criteria\": {
    \"protocols\": [\"TCP\"],
    \"ports\": [3306, 5432, 6379, 27017, 8080, 443],
    \"ip_ranges\": [\"10.0.0.0/8\", \"172.16.0.0/12\", \"192.168.0.0/16\"],
    \"track_fields\": [
        \"source_ip\",
        \"destination_ip\",
        \"transport_layer.protocol\",
        \"transport_layer.source_port\",
        \"transport_layer.destination_port\",
        \"transport_layer.flags\",
        \"payload.length\"
    ],
    \"alert_conditions\": {
        \"unauthorized_ip\": \"source_ip not in ip_ranges\",
        \"suspicious_ports\": \"destination_port not in ports\",
        \"large_payload\": \"payload.length > 1000000\"
    }
}}

Based on the user's description below, create a new monitoring criteria following the same structure.

USER DESCRIPTION:
{description}

REQUIREMENTS:
1. Return a valid JSON object with exactly these fields: title (snake_case), description (string), and criteria (object)
2. The criteria object must include: protocols (array), ports (array), track_fields (array), and alert_conditions (object)
3. Remove any comments or annotations from the JSON - it must be pure, valid JSON
4. Ensure all special characters are properly escaped
5. Additionally, provide a bpf_filter: a Berkeley Packet Filter expression equivalent to the criteria.

{qa_feedback}

{format_instructions}";

const FEEDBACK_BLOCK: &str = "QUALITY ASSURANCE FEEDBACK:
The previous criteria had the following issues that need to be addressed:
{feedback}

Please ensure the new criteria addresses these concerns.";

pub struct GeneratorNode;

impl GeneratorNode {
    pub fn new() -> Self {
        Self
    }

    fn schema() -> OutputSchema {
        OutputSchema::new()
            .field(
                "title",
                "A short, snake_case title that describes the network monitoring use case",
            )
            .field(
                "description",
                "A clear description of the use case and what type of network traffic should be monitored",
            )
            .field(
                "criteria",
                "A JSON object containing the monitoring criteria including protocols, ports, track_fields, and alert_conditions",
            )
            .field(
                "bpf_filter",
                "A Berkeley Packet Filter expression equivalent to the criteria",
            )
    }
}

impl Default for GeneratorNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for GeneratorNode {
    fn id(&self) -> &'static str {
        "generator"
    }

    fn name(&self) -> &'static str {
        "Criteria Generator"
    }

    async fn run(
        &self,
        state: &WorkflowState,
        ctx: &NodeContext,
    ) -> Result<NodeResult, GraphError> {
        let description = state
            .get_str(fields::DESCRIPTION)
            .ok_or_else(|| GraphError::node(self.id(), "description missing from state"))?;
        let mut records = super::criteria_in_state(self.id(), state)?;

        let qa_feedback = match (state.get_str(fields::SENT_FROM), state.get_str(fields::FEEDBACK)) {
            (Some("qa"), Some(feedback)) if !feedback.trim().is_empty() => {
                FEEDBACK_BLOCK.replace("{feedback}", feedback)
            }
            _ => String::new(),
        };

        let schema = Self::schema();
        let prompt = TEMPLATE
            .replace("{description}", description)
            .replace("{qa_feedback}", &qa_feedback)
            .replace("{format_instructions}", &schema.format_instructions());

        let raw = match ctx.llm.complete(ModelRole::Chat, &prompt).await {
            Ok(raw) => raw,
            Err(err) => {
                // Regenerating is the recovery path; the recursion budget
                // bounds how often we come back here.
                tracing::warn!("generator completion failed, retrying node: {err}");
                return Ok(NodeResult::goto(self.id()));
            }
        };

        let record = match schema.parse(&raw).and_then(|output| {
            let criteria = output.json_object("criteria")?;
            Ok(CriteriaRecord {
                title: output.text("title").trim().to_string(),
                description: output.text("description"),
                criteria: Value::Object(criteria),
                bpf_filter: output.text("bpf_filter"),
            })
        }) {
            Ok(record) => record,
            Err(err) => {
                tracing::warn!("generator output failed to parse, retrying node: {err}");
                return Ok(NodeResult::goto(self.id()));
            }
        };

        tracing::info!(title = %record.title, "generated new criteria candidate");

        records.push(record.clone());
        let records_value = serde_json::to_value(&records)
            .map_err(|err| GraphError::node(self.id(), err))?;

        let update = StateUpdate::new()
            .set(fields::CRITERIA, records_value)
            .set(fields::SELECTED_TITLE, json!(record.title))
            .set(fields::SENT_FROM, json!(self.id()))
            .set(fields::FEEDBACK, Value::Null);

        Ok(NodeResult::goto("qa").with_update(update))
    }
}
