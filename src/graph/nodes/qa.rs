// QA node
// Reviews the selected criteria against the user description; approves the
// run or loops feedback back to the generator

use async_trait::async_trait;
use serde_json::json;

use crate::graph::node::{GraphError, Node, NodeContext, NodeResult};
use crate::graph::state::{StateUpdate, WorkflowState};
use crate::llm::{ModelRole, OutputSchema};

use super::fields;

const TEMPLATE: &str = "You are a network security quality assurance AI agent tasked with \
assessing the quality of a network criteria that is to be monitored based on a user's \
description of their network usage needs.
USER DESCRIPTION:
{description}
SELECTED CRITERIA:
{the_criteria}

Your task is to analyze the alignment between the user's needs and the selected criteria. Follow these steps:

1. Comprehension Analysis:
   - Does the criteria demonstrate a clear understanding of the user's network usage scenario?
   - Are all key aspects of the user's description addressed in the criteria?

2. Technical Assessment:
   - Are the selected protocols appropriate for this use case?
   - Do the specified ports match the described network services?
   - Are the track_fields sufficient to monitor the described activities?
   - Are the alert conditions relevant and properly thresholded?

3. Security Coverage:
   - Does the criteria adequately address potential security concerns for this use case?
   - Are there any monitoring gaps that could leave vulnerabilities?

4. Practical Implementation:
   - Is the criteria specific enough to be implemented?
   - Are there any redundant or unnecessary elements?

Based on your analysis, provide:
1. A decision of 'VALID' or 'INVALID'
2. Detailed feedback including:
   - Specific strengths of the current criteria
   - Areas that need improvement (if any)
   - Concrete suggestions for enhancement

Your feedback will be used to either approve the criteria or guide improvements, so be thorough and specific.

{format_instructions}";

const UNPARSEABLE_FEEDBACK: &str = "The previous review response could not be parsed. \
Regenerate the criteria with a simpler, well-formed structure.";

pub struct QaNode;

impl QaNode {
    pub fn new() -> Self {
        Self
    }

    fn schema() -> OutputSchema {
        OutputSchema::new()
            .field(
                "decision",
                "Either 'VALID' if the criteria matches the use case well, or 'INVALID' if it needs improvement",
            )
            .field(
                "feedback",
                "Detailed analysis of the criteria's strengths and areas for improvement",
            )
    }
}

impl Default for QaNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for QaNode {
    fn id(&self) -> &'static str {
        "qa"
    }

    fn name(&self) -> &'static str {
        "Criteria QA"
    }

    async fn run(
        &self,
        state: &WorkflowState,
        ctx: &NodeContext,
    ) -> Result<NodeResult, GraphError> {
        let description = state
            .get_str(fields::DESCRIPTION)
            .ok_or_else(|| GraphError::node(self.id(), "description missing from state"))?;
        let selected = state
            .get_str(fields::SELECTED_TITLE)
            .ok_or_else(|| GraphError::node(self.id(), "no criteria selected for review"))?;

        let records = super::criteria_in_state(self.id(), state)?;
        let record = records
            .iter()
            .find(|record| record.title == selected)
            .ok_or_else(|| {
                GraphError::node(self.id(), format!("selected criteria '{selected}' not found"))
            })?;

        let schema = Self::schema();
        let prompt = TEMPLATE
            .replace("{description}", description)
            .replace("{the_criteria}", &record.review_summary())
            .replace("{format_instructions}", &schema.format_instructions());

        let raw = ctx
            .llm
            .complete(ModelRole::Chat, &prompt)
            .await
            .map_err(|err| GraphError::node(self.id(), err))?;

        // An unreadable verdict must not approve anything; degrade to
        // INVALID so the loop stays live and budget-bounded.
        let (valid, feedback) = match schema.parse(&raw) {
            Ok(output) => match output.enumerated("decision", &["VALID", "INVALID"]) {
                Ok(decision) => (decision == "VALID", output.text("feedback")),
                Err(err) => {
                    tracing::warn!("qa decision unreadable, treating as INVALID: {err}");
                    (false, UNPARSEABLE_FEEDBACK.to_string())
                }
            },
            Err(err) => {
                tracing::warn!("qa output failed to parse, treating as INVALID: {err}");
                (false, UNPARSEABLE_FEEDBACK.to_string())
            }
        };

        if valid {
            tracing::info!(title = %selected, "criteria approved");
            Ok(NodeResult::end()
                .with_update(StateUpdate::new().set(fields::APPROVED, json!(true))))
        } else {
            tracing::info!(title = %selected, "criteria rejected, returning feedback");
            let update = StateUpdate::new()
                .set(fields::FEEDBACK, json!(feedback))
                .set(fields::SENT_FROM, json!(self.id()));
            Ok(NodeResult::goto("generator").with_update(update))
        }
    }
}
