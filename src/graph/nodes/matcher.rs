// Criteria matcher node
// Maps a usage description onto an existing criteria profile, or hands off
// to the generator when nothing matches

use std::collections::HashSet;

use async_trait::async_trait;
use serde_json::json;

use crate::criteria::{screen_title, MatchOutcome, NO_MATCHES};
use crate::graph::node::{GraphError, Node, NodeContext, NodeResult};
use crate::graph::state::{StateUpdate, WorkflowState};
use crate::llm::{ModelRole, OutputSchema};

use super::fields;

const TEMPLATE: &str = "You are a network security expert tasked with analyzing network \
usage descriptions and matching them to existing monitoring criteria.

EXISTING CRITERIA:
{criteria_list}

USER DESCRIPTION:
{description}

Your task is to:
1. Analyze the user's description of their network usage needs
2. Compare it against the existing criteria profiles
3. Return EXACTLY \"NO_MATCHES\" if any of these conditions are true:
   - The existing criteria list is empty, blank, or null
   - No criteria matches the user description with high confidence
   - The user description is too vague or ambiguous to make a definitive match
   - You're unsure about the match quality
4. Otherwise, return the EXACT title of the single best matching criteria

CRITICAL REQUIREMENTS:
- You MUST return \"NO_MATCHES\" if there is ANY doubt about the match quality
- You MUST return \"NO_MATCHES\" if the criteria list is empty or blank
- If returning a match, the title MUST be copied exactly from the existing criteria list
- Do NOT return modified, partial, or similar-looking titles
- Do NOT attempt to combine or modify existing criteria titles
- Only return a SINGLE exact match, never multiple matches

{format_instructions}";

pub struct MatcherNode;

impl MatcherNode {
    pub fn new() -> Self {
        Self
    }

    fn schema() -> OutputSchema {
        OutputSchema::new().field(
            "title",
            "The title of the matching criteria or 'NO_MATCHES' if no good match is found",
        )
    }
}

impl Default for MatcherNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for MatcherNode {
    fn id(&self) -> &'static str {
        "matcher"
    }

    fn name(&self) -> &'static str {
        "Criteria Matcher"
    }

    async fn run(
        &self,
        state: &WorkflowState,
        ctx: &NodeContext,
    ) -> Result<NodeResult, GraphError> {
        let description = state
            .get_str(fields::DESCRIPTION)
            .ok_or_else(|| GraphError::node(self.id(), "description missing from state"))?;
        let records = super::criteria_in_state(self.id(), state)?;

        let criteria_list = records
            .iter()
            .map(|record| record.matching_summary())
            .collect::<Vec<_>>()
            .join("\n");

        let schema = Self::schema();
        let prompt = TEMPLATE
            .replace("{criteria_list}", &criteria_list)
            .replace("{description}", description)
            .replace("{format_instructions}", &schema.format_instructions());

        let raw = ctx
            .llm
            .complete(ModelRole::Chat, &prompt)
            .await
            .map_err(|err| GraphError::node(self.id(), err))?;

        // An unparseable completion is no reason to kill the run; it just
        // means we could not verify a match.
        let candidate = match schema.parse(&raw) {
            Ok(output) => output.text("title"),
            Err(err) => {
                tracing::warn!("matcher output failed to parse, treating as no match: {err}");
                NO_MATCHES.to_string()
            }
        };

        let known_titles: HashSet<String> =
            records.iter().map(|record| record.title.clone()).collect();

        match screen_title(candidate.trim(), &known_titles) {
            MatchOutcome::Existing(title) => {
                tracing::info!(title = %title, "matched existing criteria");
                Ok(NodeResult::goto("qa")
                    .with_update(StateUpdate::new().set(fields::SELECTED_TITLE, json!(title))))
            }
            MatchOutcome::NoMatch => {
                tracing::info!("no verified match, routing to generator");
                Ok(NodeResult::goto("generator"))
            }
        }
    }
}
