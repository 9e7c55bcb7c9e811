// Application state
// Wires config into the completion service, the seeded criteria store, and
// the prebuilt workflow graphs

use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::criteria::CriteriaStore;
use crate::graph::{build_analysis_graph, build_criteria_graph, GraphRuntime, NodeContext};
use crate::llm::{CompletionService, GroqProvider};

pub struct AppState {
    pub config: AppConfig,
    pub llm: CompletionService,
    pub criteria: CriteriaStore,
    pub criteria_graph: GraphRuntime,
    pub analysis_graph: GraphRuntime,
}

impl AppState {
    /// Build the shared state. Graphs are constructed (and their shape
    /// validated) here, once, so a misconfigured graph fails startup rather
    /// than a request.
    pub fn initialize(config: AppConfig) -> anyhow::Result<Arc<Self>> {
        let api_key = config.llm.api_key.clone().unwrap_or_default();
        if api_key.is_empty() {
            tracing::warn!("no completion API key configured; completion calls will fail");
        }

        let provider = Arc::new(GroqProvider::new(config.llm.base_url.clone(), api_key));
        let llm = CompletionService::new(
            provider,
            config.llm.model.clone(),
            config.llm.reasoning_model.clone(),
            Duration::from_secs(config.llm.timeout_secs),
            config.llm.max_attempts,
        );

        let criteria = CriteriaStore::with_defaults();
        let limit = config.app.graph_recursion_limit;
        let criteria_graph = build_criteria_graph(limit)?;
        let analysis_graph = build_analysis_graph(limit)?;

        tracing::info!(
            criteria_count = criteria.len(),
            recursion_limit = limit,
            "application state initialized"
        );

        Ok(Arc::new(Self {
            config,
            llm,
            criteria,
            criteria_graph,
            analysis_graph,
        }))
    }

    pub fn node_context(&self) -> NodeContext {
        NodeContext {
            llm: self.llm.clone(),
        }
    }
}
