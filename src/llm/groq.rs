use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::provider::{CompletionError, CompletionProvider};
use super::types::ChatRequest;

pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai";

/// Groq chat-completion provider (OpenAI-compatible API).
#[derive(Clone)]
pub struct GroqProvider {
    base_url: String,
    api_key: String,
    client: Client,
}

impl GroqProvider {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client: Client::new(),
        }
    }
}

#[async_trait]
impl CompletionProvider for GroqProvider {
    fn name(&self) -> &str {
        "groq"
    }

    async fn health_check(&self) -> bool {
        let url = format!("{}/v1/models", self.base_url);
        match self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    async fn complete(&self, request: ChatRequest) -> Result<String, CompletionError> {
        let url = format!("{}/v1/chat/completions", self.base_url);

        let mut body = json!({
            "model": request.model,
            "messages": request.messages,
            "stream": false,
        });
        if let Some(obj) = body.as_object_mut() {
            if let Some(t) = request.temperature {
                obj.insert("temperature".to_string(), json!(t));
            }
            if let Some(t) = request.max_tokens {
                obj.insert("max_tokens".to_string(), json!(t));
            }
        }

        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| CompletionError::Transport(err.to_string()))?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let message = res.text().await.unwrap_or_default();
            return Err(CompletionError::Api { status, message });
        }

        let payload: Value = res
            .json()
            .await
            .map_err(|err| CompletionError::Transport(err.to_string()))?;

        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or_default()
            .to_string();

        if content.trim().is_empty() {
            return Err(CompletionError::Empty);
        }

        Ok(content)
    }
}
