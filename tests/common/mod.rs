// Shared test doubles: scripted completion providers and context helpers
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use vigil_backend::graph::NodeContext;
use vigil_backend::llm::{
    ChatRequest, CompletionError, CompletionProvider, CompletionService,
};

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    /// Fails the call with a non-transient error so exactly one script slot
    /// is consumed.
    Fail,
}

/// Wrap a JSON value the way a well-behaved model would return it.
pub fn fenced(value: Value) -> Reply {
    Reply::Text(format!("```json\n{}\n```", value))
}

fn materialize(reply: Reply) -> Result<String, CompletionError> {
    match reply {
        Reply::Text(text) => Ok(text),
        Reply::Fail => Err(CompletionError::Api {
            status: 400,
            message: "scripted failure".to_string(),
        }),
    }
}

/// FIFO-scripted provider for strictly sequential workflows.
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Reply>>,
}

impl ScriptedProvider {
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
        }
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn health_check(&self) -> bool {
        true
    }

    async fn complete(&self, _request: ChatRequest) -> Result<String, CompletionError> {
        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(reply) => materialize(reply),
            None => Err(CompletionError::Api {
                status: 400,
                message: "script exhausted".to_string(),
            }),
        }
    }
}

/// Substring-keyed provider for concurrent fan-out steps, where reply order
/// cannot depend on branch scheduling.
pub struct KeyedProvider {
    rules: Vec<(String, Reply)>,
}

impl KeyedProvider {
    pub fn new(rules: impl IntoIterator<Item = (&'static str, Reply)>) -> Self {
        Self {
            rules: rules
                .into_iter()
                .map(|(needle, reply)| (needle.to_string(), reply))
                .collect(),
        }
    }
}

#[async_trait]
impl CompletionProvider for KeyedProvider {
    fn name(&self) -> &str {
        "keyed"
    }

    async fn health_check(&self) -> bool {
        true
    }

    async fn complete(&self, request: ChatRequest) -> Result<String, CompletionError> {
        let prompt = request
            .messages
            .last()
            .map(|message| message.content.as_str())
            .unwrap_or_default();
        let reply = self
            .rules
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map(|(_, reply)| reply.clone());
        match reply {
            Some(reply) => materialize(reply),
            None => Err(CompletionError::Api {
                status: 400,
                message: "no scripted rule matched the prompt".to_string(),
            }),
        }
    }
}

/// Node context over the given provider, with retries disabled so a scripted
/// failure consumes exactly one call.
pub fn test_context(provider: Arc<dyn CompletionProvider>) -> NodeContext {
    NodeContext {
        llm: CompletionService::new(
            provider,
            "chat-test",
            "reasoning-test",
            Duration::from_secs(5),
            1,
        ),
    }
}
