use std::sync::Arc;
use std::time::Duration;

use super::provider::{CompletionError, CompletionProvider};
use super::types::{ChatMessage, ChatRequest};

/// Which configured model a node wants to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelRole {
    /// Default model for matching, generation and per-packet analysis.
    Chat,
    /// Heavier model for the final threat verdict.
    Reasoning,
}

/// Completion service shared by all nodes.
///
/// Wraps a provider with a per-call timeout and a bounded retry loop for
/// transient failures (timeout, transport error, 429/5xx). Exhausted retries
/// surface the last error; callers decide whether that degrades or fails
/// their branch.
#[derive(Clone)]
pub struct CompletionService {
    provider: Arc<dyn CompletionProvider>,
    chat_model: String,
    reasoning_model: String,
    timeout: Duration,
    max_attempts: u32,
}

impl CompletionService {
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        chat_model: impl Into<String>,
        reasoning_model: impl Into<String>,
        timeout: Duration,
        max_attempts: u32,
    ) -> Self {
        Self {
            provider,
            chat_model: chat_model.into(),
            reasoning_model: reasoning_model.into(),
            timeout,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub async fn health_check(&self) -> bool {
        self.provider.health_check().await
    }

    pub async fn complete(
        &self,
        role: ModelRole,
        prompt: &str,
    ) -> Result<String, CompletionError> {
        let model = match role {
            ModelRole::Chat => self.chat_model.clone(),
            ModelRole::Reasoning => self.reasoning_model.clone(),
        };
        let request = ChatRequest::new(model, vec![ChatMessage::user(prompt)]);

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let outcome = match tokio::time::timeout(
                self.timeout,
                self.provider.complete(request.clone()),
            )
            .await
            {
                Ok(inner) => inner,
                Err(_) => Err(CompletionError::Timeout(self.timeout)),
            };

            match outcome {
                Ok(text) => return Ok(text),
                Err(err) if err.is_transient() && attempt < self.max_attempts => {
                    tracing::warn!(
                        provider = self.provider.name(),
                        attempt,
                        "transient completion failure, retrying: {err}"
                    );
                    tokio::time::sleep(Duration::from_millis(200 * u64::from(attempt))).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;

    struct FlakyProvider {
        calls: AtomicUsize,
        failures_before_success: usize,
        transient: bool,
    }

    #[async_trait]
    impl CompletionProvider for FlakyProvider {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn health_check(&self) -> bool {
            true
        }

        async fn complete(&self, _request: ChatRequest) -> Result<String, CompletionError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures_before_success {
                if self.transient {
                    Err(CompletionError::Transport("connection reset".into()))
                } else {
                    Err(CompletionError::Api {
                        status: 401,
                        message: "invalid api key".into(),
                    })
                }
            } else {
                Ok("ok".into())
            }
        }
    }

    fn service(provider: Arc<FlakyProvider>) -> CompletionService {
        CompletionService::new(
            provider,
            "chat-model",
            "reasoning-model",
            Duration::from_secs(5),
            3,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_failures() {
        let provider = Arc::new(FlakyProvider {
            calls: AtomicUsize::new(0),
            failures_before_success: 2,
            transient: true,
        });
        let svc = service(Arc::clone(&provider));

        let text = svc.complete(ModelRole::Chat, "hello").await.unwrap();
        assert_eq!(text, "ok");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let provider = Arc::new(FlakyProvider {
            calls: AtomicUsize::new(0),
            failures_before_success: 10,
            transient: true,
        });
        let svc = service(Arc::clone(&provider));

        let err = svc.complete(ModelRole::Chat, "hello").await.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn does_not_retry_client_errors() {
        let provider = Arc::new(FlakyProvider {
            calls: AtomicUsize::new(0),
            failures_before_success: 10,
            transient: false,
        });
        let svc = service(Arc::clone(&provider));

        let err = svc.complete(ModelRole::Chat, "hello").await.unwrap_err();
        assert!(!err.is_transient());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }
}
