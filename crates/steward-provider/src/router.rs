use async_trait::async_trait;
use tracing::{info, warn};

use crate::provider::{ChatRequest, ChatResponse, LlmProvider, ProviderError, TaskClass};

/// A single provider slot inside the router's preferred ordering for a class.
pub struct ProviderSlot {
    pub provider: Box<dyn LlmProvider>,
}

impl ProviderSlot {
    pub fn new(provider: Box<dyn LlmProvider>) -> Self {
        Self { provider }
    }
}

/// Routes requests across multiple AI providers with automatic failover —
/// spec.md §4.4 steps 2 and 4. Providers are tried in priority order; on a
/// transient error the current provider is retried once with a 500ms
/// back-off, then the router falls through to the next provider whose
/// `supports(task_class)` is true. If none is configured for the class, the
/// last slot (the "default coder" provider) is tried regardless of support.
pub struct ProviderRouter {
    slots: Vec<ProviderSlot>,
}

impl ProviderRouter {
    pub fn new(slots: Vec<ProviderSlot>) -> Self {
        assert!(!slots.is_empty(), "ProviderRouter requires at least one provider slot");
        Self { slots }
    }

    pub async fn call(&self, task_class: TaskClass, req: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        let mut candidates: Vec<&ProviderSlot> = self
            .slots
            .iter()
            .filter(|s| s.provider.supports(task_class))
            .collect();
        if candidates.is_empty() {
            // fall back to the default coder provider (last configured slot)
            if let Some(default) = self.slots.last() {
                candidates.push(default);
            }
        }

        let mut last_err: Option<ProviderError> = None;

        for slot in candidates {
            let provider_name = slot.provider.name();

            for attempt in 0..=1 {
                match slot.provider.call(req).await {
                    Ok(resp) => {
                        if attempt > 0 {
                            info!(provider = %provider_name, "request succeeded after retry");
                        }
                        return Ok(resp);
                    }
                    Err(e) => {
                        warn!(provider = %provider_name, attempt, err = %e, "provider call failed");

                        if matches!(e, ProviderError::RateLimited { .. }) {
                            last_err = Some(e);
                            break;
                        }
                        if !is_transient(&e) {
                            last_err = Some(e);
                            break;
                        }
                        last_err = Some(e);
                        if attempt == 0 {
                            tokio::time::sleep(tokio::time::Duration::from_millis(500)).await;
                        }
                    }
                }
            }

            info!(provider = %provider_name, "provider exhausted, trying next provider");
        }

        Err(last_err.unwrap_or_else(|| ProviderError::Unavailable("all providers failed".to_string())))
    }
}

/// Timeout and 5xx are transient (spec.md §4.4 step 4); auth/model errors are not.
fn is_transient(err: &ProviderError) -> bool {
    match err {
        ProviderError::Transient(_) | ProviderError::Unavailable(_) => true,
        ProviderError::Api { status, .. } => *status >= 500,
        ProviderError::Http(e) => e.is_timeout() || e.is_connect(),
        _ => false,
    }
}

#[async_trait]
impl LlmProvider for ProviderRouter {
    fn name(&self) -> &str {
        "router"
    }

    fn supports(&self, task_class: TaskClass) -> bool {
        self.slots.iter().any(|s| s.provider.supports(task_class))
    }

    async fn call(&self, req: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        ProviderRouter::call(self, TaskClass::Complex, req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysFail;

    #[async_trait]
    impl LlmProvider for AlwaysFail {
        fn name(&self) -> &str {
            "always-fail"
        }
        fn supports(&self, _task_class: TaskClass) -> bool {
            true
        }
        async fn call(&self, _req: &ChatRequest) -> Result<ChatResponse, ProviderError> {
            Err(ProviderError::Unavailable("intentional failure".to_string()))
        }
    }

    struct AlwaysOk;

    #[async_trait]
    impl LlmProvider for AlwaysOk {
        fn name(&self) -> &str {
            "always-ok"
        }
        fn supports(&self, _task_class: TaskClass) -> bool {
            true
        }
        async fn call(&self, req: &ChatRequest) -> Result<ChatResponse, ProviderError> {
            Ok(ChatResponse {
                text: "ok".to_string(),
                tokens: Some(2),
                model_info: req.model.clone(),
            })
        }
    }

    fn dummy_request() -> ChatRequest {
        ChatRequest {
            model: "test-model".to_string(),
            prompt: "hello".to_string(),
            system: Some("You are a test.".to_string()),
            max_tokens: 64,
        }
    }

    #[tokio::test]
    async fn router_falls_back_to_second_provider() {
        let router = ProviderRouter::new(vec![
            ProviderSlot::new(Box::new(AlwaysFail)),
            ProviderSlot::new(Box::new(AlwaysOk)),
        ]);

        let result = router.call(TaskClass::Complex, &dummy_request()).await;
        assert!(result.is_ok());
        assert_eq!(result.unwrap().text, "ok");
    }

    #[tokio::test]
    async fn router_errors_when_all_fail() {
        let router = ProviderRouter::new(vec![
            ProviderSlot::new(Box::new(AlwaysFail)),
            ProviderSlot::new(Box::new(AlwaysFail)),
        ]);

        let result = router.call(TaskClass::Complex, &dummy_request()).await;
        assert!(result.is_err());
    }
}
