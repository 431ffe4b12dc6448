use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use crate::cache::LruTtlCache;
use crate::classifier::classify;
use crate::provider::{ChatRequest, ChatResponse, ProviderError};
use crate::router::ProviderRouter;

/// Central entry point for AI requests — spec.md §4.4's full pipeline
/// (classify → cache lookup → route → cache store). Shared across all
/// connections via `Arc` in the gateway's `AppState`.
pub struct AgentRuntime {
    router: ProviderRouter,
    cache: Arc<LruTtlCache>,
    default_model: RwLock<String>,
}

impl AgentRuntime {
    pub fn new(router: ProviderRouter, cache: Arc<LruTtlCache>, default_model: String) -> Self {
        Self {
            router,
            cache,
            default_model: RwLock::new(default_model),
        }
    }

    pub async fn get_model(&self) -> String {
        self.default_model.read().await.clone()
    }

    /// Change the default model at runtime. Returns the previous model.
    pub async fn set_model(&self, model: String) -> String {
        let mut guard = self.default_model.write().await;
        std::mem::replace(&mut *guard, model)
    }

    pub fn router(&self) -> &ProviderRouter {
        &self.router
    }

    /// Process a user message with no extra system context.
    pub async fn chat(&self, user_message: &str) -> Result<ChatResponse, ProviderError> {
        self.chat_with_context(user_message, None, None).await
    }

    /// Classify, check the cache, and route — spec.md §4.4 steps 1-4.
    pub async fn chat_with_context(
        &self,
        user_message: &str,
        system: Option<&str>,
        model_override: Option<&str>,
    ) -> Result<ChatResponse, ProviderError> {
        let task_class = classify(user_message);
        let model = match model_override {
            Some(m) => m.to_string(),
            None => self.default_model.read().await.clone(),
        };

        let req = ChatRequest {
            model: model.clone(),
            prompt: user_message.to_string(),
            system: system.map(|s| s.to_string()),
            max_tokens: 4096,
        };

        if let Some(cached) = self.cache.get(&model, user_message, task_class) {
            info!(%task_class, "cache hit");
            return Ok(cached);
        }

        info!(%task_class, model = %model, "routing chat request");
        let resp = self.router.call(task_class, &req).await?;

        self.cache.put(&model, user_message, task_class, resp.clone());
        Ok(resp)
    }
}
