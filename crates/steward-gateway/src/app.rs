//! Central application state and the inbound-message dispatch pipeline —
//! spec.md §2's dataflow: C13 → C1 → (auth) → C9 (pending-confirmation
//! check) → C8 → C7 → match? execute skill : C5 → C4 → reply.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    routing::{get, post},
    Router,
};
use dashmap::DashMap;
use tracing::warn;

use steward_actions::ActionController;
use steward_alerts::AlertManager;
use steward_channels::{ChannelManager, InboundSink};
use steward_core::config::StewardConfig;
use steward_core::types::{InboundMessage, Platform, UserId};
use steward_memory::ContextEngine;
use steward_outcomes::OutcomeTracker;
use steward_planner::PlanExecutor;
use steward_provider::AgentRuntime;
use steward_registry::ChatRegistry;
use steward_scheduler::SchedulerHandle;
use steward_skills::nlp;
use steward_skills::{SkillContext, SkillRegistry};
use steward_store::types::{PendingState, Role};
use steward_store::Store;

use crate::status;

/// Affirmative replies recognized while a C9 action is PENDING.
const YES_WORDS: [&str; 5] = ["yes", "y", "confirm", "confirmed", "ok"];
/// Negative replies recognized while a C9 action is PENDING.
const NO_WORDS: [&str; 4] = ["no", "n", "cancel", "reject"];

/// Central shared state — passed as `Arc<AppState>` to every Axum handler
/// and shared into the channel adapters as an `Arc<dyn InboundSink>`.
pub struct AppState {
    pub config: StewardConfig,
    pub store: Arc<Store>,
    pub registry: Arc<ChatRegistry>,
    pub context_engine: Arc<ContextEngine>,
    pub outcomes: Arc<OutcomeTracker>,
    pub provider: Arc<AgentRuntime>,
    pub skills: Arc<SkillRegistry>,
    pub actions: Arc<ActionController>,
    pub alerts: Arc<AlertManager>,
    pub planner: Arc<PlanExecutor>,
    pub scheduler: Arc<SchedulerHandle>,
    pub channels: Arc<ChannelManager>,
    /// GitHub delivery-id -> received-at, for the 5-min webhook dedup window
    /// (spec.md §4.13).
    pub github_deliveries: DashMap<String, chrono::DateTime<chrono::Utc>>,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: StewardConfig,
        store: Arc<Store>,
        registry: Arc<ChatRegistry>,
        context_engine: Arc<ContextEngine>,
        outcomes: Arc<OutcomeTracker>,
        provider: Arc<AgentRuntime>,
        skills: Arc<SkillRegistry>,
        actions: Arc<ActionController>,
        alerts: Arc<AlertManager>,
        planner: Arc<PlanExecutor>,
        scheduler: Arc<SchedulerHandle>,
        channels: Arc<ChannelManager>,
    ) -> Self {
        Self {
            config,
            store,
            registry,
            context_engine,
            outcomes,
            provider,
            skills,
            actions,
            alerts,
            planner,
            scheduler,
            channels,
            github_deliveries: DashMap::new(),
        }
    }

    /// `true` if `delivery_id` was already seen within the last 5 minutes.
    /// Also evicts stale entries on every call — lazy reaping, same shape as
    /// `steward-actions`' expired-PENDING reap.
    pub fn github_delivery_seen(&self, delivery_id: &str) -> bool {
        let now = chrono::Utc::now();
        self.github_deliveries
            .retain(|_, seen_at| now.signed_duration_since(*seen_at) < chrono::Duration::minutes(5));
        if self.github_deliveries.contains_key(delivery_id) {
            return true;
        }
        self.github_deliveries.insert(delivery_id.to_string(), now);
        false
    }

    async fn reply(&self, platform: Platform, chat_id: &steward_core::types::ChatId, text: &str) {
        let channel_name = platform.to_string();
        if let Err(e) = self.channels.send_text(&channel_name, chat_id, text).await {
            warn!(channel = %channel_name, chat_id = %chat_id, error = %e, "gateway: failed to deliver reply");
        }
    }
}

#[async_trait]
impl InboundSink for AppState {
    async fn handle(&self, msg: InboundMessage) {
        let text = match &msg.text {
            Some(t) if !t.trim().is_empty() => t.clone(),
            _ => return,
        };

        self.store
            .memory
            .append_conversation(&msg.chat_id, Role::User, &text)
            .unwrap_or_else(|e| {
                warn!(error = %e, "gateway: failed to persist inbound message (swallowed)");
                0
            });

        // C9 pending-confirmation check.
        match self.store.state.current_pending(&msg.user_id) {
            Ok(Some(pending)) if pending.state == PendingState::Pending => {
                self.handle_pending_reply(&msg, &text, pending.kind, pending.expires_at).await;
                return;
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "gateway: pending-action lookup failed"),
        }

        let reply = self.run_pipeline(&msg, &text).await;

        self.store
            .memory
            .append_conversation(&msg.chat_id, Role::Assistant, &reply)
            .unwrap_or_else(|e| {
                warn!(error = %e, "gateway: failed to persist outbound reply (swallowed)");
                0
            });

        self.reply(msg.platform, &msg.chat_id, &reply).await;
    }
}

impl AppState {
    async fn handle_pending_reply(
        &self,
        msg: &InboundMessage,
        text: &str,
        kind: String,
        expires_at: chrono::DateTime<chrono::Utc>,
    ) {
        let lower = text.trim().to_lowercase();
        if YES_WORDS.contains(&lower.as_str()) {
            match self.actions.confirm(&msg.user_id).await {
                Ok(action) => {
                    let body = status::complete(&format!("{} confirmed", action.kind), None, msg.platform);
                    self.reply(msg.platform, &msg.chat_id, &body).await;
                }
                Err(e) => {
                    let body = status::failed(&e.to_string(), "ActionError", msg.platform);
                    self.reply(msg.platform, &msg.chat_id, &body).await;
                }
            }
            return;
        }

        if NO_WORDS.contains(&lower.as_str()) {
            match self.actions.reject(&msg.user_id).await {
                Ok(_) => {
                    let body = status::info("Cancelled.", msg.platform);
                    self.reply(msg.platform, &msg.chat_id, &body).await;
                }
                Err(e) => {
                    let body = status::failed(&e.to_string(), "ActionError", msg.platform);
                    self.reply(msg.platform, &msg.chat_id, &body).await;
                }
            }
            return;
        }

        // Unrelated message while PENDING: remind, don't auto-reject (spec.md §4.9).
        let remaining = (expires_at - chrono::Utc::now()).num_seconds().max(0);
        let body = status::approval_needed(&kind, "awaiting your confirmation", remaining, msg.platform);
        self.reply(msg.platform, &msg.chat_id, &body).await;
    }

    /// C8 (rewrite) → C7 (skill dispatch) → else C5 (context) → C4 (AI router).
    async fn run_pipeline(&self, msg: &InboundMessage, text: &str) -> String {
        let ctx = SkillContext {
            user_id: msg.user_id.clone(),
            chat_id: msg.chat_id.clone(),
            raw_text: text.to_string(),
        };

        let command = nlp::rewrite(text, &ctx);

        if let Some(response) = self.skills.dispatch(&command, &ctx) {
            return response.message;
        }

        match self.context_engine.build(&msg.user_id, msg.platform, &msg.chat_id).await {
            Ok(context) => {
                let system = steward_memory::format_for_system_prompt(&context);
                match self.provider.chat_with_context(text, Some(&system), None).await {
                    Ok(resp) => resp.text,
                    Err(e) => status::failed(&e.to_string(), provider_error_category(&e), msg.platform),
                }
            }
            Err(e) => {
                warn!(error = %e, "gateway: context build failed, calling AI without context");
                match self.provider.chat(text).await {
                    Ok(resp) => resp.text,
                    Err(e) => status::failed(&e.to_string(), provider_error_category(&e), msg.platform),
                }
            }
        }
    }
}

fn provider_error_category(e: &steward_provider::ProviderError) -> &'static str {
    use steward_provider::ProviderError;
    match e {
        ProviderError::RateLimited { .. } | ProviderError::Transient(_) | ProviderError::Http(_) => {
            "ProviderTransient"
        }
        ProviderError::Api { .. } | ProviderError::Parse(_) | ProviderError::Unavailable(_) => "ProviderFatal",
    }
}

/// Reject an `InboundMessage` with an unrecognized user, used by webhook
/// routes that construct messages from sources without platform-native
/// allowlisting (the primary adapter already enforces this itself).
pub fn authorized(config: &StewardConfig, user_id: &UserId) -> bool {
    config.authorized_users.iter().any(|u| u == "*" || u == user_id.as_str())
}

/// Assemble the full Axum router — spec.md §4.13's path table.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route("/webhook", post(crate::http::webhooks::secondary_webhook_handler))
        .route("/telegram", post(crate::http::webhooks::telegram_webhook_handler))
        .route("/github-webhook", post(crate::http::webhooks::github_webhook_handler))
        .route("/voice/{*path}", post(crate::http::webhooks::voice_handler))
        .route("/api/{*path}", get(crate::http::webhooks::api_handler))
        .route("/api/{*path}", post(crate::http::webhooks::api_handler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
