use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use tracing::{info, warn};

use steward_channels::InboundSink;
use steward_core::types::InboundMessage;

mod app;
mod http;
mod jobs;
mod status;

/// Channel adapters need an `Arc<dyn InboundSink>` before `AppState` exists
/// (the adapters are built first so `ChannelManager` can be handed to
/// `AppState::new`). This breaks that cycle: adapters hold an
/// `Arc<LateBoundSink>` and every `handle()` call forwards to whatever was
/// installed in the `OnceLock` once startup finishes.
#[derive(Default)]
struct LateBoundSink(OnceLock<Arc<dyn InboundSink>>);

impl LateBoundSink {
    fn set(&self, sink: Arc<dyn InboundSink>) {
        let _ = self.0.set(sink);
    }
}

#[async_trait]
impl InboundSink for LateBoundSink {
    async fn handle(&self, msg: InboundMessage) {
        match self.0.get() {
            Some(sink) => sink.handle(msg).await,
            None => warn!("inbound message dropped: gateway not fully started"),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "steward_gateway=info,tower_http=debug".into()),
        )
        .init();

    let config_path = std::env::var("STEWARD_CONFIG").ok();
    let config = steward_core::config::StewardConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        warn!("config load failed ({e}), using defaults");
        steward_core::config::StewardConfig::default()
    });

    let store = Arc::new(steward_store::Store::open(
        &config.database.memory_db_path,
        &config.database.state_db_path,
    )?);
    let state_store = Arc::clone(&store.state);

    let registry = Arc::new(steward_registry::ChatRegistry::load(Arc::clone(&state_store))?);
    let outcomes = Arc::new(steward_outcomes::OutcomeTracker::new(Arc::clone(&state_store)));
    let context_engine = Arc::new(steward_memory::ContextEngine::new(
        Arc::clone(&store),
        Arc::clone(&registry),
        None,
    ));

    let anthropic_key = config.provider_api_keys.get("anthropic").cloned().unwrap_or_default();
    let default_model = "claude-3-5-sonnet-latest".to_string();

    let runtime_router = steward_provider::ProviderRouter::new(vec![
        steward_provider::ProviderSlot::new(Box::new(steward_provider::anthropic::AnthropicProvider::new(
            anthropic_key.clone(),
            None,
        ))),
        steward_provider::ProviderSlot::new(Box::new(steward_provider::ollama::OllamaProvider::new(None))),
    ]);
    let cache = Arc::new(steward_provider::LruTtlCache::new(
        config.cache.enabled,
        config.cache.ttl_seconds,
        config.cache.max_size,
    ));
    let provider = Arc::new(steward_provider::AgentRuntime::new(runtime_router, cache, default_model.clone()));

    let planner_router = Arc::new(steward_provider::ProviderRouter::new(vec![
        steward_provider::ProviderSlot::new(Box::new(steward_provider::anthropic::AnthropicProvider::new(anthropic_key, None))),
    ]));

    // No `SkillHandler` implementations are bundled in this build — the
    // registry starts empty and every command falls through to C5→C4.
    let skills = Arc::new(steward_skills::SkillRegistry::new(Vec::new()));

    let actions = Arc::new(steward_actions::ActionController::new(
        Arc::clone(&state_store),
        Arc::clone(&outcomes),
        HashMap::new(),
        HashSet::new(),
    ));

    let alerts = Arc::new(steward_alerts::AlertManager::new(
        Arc::clone(&state_store),
        Arc::new(steward_alerts::NullSink),
        steward_alerts::DndWindow::default(),
    ));

    let github_token = config.platform_tokens.get("github").cloned().unwrap_or_default();
    let repo_provider: Arc<dyn steward_planner::RepoProvider> =
        Arc::new(steward_planner::GithubRepoProvider::new(reqwest::Client::new(), github_token));
    let planner = Arc::new(steward_planner::PlanExecutor::new(
        Arc::clone(&state_store),
        Arc::clone(&outcomes),
        planner_router,
        repo_provider,
        default_model,
    ));

    let late_sink: Arc<LateBoundSink> = Arc::new(LateBoundSink::default());

    let mut manager = steward_channels::ChannelManager::new();
    if let Some(token) = config.platform_tokens.get("primary") {
        manager.register(Arc::new(steward_channels::primary::PrimaryAdapter::new(
            token,
            config.channels.primary.clone(),
            config.authorized_users.clone(),
            Arc::clone(&late_sink) as Arc<dyn InboundSink>,
        )));
    }
    if config.channels.secondary.base_url.is_some() {
        match steward_channels::secondary::SecondaryAdapter::new(
            config.channels.secondary.clone(),
            config.platform_tokens.get("secondary").cloned(),
        ) {
            Ok(adapter) => manager.register(Arc::new(adapter)),
            Err(e) => warn!("secondary channel not registered: {e}"),
        }
    }
    let channels = Arc::new(manager);

    let scheduler_conn = rusqlite::Connection::open(&config.database.state_db_path)?;
    let scheduler = Arc::new(steward_scheduler::SchedulerHandle::new(scheduler_conn)?);
    if scheduler.list_jobs()?.is_empty() {
        steward_scheduler::register_default_jobs(&scheduler, 2)?;
    }

    let state = Arc::new(app::AppState::new(
        config.clone(),
        Arc::clone(&store),
        registry,
        context_engine,
        outcomes,
        provider,
        skills,
        actions,
        Arc::clone(&alerts),
        planner,
        Arc::clone(&scheduler),
        Arc::clone(&channels),
    ));
    late_sink.set(Arc::clone(&state) as Arc<dyn InboundSink>);

    channels.connect_all().await;

    let mut handler_registry = steward_scheduler::HandlerRegistry::new();
    jobs::register_handlers(&mut handler_registry, Arc::clone(&channels), alerts);

    let scheduler_conn2 = rusqlite::Connection::open(&config.database.state_db_path)?;
    let engine = steward_scheduler::SchedulerEngine::new(scheduler_conn2, None, handler_registry)?;
    let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(engine.run(shutdown_rx));

    let bind = config.gateway.bind.clone();
    let port = config.gateway.port;
    let router = app::build_router(state);

    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    info!("steward gateway listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
