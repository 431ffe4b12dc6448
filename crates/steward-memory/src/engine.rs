use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{Datelike, Utc};
use steward_core::types::{ChatId, Platform, UserId};
use steward_registry::ChatRegistry;
use steward_store::Store;
use tracing::debug;

use crate::error::Result;
use crate::types::{Context, ProjectSummary, ProjectSummarySource};

const MAX_CONVERSATION_ENTRIES: u32 = 15;
const MAX_USER_FACTS: u32 = 20;
const MAX_OUTCOMES: u32 = 8;
const MAX_PLANS: u32 = 5;
const PROJECT_CACHE_TTL: Duration = Duration::from_secs(60 * 60);
/// Rendered system-prompt text is capped at roughly this many characters
/// (~1500 tokens) — spec.md §4.5.
const MAX_RENDERED_CHARS: usize = 6000;

/// Builds and renders `Context` — spec.md §4.5. Constructed per AI call,
/// never cached itself; the one piece of state it owns is the 60-minute
/// project-summary cache, since fetching that is the only expensive part.
pub struct ContextEngine {
    store: Arc<Store>,
    registry: Arc<ChatRegistry>,
    project_source: Option<Arc<dyn ProjectSummarySource>>,
    project_cache: Mutex<HashMap<String, (ProjectSummary, Instant)>>,
}

impl ContextEngine {
    pub fn new(
        store: Arc<Store>,
        registry: Arc<ChatRegistry>,
        project_source: Option<Arc<dyn ProjectSummarySource>>,
    ) -> Self {
        Self {
            store,
            registry,
            project_source,
            project_cache: Mutex::new(HashMap::new()),
        }
    }

    pub async fn build(&self, user_id: &UserId, platform: Platform, chat_id: &ChatId) -> Result<Context> {
        let now = Utc::now();
        let chat_binding = self.registry.lookup(platform, chat_id);

        let user_facts = self.store.memory.facts_for_user(user_id, MAX_USER_FACTS)?;
        let conversation = self.store.memory.recent_conversation(chat_id, MAX_CONVERSATION_ENTRIES)?;
        let outcomes = self.store.state.recent_outcomes_for_user(user_id, MAX_OUTCOMES)?;
        let plans = self.store.state.recent_plans_for_user(user_id, MAX_PLANS)?;

        let project_summary = match &chat_binding {
            Some(b) => self.project_summary(&b.value).await,
            None => None,
        };

        Ok(Context {
            now,
            day_of_week: now.weekday().to_string(),
            chat_binding,
            user_facts,
            project_summary,
            outcomes,
            plans,
            conversation,
        })
    }

    async fn project_summary(&self, project: &str) -> Option<ProjectSummary> {
        let source = self.project_source.as_ref()?;

        if let Some((summary, fetched_at)) = self.project_cache.lock().unwrap().get(project) {
            if fetched_at.elapsed() < PROJECT_CACHE_TTL {
                return Some(summary.clone());
            }
        }

        match source.summary(project).await {
            Ok(summary) => {
                self.project_cache
                    .lock()
                    .unwrap()
                    .insert(project.to_string(), (summary.clone(), Instant::now()));
                Some(summary)
            }
            Err(err) => {
                debug!(project, error = %err, "failed to fetch project summary");
                None
            }
        }
    }
}

/// Renders a `Context` into the fixed-order system-prompt text block —
/// spec.md §4.5: time → chat-binding → user-facts → project → outcomes →
/// history. Sections are dropped from the bottom (history first, then
/// outcomes) if the rendered text would exceed the cap.
pub fn format_for_system_prompt(ctx: &Context) -> String {
    let sections = [
        render_time(ctx),
        render_chat_binding(ctx),
        render_user_facts(ctx),
        render_project(ctx),
        render_outcomes(ctx),
        render_history(ctx),
    ];

    let mut kept: Vec<&str> = sections.iter().filter(|s| !s.is_empty()).map(|s| s.as_str()).collect();

    loop {
        let rendered = kept.join("\n\n");
        if rendered.len() <= MAX_RENDERED_CHARS || kept.len() <= 1 {
            return rendered;
        }
        // history is last, outcomes second-to-last — drop from the bottom.
        kept.pop();
    }
}

fn render_time(ctx: &Context) -> String {
    format!(
        "## Current time\n{} ({})",
        ctx.now.to_rfc3339(),
        ctx.day_of_week
    )
}

fn render_chat_binding(ctx: &Context) -> String {
    match &ctx.chat_binding {
        Some(b) => format!(
            "## Chat\ntype={} value={} notifications={}",
            b.binding_type, b.value, b.notification_level
        ),
        None => String::new(),
    }
}

fn render_user_facts(ctx: &Context) -> String {
    if ctx.user_facts.is_empty() {
        return String::new();
    }
    let mut out = String::from("## Known facts\n");
    for fact in &ctx.user_facts {
        out.push_str(&format!("- {}: {}\n", fact.key, fact.value));
    }
    out
}

fn render_project(ctx: &Context) -> String {
    match &ctx.project_summary {
        Some(p) => {
            let mut out = format!("## Active project\n{}\n", p.summary);
            if !p.open_prs.is_empty() {
                out.push_str("Open PRs:\n");
                for pr in &p.open_prs {
                    out.push_str(&format!("- {pr}\n"));
                }
            }
            out
        }
        None => String::new(),
    }
}

fn render_outcomes(ctx: &Context) -> String {
    if ctx.outcomes.is_empty() {
        return String::new();
    }
    let mut out = String::from("## Recent outcomes\n");
    for o in &ctx.outcomes {
        let result = o
            .result
            .map(|r| r.to_string())
            .unwrap_or_else(|| "in progress".to_string());
        out.push_str(&format!("- {} ({}): {}\n", o.kind, result, o.details));
    }
    out
}

fn render_history(ctx: &Context) -> String {
    if ctx.conversation.is_empty() {
        return String::new();
    }
    let mut out = String::from("## Conversation history\n");
    for entry in &ctx.conversation {
        out.push_str(&format!("{}: {}\n", entry.role, entry.text));
    }
    out
}
