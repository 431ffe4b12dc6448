use async_trait::async_trait;
use chrono::{DateTime, Utc};
use steward_store::types::{ChatBinding, ConversationEntry, Outcome, Plan, UserFact};

/// TODO-extract + open-PR summary for the project bound to a chat —
/// spec.md §4.5. Fetched by a `ProjectSummarySource` and cached 60 minutes
/// by the `ContextEngine`, since the engine itself is never cached.
#[derive(Debug, Clone)]
pub struct ProjectSummary {
    pub summary: String,
    pub open_prs: Vec<String>,
}

/// Supplies the project summary section — implemented by whatever has repo
/// access (the planner, or a thin client over the repo provider). Kept as a
/// trait so the context engine has no direct dependency on repo I/O.
#[async_trait]
pub trait ProjectSummarySource: Send + Sync {
    async fn summary(&self, project: &str) -> Result<ProjectSummary, String>;
}

/// Everything the AI needs to answer one message — spec.md §4.5. Built fresh
/// per call; never cached across calls (the underlying data is cached by its
/// own owners: the project summary here, the AI response cache in C4).
#[derive(Debug, Clone)]
pub struct Context {
    pub now: DateTime<Utc>,
    pub day_of_week: String,
    pub chat_binding: Option<ChatBinding>,
    pub user_facts: Vec<UserFact>,
    pub project_summary: Option<ProjectSummary>,
    pub outcomes: Vec<Outcome>,
    pub plans: Vec<Plan>,
    pub conversation: Vec<ConversationEntry>,
}
