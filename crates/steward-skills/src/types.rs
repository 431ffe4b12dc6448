use serde::{Deserialize, Serialize};
use steward_core::types::UserId;

/// One pattern a skill's `SKILL.toml` manifest declares — spec.md §4.7.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CommandSpec {
    pub pattern: String,
    pub description: String,
    pub usage: String,
}

/// Declarative `SKILL.toml` front matter, loaded by dual-path discovery.
/// The `execute`/`canHandle` behavior comes from a compiled `SkillHandler`
/// matched to this manifest by `name` — manifests describe what a skill is,
/// handlers implement what it does.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SkillManifest {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub commands: Vec<CommandSpec>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

/// Context passed to `execute`/`canHandle` — whatever a skill needs to know
/// about who's asking and where.
#[derive(Debug, Clone)]
pub struct SkillContext {
    pub user_id: UserId,
    pub chat_id: steward_core::types::ChatId,
    pub raw_text: String,
}

/// `{ok|err, message, data?, meta?}` — spec.md §4.7. `message` is the
/// user-visible text; side effects happen before `execute` returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub ok: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
}

impl Response {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
            data: None,
            meta: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
            data: None,
            meta: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Compiled behavior for a skill — matched to its `SkillManifest` by name.
pub trait SkillHandler: Send + Sync {
    fn execute(&self, command: &str, ctx: &SkillContext) -> Response;

    /// Default: true if any of the manifest's patterns match `command`.
    /// Patterns are treated as case-insensitive substrings; a handler can
    /// override this for real pattern matching (regex, fuzzy, etc).
    fn can_handle(&self, command: &str, manifest: &SkillManifest, _ctx: &SkillContext) -> bool {
        let lower = command.to_lowercase();
        manifest
            .commands
            .iter()
            .any(|c| lower.contains(&c.pattern.to_lowercase()))
    }
}

/// A manifest paired with its compiled handler — the unit the registry
/// dispatches over.
pub struct Skill {
    pub manifest: SkillManifest,
    pub handler: std::sync::Arc<dyn SkillHandler>,
}

impl Skill {
    pub fn new(manifest: SkillManifest, handler: std::sync::Arc<dyn SkillHandler>) -> Self {
        Self { manifest, handler }
    }

    pub fn name(&self) -> &str {
        &self.manifest.name
    }

    pub fn priority(&self) -> i32 {
        self.manifest.priority
    }

    pub fn can_handle(&self, command: &str, ctx: &SkillContext) -> bool {
        self.handler.can_handle(command, &self.manifest, ctx)
    }

    pub fn execute(&self, command: &str, ctx: &SkillContext) -> Response {
        self.handler.execute(command, ctx)
    }
}
