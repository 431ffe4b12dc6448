use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use steward_core::types::{sortable_id, UserId};
use steward_outcomes::OutcomeTracker;
use steward_provider::{ChatRequest, ProviderRouter, TaskClass};
use steward_store::types::{FileOp, FileOpKind, Plan};
use steward_store::StateStore;
use tracing::{info, warn};

use crate::error::{PlannerError, Result};
use crate::repo::RepoProvider;
use crate::types::{FileChange, Phase, ProgressEvent, ProgressSink};

/// Within-phase progress updates are throttled to this cadence — spec.md §4.10.
const PROGRESS_THROTTLE: Duration = Duration::from_secs(30);

pub struct PlanExecutor {
    store: Arc<StateStore>,
    outcomes: Arc<OutcomeTracker>,
    router: Arc<ProviderRouter>,
    repo: Arc<dyn RepoProvider>,
    model: String,
}

impl PlanExecutor {
    pub fn new(
        store: Arc<StateStore>,
        outcomes: Arc<OutcomeTracker>,
        router: Arc<ProviderRouter>,
        repo: Arc<dyn RepoProvider>,
        model: String,
    ) -> Self {
        Self { store, outcomes, router, repo, model }
    }

    /// Runs all six phases for one instruction, persisting a `Plan` row
    /// throughout and recording a C6 outcome for the whole run.
    pub async fn run(
        &self,
        user_id: &UserId,
        project: &str,
        instruction: &str,
        sink: &dyn ProgressSink,
    ) -> Result<Plan> {
        let plan_id = sortable_id();
        let action_id = self
            .outcomes
            .start_action("plan", &format!("plan {plan_id} for {project}"))
            .ok();

        let mut plan = Plan {
            id: plan_id.clone(),
            user_id: user_id.clone(),
            instruction_text: instruction.to_string(),
            target_project: project.to_string(),
            file_ops: Vec::new(),
            status: "analyzing".to_string(),
            created_at: Utc::now(),
            pr_url: None,
        };
        self.store.save_plan(&plan)?;

        let result = self.run_phases(&plan_id, project, instruction, &mut plan, sink).await;

        match &result {
            Ok(()) => {
                plan.status = "complete".to_string();
                self.store.save_plan(&plan)?;
                if let Some(id) = &action_id {
                    self.outcomes
                        .complete_action(
                            id,
                            steward_store::types::OutcomeResult::Success,
                            plan.pr_url.as_deref().unwrap_or(""),
                        )
                        .ok();
                }
            }
            Err(e) => {
                plan.status = "failed".to_string();
                self.store.save_plan(&plan)?;
                if let Some(id) = &action_id {
                    self.outcomes
                        .complete_action(id, steward_store::types::OutcomeResult::Failed, &e.to_string())
                        .ok();
                }
            }
        }
        result.map(|()| plan)
    }

    async fn run_phases(
        &self,
        plan_id: &str,
        project: &str,
        instruction: &str,
        plan: &mut Plan,
        sink: &dyn ProgressSink,
    ) -> Result<()> {
        emit(sink, plan_id, Phase::AnalyzePlan, "classifying instruction", None).await;
        let paths = self.analyze(instruction).await?;
        if paths.is_empty() {
            return Err(PlannerError::Analysis("no file operations could be enumerated".to_string()));
        }

        emit(sink, plan_id, Phase::ReadProjectFiles, "fetching files to modify", None).await;
        let mut changes = Vec::with_capacity(paths.len());
        for path in &paths {
            let original = self.repo.read_file(project, path).await.ok();
            changes.push(FileChange { path: path.clone(), original, new_content: String::new() });
        }

        emit(sink, plan_id, Phase::GenerateCode, "generating code", None).await;
        let mut last_progress = Instant::now() - PROGRESS_THROTTLE;
        for (i, change) in changes.iter_mut().enumerate() {
            change.new_content = self.generate(instruction, &change.path, change.original.as_deref()).await?;
            if last_progress.elapsed() >= PROGRESS_THROTTLE || i == changes.len() - 1 {
                emit(
                    sink,
                    plan_id,
                    Phase::GenerateCode,
                    "generating code",
                    Some(format!("{}/{} files generated", i + 1, changes.len())),
                )
                .await;
                last_progress = Instant::now();
            }
        }

        plan.file_ops = changes
            .iter()
            .map(|c| FileOp {
                op: if c.original.is_some() { FileOpKind::Write } else { FileOpKind::Create },
                path: c.path.clone(),
                content_ref: None,
            })
            .collect();
        plan.status = "generated".to_string();
        self.store.save_plan(plan)?;

        let slug = slugify(instruction);
        let branch = format!("{slug}-{}", &sortable_id()[..8]);
        let base = self.repo.default_branch(project).await.map_err(PlannerError::Repo)?;

        emit(sink, plan_id, Phase::CreateBranch, &format!("creating branch {branch}"), None).await;
        if let Err(e) = self.repo.create_branch(project, &base, &branch).await {
            return Err(PlannerError::Repo(e));
        }

        emit(sink, plan_id, Phase::CommitChanges, "pushing changes", None).await;
        let files: Vec<(String, String)> =
            changes.iter().map(|c| (c.path.clone(), c.new_content.clone())).collect();
        if let Err(e) = self.repo.commit_files(project, &branch, &files, instruction).await {
            self.rollback(project, &branch).await;
            return Err(PlannerError::Repo(e));
        }

        emit(sink, plan_id, Phase::CreatePr, "opening pull request", None).await;
        let title = format!("{}: {}", slug, truncate(instruction, 60));
        let body = format!("Automated change.\n\n{instruction}");
        match self.repo.open_pr(project, &branch, &base, &title, &body).await {
            Ok(url) => {
                plan.pr_url = Some(url);
                Ok(())
            }
            Err(e) => {
                self.rollback(project, &branch).await;
                Err(PlannerError::Repo(e))
            }
        }
    }

    async fn rollback(&self, project: &str, branch: &str) {
        warn!(project, branch, "rolling back created branch after failure");
        if let Err(e) = self.repo.delete_branch(project, branch).await {
            warn!(project, branch, error = %e, "rollback failed, partial remote state remains");
        }
    }

    /// Phase 1: cheap heuristic instead of another AI round-trip — classify
    /// the instruction and enumerate candidate paths it mentions.
    async fn analyze(&self, instruction: &str) -> Result<Vec<String>> {
        Ok(instruction
            .split_whitespace()
            .filter(|tok| tok.contains('/') || tok.contains('.'))
            .map(|tok| tok.trim_matches(|c: char| !c.is_alphanumeric() && c != '/' && c != '.' && c != '_' && c != '-'))
            .filter(|tok| !tok.is_empty())
            .map(|tok| tok.to_string())
            .collect())
    }

    async fn generate(&self, instruction: &str, path: &str, original: Option<&str>) -> Result<String> {
        let system = format!(
            "You are editing the file `{path}` in a software repository. \
             Return only the complete new file content, no commentary."
        );
        let prompt = match original {
            Some(src) => format!("Instruction: {instruction}\n\nCurrent content of {path}:\n{src}"),
            None => format!("Instruction: {instruction}\n\nCreate new file {path}."),
        };
        let req = ChatRequest { model: self.model.clone(), prompt, system: Some(system), max_tokens: 8192 };
        let resp = self.router.call(TaskClass::Coding, &req).await?;
        info!(path, tokens = resp.tokens, "generated file content");
        Ok(resp.text)
    }
}

async fn emit(sink: &dyn ProgressSink, plan_id: &str, phase: Phase, message: &str, detail: Option<String>) {
    sink.emit(ProgressEvent {
        plan_id: plan_id.to_string(),
        phase,
        message: message.to_string(),
        detail,
    })
    .await;
}

fn slugify(text: &str) -> String {
    let mut out = String::new();
    for ch in text.chars().take(40) {
        if ch.is_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    out.trim_matches('-').to_string()
}

fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        text.to_string()
    } else {
        format!("{}...", &text[..max])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_lowercases_and_collapses_punctuation() {
        assert_eq!(slugify("Fix the Login Bug!!"), "fix-the-login-bug");
    }

    #[test]
    fn slugify_caps_length() {
        let long = "a ".repeat(100);
        assert!(slugify(&long).len() <= 40);
    }

    #[test]
    fn truncate_leaves_short_text_untouched() {
        assert_eq!(truncate("short", 60), "short");
    }

    #[test]
    fn truncate_adds_ellipsis_past_max() {
        let text = "x".repeat(100);
        let truncated = truncate(&text, 10);
        assert_eq!(truncated, format!("{}...", "x".repeat(10)));
    }
}
