use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The six named phases of plan execution — spec.md §4.10.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    AnalyzePlan,
    ReadProjectFiles,
    GenerateCode,
    CreateBranch,
    CommitChanges,
    CreatePr,
}

impl Phase {
    pub fn label(&self) -> &'static str {
        match self {
            Phase::AnalyzePlan => "Analyze plan",
            Phase::ReadProjectFiles => "Read project files",
            Phase::GenerateCode => "Generate code",
            Phase::CreateBranch => "Create branch",
            Phase::CommitChanges => "Commit changes",
            Phase::CreatePr => "Create PR",
        }
    }
}

/// Emitted on every phase transition, and at most every 30s within a long
/// phase (phase 3's file-by-file updates are throttled to this cadence).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub plan_id: String,
    pub phase: Phase,
    pub message: String,
    /// Set only for within-phase updates (e.g. "3/7 files generated").
    pub detail: Option<String>,
}

/// Decouples the planner from C14/the channel layer: whoever drives a plan
/// supplies a sink that renders `ProgressEvent`s into whatever form the
/// user's chat expects.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn emit(&self, event: ProgressEvent);
}

/// A no-op sink for callers that don't want progress delivery (tests,
/// autonomous runs with no attached chat).
pub struct NullSink;

#[async_trait]
impl ProgressSink for NullSink {
    async fn emit(&self, _event: ProgressEvent) {}
}

/// One file this plan intends to touch, produced by phase 1 and filled in
/// by phase 3.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileChange {
    pub path: String,
    pub original: Option<String>,
    pub new_content: String,
}
