use tracing::debug;

use crate::types::{Response, Skill, SkillContext};

/// Sorted-by-priority dispatcher — spec.md §4.7 steps 1-3.
pub struct SkillRegistry {
    skills: Vec<Skill>,
}

impl SkillRegistry {
    pub fn new(mut skills: Vec<Skill>) -> Self {
        // Descending priority, stable tie-break by name (sort_by_key is stable
        // so equal-priority entries keep their discovery order; sort twice —
        // first by name ascending, then by priority descending — to land on
        // "ties broken by name" deterministically).
        skills.sort_by(|a, b| a.name().cmp(b.name()));
        skills.sort_by(|a, b| b.priority().cmp(&a.priority()));
        Self { skills }
    }

    pub fn skills(&self) -> &[Skill] {
        &self.skills
    }

    /// Returns `None` if no skill handles the command — the sentinel that
    /// tells the caller to fall back to C5→C4 (context engine, then AI).
    pub fn dispatch(&self, command: &str, ctx: &SkillContext) -> Option<Response> {
        for skill in &self.skills {
            if skill.can_handle(command, ctx) {
                debug!(skill = skill.name(), command, "dispatching to skill");
                return Some(skill.execute(command, ctx));
            }
        }
        None
    }
}
