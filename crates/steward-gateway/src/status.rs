//! Status messenger (C14) — spec.md §4.14.
//!
//! Stateless formatters, one per status kind. Every rendered message has the
//! same shape: a bold header, an indented body, and an optional trailing
//! metadata line (cost estimate, ETA, next steps). Bold only renders where
//! the platform supports markdown; [`Platform::Voice`] always gets plain text
//! since it's read aloud, not displayed.

use steward_core::types::Platform;

fn bold(header: &str, platform: Platform) -> String {
    match platform {
        Platform::Voice => header.to_string(),
        Platform::Primary | Platform::Secondary => format!("*{header}*"),
    }
}

fn render(header: &str, body: &str, meta: Option<&str>, platform: Platform) -> String {
    let mut out = format!("{}\n  {}", bold(header, platform), body);
    if let Some(m) = meta {
        out.push_str("\n  ");
        out.push_str(m);
    }
    out
}

/// An action is awaiting user confirmation (C9 `PENDING`).
pub fn approval_needed(action_kind: &str, summary: &str, expires_in_secs: i64, platform: Platform) -> String {
    render(
        "Approval needed",
        &format!("{action_kind}: {summary}"),
        Some(&format!("Expires in {expires_in_secs}s — reply yes/no.")),
        platform,
    )
}

/// Work has started but has no incremental progress yet.
pub fn working(activity: &str, platform: Platform) -> String {
    render("Working", activity, None, platform)
}

/// An incremental update within a long-running operation (C10's phases).
pub fn progress(phase_label: &str, detail: Option<&str>, platform: Platform) -> String {
    render("In progress", phase_label, detail, platform)
}

/// A terminal success result.
pub fn complete(summary: &str, result_link: Option<&str>, platform: Platform) -> String {
    render("Complete", summary, result_link, platform)
}

/// A terminal failure result — `category` is a `StewardError::category()` string.
pub fn failed(reason: &str, category: &str, platform: Platform) -> String {
    render("Failed", reason, Some(&format!("category: {category}")), platform)
}

/// A one-off informational message with no lifecycle (e.g. a reminder fire).
pub fn info(message: &str, platform: Platform) -> String {
    render("Info", message, None, platform)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_gets_bold_header() {
        let s = working("fetching project status", Platform::Primary);
        assert!(s.starts_with("*Working*"));
        assert!(s.contains("fetching project status"));
    }

    #[test]
    fn voice_gets_plain_header() {
        let s = working("fetching project status", Platform::Voice);
        assert!(s.starts_with("Working\n"));
        assert!(!s.contains('*'));
    }

    #[test]
    fn approval_needed_includes_expiry() {
        let s = approval_needed("deploy", "push to prod", 300, Platform::Primary);
        assert!(s.contains("Expires in 300s"));
    }

    #[test]
    fn failed_includes_category() {
        let s = failed("provider timed out", "ProviderTransient", Platform::Secondary);
        assert!(s.contains("category: ProviderTransient"));
    }
}
