use crate::provider::TaskClass;

const GREETINGS: &[&str] = &[
    "hi", "hello", "hey", "yo", "sup", "morning", "good morning", "good evening", "good night",
    "gm", "gn", "howdy",
];

const PLANNING_WORDS: &[&str] = &[
    "plan", "schedule", "roadmap", "milestone", "timeline", "strategy", "break down", "break this down",
];

const CODING_WORDS: &[&str] = &[
    "code", "bug", "function", "compile", "error", "stack trace", "refactor", "implement", "pr",
    "pull request", "commit", "diff", "test fail", "exception", "repo", "branch",
];

const SOCIAL_WORDS: &[&str] = &[
    "feel", "feeling", "tired", "stressed", "happy", "sad", "lonely", "proud", "worried", "excited",
];

const RESEARCH_WORDS: &[&str] = &[
    "research", "compare", "what is the difference", "pros and cons", "summarize", "look up", "find out",
    "investigate",
];

const COMPLEX_WORDS: &[&str] = &[
    "architecture", "design doc", "tradeoff", "trade-off", "migrate", "migration", "multi-step",
    "end to end", "end-to-end",
];

/// Keyword-heuristic classifier — spec.md §4.4 step 1. Greetings and very
/// short inputs (≤3 tokens) classify as `Simple` regardless of content.
pub fn classify(query: &str) -> TaskClass {
    let normalized = query.trim().to_lowercase();
    if normalized.is_empty() {
        return TaskClass::Simple;
    }

    if GREETINGS.iter().any(|g| normalized == *g || normalized.starts_with(g)) {
        return TaskClass::Greeting;
    }

    let token_count = normalized.split_whitespace().count();
    if token_count <= 3 {
        return TaskClass::Simple;
    }

    if contains_any(&normalized, COMPLEX_WORDS) {
        return TaskClass::Complex;
    }
    if contains_any(&normalized, CODING_WORDS) {
        return TaskClass::Coding;
    }
    if contains_any(&normalized, PLANNING_WORDS) {
        return TaskClass::Planning;
    }
    if contains_any(&normalized, RESEARCH_WORDS) {
        return TaskClass::Research;
    }
    if contains_any(&normalized, SOCIAL_WORDS) {
        return TaskClass::Social;
    }

    TaskClass::Simple
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greeting_classifies_as_greeting() {
        assert_eq!(classify("hey there"), TaskClass::Greeting);
        assert_eq!(classify("Good morning!"), TaskClass::Greeting);
    }

    #[test]
    fn short_input_classifies_as_simple() {
        assert_eq!(classify("what time"), TaskClass::Simple);
    }

    #[test]
    fn coding_keywords_classify_as_coding() {
        assert_eq!(
            classify("can you fix this bug in the function, it won't compile"),
            TaskClass::Coding
        );
    }

    #[test]
    fn planning_keywords_classify_as_planning() {
        assert_eq!(
            classify("help me build a roadmap for next quarter's milestones"),
            TaskClass::Planning
        );
    }

    #[test]
    fn complex_keywords_take_priority_over_coding() {
        assert_eq!(
            classify("what's the right architecture tradeoff for this migration of the service"),
            TaskClass::Complex
        );
    }

    #[test]
    fn empty_query_classifies_as_simple() {
        assert_eq!(classify("   "), TaskClass::Simple);
    }
}
