use crate::types::SkillContext;

const GREETINGS: &[&str] = &["hi", "hello", "hey", "yo", "good morning", "good evening"];

const CODING_VERBS: &[&str] = &["add", "make", "fix", "implement", "refactor", "remove", "update"];

const COMPONENT_NOUNS: &[&str] = &[
    "function", "endpoint", "route", "button", "component", "test", "bug", "feature", "page",
];

/// One phrasing → canonical-command translation rule, tried in order.
struct Rule {
    contains: &'static str,
    template: fn(&str) -> String,
}

fn rules() -> &'static [Rule] {
    &[
        Rule {
            contains: "what's left on",
            template: |text| format!("project status {}", after(text, "what's left on")),
        },
        Rule {
            contains: "whats left on",
            template: |text| format!("project status {}", after(text, "whats left on")),
        },
        Rule {
            contains: "how's",
            template: |text| format!("project status {}", after(text, "how's")),
        },
        Rule {
            contains: "status of",
            template: |text| format!("project status {}", after(text, "status of")),
        },
        Rule {
            contains: "remind me to",
            template: |text| format!("task create {}", after(text, "remind me to")),
        },
        Rule {
            contains: "mark",
            template: |text| {
                let rest = after(text, "mark");
                format!("task complete {}", rest.trim_end_matches("as done").trim())
            },
        },
    ]
}

fn after<'a>(text: &'a str, marker: &str) -> &'a str {
    text.find(marker)
        .map(|i| text[i + marker.len()..].trim())
        .unwrap_or(text)
}

/// Translates natural phrasing into canonical skill commands — spec.md §4.8.
/// Rules are tried first so a known phrasing like "what's left on project-x"
/// rewrites even though it also reads as a question; only once no rule
/// matches do the passthrough guards (greeting, question, coding request)
/// kick in and return the text unchanged.
pub fn rewrite(text: &str, _ctx: &SkillContext) -> String {
    let normalized = text.trim().to_lowercase();

    for rule in rules() {
        if normalized.contains(rule.contains) {
            return (rule.template)(&normalized);
        }
    }

    if is_greeting(&normalized) || is_question(&normalized) || is_coding_request(&normalized) {
        return text.to_string();
    }

    text.to_string()
}

fn is_greeting(text: &str) -> bool {
    GREETINGS.iter().any(|g| text == *g || text.starts_with(g))
}

fn is_question(text: &str) -> bool {
    text.ends_with('?') || text.starts_with("what") || text.starts_with("why") || text.starts_with("how")
}

fn is_coding_request(text: &str) -> bool {
    let first_word = text.split_whitespace().next().unwrap_or("");
    CODING_VERBS.contains(&first_word) && COMPONENT_NOUNS.iter().any(|n| text.contains(n))
}

#[cfg(test)]
mod tests {
    use super::*;
    use steward_core::types::{ChatId, UserId};

    fn ctx() -> SkillContext {
        SkillContext {
            user_id: UserId::from("u1"),
            chat_id: ChatId::from("c1"),
            raw_text: String::new(),
        }
    }

    #[test]
    fn greeting_passes_through_unchanged() {
        assert_eq!(rewrite("hey there", &ctx()), "hey there");
    }

    #[test]
    fn coding_verb_with_component_noun_passes_through() {
        assert_eq!(rewrite("fix the login button", &ctx()), "fix the login button");
    }

    #[test]
    fn question_passes_through_unchanged() {
        assert_eq!(rewrite("what is the weather like?", &ctx()), "what is the weather like?");
    }

    #[test]
    fn project_status_phrasing_rewrites() {
        assert_eq!(rewrite("what's left on project-x", &ctx()), "project status project-x");
    }

    #[test]
    fn reminder_phrasing_rewrites() {
        assert_eq!(rewrite("remind me to call mom", &ctx()), "task create call mom");
    }
}
