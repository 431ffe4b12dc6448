//! Hard-truncation for outbound text — spec.md §4.1.
//!
//! Deliberately the opposite of chunking: a message over `max_len` is cut to
//! one message with a trailing marker, not split into several.

const MARKER: &str = "... (truncated)";

/// Truncate `text` to at most `max_len` characters, appending [`MARKER`]
/// when truncation occurs. The cut point backs up to the nearest char
/// boundary and, where possible, the nearest preceding whitespace so the
/// marker doesn't land mid-word.
pub fn hard_truncate(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }

    let budget = max_len.saturating_sub(MARKER.len());
    let mut cut = 0;
    let mut last_space = None;
    for (i, ch) in text.char_indices() {
        if i >= budget {
            break;
        }
        if ch.is_whitespace() {
            last_space = Some(i);
        }
        cut = i + ch.len_utf8();
    }

    let boundary = last_space.filter(|&s| s > budget / 2).unwrap_or(cut);
    format!("{}{}", text[..boundary].trim_end(), MARKER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_untouched() {
        assert_eq!(hard_truncate("hello", 100), "hello");
    }

    #[test]
    fn exactly_at_limit_untouched() {
        let text = "a".repeat(50);
        assert_eq!(hard_truncate(&text, 50), text);
    }

    #[test]
    fn over_limit_gets_marker() {
        let text = "a".repeat(200);
        let out = hard_truncate(&text, 100);
        assert!(out.ends_with("... (truncated)"));
        assert!(out.chars().count() <= 100);
    }

    #[test]
    fn breaks_on_whitespace_when_reasonable() {
        let text = "word ".repeat(50);
        let out = hard_truncate(&text, 100);
        assert!(out.ends_with("... (truncated)"));
        assert!(!out[..out.len() - MARKER.len()].ends_with("wor"));
    }
}
