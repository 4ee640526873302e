//! Strict answer-letter extraction.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::LabelSet;

/// A line declaring `Answer: <LETTER>`, anywhere in the response.
static ANSWER_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^\s*Answer\s*:\s*([A-J])\b").expect("Invalid answer-line regex"));

/// First declared letter that belongs to `allowed`, uppercased.
///
/// No heuristics: text that names the right option informally without an
/// `Answer:` line yields `None`.
pub fn extract_answer(text: &str, allowed: &LabelSet) -> Option<char> {
    ANSWER_LINE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .filter_map(|m| m.as_str().chars().next())
        .map(|c| c.to_ascii_uppercase())
        .find(|c| allowed.contains(*c))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abcd() -> LabelSet {
        LabelSet::positional(4)
    }

    #[test]
    fn test_extracts_trailing_line() {
        assert_eq!(extract_answer("Reasoning...\nAnswer: B", &abcd()), Some('B'));
        assert_eq!(extract_answer("answer :c", &abcd()), Some('C'));
        assert_eq!(extract_answer("  ANSWER:   d  ", &abcd()), Some('D'));
    }

    #[test]
    fn test_no_heuristics() {
        assert_eq!(extract_answer("The answer is clearly B.", &abcd()), None);
        assert_eq!(extract_answer("B", &abcd()), None);
        assert_eq!(extract_answer("", &abcd()), None);
    }

    #[test]
    fn test_letter_outside_label_set_is_skipped() {
        assert_eq!(extract_answer("Answer: F", &abcd()), None);
        assert_eq!(extract_answer("Answer: F\nAnswer: A", &abcd()), Some('A'));
    }

    #[test]
    fn test_word_boundary() {
        // "Answer: Because" must not read as B
        assert_eq!(extract_answer("Answer: Because of X", &abcd()), None);
    }
}
