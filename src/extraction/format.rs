//! Trailing-line format check, independent of extraction.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::LabelSet;

/// The whole final line must be exactly `Answer: <LETTER>`.
static FINAL_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?i:answer)\s*:\s*([A-Ja-j])$").expect("Invalid final-line regex"));

/// The letter declared by the last non-empty line, when that line is exactly
/// `Answer: <LETTER>` with an allowed letter.
pub fn final_answer(text: &str, allowed: &LabelSet) -> Option<char> {
    let last = text.lines().map(str::trim).rfind(|l| !l.is_empty())?;
    FINAL_LINE
        .captures(last)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().chars().next())
        .map(|c| c.to_ascii_uppercase())
        .filter(|c| allowed.contains(*c))
}

/// True iff the last non-empty line declares an allowed letter and nothing else.
///
/// A correct letter mentioned earlier in the response does not count.
pub fn is_format_compliant(text: &str, allowed: &LabelSet) -> bool {
    final_answer(text, allowed).is_some()
}
