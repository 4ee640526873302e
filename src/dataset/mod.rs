//! Example source: JSON Lines splits on disk.
//!
//! Each line is one example:
//!
//! ```json
//! {"id": "q1", "context": "...", "question": "...",
//!  "choices": [{"label": "A", "text": "..."}, ...], "answer": "B"}
//! ```
//!
//! Examples are validated on load and never re-ordered afterwards; the only
//! transformation applied later is the choice permutation in [`shuffle`].

pub mod shuffle;

use std::collections::HashSet;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::info;

use crate::error::{EvalError, Result};
use crate::types::{DatasetDescriptor, Example, LABEL_ALPHABET, MAX_CHOICES, MIN_CHOICES};

pub use shuffle::{example_seed, permutation, present};

/// Load `<dataset dir>/<split>.jsonl`, keeping at most `limit` examples.
pub fn load_split(descriptor: &DatasetDescriptor, split: &str, limit: usize) -> Result<Vec<Example>> {
    let path = descriptor.split_path(split);
    let examples = load_jsonl(&path, limit)?;
    info!(
        dataset = %descriptor.name,
        split,
        count = examples.len(),
        "loaded split"
    );
    Ok(examples)
}

/// Read and validate examples from a JSON Lines file, file order preserved.
///
/// Blank lines are skipped. Every line up to the limit is validated; the
/// rest of the file is not read.
pub fn load_jsonl(path: &Path, limit: usize) -> Result<Vec<Example>> {
    let file = std::fs::File::open(path).map_err(|e| EvalError::io(path, e))?;
    let reader = BufReader::new(file);

    let mut examples = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        if examples.len() >= limit {
            break;
        }
        let line = line.map_err(|e| EvalError::io(path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        let line_no = idx + 1;
        let example: Example = serde_json::from_str(&line).map_err(|e| EvalError::InvalidExample {
            id: format!("<line {}>", line_no),
            reason: format!("{}: {}", path.display(), e),
        })?;
        validate(&example).map_err(|reason| EvalError::InvalidExample {
            id: example.id.clone(),
            reason: format!("{} (line {})", reason, line_no),
        })?;
        examples.push(example);
    }
    Ok(examples)
}

/// Check the structural rules every example must satisfy.
pub fn validate(example: &Example) -> std::result::Result<(), String> {
    if example.id.trim().is_empty() {
        return Err("empty id".to_string());
    }

    let n = example.choices.len();
    if !(MIN_CHOICES..=MAX_CHOICES).contains(&n) {
        return Err(format!(
            "{} choices, expected {}..={}",
            n, MIN_CHOICES, MAX_CHOICES
        ));
    }

    let mut seen = HashSet::new();
    for choice in &example.choices {
        let mut chars = choice.label.chars();
        let valid = matches!(
            (chars.next(), chars.next()),
            (Some(c), None) if LABEL_ALPHABET.contains(&c)
        );
        if !valid {
            return Err(format!("label '{}' is not one of A-J", choice.label));
        }
        if !seen.insert(choice.label.as_str()) {
            return Err(format!("duplicate label '{}'", choice.label));
        }
    }

    if example.gold_index().is_none() {
        return Err(format!("gold label '{}' is not among the choices", example.answer));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Choice;

    fn example(labels: &[&str], answer: &str) -> Example {
        Example {
            id: "q1".to_string(),
            context: String::new(),
            question: "Which?".to_string(),
            choices: labels
                .iter()
                .map(|l| Choice::new(*l, format!("text {}", l)))
                .collect(),
            answer: answer.to_string(),
        }
    }

    #[test]
    fn test_validate_accepts_well_formed() {
        assert!(validate(&example(&["A", "B", "C", "D"], "B")).is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_examples() {
        assert!(validate(&example(&["A"], "A")).unwrap_err().contains("choices"));
        assert!(validate(&example(&["A", "A"], "A")).unwrap_err().contains("duplicate"));
        assert!(validate(&example(&["A", "K"], "A")).unwrap_err().contains("A-J"));
        assert!(validate(&example(&["A", "B"], "C")).unwrap_err().contains("gold"));
    }

    #[test]
    fn test_load_jsonl_respects_limit_and_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dev.jsonl");
        let lines = [
            r#"{"id":"1","question":"q1","choices":[{"label":"A","text":"x"},{"label":"B","text":"y"}],"answer":"A"}"#,
            "",
            r#"{"id":"2","context":"p","question":"q2","choices":[{"label":"A","text":"x"},{"label":"B","text":"y"}],"answer":"B"}"#,
            r#"{"id":"3","question":"q3","choices":[{"label":"A","text":"x"},{"label":"B","text":"y"}],"answer":"B"}"#,
        ];
        std::fs::write(&path, lines.join("\n")).unwrap();

        let loaded = load_jsonl(&path, 2).unwrap();
        let ids: Vec<_> = loaded.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
        assert!(!loaded[0].has_context());
        assert!(loaded[1].has_context());
    }

    #[test]
    fn test_load_jsonl_reports_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dev.jsonl");
        std::fs::write(
            &path,
            r#"{"id":"bad","question":"q","choices":[{"label":"A","text":"x"},{"label":"B","text":"y"}],"answer":"Z"}"#,
        )
        .unwrap();

        match load_jsonl(&path, 10) {
            Err(EvalError::InvalidExample { id, reason }) => {
                assert_eq!(id, "bad");
                assert!(reason.contains("line 1"));
            }
            other => panic!("expected InvalidExample, got {:?}", other),
        }
    }
}
