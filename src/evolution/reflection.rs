//! Reflection Engine: failed examples in, rules and prompt edits out.
//!
//! Exactly one generator call per round. A response that does not contain a
//! parseable `{"rules": [...], "edits": [...]}` object degrades to an empty
//! proposal; the round continues with nothing to evaluate.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::generator::Generator;
use crate::strategy::StrategyRecord;
use crate::types::Example;

/// Upper bound on failures shown to the model, whatever the config says.
pub const MAX_REFLECTION_EXAMPLES: usize = 50;

/// One proposed addition to the base prompt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Edit {
    pub name: Option<String>,
    pub text: String,
    pub why: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Reflection {
    pub rules: Vec<String>,
    pub edits: Vec<Edit>,
}

/// Persisted as `round1/reflection.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReflectionArtifact {
    pub prompt: String,
    pub raw_response: String,
    pub parsed: Reflection,
}

/// Compact view of a failed example.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureSnippet {
    pub context: String,
    pub question: String,
    /// `"A. text B. text ..."`
    pub choices: String,
    pub answer_pred: String,
    pub answer_gold: String,
}

impl FailureSnippet {
    pub fn new(example: &Example, record: &StrategyRecord) -> Self {
        let choices = example
            .choices
            .iter()
            .map(|c| format!("{}. {}", c.label, c.text))
            .collect::<Vec<_>>()
            .join(" ");
        Self {
            context: example.context.clone(),
            question: example.question.clone(),
            choices,
            answer_pred: record.answer_pred.clone().unwrap_or_default(),
            answer_gold: record.answer_gold.clone(),
        }
    }
}

/// Incorrect records paired with the example as it was presented.
///
/// `presented` and `records` are parallel, in evaluation order.
pub fn harvest_failures(presented: &[Example], records: &[StrategyRecord], limit: usize) -> Vec<FailureSnippet> {
    presented
        .iter()
        .zip(records)
        .filter(|(_, r)| !r.is_correct())
        .take(limit.min(MAX_REFLECTION_EXAMPLES))
        .map(|(ex, r)| FailureSnippet::new(ex, r))
        .collect()
}

/// Build the single reflection prompt.
pub fn build_reflection_prompt(
    base_prompt: &str,
    failures: &[FailureSnippet],
    num_edits: usize,
    max_edit_lines: usize,
) -> String {
    let failure_block = serde_json::to_string_pretty(failures).unwrap_or_else(|_| "[]".to_string());
    format!(
        r#"You are improving a system prompt for a multiple-choice tutor.
You will see FAILED EXAMPLES: each includes (context, question, choices, your_answer, correct_answer).

1) Diagnose recurring failure modes as general rules (not per-example tips).
2) Propose {num_edits} prompt edits. Each edit must be:
   - Self-contained (can be appended to the base prompt)
   - Max {max_edit_lines} lines, imperative, testable
   - Include any verification/check steps
3) For each edit, state which failure modes it addresses.

Return **valid JSON** only in this schema:
{{
  "rules": ["..."],
  "edits": [
     {{"name":"A","text":"<edit text>","why":"<which failures it fixes>"}}
  ]
}}

BASE PROMPT:
---
{base_prompt}
---
FAILED EXAMPLES (JSON):
{failure_block}
"#
    )
}

/// The balanced `{...}` object starting at the beginning of `text`, if any.
fn balanced_object(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&text[..i + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parse the first balanced `{...}` object that carries `rules` or `edits`.
///
/// Tolerates code fences and prose around the JSON, including prose with
/// braces of its own ahead of the object.
pub fn parse_reflection(response: &str) -> Result<Reflection, String> {
    let mut last_error = "No JSON found in reflection response".to_string();

    for (start, _) in response.char_indices().filter(|&(_, c)| c == '{') {
        let Some(candidate) = balanced_object(&response[start..]) else {
            last_error = "Unbalanced JSON in reflection response".to_string();
            continue;
        };
        let value: serde_json::Value = match serde_json::from_str(candidate) {
            Ok(value) => value,
            Err(e) => {
                last_error = format!("Failed to parse reflection JSON: {}", e);
                continue;
            }
        };
        if value.get("rules").is_none() && value.get("edits").is_none() {
            continue;
        }
        match serde_json::from_value(value) {
            Ok(parsed) => return Ok(parsed),
            Err(e) => last_error = format!("Failed to parse reflection JSON: {}", e),
        }
    }
    Err(last_error)
}

/// Ask the generator for rules and edits. Never fails; see module docs.
pub fn reflect<G: Generator + ?Sized>(
    generator: &mut G,
    base_prompt: &str,
    failures: &[FailureSnippet],
    num_edits: usize,
    max_edit_lines: usize,
) -> ReflectionArtifact {
    let prompt = build_reflection_prompt(base_prompt, failures, num_edits, max_edit_lines);
    let response = generator.generate(&prompt, None);

    let parsed = match parse_reflection(&response.text) {
        Ok(parsed) => {
            info!(
                failures = failures.len(),
                rules = parsed.rules.len(),
                edits = parsed.edits.len(),
                "reflection parsed"
            );
            parsed
        }
        Err(e) => {
            warn!(error = %e, "reflection unparseable, continuing with no edits");
            Reflection::default()
        }
    };

    ReflectionArtifact {
        prompt,
        raw_response: response.text,
        parsed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::StrategyUsage;
    use crate::types::{Choice, Generation, Usage};

    struct Fixed(&'static str);

    impl Generator for Fixed {
        fn generate(&mut self, _prompt: &str, _stop: Option<&[String]>) -> Generation {
            Generation::new(self.0, Usage::absent(), 0.0)
        }

        fn name(&self) -> String {
            "fixed".into()
        }
    }

    fn record(id: &str, correct: bool) -> StrategyRecord {
        StrategyRecord {
            id: id.into(),
            strategy: "baseline".into(),
            answer_gold: "B".into(),
            answer_pred: if correct { Some("B".into()) } else { None },
            correct: u8::from(correct),
            format_compliant: correct,
            latency_sec: 0.0,
            usage: StrategyUsage::from_calls(&[]),
            raw_text: String::new(),
            prompt_rendered: String::new(),
        }
    }

    fn example(id: &str) -> Example {
        Example {
            id: id.into(),
            context: "ctx".into(),
            question: format!("question {}", id),
            choices: vec![Choice::new("A", "yes"), Choice::new("B", "no")],
            answer: "B".into(),
        }
    }

    #[test]
    fn test_parse_fenced_json() {
        let raw = "Here you go:\n```json\n{\"rules\":[\"check units\"],\"edits\":[{\"name\":\"A\",\"text\":\"Verify {units}.\",\"why\":\"unit slips\"}]}\n```";
        let parsed = parse_reflection(raw).unwrap();
        assert_eq!(parsed.rules, vec!["check units"]);
        assert_eq!(parsed.edits[0].text, "Verify {units}.");
    }

    #[test]
    fn test_parse_skips_braces_in_leading_prose() {
        let raw = "Tip: always use {units} and {} checks.\n{\"rules\":[\"r\"],\"edits\":[{\"name\":\"units\",\"text\":\"State units.\"}]}";
        let parsed = parse_reflection(raw).unwrap();
        assert_eq!(parsed.rules, vec!["r"]);
        assert_eq!(parsed.edits[0].name.as_deref(), Some("units"));
    }

    #[test]
    fn test_parse_skips_unclosed_brace_before_json() {
        let raw = "Consider { this.\n{\"edits\":[{\"text\":\"Be brief.\"}]}";
        assert_eq!(parse_reflection(raw).unwrap().edits[0].text, "Be brief.");
    }

    #[test]
    fn test_parse_missing_fields_default() {
        let parsed = parse_reflection(r#"{"edits":[{"text":"Be brief."}]}"#).unwrap();
        assert!(parsed.rules.is_empty());
        assert_eq!(parsed.edits[0].name, None);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_reflection("no json here").is_err());
        assert!(parse_reflection("{\"rules\": [").is_err());
        assert!(parse_reflection("{\"rules\": 5}").is_err());
    }

    #[test]
    fn test_malformed_response_degrades() {
        let artifact = reflect(&mut Fixed("I think you should try harder."), "BASE", &[], 3, 5);
        assert!(artifact.parsed.edits.is_empty());
        assert!(artifact.parsed.rules.is_empty());
        assert_eq!(artifact.raw_response, "I think you should try harder.");
        assert!(artifact.prompt.contains("BASE PROMPT:\n---\nBASE\n---"));
    }

    #[test]
    fn test_harvest_takes_failures_in_order() {
        let presented = vec![example("1"), example("2"), example("3"), example("4")];
        let records = vec![record("1", false), record("2", true), record("3", false), record("4", false)];
        let failures = harvest_failures(&presented, &records, 2);
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].question, "question 1");
        assert_eq!(failures[1].question, "question 3");
        assert_eq!(failures[0].choices, "A. yes B. no");
        assert_eq!(failures[0].answer_pred, "");
    }

    #[test]
    fn test_prompt_mentions_edit_count() {
        let prompt = build_reflection_prompt("BASE", &[], 4, 3);
        assert!(prompt.contains("Propose 4 prompt edits"));
        assert!(prompt.contains("Max 3 lines"));
        assert!(prompt.contains("\"rules\": [\"...\"]"));
    }
}
