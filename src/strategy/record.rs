//! Per-example record schema, one JSON Lines row per example.

use serde::{Deserialize, Serialize};

use crate::types::Generation;

/// One generator call inside a strategy chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageTrace {
    pub stage: String,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
    pub latency_sec: f64,
    pub text: String,
}

impl StageTrace {
    pub fn new(stage: &str, generation: &Generation) -> Self {
        Self {
            stage: stage.to_string(),
            input_tokens: generation.usage.input_tokens,
            output_tokens: generation.usage.output_tokens,
            latency_sec: generation.latency_sec,
            text: generation.text.clone(),
        }
    }
}

/// Which way the hybrid arbitration went.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Branch {
    /// Auditor letter adopted
    Override,
    NoDisagreement,
    /// Auditor named a letter outside the example's label set
    InvalidLetter,
    LowConfidence,
    AuditorUnparseable,
}

impl Branch {
    pub fn as_str(&self) -> &'static str {
        match self {
            Branch::Override => "override",
            Branch::NoDisagreement => "no_disagreement",
            Branch::InvalidLetter => "invalid_letter",
            Branch::LowConfidence => "low_confidence",
            Branch::AuditorUnparseable => "auditor_unparseable",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arbitration {
    pub producer_pred: Option<String>,
    pub auditor_pred: Option<String>,
    pub confidence: f64,
    pub threshold: f64,
    pub branch: Branch,
}

/// Strategy-shaped usage payload.
///
/// The three sums are exact. Each is `None` unless every call reported
/// that counter, so a partial sum never masquerades as a total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyUsage {
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
    pub total_tokens: Option<u64>,
    pub calls: Vec<StageTrace>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arbitration: Option<Arbitration>,
}

impl StrategyUsage {
    /// Sum counters over `(stage, generation)` pairs in call order.
    pub fn from_calls(calls: &[(&str, &Generation)]) -> Self {
        let sum = |field: fn(&Generation) -> Option<u64>| -> Option<u64> {
            calls.iter().map(|(_, g)| field(g)).sum()
        };
        Self {
            input_tokens: sum(|g| g.usage.input_tokens),
            output_tokens: sum(|g| g.usage.output_tokens),
            total_tokens: sum(|g| g.usage.total_tokens),
            calls: calls.iter().map(|(stage, g)| StageTrace::new(stage, g)).collect(),
            arbitration: None,
        }
    }

    pub fn with_arbitration(mut self, arbitration: Arbitration) -> Self {
        self.arbitration = Some(arbitration);
        self
    }
}

/// Outcome of one strategy on one example. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyRecord {
    pub id: String,
    pub strategy: String,
    pub answer_gold: String,
    pub answer_pred: Option<String>,
    /// 1 iff `answer_pred == answer_gold` and the response is format compliant
    pub correct: u8,
    pub format_compliant: bool,
    /// Summed over all calls
    pub latency_sec: f64,
    pub usage: StrategyUsage,
    /// Text of the deciding response
    pub raw_text: String,
    /// First prompt of the chain
    pub prompt_rendered: String,
}

impl StrategyRecord {
    pub fn is_correct(&self) -> bool {
        self.correct == 1
    }

    pub fn branch(&self) -> Option<Branch> {
        self.usage.arbitration.as_ref().map(|a| a.branch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Usage;

    #[test]
    fn test_sums_are_exact() {
        let a = Generation::new("x", Usage::new(Some(10), Some(3)), 0.5);
        let b = Generation::new("y", Usage::new(Some(20), Some(4)), 0.25);
        let usage = StrategyUsage::from_calls(&[("initial", &a), ("revision", &b)]);
        assert_eq!(usage.input_tokens, Some(30));
        assert_eq!(usage.output_tokens, Some(7));
        assert_eq!(usage.total_tokens, Some(37));
        assert_eq!(usage.calls.len(), 2);
        assert_eq!(usage.calls[1].stage, "revision");
    }

    #[test]
    fn test_missing_counter_voids_sum() {
        let a = Generation::new("x", Usage::new(Some(10), Some(3)), 0.0);
        let b = Generation::new("y", Usage::absent(), 0.0);
        let usage = StrategyUsage::from_calls(&[("producer", &a), ("auditor", &b)]);
        assert_eq!(usage.input_tokens, None);
        assert_eq!(usage.output_tokens, None);
        assert_eq!(usage.calls[0].output_tokens, Some(3));
    }

    #[test]
    fn test_branch_serializes_snake_case() {
        let json = serde_json::to_string(&Branch::AuditorUnparseable).unwrap();
        assert_eq!(json, "\"auditor_unparseable\"");
        assert_eq!(Branch::LowConfidence.as_str(), "low_confidence");
    }

    #[test]
    fn test_arbitration_omitted_when_absent() {
        let g = Generation::new("x", Usage::absent(), 0.0);
        let usage = StrategyUsage::from_calls(&[("answer", &g)]);
        let json = serde_json::to_value(&usage).unwrap();
        assert!(json.get("arbitration").is_none());
        assert!(json["input_tokens"].is_null());
    }
}
