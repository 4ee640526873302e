//! Aggregation of per-example records into run-level numbers.
//!
//! ## Metrics
//!
//! | Metric            | Over                                   | Undefined when      |
//! |-------------------|----------------------------------------|---------------------|
//! | accuracy          | all examples (0.0 when empty)          | never               |
//! | avg_tokens_out    | examples with a known output count     | no count is known   |
//! | avg_latency_sec   | all examples                           | never (0.0 if empty)|
//!
//! Hybrid runs additionally report [`OverrideStats`].

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::strategy::{Branch, StrategyRecord};

/// Aggregated result of one strategy over one split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalResult {
    pub accuracy: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_tokens_out: Option<f64>,
    pub avg_latency_sec: f64,
    pub n_examples: usize,
    pub records_path: PathBuf,
}

impl EvalResult {
    pub fn aggregate(records: &[StrategyRecord], records_path: PathBuf) -> Self {
        let n = records.len();
        let correct = records.iter().filter(|r| r.is_correct()).count();
        let tokens: Vec<u64> = records.iter().filter_map(|r| r.usage.output_tokens).collect();
        let latency: f64 = records.iter().map(|r| r.latency_sec).sum();

        Self {
            accuracy: if n == 0 { 0.0 } else { correct as f64 / n as f64 },
            avg_tokens_out: if tokens.is_empty() {
                None
            } else {
                Some(tokens.iter().sum::<u64>() as f64 / tokens.len() as f64)
            },
            avg_latency_sec: if n == 0 { 0.0 } else { latency / n as f64 },
            n_examples: n,
            records_path,
        }
    }
}

/// How the hybrid auditor behaved over a split.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverrideStats {
    pub total_examples: usize,
    pub overrides: usize,
    /// Overrides that ended up correct
    pub successful_overrides: usize,
    pub override_success_rate: f64,
    /// Disagreements refused for low confidence or an illegal letter
    pub auditor_rejections: usize,
    pub no_disagreement: usize,
    pub auditor_unparseable: usize,
    pub mean_confidence: f64,
}

impl OverrideStats {
    /// `None` when no record carries an arbitration trace.
    pub fn from_records(records: &[StrategyRecord]) -> Option<Self> {
        let arbitrated: Vec<&StrategyRecord> =
            records.iter().filter(|r| r.usage.arbitration.is_some()).collect();
        if arbitrated.is_empty() {
            return None;
        }

        let mut stats = OverrideStats {
            total_examples: arbitrated.len(),
            ..Default::default()
        };
        let mut confidence_sum = 0.0;

        for record in &arbitrated {
            let Some(arb) = &record.usage.arbitration else {
                continue;
            };
            confidence_sum += arb.confidence;
            match arb.branch {
                Branch::Override => {
                    stats.overrides += 1;
                    if record.is_correct() {
                        stats.successful_overrides += 1;
                    }
                }
                Branch::LowConfidence | Branch::InvalidLetter => stats.auditor_rejections += 1,
                Branch::NoDisagreement => stats.no_disagreement += 1,
                Branch::AuditorUnparseable => stats.auditor_unparseable += 1,
            }
        }

        stats.override_success_rate = if stats.overrides == 0 {
            0.0
        } else {
            stats.successful_overrides as f64 / stats.overrides as f64
        };
        stats.mean_confidence = confidence_sum / arbitrated.len() as f64;
        Some(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::{Arbitration, StrategyUsage};
    use crate::types::{Generation, Usage};

    fn record(correct: bool, output_tokens: Option<u64>, latency: f64) -> StrategyRecord {
        let g = Generation::new(
            "Answer: A",
            Usage {
                output_tokens,
                ..Usage::absent()
            },
            latency,
        );
        StrategyRecord {
            id: "x".into(),
            strategy: "baseline".into(),
            answer_gold: "A".into(),
            answer_pred: Some("A".into()),
            correct: u8::from(correct),
            format_compliant: true,
            latency_sec: latency,
            usage: StrategyUsage::from_calls(&[("answer", &g)]),
            raw_text: g.text.clone(),
            prompt_rendered: String::new(),
        }
    }

    fn with_branch(mut r: StrategyRecord, branch: Branch, confidence: f64) -> StrategyRecord {
        r.usage = r.usage.with_arbitration(Arbitration {
            producer_pred: Some("A".into()),
            auditor_pred: Some("B".into()),
            confidence,
            threshold: 0.5,
            branch,
        });
        r
    }

    #[test]
    fn test_empty_split() {
        let result = EvalResult::aggregate(&[], PathBuf::from("r.jsonl"));
        assert_eq!(result.accuracy, 0.0);
        assert_eq!(result.avg_tokens_out, None);
        assert_eq!(result.avg_latency_sec, 0.0);
    }

    #[test]
    fn test_tokens_averaged_over_known_only() {
        let records = vec![
            record(true, Some(10), 1.0),
            record(false, None, 2.0),
            record(true, Some(20), 3.0),
        ];
        let result = EvalResult::aggregate(&records, PathBuf::from("r.jsonl"));
        assert!((result.accuracy - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(result.avg_tokens_out, Some(15.0));
        assert!((result.avg_latency_sec - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_absent_tokens_omitted_from_json() {
        let result = EvalResult::aggregate(&[record(true, None, 0.0)], PathBuf::from("r.jsonl"));
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("avg_tokens_out").is_none());
    }

    #[test]
    fn test_override_stats() {
        let records = vec![
            with_branch(record(true, None, 0.0), Branch::Override, 0.9),
            with_branch(record(false, None, 0.0), Branch::Override, 0.7),
            with_branch(record(true, None, 0.0), Branch::LowConfidence, 0.2),
            with_branch(record(true, None, 0.0), Branch::NoDisagreement, 0.2),
        ];
        let stats = OverrideStats::from_records(&records).unwrap();
        assert_eq!(stats.total_examples, 4);
        assert_eq!(stats.overrides, 2);
        assert_eq!(stats.successful_overrides, 1);
        assert!((stats.override_success_rate - 0.5).abs() < 1e-12);
        assert_eq!(stats.auditor_rejections, 1);
        assert_eq!(stats.no_disagreement, 1);
        assert!((stats.mean_confidence - 0.5).abs() < 1e-12);

        assert!(OverrideStats::from_records(&[record(true, None, 0.0)]).is_none());
    }
}
