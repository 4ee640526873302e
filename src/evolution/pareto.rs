//! Pareto frontier over (output tokens, accuracy).
//!
//! Lower tokens and higher accuracy are better. A variant is dominated when
//! another one is at least as good on both axes and strictly better on one.

use std::cmp::Ordering;

use super::variants::Variant;

fn dominates(a: &Variant, b: &Variant) -> bool {
    a.avg_tokens_out <= b.avg_tokens_out
        && a.accuracy >= b.accuracy
        && (a.avg_tokens_out < b.avg_tokens_out || a.accuracy > b.accuracy)
}

/// Non-dominated variants, in input order.
pub fn pareto_frontier(variants: &[Variant]) -> Vec<Variant> {
    variants
        .iter()
        .enumerate()
        .filter(|(i, v)| {
            !variants
                .iter()
                .enumerate()
                .any(|(j, other)| j != *i && dominates(other, v))
        })
        .map(|(_, v)| v.clone())
        .collect()
}

/// Highest accuracy, then fewest tokens. Earlier variants win exact ties.
///
/// Picks from `frontier`, or from `all` when the frontier is empty.
pub fn select_best<'a>(frontier: &'a [Variant], all: &'a [Variant]) -> Option<&'a Variant> {
    let pool = if frontier.is_empty() { all } else { frontier };
    pool.iter().reduce(|best, v| {
        let better = match v.accuracy.total_cmp(&best.accuracy) {
            Ordering::Greater => true,
            Ordering::Less => false,
            Ordering::Equal => v.avg_tokens_out < best.avg_tokens_out,
        };
        if better { v } else { best }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn v(name: &str, accuracy: f64, tokens: f64) -> Variant {
        Variant {
            name: name.into(),
            accuracy,
            avg_tokens_out: tokens,
            avg_latency_sec: 0.0,
            prompt_path: PathBuf::from(format!("variant_{}/prompt.txt", name)),
            prompt: String::new(),
        }
    }

    fn names(vs: &[Variant]) -> Vec<&str> {
        vs.iter().map(|v| v.name.as_str()).collect()
    }

    #[test]
    fn test_frontier_drops_dominated() {
        let all = vec![v("A", 0.6, 50.0), v("B", 0.8, 60.0), v("C", 0.5, 70.0), v("D", 0.8, 55.0)];
        let frontier = pareto_frontier(&all);
        // C dominated by A, B dominated by D
        assert_eq!(names(&frontier), vec!["A", "D"]);
    }

    #[test]
    fn test_identical_variants_both_survive() {
        let all = vec![v("A", 0.5, 10.0), v("B", 0.5, 10.0)];
        assert_eq!(pareto_frontier(&all).len(), 2);
    }

    #[test]
    fn test_frontier_members_undominated_and_drawn_from_input() {
        let all: Vec<Variant> = (0..12)
            .map(|i| v(&i.to_string(), f64::from((i * 7) % 5) / 4.0, f64::from((i * 3) % 7) * 10.0))
            .collect();
        let frontier = pareto_frontier(&all);
        assert!(!frontier.is_empty());
        for f in &frontier {
            assert!(all.contains(f));
            assert!(!all.iter().any(|o| dominates(o, f)));
        }
    }

    #[test]
    fn test_select_best_tie_breaks_on_tokens() {
        let frontier = vec![v("A", 0.8, 60.0), v("B", 0.8, 40.0), v("C", 0.7, 10.0)];
        assert_eq!(select_best(&frontier, &[]).unwrap().name, "B");
    }

    #[test]
    fn test_select_best_falls_back_and_handles_empty() {
        let all = vec![v("A", 0.4, 5.0), v("B", 0.9, 50.0)];
        assert_eq!(select_best(&[], &all).unwrap().name, "B");
        assert!(select_best(&[], &[]).is_none());
    }
}
