//! Deterministic per-example choice permutation.
//!
//! The per-example seed is the first 8 bytes (little-endian) of
//! `SHA-256("<global_seed>:<example_id>")`, so a permutation depends only on
//! the pair and never on iteration order or ambient RNG state.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use sha2::{Digest, Sha256};

use crate::error::{EvalError, Result};
use crate::types::{Choice, Example, LABEL_ALPHABET};

/// Seed for one example, derived from the run seed and the example id.
pub fn example_seed(global_seed: u64, example_id: &str) -> u64 {
    let digest = Sha256::digest(format!("{}:{}", global_seed, example_id).as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

/// `perm[new_position] = original_index`.
pub fn permutation(global_seed: u64, example_id: &str, n: usize) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(example_seed(global_seed, example_id));
    indices.shuffle(&mut rng);
    indices
}

/// Build the example as presented to the model.
///
/// Choices are relabeled positionally (A, B, ...) after permutation, and the
/// gold label follows its text. With `shuffle = false` the identity
/// permutation is used and the relabel/check still runs.
pub fn present(example: &Example, global_seed: u64, shuffle: bool) -> Result<Example> {
    let n = example.choices.len();
    let perm = if shuffle {
        permutation(global_seed, &example.id, n)
    } else {
        (0..n).collect()
    };

    let consistency = |reason: String| EvalError::Consistency {
        id: example.id.clone(),
        reason,
    };

    if n > LABEL_ALPHABET.len() {
        return Err(consistency(format!("{} choices exceed the label alphabet", n)));
    }

    let gold_original = example
        .gold_index()
        .ok_or_else(|| consistency(format!("gold label '{}' missing", example.answer)))?;
    let gold_new = perm
        .iter()
        .position(|&i| i == gold_original)
        .ok_or_else(|| consistency("permutation dropped the gold choice".to_string()))?;

    let choices: Vec<Choice> = perm
        .iter()
        .enumerate()
        .map(|(pos, &orig)| Choice::new(LABEL_ALPHABET[pos].to_string(), example.choices[orig].text.clone()))
        .collect();

    if choices[gold_new].text != example.choices[gold_original].text {
        return Err(consistency(format!(
            "gold text moved from {} to {} but content differs",
            example.answer, choices[gold_new].label
        )));
    }

    Ok(Example {
        id: example.id.clone(),
        context: example.context.clone(),
        question: example.question.clone(),
        answer: choices[gold_new].label.clone(),
        choices,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example() -> Example {
        Example {
            id: "ex-17".to_string(),
            context: String::new(),
            question: "Which planet is largest?".to_string(),
            choices: vec![
                Choice::new("A", "Mars"),
                Choice::new("B", "Jupiter"),
                Choice::new("C", "Venus"),
                Choice::new("D", "Mercury"),
                Choice::new("E", "Earth"),
            ],
            answer: "B".to_string(),
        }
    }

    #[test]
    fn test_permutation_is_deterministic() {
        assert_eq!(permutation(42, "ex-17", 5), permutation(42, "ex-17", 5));
        assert_eq!(example_seed(42, "ex-17"), example_seed(42, "ex-17"));
        assert_ne!(example_seed(42, "ex-17"), example_seed(43, "ex-17"));
    }

    #[test]
    fn test_permutation_is_bijection() {
        let mut perm = permutation(9, "abc", 10);
        perm.sort_unstable();
        assert_eq!(perm, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_present_keeps_gold_text() {
        let ex = example();
        for seed in 0..20 {
            let shown = present(&ex, seed, true).unwrap();
            let gold = shown.gold_index().unwrap();
            assert_eq!(shown.choices[gold].text, "Jupiter");
            let labels: Vec<_> = shown.choices.iter().map(|c| c.label.as_str()).collect();
            assert_eq!(labels, vec!["A", "B", "C", "D", "E"]);
        }
        assert_eq!(present(&ex, 3, true).unwrap(), present(&ex, 3, true).unwrap());
    }

    #[test]
    fn test_present_without_shuffle_is_identity() {
        let ex = example();
        assert_eq!(present(&ex, 1, false).unwrap(), ex);
    }

    #[test]
    fn test_present_relabels_nonpositional_labels() {
        let mut ex = example();
        ex.choices.truncate(3);
        ex.choices[0].label = "C".to_string();
        ex.choices[2].label = "A".to_string();
        let shown = present(&ex, 1, false).unwrap();
        assert_eq!(shown.answer, "B");
        assert_eq!(shown.choices[0].label, "A");
        assert_eq!(shown.choices[0].text, "Mars");
    }
}
