//! Deterministic offline backends for smoke runs and tests.

use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::Generator;
use crate::types::{Generation, Usage};

const MOCK_LETTERS: [char; 4] = ['A', 'B', 'C', 'D'];

/// Picks a letter A-D per call from an RNG seeded once by the run seed.
#[derive(Debug, Clone)]
pub struct MockGenerator {
    rng: StdRng,
}

impl MockGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Generator for MockGenerator {
    fn generate(&mut self, _prompt: &str, _stop: Option<&[String]>) -> Generation {
        let start = Instant::now();
        let letter = MOCK_LETTERS[self.rng.gen_range(0..MOCK_LETTERS.len())];
        let text = format!("Reasoning: (mock) I considered options.\nAnswer: {}", letter);
        let words = text.split_whitespace().count() as u64;
        Generation::new(
            text,
            Usage {
                output_tokens: Some(words),
                ..Usage::absent()
            },
            start.elapsed().as_secs_f64(),
        )
    }

    fn name(&self) -> String {
        "mock".to_string()
    }
}

/// Answers `A` to everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysA;

impl Generator for AlwaysA {
    fn generate(&mut self, _prompt: &str, _stop: Option<&[String]>) -> Generation {
        let start = Instant::now();
        Generation::new(
            "Answer: A",
            Usage {
                output_tokens: Some(2),
                ..Usage::absent()
            },
            start.elapsed().as_secs_f64(),
        )
    }

    fn name(&self) -> String {
        "always_a".to_string()
    }
}
