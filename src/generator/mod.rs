//! The Generator capability: prompt in, text + usage + latency out.
//!
//! Backends form a closed set resolved once from configuration:
//!
//! | Provider         | Backend            | Usage counters          |
//! |------------------|--------------------|-------------------------|
//! | `openai`         | [`HttpGenerator`]  | prompt/completion/total |
//! | `anthropic`      | [`HttpGenerator`]  | input/output            |
//! | `cli:<agent>`    | [`AgentGenerator`] | absent                  |
//! | `mock`           | [`MockGenerator`]  | output (word count)     |
//! | `always_a`       | [`AlwaysA`]        | output = 2              |
//!
//! Network and subprocess failures never escape a backend: they are replaced
//! by [`fallback_generation`], so strategies always see a well-formed result.

pub mod agents;
pub mod http;
pub mod stub;

pub use agents::{Agent, AgentGenerator};
pub use http::{HttpGenerator, HttpProvider};
pub use stub::{AlwaysA, MockGenerator};

use crate::config::ModelConfig;
use crate::error::{EvalError, Result};
use crate::types::{Generation, Usage};

/// Text substituted when a backend call fails.
pub const FALLBACK_TEXT: &str = "Error: API call failed. Using fallback response.\nAnswer: A";

/// Stateless-from-the-caller's-view text generation.
///
/// `&mut self` only lets stubs advance a seeded RNG; calls are strictly
/// sequential and never overlap.
pub trait Generator {
    fn generate(&mut self, prompt: &str, stop: Option<&[String]>) -> Generation;

    /// Short name for logs and summaries.
    fn name(&self) -> String;
}

impl<G: Generator + ?Sized> Generator for Box<G> {
    fn generate(&mut self, prompt: &str, stop: Option<&[String]>) -> Generation {
        (**self).generate(prompt, stop)
    }

    fn name(&self) -> String {
        (**self).name()
    }
}

/// Deterministic stand-in for a failed call.
pub fn fallback_generation(latency_sec: f64) -> Generation {
    Generation::new(
        FALLBACK_TEXT,
        Usage {
            input_tokens: Some(0),
            output_tokens: Some(10),
            total_tokens: Some(10),
        },
        latency_sec,
    )
}

/// Every backend the tool can run against.
pub enum Backend {
    Http(HttpGenerator),
    Agent(AgentGenerator),
    Mock(MockGenerator),
    AlwaysA(AlwaysA),
}

impl Backend {
    /// Resolve the configured provider. Unknown names are fatal.
    pub fn from_config(model: &ModelConfig, seed: u64) -> Result<Self> {
        let provider = model.provider.trim().to_lowercase();

        if let Some(agent) = provider.strip_prefix("cli:") {
            let agent: Agent = agent
                .parse()
                .map_err(|_| EvalError::UnknownProvider(model.provider.clone()))?;
            return Ok(Backend::Agent(AgentGenerator::new(agent, model.model_id.clone())));
        }

        match provider.as_str() {
            "mock" => Ok(Backend::Mock(MockGenerator::new(seed))),
            "always_a" | "always-a" => Ok(Backend::AlwaysA(AlwaysA)),
            "openai" => Ok(Backend::Http(HttpGenerator::from_env(HttpProvider::OpenAi, model)?)),
            "anthropic" => Ok(Backend::Http(HttpGenerator::from_env(HttpProvider::Anthropic, model)?)),
            _ => Err(EvalError::UnknownProvider(model.provider.clone())),
        }
    }
}

impl Generator for Backend {
    fn generate(&mut self, prompt: &str, stop: Option<&[String]>) -> Generation {
        match self {
            Backend::Http(g) => g.generate(prompt, stop),
            Backend::Agent(g) => g.generate(prompt, stop),
            Backend::Mock(g) => g.generate(prompt, stop),
            Backend::AlwaysA(g) => g.generate(prompt, stop),
        }
    }

    fn name(&self) -> String {
        match self {
            Backend::Http(g) => g.name(),
            Backend::Agent(g) => g.name(),
            Backend::Mock(g) => g.name(),
            Backend::AlwaysA(g) => g.name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(provider: &str) -> ModelConfig {
        ModelConfig {
            provider: provider.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_factory_resolves_stubs() {
        assert!(matches!(Backend::from_config(&model("mock"), 1).unwrap(), Backend::Mock(_)));
        assert!(matches!(
            Backend::from_config(&model("always_a"), 1).unwrap(),
            Backend::AlwaysA(_)
        ));
        assert!(matches!(
            Backend::from_config(&model("cli:claude"), 1).unwrap(),
            Backend::Agent(_)
        ));
    }

    #[test]
    fn test_factory_rejects_unknown() {
        let err = Backend::from_config(&model("davinci-local"), 1).err().unwrap();
        assert!(matches!(err, EvalError::UnknownProvider(_)));
        let err = Backend::from_config(&model("cli:eliza"), 1).err().unwrap();
        assert!(matches!(err, EvalError::UnknownProvider(_)));
    }

    #[test]
    fn test_fallback_is_well_formed() {
        let g = fallback_generation(0.25);
        assert!(g.text.ends_with("Answer: A"));
        assert_eq!(g.usage.output_tokens, Some(10));
        assert_eq!(g.usage.total_tokens, Some(10));
        assert!((g.latency_sec - 0.25).abs() < 1e-12);
    }
}
