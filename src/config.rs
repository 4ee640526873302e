//! Configuration loading from tutorgram.toml.
//!
//! Search order mirrors common Rust/Python tooling:
//! 1. An explicit `--config` path
//! 2. `tutorgram.toml` in the working directory
//! 3. Walk up parent directories looking for `tutorgram.toml`
//! 4. Built-in defaults
//!
//! ## Example
//!
//! ```toml
//! seed = 7
//!
//! [model]
//! provider = "openai"
//! model-id = "gpt-4o-mini"
//!
//! [dataset]
//! name = "arc_easy"
//! n-dev = 50
//!
//! [hybrid]
//! threshold = 0.6
//! ```
//!
//! `Config` is a plain value. Sweeps and multi-dataset runs derive per-cell
//! configs in memory with [`Config::with_dataset`] / [`Config::with_threshold`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{EvalError, Result};
use crate::types::{DatasetDescriptor, PromptFamily};

pub const CONFIG_FILE: &str = "tutorgram.toml";

/// Tutoring prompt used when `evaluation.base-prompt-path` is not set.
pub const DEFAULT_BASE_PROMPT: &str = "You are a careful tutor answering multiple-choice questions.
Read the question and every choice before deciding.
Reason briefly and concretely; do not restate the question.
Commit to exactly one of the allowed letters.";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    /// Global seed; per-example seeds are derived from it
    pub seed: u64,
    pub model: ModelConfig,
    pub dataset: DatasetConfig,
    pub evaluation: EvaluationConfig,
    pub hybrid: HybridConfig,
    pub evolution: EvolutionConfig,
    pub sweep: SweepConfig,
    pub logging: LoggingConfig,

    /// File this config was read from (for display)
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ModelConfig {
    /// openai | anthropic | mock | always_a | cli:claude | cli:gemini | cli:codex
    pub provider: String,
    /// Backend default when absent
    pub model_id: Option<String>,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub request_timeout_secs: u64,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DatasetConfig {
    pub name: String,
    /// Splits live at `<root>/<name>/{dev,test}.jsonl`
    pub root: PathBuf,
    pub n_dev: usize,
    pub n_test: usize,
    /// Overrides the family derived from the dataset name
    pub family: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct EvaluationConfig {
    pub shuffle_choices: bool,
    pub base_prompt_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct HybridConfig {
    /// Minimum auditor confidence for an override
    pub threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct EvolutionConfig {
    /// Failures shown to the reflection call
    pub num_reflection_examples: usize,
    /// Edits requested from the reflection call
    pub num_edits: usize,
    /// Longer edits are cut to this many lines
    pub max_edit_lines: usize,
    /// Joins base prompt and edit text
    pub separator: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SweepConfig {
    pub thresholds: Vec<f64>,
    /// Empty means just `dataset.name`
    pub datasets: Vec<String>,
    /// Per-dataset threshold lists, replacing `thresholds`
    pub dataset_specific: BTreeMap<String, Vec<f64>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LoggingConfig {
    pub runs_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            seed: 42,
            model: ModelConfig::default(),
            dataset: DatasetConfig::default(),
            evaluation: EvaluationConfig::default(),
            hybrid: HybridConfig::default(),
            evolution: EvolutionConfig::default(),
            sweep: SweepConfig::default(),
            logging: LoggingConfig::default(),
            source: None,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig {
            provider: "mock".to_string(),
            model_id: None,
            temperature: 0.2,
            max_output_tokens: 256,
            request_timeout_secs: 60,
            base_url: None,
        }
    }
}

impl Default for DatasetConfig {
    fn default() -> Self {
        DatasetConfig {
            name: "synthetic".to_string(),
            root: PathBuf::from("data"),
            n_dev: 20,
            n_test: 20,
            family: None,
        }
    }
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        EvaluationConfig {
            shuffle_choices: true,
            base_prompt_path: None,
        }
    }
}

impl Default for HybridConfig {
    fn default() -> Self {
        HybridConfig { threshold: 0.5 }
    }
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        EvolutionConfig {
            num_reflection_examples: 8,
            num_edits: 3,
            max_edit_lines: 5,
            separator: "\n\n".to_string(),
        }
    }
}

impl Default for SweepConfig {
    fn default() -> Self {
        SweepConfig {
            thresholds: vec![0.3, 0.5, 0.7, 0.9],
            datasets: Vec::new(),
            dataset_specific: BTreeMap::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            runs_dir: PathBuf::from("runs"),
        }
    }
}

impl Config {
    /// Discover configuration starting at `directory`.
    ///
    /// Returns defaults when no file is found; a file that exists but fails
    /// to parse is an error rather than a silent fallback.
    pub fn load(directory: &Path) -> Result<Self> {
        let mut current = Some(directory.to_path_buf());
        while let Some(dir) = current {
            let candidate = dir.join(CONFIG_FILE);
            if candidate.exists() {
                return Self::from_path(&candidate);
            }
            current = dir.parent().map(Path::to_path_buf);
        }
        Ok(Self::default())
    }

    /// Load from an explicit file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| EvalError::io(path, e))?;
        let mut config = Self::from_toml_str(&content)?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no run could use.
    pub fn validate(&self) -> Result<()> {
        check_threshold(self.hybrid.threshold)?;
        for t in self
            .sweep
            .thresholds
            .iter()
            .chain(self.sweep.dataset_specific.values().flatten())
        {
            check_threshold(*t)?;
        }
        if self.evolution.max_edit_lines == 0 {
            return Err(EvalError::Config("evolution.max-edit-lines must be at least 1".into()));
        }
        if let Some(family) = &self.dataset.family {
            family.parse::<PromptFamily>().map_err(EvalError::Config)?;
        }
        Ok(())
    }

    /// The dataset this config points at, with its family resolved once.
    pub fn descriptor(&self) -> Result<DatasetDescriptor> {
        let family = match &self.dataset.family {
            Some(f) => Some(f.parse::<PromptFamily>().map_err(EvalError::Config)?),
            None => None,
        };
        Ok(DatasetDescriptor::new(&self.dataset.name, &self.dataset.root, family))
    }

    /// Base tutoring prompt: file contents if configured, else the built-in prompt.
    pub fn base_prompt(&self) -> Result<String> {
        match &self.evaluation.base_prompt_path {
            Some(path) => std::fs::read_to_string(path)
                .map(|s| s.trim_end().to_string())
                .map_err(|e| EvalError::io(path, e)),
            None => Ok(DEFAULT_BASE_PROMPT.to_string()),
        }
    }

    /// Same config, different dataset. A family override is dropped since it
    /// belonged to the previous dataset.
    pub fn with_dataset(&self, name: &str) -> Self {
        let mut config = self.clone();
        if config.dataset.name != name {
            config.dataset.name = name.to_string();
            config.dataset.family = None;
        }
        config
    }

    pub fn with_threshold(&self, threshold: f64) -> Self {
        let mut config = self.clone();
        config.hybrid.threshold = threshold;
        config
    }

    /// Datasets a sweep should visit.
    pub fn sweep_datasets(&self) -> Vec<String> {
        if self.sweep.datasets.is_empty() {
            vec![self.dataset.name.clone()]
        } else {
            self.sweep.datasets.clone()
        }
    }

    /// Thresholds to sweep for a dataset.
    pub fn sweep_thresholds(&self, dataset: &str) -> Vec<f64> {
        self.sweep
            .dataset_specific
            .get(dataset)
            .cloned()
            .unwrap_or_else(|| self.sweep.thresholds.clone())
    }

    /// Format config for verbose display.
    pub fn display_summary(&self) -> String {
        let mut lines = Vec::new();

        match &self.source {
            Some(source) => lines.push(format!("   Config:    {}", source.display())),
            None => lines.push("   Config:    (defaults)".to_string()),
        }
        lines.push(format!(
            "   Provider:  {} ({})",
            self.model.provider,
            self.model.model_id.as_deref().unwrap_or("default model")
        ));
        lines.push(format!(
            "   Dataset:   {} (dev {}, test {})",
            self.dataset.name, self.dataset.n_dev, self.dataset.n_test
        ));
        lines.push(format!("   Seed:      {}", self.seed));
        lines.push(format!("   Threshold: {:.2}", self.hybrid.threshold));
        lines.push(format!("   Runs dir:  {}", self.logging.runs_dir.display()));

        lines.join("\n")
    }
}

fn check_threshold(t: f64) -> Result<()> {
    if (0.0..=1.0).contains(&t) {
        Ok(())
    } else {
        Err(EvalError::Config(format!("threshold {} outside [0, 1]", t)))
    }
}
