//! Error taxonomy.
//!
//! Generator transport failures are deliberately absent: backends substitute
//! a fallback generation at their boundary, so the evaluation loop never sees
//! them. Answer parse failures are not errors either (they yield `None`).

use std::path::{Path, PathBuf};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EvalError>;

#[derive(Debug, Error)]
pub enum EvalError {
    #[error("Unknown strategy: {0}. Use 'baseline', 'self_refine', 'distill_from_self_refine', or 'hybrid'")]
    UnknownStrategy(String),

    #[error("Unknown or unavailable provider: {0}")]
    UnknownProvider(String),

    #[error("Unknown mode: {0}")]
    UnknownMode(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid example {id}: {reason}")]
    InvalidExample { id: String, reason: String },

    #[error("Internal consistency violated for example {id}: {reason}")]
    Consistency { id: String, reason: String },

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl EvalError {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        EvalError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Configuration errors abort immediately; nothing is retried or skipped.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            EvalError::UnknownStrategy(_)
                | EvalError::UnknownProvider(_)
                | EvalError::UnknownMode(_)
                | EvalError::Config(_)
        )
    }
}
