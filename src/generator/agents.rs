//! Local agent CLIs as generators.
//!
//! Supports multiple LLM agents via `provider = "cli:<agent>"`:
//! - `claude`: Claude CLI (`claude --print -p`)
//! - `gemini`: Gemini CLI (`gemini -o text -y`)
//! - `codex`: Codex CLI (`codex exec`, prompt on stdin, answer via output file)
//!
//! None of these report token counts, so usage is always absent.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::str::FromStr;
use std::time::Instant;

use tracing::warn;

use super::{Generator, fallback_generation};
use crate::types::{Generation, Usage};

/// Which agent CLI to invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Agent {
    #[default]
    Claude,
    Gemini,
    /// OpenAI Codex CLI
    Codex,
}

impl FromStr for Agent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "claude" => Ok(Agent::Claude),
            "gemini" => Ok(Agent::Gemini),
            "codex" | "o3" => Ok(Agent::Codex),
            _ => Err(format!("Unknown agent: {}. Use 'claude', 'gemini', or 'codex'", s)),
        }
    }
}

impl std::fmt::Display for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Agent::Claude => write!(f, "claude"),
            Agent::Gemini => write!(f, "gemini"),
            Agent::Codex => write!(f, "codex"),
        }
    }
}

/// Generator that shells out to an agent CLI per call.
#[derive(Debug, Clone)]
pub struct AgentGenerator {
    agent: Agent,
    model: Option<String>,
}

impl AgentGenerator {
    pub fn new(agent: Agent, model: Option<String>) -> Self {
        Self { agent, model }
    }

    fn call(&self, prompt: &str) -> Result<String, String> {
        let model = self.model.as_deref();
        match self.agent {
            Agent::Claude => call_claude(prompt, model),
            Agent::Gemini => call_gemini(prompt, model),
            Agent::Codex => call_codex(prompt, model),
        }
    }
}

impl Generator for AgentGenerator {
    fn generate(&mut self, prompt: &str, _stop: Option<&[String]>) -> Generation {
        let start = Instant::now();
        match self.call(prompt) {
            Ok(text) => Generation::new(text, Usage::absent(), start.elapsed().as_secs_f64()),
            Err(e) => {
                warn!(agent = %self.agent, error = %e, "agent call failed, substituting fallback");
                fallback_generation(start.elapsed().as_secs_f64())
            }
        }
    }

    fn name(&self) -> String {
        match &self.model {
            Some(m) => format!("cli:{}({})", self.agent, m),
            None => format!("cli:{}", self.agent),
        }
    }
}

/// Call Claude CLI and return response.
fn call_claude(prompt: &str, model: Option<&str>) -> Result<String, String> {
    let mut cmd = Command::new("claude");
    if let Some(m) = model {
        cmd.args(["--model", m]);
    }
    cmd.args(["--print", "-p", prompt]);

    let output = cmd
        .output()
        .map_err(|e| format!("Failed to execute claude: {}", e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!("Claude returned error: {}", stderr));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Call Gemini CLI in plain-text mode.
fn call_gemini(prompt: &str, model: Option<&str>) -> Result<String, String> {
    let mut cmd = Command::new("gemini");
    cmd.args(["-o", "text", "-y"]);
    if let Some(m) = model {
        cmd.args(["-m", m]);
    }
    cmd.arg(prompt);

    let output = cmd
        .output()
        .map_err(|e| format!("Failed to execute gemini: {}", e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!("Gemini returned error: {}", stderr));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Output file for `codex exec -o`, removed on drop whatever happens.
struct ScratchFile(PathBuf);

impl Drop for ScratchFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.0);
    }
}

/// Call Codex CLI: prompt on stdin, answer written to a scratch file.
fn call_codex(prompt: &str, model: Option<&str>) -> Result<String, String> {
    let scratch = ScratchFile(
        std::env::temp_dir().join(format!("tutorgram_codex_{}.txt", std::process::id())),
    );

    let mut cmd = Command::new("codex");
    cmd.args(["exec", "--skip-git-repo-check"]);
    if let Some(m) = model {
        cmd.args(["-m", m]);
    }
    cmd.arg("-o").arg(&scratch.0).arg("-");

    let mut child = cmd
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| format!("Failed to execute codex: {}", e))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(prompt.as_bytes())
            .map_err(|e| format!("Failed to write to codex stdin: {}", e))?;
    }

    let output = child
        .wait_with_output()
        .map_err(|e| format!("Failed to wait for codex: {}", e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!("Codex returned error: {}", stderr));
    }

    let response = std::fs::read_to_string(&scratch.0)
        .map_err(|e| format!("Failed to read codex output: {}", e))?;

    Ok(response.trim().to_string())
}
