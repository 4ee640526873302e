//! Run ledger: the on-disk record of one run.
//!
//! Layout (plain modes):
//!
//! ```text
//! <runs-dir>/<YYYYmmdd-HHMMSS>_<mode>[_<dataset>][_t<threshold>]/
//!   base_prompt.txt
//!   dev/records.jsonl
//!   test/records.jsonl
//!   summary.json
//! ```
//!
//! Run directories are created exclusively and never reused. Records are
//! appended and flushed one at a time so an aborted run keeps what it had.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{EvalError, Result};

pub const RECORDS_FILE: &str = "records.jsonl";
pub const SUMMARY_FILE: &str = "summary.json";

/// Timestamp used in run directory names.
pub fn timestamp() -> String {
    chrono::Local::now().format("%Y%m%d-%H%M%S").to_string()
}

/// Directory name for a run: `<ts>_<mode>[_<dataset>][_t<threshold>]`.
pub fn run_name(mode: &str, dataset: Option<&str>, threshold: Option<f64>) -> String {
    let mut name = format!("{}_{}", timestamp(), mode);
    if let Some(ds) = dataset {
        name.push('_');
        name.push_str(ds);
    }
    if let Some(t) = threshold {
        name.push_str(&format!("_t{:.2}", t));
    }
    name
}

/// One run directory, owned exclusively by the current run.
#[derive(Debug, Clone)]
pub struct RunLedger {
    root: PathBuf,
}

impl RunLedger {
    /// Create `<runs_dir>/<name>`, adding `_2`, `_3`, ... on collision.
    pub fn create(runs_dir: &Path, name: &str) -> Result<Self> {
        std::fs::create_dir_all(runs_dir).map_err(|e| EvalError::io(runs_dir, e))?;

        let mut attempt = 1u32;
        loop {
            let candidate = if attempt == 1 {
                runs_dir.join(name)
            } else {
                runs_dir.join(format!("{}_{}", name, attempt))
            };
            match std::fs::create_dir(&candidate) {
                Ok(()) => return Ok(Self { root: candidate }),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => return Err(EvalError::io(&candidate, e)),
            }
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of `rel`, creating its parent directories.
    pub fn path(&self, rel: impl AsRef<Path>) -> Result<PathBuf> {
        let path = self.root.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| EvalError::io(parent, e))?;
        }
        Ok(path)
    }

    pub fn write_text(&self, rel: impl AsRef<Path>, text: &str) -> Result<PathBuf> {
        let path = self.path(rel)?;
        std::fs::write(&path, text).map_err(|e| EvalError::io(&path, e))?;
        Ok(path)
    }

    /// Pretty-printed JSON, replacing any previous content.
    pub fn write_json<T: Serialize + ?Sized>(&self, rel: impl AsRef<Path>, value: &T) -> Result<PathBuf> {
        let path = self.path(rel)?;
        let json = serde_json::to_string_pretty(value)?;
        std::fs::write(&path, json).map_err(|e| EvalError::io(&path, e))?;
        Ok(path)
    }

    /// Append-only writer for `<dir>/records.jsonl`.
    pub fn records(&self, dir: impl AsRef<Path>) -> Result<JsonlWriter> {
        JsonlWriter::create(&self.path(dir.as_ref().join(RECORDS_FILE))?)
    }
}

/// Line-per-value JSON writer, flushed after every line.
pub struct JsonlWriter {
    path: PathBuf,
    out: BufWriter<File>,
}

impl JsonlWriter {
    pub fn create(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| EvalError::io(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            out: BufWriter::new(file),
        })
    }

    pub fn append<T: Serialize>(&mut self, value: &T) -> Result<()> {
        serde_json::to_writer(&mut self.out, value)?;
        self.out
            .write_all(b"\n")
            .and_then(|_| self.out.flush())
            .map_err(|e| EvalError::io(&self.path, e))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Read a JSON Lines file back (used by tooling and tests).
pub fn read_jsonl<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let content = std::fs::read_to_string(path).map_err(|e| EvalError::io(path, e))?;
    content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).map_err(EvalError::from))
        .collect()
}
