// ============================================================
// Layer 6 — Output Store
// ============================================================
// Reads example files and writes preprocessing results.
//
// What gets written per run:
//   1. <name>.jsonl             — one aligned Feature per line
//   2. preprocess_config.json   — the settings that produced it
//
// Example files are JSON lines: one object per example, keys are
// column names ("guid", "context", "question", "answers", ...).
//
// Reference: Rust Book §9 (Error Handling)
//            Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::{
    fs::{self, File},
    io::{BufRead, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use crate::domain::batch::Feature;

pub const CONFIG_FILE: &str = "preprocess_config.json";

pub struct OutputStore {
    dir: PathBuf,
}

impl OutputStore {
    /// Create the output directory if it doesn't already exist
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create output directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Save a run configuration as pretty JSON
    pub fn save_config<T: Serialize>(&self, cfg: &T) -> Result<PathBuf> {
        let path = self.dir.join(CONFIG_FILE);
        let json = serde_json::to_string_pretty(cfg)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        tracing::debug!("Saved run config to '{}'", path.display());
        Ok(path)
    }

    pub fn load_config<T: DeserializeOwned>(&self) -> Result<T> {
        let path = self.dir.join(CONFIG_FILE);
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read config from '{}'", path.display()))?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Open `<dir>/<name>` for writing features
    pub fn feature_writer(&self, name: &str) -> Result<FeatureWriter> {
        let path = self.dir.join(name);
        let file = File::create(&path)
            .with_context(|| format!("Cannot create '{}'", path.display()))?;
        Ok(FeatureWriter { path, out: BufWriter::new(file), written: 0 })
    }
}

/// Appends features as JSON lines
pub struct FeatureWriter {
    path:    PathBuf,
    out:     BufWriter<File>,
    written: usize,
}

impl FeatureWriter {
    pub fn write_all(&mut self, features: &[Feature]) -> Result<()> {
        for feature in features {
            serde_json::to_writer(&mut self.out, feature)?;
            self.out.write_all(b"\n")?;
        }
        self.written += features.len();
        Ok(())
    }

    /// Flush and report how many features were written
    pub fn finish(mut self) -> Result<(PathBuf, usize)> {
        self.out
            .flush()
            .with_context(|| format!("Cannot flush '{}'", self.path.display()))?;
        Ok((self.path, self.written))
    }
}

/// Read a JSON-lines file; blank lines are skipped
pub fn read_jsonl(path: impl AsRef<Path>) -> Result<Vec<Value>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("Cannot open '{}'", path.display()))?;

    let mut rows = Vec::new();
    for (n, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let row = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}: invalid JSON", path.display(), n + 1))?;
        rows.push(row);
    }
    Ok(rows)
}
