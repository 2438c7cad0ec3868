// ============================================================
// Layer 4 — Task Catalog
// ============================================================
// Maps task identifiers ("klue-ner", "klue-mrc", ...) to their
// raw catalog entries. The catalog is read once and never
// modified afterwards.
//
// Sources, in order of preference:
//   1. a JSON file given on the command line (--catalog)
//   2. the catalog embedded in the binary (assets/benchmarks.json)
//
// Lookup rules for get_task_info(name):
//   - an exact identifier returns that one task
//   - otherwise `name` is treated as a group prefix and every
//     task "<name>-*" is returned, in catalog order
//   - no match returns an empty Vec, never an error

use std::{fs, path::Path};

use serde_json::{Map, Value};

use crate::domain::task_info::{TaskInfo, TASK_SEPARATOR};
use crate::error::{FinetuneError, Result};

/// Catalog shipped with the crate
pub const DEFAULT_CATALOG: &str = include_str!("../../assets/benchmarks.json");

#[derive(Debug, Clone)]
pub struct TaskCatalog {
    entries: Map<String, Value>,
}

impl TaskCatalog {
    /// Parse a catalog from JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json).map_err(|e| FinetuneError::Catalog {
            message: format!("malformed catalog: {e}"),
        })?;
        match value {
            Value::Object(entries) => Ok(Self { entries }),
            _ => Err(FinetuneError::Catalog {
                message: "the catalog must be a JSON object keyed by task identifier".to_string(),
            }),
        }
    }

    /// Load a catalog file. A missing or malformed file is fatal.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| FinetuneError::Catalog {
            message: format!("cannot read '{}': {e}", path.display()),
        })?;
        let catalog = Self::from_json(&json)?;
        tracing::info!("Loaded {} tasks from '{}'", catalog.len(), path.display());
        Ok(catalog)
    }

    /// The embedded catalog
    pub fn builtin() -> Result<Self> {
        Self::from_json(DEFAULT_CATALOG)
    }

    /// Use `path` when given, the embedded catalog otherwise
    pub fn load_or_builtin(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Self::builtin(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Task identifiers in catalog order
    pub fn task_ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Resolve a task identifier or a task group into descriptors.
    ///
    /// Entries that fail to build a descriptor are an error: a
    /// catalog that names a task must describe it correctly.
    pub fn get_task_info(&self, name: &str) -> Result<Vec<TaskInfo>> {
        if let Some(entry) = self.entries.get(name) {
            return Ok(vec![TaskInfo::from_entry(name, entry)?]);
        }

        let infos = self
            .entries
            .iter()
            .filter(|(key, _)| group_of(key) == name)
            .map(|(key, entry)| TaskInfo::from_entry(key, entry))
            .collect::<Result<Vec<_>>>()?;

        if infos.is_empty() {
            tracing::debug!("No catalog task or group matches '{}'", name);
        }
        Ok(infos)
    }
}

/// Text before the first separator
fn group_of(task_id: &str) -> &str {
    task_id.split(TASK_SEPARATOR).next().unwrap_or(task_id)
}
