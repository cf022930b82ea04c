//! Authoritative reads of which entities still lack a payload.

use serde_json::Value;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::error::{BatchError, BatchResult};

/// Source of truth for "did the update land"
///
/// Given the candidate ids, return those that still show an empty or missing
/// payload. Implementations that cannot scope their answer may return ids
/// outside `candidates`; reconciliation reports those as unexpected.
pub trait AuthoritativeReader {
    fn still_empty(&self, candidates: &BTreeSet<String>) -> BatchResult<BTreeSet<String>>;
}

/// Result of an authoritative query captured ahead of time
///
/// File formats:
/// - a JSON array of ids (strings or numbers)
/// - a JSON array of row objects carrying the key column, e.g.
///   `[{"ploomes_deal_id": "42", "id": 7}]`
/// - plain text, one id per line (`#` comments and blank lines ignored)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StillEmptySnapshot {
    ids: BTreeSet<String>,
}

impl StillEmptySnapshot {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_path(path: impl AsRef<Path>, key_column: &str) -> BatchResult<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| BatchError::io(path, e))?;
        let snapshot = Self::parse(&raw, key_column)?;

        debug!(
            path = %path.display(),
            still_empty = snapshot.len(),
            "Loaded still-empty snapshot"
        );

        Ok(snapshot)
    }

    pub fn parse(raw: &str, key_column: &str) -> BatchResult<Self> {
        let trimmed = raw.trim_start();
        if !trimmed.starts_with('[') {
            let ids = trimmed
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(str::to_string);
            return Ok(Self::new(ids));
        }

        let values: Vec<Value> = serde_json::from_str(trimmed)?;
        let ids = values
            .iter()
            .enumerate()
            .map(|(position, value)| {
                snapshot_id(value, key_column).ok_or_else(|| {
                    BatchError::Reconciliation(format!(
                        "snapshot entry {position} is not an id or a row with '{key_column}'"
                    ))
                })
            })
            .collect::<BatchResult<BTreeSet<String>>>()?;

        Ok(Self { ids })
    }

    pub fn ids(&self) -> &BTreeSet<String> {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

fn snapshot_id(value: &Value, key_column: &str) -> Option<String> {
    let id = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Object(row) => return snapshot_id(row.get(key_column)?, key_column),
        _ => return None,
    };
    Some(id).filter(|id| !id.is_empty())
}

impl AuthoritativeReader for StillEmptySnapshot {
    fn still_empty(&self, _candidates: &BTreeSet<String>) -> BatchResult<BTreeSet<String>> {
        Ok(self.ids.clone())
    }
}
