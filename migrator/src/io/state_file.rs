//! File-backed [`StateStore`] (`.migrator/state.json`).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::ports::StateStore;
use crate::io::atomic::write_atomic;

/// Persisted record of applied migrations.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StateDocument {
    /// Applied migrations in recording order.
    pub applied: Vec<AppliedRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppliedRecord {
    pub version: String,
    /// RFC 3339 UTC timestamp of when the forward action completed.
    pub applied_at: String,
}

impl StateDocument {
    /// Greatest recorded version, i.e. the latest applied marker.
    pub fn latest(&self) -> Option<&str> {
        self.applied
            .iter()
            .map(|record| record.version.as_str())
            .max()
    }

    pub fn contains(&self, version: &str) -> bool {
        self.applied.iter().any(|record| record.version == version)
    }
}

/// State store that reads and rewrites a JSON document on every call.
#[derive(Debug, Clone)]
pub struct JsonStateStore {
    path: PathBuf,
}

impl JsonStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<StateDocument> {
        load_state(&self.path)
    }
}

impl StateStore for JsonStateStore {
    fn setup(&mut self) -> Result<()> {
        if self.path.exists() {
            // Surface a corrupt file before any migration runs.
            load_state(&self.path)?;
            return Ok(());
        }
        debug!(path = %self.path.display(), "creating empty state file");
        write_state(&self.path, &StateDocument::default())
    }

    fn latest_version(&self) -> Result<Option<String>> {
        let state = load_state(&self.path)?;
        Ok(state.latest().map(str::to_string))
    }

    fn record_applied(&mut self, version: &str) -> Result<()> {
        let mut state = load_state(&self.path)?;
        if state.contains(version) {
            bail!(
                "migration {version} is already recorded in {}",
                self.path.display()
            );
        }
        state.applied.push(AppliedRecord {
            version: version.to_string(),
            applied_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        });
        write_state(&self.path, &state)
    }

    fn remove_record(&mut self, version: &str) -> Result<()> {
        let mut state = load_state(&self.path)?;
        let Some(index) = state
            .applied
            .iter()
            .position(|record| record.version == version)
        else {
            bail!(
                "migration {version} is not recorded in {}",
                self.path.display()
            );
        };
        state.applied.remove(index);
        write_state(&self.path, &state)
    }
}

/// Load the state document from disk.
pub fn load_state(path: &Path) -> Result<StateDocument> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read state {}", path.display()))?;
    let state: StateDocument = serde_json::from_str(&contents)
        .with_context(|| format!("parse state {}", path.display()))?;
    debug!(path = %path.display(), applied = state.applied.len(), "state loaded");
    Ok(state)
}

/// Atomically write the state document (temp file + rename).
pub fn write_state(path: &Path, state: &StateDocument) -> Result<()> {
    debug!(path = %path.display(), applied = state.applied.len(), "writing state");
    let mut buf = serde_json::to_string_pretty(state)?;
    buf.push('\n');
    write_atomic(path, &buf, "json.tmp")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(temp: &tempfile::TempDir) -> JsonStateStore {
        JsonStateStore::new(temp.path().join(".migrator").join("state.json"))
    }

    #[test]
    fn setup_creates_empty_document() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut store = store_in(&temp);
        store.setup().expect("setup");

        let contents = fs::read_to_string(store.path()).expect("read");
        assert_eq!(contents, "{\n  \"applied\": []\n}\n");
        assert_eq!(store.latest_version().expect("latest"), None);
    }

    #[test]
    fn setup_keeps_existing_records() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut store = store_in(&temp);
        store.setup().expect("setup");
        store.record_applied("01").expect("record");

        store.setup().expect("setup again");
        assert_eq!(store.latest_version().expect("latest").as_deref(), Some("01"));
    }

    #[test]
    fn setup_rejects_corrupt_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut store = store_in(&temp);
        fs::create_dir_all(store.path().parent().expect("parent")).expect("mkdir");
        fs::write(store.path(), "not json").expect("write");

        let err = store.setup().unwrap_err();
        assert!(err.to_string().contains("parse state"));
    }

    #[test]
    fn latest_is_greatest_remaining_version() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut store = store_in(&temp);
        store.setup().expect("setup");
        for version in ["01", "04", "08"] {
            store.record_applied(version).expect("record");
        }
        assert_eq!(store.latest_version().expect("latest").as_deref(), Some("08"));

        store.remove_record("08").expect("remove");
        assert_eq!(store.latest_version().expect("latest").as_deref(), Some("04"));

        let versions: Vec<String> = store
            .load()
            .expect("load")
            .applied
            .into_iter()
            .map(|record| record.version)
            .collect();
        assert_eq!(versions, vec!["01", "04"]);
    }

    #[test]
    fn record_stamps_applied_at() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut store = store_in(&temp);
        store.setup().expect("setup");
        store.record_applied("01").expect("record");

        let state = store.load().expect("load");
        let stamp = &state.applied[0].applied_at;
        assert!(chrono::DateTime::parse_from_rfc3339(stamp).is_ok(), "{stamp}");
    }

    #[test]
    fn duplicate_record_is_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut store = store_in(&temp);
        store.setup().expect("setup");
        store.record_applied("01").expect("record");

        let err = store.record_applied("01").unwrap_err();
        assert!(err.to_string().contains("already recorded"));
    }

    #[test]
    fn removing_unknown_version_fails() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut store = store_in(&temp);
        store.setup().expect("setup");

        let err = store.remove_record("01").unwrap_err();
        assert!(err.to_string().contains("not recorded"));
    }

    #[test]
    fn latest_without_setup_fails() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = store_in(&temp);
        let err = store.latest_version().unwrap_err();
        assert!(err.to_string().contains("read state"));
    }
}
