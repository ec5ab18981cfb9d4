//! In-memory [`StateStore`] for embedding and tests.

use anyhow::{Result, bail};

use crate::core::ports::StateStore;

/// Keeps applied versions in memory. The latest marker is the greatest
/// remaining version, so it falls back correctly after a removal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStore {
    applied: Vec<String>,
    ready: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that already has `versions` applied.
    pub fn with_applied<I, V>(versions: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        Self {
            applied: versions.into_iter().map(Into::into).collect(),
            ready: false,
        }
    }

    /// Applied versions in recording order.
    pub fn applied(&self) -> &[String] {
        &self.applied
    }

    /// True once `setup` has run.
    pub fn is_ready(&self) -> bool {
        self.ready
    }
}

impl StateStore for MemoryStore {
    fn setup(&mut self) -> Result<()> {
        self.ready = true;
        Ok(())
    }

    fn latest_version(&self) -> Result<Option<String>> {
        Ok(self.applied.iter().max().cloned())
    }

    fn record_applied(&mut self, version: &str) -> Result<()> {
        if self.applied.iter().any(|applied| applied == version) {
            bail!("migration {version} is already recorded");
        }
        self.applied.push(version.to_string());
        Ok(())
    }

    fn remove_record(&mut self, version: &str) -> Result<()> {
        let Some(index) = self.applied.iter().position(|applied| applied == version) else {
            bail!("migration {version} is not recorded");
        };
        self.applied.remove(index);
        Ok(())
    }
}
