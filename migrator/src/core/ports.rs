//! Collaborator contracts consumed by the runner.
//!
//! Both traits are injected into [`MigrationRunner`](crate::runner::MigrationRunner)
//! at construction. Calls are made strictly one at a time; cancellation or
//! deadlines, if wanted, belong inside the implementations.

use anyhow::Result;

use super::migration::Migration;

/// Supplies the full candidate set of migrations.
///
/// Order is not significant to the runner, and there is no error path: a
/// source that can fail must be prepared (loaded, validated) before it is
/// handed to a runner.
pub trait MigrationSource {
    fn migrations(&self) -> &[Migration];
}

impl MigrationSource for Vec<Migration> {
    fn migrations(&self) -> &[Migration] {
        self
    }
}

/// Persists which migrations have been applied.
pub trait StateStore {
    /// Idempotent initialization, called once per runner operation before
    /// anything else.
    fn setup(&mut self) -> Result<()>;

    /// Version of the most recently applied migration, or `None` if nothing
    /// is applied.
    fn latest_version(&self) -> Result<Option<String>>;

    /// Record `version` as applied. After this, `latest_version` returns it.
    fn record_applied(&mut self, version: &str) -> Result<()>;

    /// Remove the record for `version`. The marker must then fall back to the
    /// most recent remaining record.
    fn remove_record(&mut self, version: &str) -> Result<()>;
}
