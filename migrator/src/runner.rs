//! Orchestration for `migrator up` and `migrator down`.
//!
//! The runner never persists a state change before the matching action has
//! completed, and never starts a second action before the previous state
//! change has resolved. Any failure aborts the operation and leaves the store
//! exactly as far as it got; nothing is retried or rolled back.

use tracing::{info, instrument};

use crate::core::migration::is_pending;
use crate::core::ports::{MigrationSource, StateStore};
use crate::error::{MigrateError, chain};
use crate::status::{StatusReport, build_report};

/// Applies and reverts migrations from `source`, tracking them in `store`.
pub struct MigrationRunner<S, T> {
    source: S,
    store: T,
}

impl<S: MigrationSource, T: StateStore> MigrationRunner<S, T> {
    pub fn new(source: S, store: T) -> Self {
        Self { source, store }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn store(&self) -> &T {
        &self.store
    }

    pub fn into_parts(self) -> (S, T) {
        (self.source, self.store)
    }

    /// Run the forward action of every candidate newer than the latest
    /// applied version, in source order, recording each one as it succeeds.
    ///
    /// With no latest version, every candidate runs. Candidates are compared
    /// to the marker one by one; the candidate set is never sorted.
    ///
    /// # Errors
    ///
    /// * If store setup fails
    /// * If the latest version cannot be read
    /// * If a forward action fails (later candidates are not attempted)
    /// * If recording an applied migration fails (its effects already happened)
    #[instrument(skip_all)]
    pub fn migrate_up(&mut self) -> Result<(), MigrateError> {
        info!("migrating up");
        self.store
            .setup()
            .map_err(|err| chain("error running setup", err))?;

        let migrations = self.source.migrations();
        let latest = self
            .store
            .latest_version()
            .map_err(|err| chain("error getting latest version", err))?;
        match &latest {
            Some(version) => info!(latest = %version, "latest applied version"),
            None => info!("no applied migrations found"),
        }

        for migration in migrations {
            if !is_pending(migration.version(), latest.as_deref()) {
                info!(migration = %migration.label(), "skipping");
                continue;
            }

            info!(migration = %migration.label(), "running");
            migration.up().map_err(|err| {
                chain(
                    format!("error running migration {}", migration.version()),
                    err,
                )
            })?;
            self.store
                .record_applied(migration.version())
                .map_err(|err| {
                    chain(
                        format!("error saving migration {}", migration.version()),
                        err,
                    )
                })?;
        }

        info!("finished running migrations");
        Ok(())
    }

    /// Run the reverse action of the latest applied migration and remove its
    /// record. Multi-step rollback is repeated calls.
    ///
    /// # Errors
    ///
    /// * [`MigrateError::NothingToRevert`] if no migration is applied
    /// * [`MigrateError::MissingMigration`] if the latest version matches no candidate
    /// * If store setup fails or the latest version cannot be read
    /// * If the reverse action fails (the record is left in place)
    /// * If removing the record fails (the reverse action already ran)
    #[instrument(skip_all)]
    pub fn migrate_down(&mut self) -> Result<(), MigrateError> {
        info!("migrating down");
        self.store
            .setup()
            .map_err(|err| chain("error running setup", err))?;

        let migrations = self.source.migrations();
        let latest = self
            .store
            .latest_version()
            .map_err(|err| chain("error getting latest version", err))?
            .ok_or(MigrateError::NothingToRevert)?;

        let migration = migrations
            .iter()
            .find(|migration| migration.version() == latest)
            .ok_or_else(|| MigrateError::MissingMigration(latest.clone()))?;

        info!(migration = %migration.label(), "running");
        migration
            .down()
            .map_err(|err| chain(format!("error running migration {latest}"), err))?;
        self.store
            .remove_record(&latest)
            .map_err(|err| chain(format!("error deleting migration {latest}"), err))?;

        info!("finished running migrations");
        Ok(())
    }

    /// Report which candidates are applied and which are pending. Read-only:
    /// no action runs and no record changes.
    ///
    /// # Errors
    ///
    /// * If store setup fails or the latest version cannot be read
    #[instrument(skip_all)]
    pub fn status(&mut self) -> Result<StatusReport, MigrateError> {
        self.store
            .setup()
            .map_err(|err| chain("error running setup", err))?;
        let latest = self
            .store
            .latest_version()
            .map_err(|err| chain("error getting latest version", err))?;
        Ok(build_report(self.source.migrations(), latest))
    }
}
