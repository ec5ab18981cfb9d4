//! Errors surfaced by `migrate_up` / `migrate_down`.

use thiserror::Error;

/// Failure of a runner operation.
///
/// `NothingToRevert` and `MissingMigration` are expected, terminal conditions
/// that callers may branch on. Every infrastructure failure (setup, state
/// query, action, persistence) arrives as `Chained`.
#[derive(Debug, Error)]
pub enum MigrateError {
    /// `migrate_down` found no applied migrations.
    #[error("no migrations to migrate down")]
    NothingToRevert,

    /// The recorded marker matches no candidate migration; the source and the
    /// state store have diverged.
    #[error("could not find migration with version {0}")]
    MissingMigration(String),

    /// A collaborator failure, rendered as the context line followed by the
    /// cause on an indented continuation line.
    #[error("{context}\n\t{cause:#}")]
    Chained {
        context: String,
        cause: anyhow::Error,
    },
}

impl MigrateError {
    /// True for the expected conditions (`NothingToRevert`, `MissingMigration`).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::NothingToRevert | Self::MissingMigration(_))
    }
}

/// Combine a context message and an underlying error into one readable error.
pub fn chain(context: impl Into<String>, cause: impl Into<anyhow::Error>) -> MigrateError {
    MigrateError::Chained {
        context: context.into(),
        cause: cause.into(),
    }
}
