//! Migration records and version-key ordering.

use std::fmt;

use anyhow::Result;

/// Forward/reverse action pair for a single migration.
///
/// Each concrete migration is its own implementing value. Dependencies an
/// action needs (connections, paths, handles) belong on the implementing type.
pub trait Migrator {
    /// Apply the migration's change.
    fn up(&self) -> Result<()>;

    /// Undo the migration's change.
    fn down(&self) -> Result<()>;
}

/// A versioned migration as supplied by a [`MigrationSource`](super::ports::MigrationSource).
///
/// The version key is compared with plain string ordering, so callers must
/// pick an encoding where that ordering is chronological (zero-padded
/// sequence numbers or timestamps). It is never validated here.
pub struct Migration {
    version: String,
    description: Option<String>,
    migrator: Box<dyn Migrator>,
}

impl Migration {
    pub fn new(version: impl Into<String>, migrator: impl Migrator + 'static) -> Self {
        Self {
            version: version.into(),
            description: None,
            migrator: Box::new(migrator),
        }
    }

    /// Attach a display-only description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// `version` or `version (description)`, for progress output.
    pub fn label(&self) -> String {
        match &self.description {
            Some(description) => format!("{} ({})", self.version, description),
            None => self.version.clone(),
        }
    }

    pub fn up(&self) -> Result<()> {
        self.migrator.up()
    }

    pub fn down(&self) -> Result<()> {
        self.migrator.down()
    }
}

impl fmt::Debug for Migration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Migration")
            .field("version", &self.version)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// True if a migration with `version` still has to run given the latest
/// applied marker: either nothing is applied or `version` sorts strictly after it.
pub fn is_pending(version: &str, latest: Option<&str>) -> bool {
    latest.is_none_or(|latest| version > latest)
}
