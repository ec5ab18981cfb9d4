//! Applied/pending report for `migrator status`.

use std::fmt;

use crate::core::migration::{Migration, is_pending};

/// Whether a candidate is covered by the latest applied marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationState {
    Applied,
    Pending,
}

/// One candidate in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    pub version: String,
    pub description: Option<String>,
    pub state: MigrationState,
}

/// Snapshot of the marker and every candidate's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub latest: Option<String>,
    pub migrations: Vec<MigrationStatus>,
}

impl StatusReport {
    pub fn pending(&self) -> impl Iterator<Item = &MigrationStatus> {
        self.migrations
            .iter()
            .filter(|migration| migration.state == MigrationState::Pending)
    }
}

/// Human-readable listing: the marker, then one line per candidate.
impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "latest applied: {}",
            self.latest.as_deref().unwrap_or("none")
        )?;
        for migration in &self.migrations {
            let state = match migration.state {
                MigrationState::Applied => "applied",
                MigrationState::Pending => "pending",
            };
            match &migration.description {
                Some(description) => {
                    writeln!(f, "  [{state}] {} {description}", migration.version)?;
                }
                None => writeln!(f, "  [{state}] {}", migration.version)?,
            }
        }
        Ok(())
    }
}

/// Classify `migrations` against `latest` with the same rule `migrate_up` uses.
pub fn build_report(migrations: &[Migration], latest: Option<String>) -> StatusReport {
    let migrations = migrations
        .iter()
        .map(|migration| MigrationStatus {
            version: migration.version().to_string(),
            description: migration.description().map(str::to_string),
            state: if is_pending(migration.version(), latest.as_deref()) {
                MigrationState::Pending
            } else {
                MigrationState::Applied
            },
        })
        .collect();
    StatusReport { latest, migrations }
}
