//! Stable exit codes for migrator CLI commands.

use crate::error::MigrateError;

/// Command succeeded.
pub const OK: i32 = 0;
/// Command failed (config, setup, state, script or persistence errors).
pub const FAILED: i32 = 1;
/// `migrator down` found no applied migrations.
pub const NOTHING_TO_REVERT: i32 = 2;
/// The latest applied version matches no migration on disk.
pub const INCONSISTENT: i32 = 3;

/// Exit code for an error returned by a command.
pub fn for_error(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<MigrateError>() {
        Some(MigrateError::NothingToRevert) => NOTHING_TO_REVERT,
        Some(MigrateError::MissingMigration(_)) => INCONSISTENT,
        _ => FAILED,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::chain;
    use anyhow::anyhow;

    #[test]
    fn terminal_errors_map_to_dedicated_codes() {
        assert_eq!(for_error(&MigrateError::NothingToRevert.into()), NOTHING_TO_REVERT);
        assert_eq!(
            for_error(&MigrateError::MissingMigration("05".to_string()).into()),
            INCONSISTENT
        );
    }

    #[test]
    fn everything_else_fails() {
        assert_eq!(for_error(&chain("error running setup", anyhow!("boom")).into()), FAILED);
        assert_eq!(for_error(&anyhow!("parse config")), FAILED);
    }
}
