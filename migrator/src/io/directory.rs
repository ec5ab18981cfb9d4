//! Migration source backed by a directory of shell scripts.
//!
//! ```text
//! migrations/
//! ├── 20240101000000_create_users/
//! │   ├── up.sh      # optional forward script
//! │   └── down.sh    # optional reverse script
//! └── 20240215093000_add_index/
//!     └── up.sh
//! ```
//!
//! The directory name is `<version>[_<description>]`; underscores in the
//! description render as spaces. Missing or blank scripts are no-ops.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use tracing::{debug, instrument, warn};

use crate::core::migration::{Migration, Migrator};
use crate::core::ports::MigrationSource;
use crate::io::config::ScriptConfig;
use crate::io::process::{ScriptRequest, run_script};

pub const UP_SCRIPT: &str = "up.sh";
pub const DOWN_SCRIPT: &str = "down.sh";

/// Migrations loaded eagerly from a directory.
///
/// Loading happens in [`DirectorySource::load`], so the runner only ever sees
/// a fully prepared candidate set.
#[derive(Debug)]
pub struct DirectorySource {
    dir: PathBuf,
    migrations: Vec<Migration>,
}

impl DirectorySource {
    /// Scan `dir` for migration subdirectories, in directory-name order.
    ///
    /// A missing directory yields an empty source. Files at the top level
    /// and hidden subdirectories are ignored. Script paths are stored
    /// absolute, since scripts run with their own directory as cwd.
    #[instrument(skip_all, fields(dir = %dir.display()))]
    pub fn load(dir: &Path, script: &ScriptConfig) -> Result<Self> {
        if !dir.exists() {
            warn!("migrations directory missing, no migrations loaded");
            return Ok(Self {
                dir: dir.to_path_buf(),
                migrations: Vec::new(),
            });
        }
        let resolved =
            fs::canonicalize(dir).with_context(|| format!("resolve {}", dir.display()))?;
        let dir = resolved.as_path();

        let mut entries = Vec::new();
        for entry in fs::read_dir(dir).with_context(|| format!("read {}", dir.display()))? {
            let entry = entry.with_context(|| format!("read entry in {}", dir.display()))?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let name = entry
                .file_name()
                .into_string()
                .map_err(|name| anyhow!("non utf-8 migration directory {:?}", name))?;
            if name.starts_with('.') {
                continue;
            }
            entries.push((name, path));
        }
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let migrations = entries
            .into_iter()
            .map(|(name, path)| load_migration(&name, &path, script))
            .collect::<Result<Vec<_>>>()?;
        debug!(count = migrations.len(), "loaded migrations");

        Ok(Self {
            dir: dir.to_path_buf(),
            migrations,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl MigrationSource for DirectorySource {
    fn migrations(&self) -> &[Migration] {
        &self.migrations
    }
}

/// Split `<version>[_<description>]`.
pub fn parse_dir_name(name: &str) -> Result<(String, Option<String>)> {
    let (version, description) = match name.split_once('_') {
        Some((version, rest)) => (version, Some(rest.replace('_', " "))),
        None => (name, None),
    };
    if version.is_empty() {
        bail!("migration directory {name:?} has an empty version");
    }
    let description = description.filter(|description| !description.trim().is_empty());
    Ok((version.to_string(), description))
}

fn load_migration(name: &str, dir: &Path, script: &ScriptConfig) -> Result<Migration> {
    let (version, description) = parse_dir_name(name)?;
    let migrator = ScriptMigrator {
        dir: dir.to_path_buf(),
        up: script_if_present(&dir.join(UP_SCRIPT))?,
        down: script_if_present(&dir.join(DOWN_SCRIPT))?,
        shell: script.shell.clone(),
        timeout: script.timeout(),
        output_limit_bytes: script.output_limit_bytes,
    };
    let migration = Migration::new(version, migrator);
    Ok(match description {
        Some(description) => migration.with_description(description),
        None => migration,
    })
}

fn script_if_present(path: &Path) -> Result<Option<PathBuf>> {
    if !path.exists() {
        return Ok(None);
    }
    let contents =
        fs::read_to_string(path).with_context(|| format!("read script {}", path.display()))?;
    if contents.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(path.to_path_buf()))
}

/// Runs `up.sh` / `down.sh` through the configured shell inside the
/// migration's directory.
#[derive(Debug, Clone)]
pub struct ScriptMigrator {
    dir: PathBuf,
    up: Option<PathBuf>,
    down: Option<PathBuf>,
    shell: Vec<String>,
    timeout: Duration,
    output_limit_bytes: usize,
}

impl ScriptMigrator {
    fn run(&self, script: Option<&Path>) -> Result<()> {
        let Some(script) = script else {
            debug!(dir = %self.dir.display(), "no script, nothing to do");
            return Ok(());
        };

        let output = run_script(&ScriptRequest {
            shell: &self.shell,
            script,
            workdir: &self.dir,
            timeout: self.timeout,
            output_limit_bytes: self.output_limit_bytes,
        })
        .with_context(|| format!("run {}", script.display()))?;
        debug!(script = %script.display(), stdout = %output.stdout.lossy(), "script output");

        if output.timed_out {
            bail!("{} timed out after {:?}", script.display(), self.timeout);
        }
        if !output.status.success() {
            bail!(
                "{} failed with status {:?}: {}",
                script.display(),
                output.status.code(),
                output.stderr.lossy().trim()
            );
        }
        Ok(())
    }
}

impl Migrator for ScriptMigrator {
    fn up(&self) -> Result<()> {
        self.run(self.up.as_deref())
    }

    fn down(&self) -> Result<()> {
        self.run(self.down.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestWorkspace;

    fn load(workspace: &TestWorkspace) -> DirectorySource {
        let cfg = workspace.config();
        DirectorySource::load(&cfg.migrations_path(workspace.path()), &cfg.script).expect("load")
    }

    #[test]
    fn parse_dir_name_splits_version_and_description() {
        assert_eq!(
            parse_dir_name("20240101_create_users").expect("parse"),
            ("20240101".to_string(), Some("create users".to_string()))
        );
        assert_eq!(parse_dir_name("01").expect("parse"), ("01".to_string(), None));
        assert_eq!(parse_dir_name("01_").expect("parse"), ("01".to_string(), None));
        assert!(parse_dir_name("_orphan").is_err());
    }

    #[test]
    fn missing_directory_is_empty() {
        let temp = tempfile::tempdir().expect("tempdir");
        let source =
            DirectorySource::load(&temp.path().join("nope"), &ScriptConfig::default()).expect("load");
        assert!(source.migrations().is_empty());
    }

    #[test]
    fn loads_subdirectories_in_name_order() {
        let workspace = TestWorkspace::new().expect("workspace");
        workspace.add_journaled_migration("10_third").expect("add");
        workspace.add_journaled_migration("01_first").expect("add");
        workspace.add_journaled_migration("04_second_step").expect("add");
        fs::write(workspace.path().join("migrations/README.md"), "notes").expect("write");
        fs::create_dir_all(workspace.path().join("migrations/.hidden")).expect("mkdir");

        let source = load(&workspace);
        let labels: Vec<String> = source.migrations().iter().map(Migration::label).collect();
        assert_eq!(labels, vec!["01 (first)", "04 (second step)", "10 (third)"]);
    }

    #[test]
    fn scripts_run_in_migration_directory() {
        let workspace = TestWorkspace::new().expect("workspace");
        workspace.add_journaled_migration("01_first").expect("add");

        let source = load(&workspace);
        let migration = &source.migrations()[0];
        migration.up().expect("up");
        migration.down().expect("down");

        assert_eq!(
            workspace.journal().expect("journal"),
            vec!["up 01_first", "down 01_first"]
        );
    }

    #[test]
    fn relative_directory_still_finds_scripts() {
        let workspace = TestWorkspace::in_dir(Path::new(".")).expect("workspace");
        assert!(workspace.path().is_relative());
        workspace.add_journaled_migration("01_first").expect("add");

        let source = DirectorySource::load(
            &workspace.path().join("migrations"),
            &ScriptConfig::default(),
        )
        .expect("load");
        assert!(source.dir().is_absolute());
        source.migrations()[0].up().expect("up");

        assert_eq!(workspace.journal().expect("journal"), vec!["up 01_first"]);
    }

    #[test]
    fn timed_out_script_is_an_error() {
        let workspace = TestWorkspace::new().expect("workspace");
        workspace
            .add_migration("01_slow", Some("sleep 5\necho finished\n"), None)
            .expect("add");
        let script = ScriptConfig {
            timeout_secs: 1,
            ..ScriptConfig::default()
        };

        let source =
            DirectorySource::load(&workspace.path().join("migrations"), &script).expect("load");
        let started = std::time::Instant::now();
        let err = source.migrations()[0].up().unwrap_err();
        assert!(err.to_string().contains("timed out"), "{err}");
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn missing_and_blank_scripts_are_no_ops() {
        let workspace = TestWorkspace::new().expect("workspace");
        workspace
            .add_migration("01_empty", Some("  \n"), None)
            .expect("add");

        let source = load(&workspace);
        source.migrations()[0].up().expect("up");
        source.migrations()[0].down().expect("down");
    }

    #[test]
    fn failing_script_reports_stderr() {
        let workspace = TestWorkspace::new().expect("workspace");
        workspace
            .add_migration("01_broken", Some("echo 'table exists' >&2\nexit 1\n"), None)
            .expect("add");

        let source = load(&workspace);
        let err = source.migrations()[0].up().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("failed with status Some(1)"), "{message}");
        assert!(message.contains("table exists"), "{message}");
    }
}
