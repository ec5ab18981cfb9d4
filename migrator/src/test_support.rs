//! Test-only helpers: scripted collaborators and scratch workspaces.
//!
//! Scripted migrators and the scripted store append to a shared [`Journal`],
//! so tests can assert on the exact interleaving of actions and state calls.

use std::cell::RefCell;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use anyhow::{Context, Result, bail};
use tempfile::TempDir;

use crate::core::migration::{Migration, Migrator};
use crate::core::ports::StateStore;
use crate::io::config::MigratorConfig;

/// Ordered log of collaborator calls, e.g. `["setup", "latest", "up:08", "record:08"]`.
#[derive(Debug, Clone, Default)]
pub struct Journal(Rc<RefCell<Vec<String>>>);

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.0.borrow_mut().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    /// Entries starting with `prefix`, e.g. all `up:` calls.
    pub fn with_prefix(&self, prefix: &str) -> Vec<String> {
        self.0
            .borrow()
            .iter()
            .filter(|entry| entry.starts_with(prefix))
            .cloned()
            .collect()
    }
}

/// Migrator that journals `up:<version>` / `down:<version>` and optionally fails.
pub struct ScriptedMigrator {
    version: String,
    journal: Journal,
    up_error: Option<String>,
    down_error: Option<String>,
}

impl Migrator for ScriptedMigrator {
    fn up(&self) -> Result<()> {
        self.journal.push(format!("up:{}", self.version));
        if let Some(message) = &self.up_error {
            bail!("{message}");
        }
        Ok(())
    }

    fn down(&self) -> Result<()> {
        self.journal.push(format!("down:{}", self.version));
        if let Some(message) = &self.down_error {
            bail!("{message}");
        }
        Ok(())
    }
}

/// Successful migration for `version`.
pub fn migration(version: &str, journal: &Journal) -> Migration {
    scripted(version, journal, None, None)
}

/// Migration whose forward action fails with `message`.
pub fn failing_up(version: &str, journal: &Journal, message: &str) -> Migration {
    scripted(version, journal, Some(message), None)
}

/// Migration whose reverse action fails with `message`.
pub fn failing_down(version: &str, journal: &Journal, message: &str) -> Migration {
    scripted(version, journal, None, Some(message))
}

/// Successful migrations for each version, in the given order.
pub fn migrations(versions: &[&str], journal: &Journal) -> Vec<Migration> {
    versions
        .iter()
        .map(|version| migration(version, journal))
        .collect()
}

fn scripted(
    version: &str,
    journal: &Journal,
    up_error: Option<&str>,
    down_error: Option<&str>,
) -> Migration {
    Migration::new(
        version,
        ScriptedMigrator {
            version: version.to_string(),
            journal: journal.clone(),
            up_error: up_error.map(str::to_string),
            down_error: down_error.map(str::to_string),
        },
    )
    .with_description("does some migration stuff")
}

/// State store with a fixed marker and injectable failures.
///
/// Unlike a real store, `latest` does not move when records change; tests
/// inspect `recorded` / `removed` instead.
#[derive(Debug, Default)]
pub struct ScriptedStore {
    journal: Journal,
    latest: Option<String>,
    setup_error: Option<String>,
    latest_error: Option<String>,
    record_error: Option<String>,
    remove_error: Option<String>,
    pub recorded: Vec<String>,
    pub removed: Vec<String>,
}

impl ScriptedStore {
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
            ..Self::default()
        }
    }

    pub fn with_latest(mut self, version: &str) -> Self {
        self.latest = Some(version.to_string());
        self
    }

    pub fn failing_setup(mut self, message: &str) -> Self {
        self.setup_error = Some(message.to_string());
        self
    }

    pub fn failing_latest(mut self, message: &str) -> Self {
        self.latest_error = Some(message.to_string());
        self
    }

    pub fn failing_record(mut self, message: &str) -> Self {
        self.record_error = Some(message.to_string());
        self
    }

    pub fn failing_remove(mut self, message: &str) -> Self {
        self.remove_error = Some(message.to_string());
        self
    }
}

impl StateStore for ScriptedStore {
    fn setup(&mut self) -> Result<()> {
        self.journal.push("setup");
        if let Some(message) = &self.setup_error {
            bail!("{message}");
        }
        Ok(())
    }

    fn latest_version(&self) -> Result<Option<String>> {
        self.journal.push("latest");
        if let Some(message) = &self.latest_error {
            bail!("{message}");
        }
        Ok(self.latest.clone())
    }

    fn record_applied(&mut self, version: &str) -> Result<()> {
        self.journal.push(format!("record:{version}"));
        if let Some(message) = &self.record_error {
            bail!("{message}");
        }
        self.recorded.push(version.to_string());
        Ok(())
    }

    fn remove_record(&mut self, version: &str) -> Result<()> {
        self.journal.push(format!("remove:{version}"));
        if let Some(message) = &self.remove_error {
            bail!("{message}");
        }
        self.removed.push(version.to_string());
        Ok(())
    }
}

/// Temporary project directory with a `migrations/` folder of shell scripts.
///
/// Scripts run with the migration directory as working directory, so
/// `../../journal.log` is the workspace-level journal written by
/// [`TestWorkspace::add_journaled_migration`].
pub struct TestWorkspace {
    temp: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Result<Self> {
        Self::from_temp(tempfile::tempdir().context("create temp workspace")?)
    }

    /// Workspace created under `parent`; `path()` stays relative if `parent` is.
    pub fn in_dir(parent: &Path) -> Result<Self> {
        Self::from_temp(tempfile::tempdir_in(parent).context("create temp workspace")?)
    }

    fn from_temp(temp: TempDir) -> Result<Self> {
        fs::create_dir_all(temp.path().join("migrations")).context("create migrations dir")?;
        Ok(Self { temp })
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    /// Default config; relative paths resolve against [`TestWorkspace::path`].
    pub fn config(&self) -> MigratorConfig {
        MigratorConfig::default()
    }

    /// Create `migrations/<dir_name>/` with optional `up.sh` / `down.sh`.
    pub fn add_migration(&self, dir_name: &str, up: Option<&str>, down: Option<&str>) -> Result<()> {
        let dir = self.path().join("migrations").join(dir_name);
        fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
        if let Some(script) = up {
            fs::write(dir.join("up.sh"), script).context("write up.sh")?;
        }
        if let Some(script) = down {
            fs::write(dir.join("down.sh"), script).context("write down.sh")?;
        }
        Ok(())
    }

    /// Add a migration whose scripts append `up <name>` / `down <name>` to `journal.log`.
    pub fn add_journaled_migration(&self, dir_name: &str) -> Result<()> {
        self.add_migration(
            dir_name,
            Some(&format!("echo \"up {dir_name}\" >> ../../journal.log\n")),
            Some(&format!("echo \"down {dir_name}\" >> ../../journal.log\n")),
        )
    }

    /// Lines of `journal.log`, empty if no script has run yet.
    pub fn journal(&self) -> Result<Vec<String>> {
        let path = self.path().join("journal.log");
        if !path.exists() {
            return Ok(Vec::new());
        }
        let contents = fs::read_to_string(&path).context("read journal.log")?;
        Ok(contents.lines().map(str::to_string).collect())
    }
}
