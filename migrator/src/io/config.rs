//! Migrator configuration stored under `.migrator/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::io::atomic::write_atomic;

/// Default location of the config file, relative to the project root.
pub const DEFAULT_CONFIG_PATH: &str = ".migrator/config.toml";

/// Migrator configuration (TOML).
///
/// Relative paths resolve against the project root (the directory the CLI
/// runs in). Missing fields take the defaults below.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MigratorConfig {
    /// Directory holding one subdirectory per migration.
    pub migrations_dir: PathBuf,

    /// JSON file recording applied migrations.
    pub state_path: PathBuf,

    pub script: ScriptConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ScriptConfig {
    /// Interpreter invoked with the script path appended (e.g. `["sh"]`, `["bash","-e"]`).
    pub shell: Vec<String>,

    /// Wall-clock limit for a single `up.sh` / `down.sh` run.
    pub timeout_secs: u64,

    /// Keep at most this many bytes of script stdout/stderr.
    pub output_limit_bytes: usize,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            shell: vec!["sh".to_string()],
            timeout_secs: 10 * 60,
            output_limit_bytes: 100_000,
        }
    }
}

impl ScriptConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for MigratorConfig {
    fn default() -> Self {
        Self {
            migrations_dir: PathBuf::from("migrations"),
            state_path: PathBuf::from(".migrator/state.json"),
            script: ScriptConfig::default(),
        }
    }
}

impl MigratorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.migrations_dir.as_os_str().is_empty() {
            return Err(anyhow!("migrations_dir must not be empty"));
        }
        if self.state_path.as_os_str().is_empty() {
            return Err(anyhow!("state_path must not be empty"));
        }
        if self.script.shell.is_empty() || self.script.shell[0].trim().is_empty() {
            return Err(anyhow!("script.shell must be a non-empty array"));
        }
        if self.script.timeout_secs == 0 {
            return Err(anyhow!("script.timeout_secs must be > 0"));
        }
        if self.script.output_limit_bytes == 0 {
            return Err(anyhow!("script.output_limit_bytes must be > 0"));
        }
        Ok(())
    }

    /// Migrations directory resolved against `root`.
    pub fn migrations_path(&self, root: &Path) -> PathBuf {
        root.join(&self.migrations_dir)
    }

    /// State file resolved against `root`.
    pub fn state_file(&self, root: &Path) -> PathBuf {
        root.join(&self.state_path)
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `MigratorConfig::default()`.
pub fn load_config(path: &Path) -> Result<MigratorConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "config missing, using defaults");
        let cfg = MigratorConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: MigratorConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &MigratorConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf, "toml.tmp")
}
