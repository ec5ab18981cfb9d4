//! Scaffolding for `migrator init`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tracing::info;

use super::config::{MigratorConfig, write_config};

/// Options for `init_migrator`.
#[derive(Debug, Clone)]
pub struct InitOptions {
    /// If true, overwrite an existing config file.
    pub force: bool,
}

/// Paths created by `init_migrator`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitOutcome {
    pub config_path: PathBuf,
    pub migrations_dir: PathBuf,
}

/// Write a default config at `config_path` and create the migrations
/// directory under `root`.
///
/// Fails if the config already exists unless `options.force` is set. The
/// state file is not created here; the state store creates it on first use.
pub fn init_migrator(root: &Path, config_path: &Path, options: &InitOptions) -> Result<InitOutcome> {
    if config_path.exists() && !options.force {
        return Err(anyhow!(
            "migrator init: {} already exists (use --force to overwrite)",
            config_path.display()
        ));
    }

    let cfg = MigratorConfig::default();
    write_config(config_path, &cfg)?;

    let migrations_dir = cfg.migrations_path(root);
    fs::create_dir_all(&migrations_dir)
        .with_context(|| format!("create directory {}", migrations_dir.display()))?;

    info!(config = %config_path.display(), migrations = %migrations_dir.display(), "initialized");
    Ok(InitOutcome {
        config_path: config_path.to_path_buf(),
        migrations_dir,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::config::load_config;

    #[test]
    fn init_writes_default_config_and_migrations_dir() {
        let temp = tempfile::tempdir().expect("tempdir");
        let config_path = temp.path().join(".migrator/config.toml");

        let outcome =
            init_migrator(temp.path(), &config_path, &InitOptions { force: false }).expect("init");

        assert!(outcome.migrations_dir.is_dir());
        assert_eq!(load_config(&config_path).expect("load"), MigratorConfig::default());
    }

    #[test]
    fn init_refuses_to_overwrite_without_force() {
        let temp = tempfile::tempdir().expect("tempdir");
        let config_path = temp.path().join(".migrator/config.toml");
        init_migrator(temp.path(), &config_path, &InitOptions { force: false }).expect("init");

        let err = init_migrator(temp.path(), &config_path, &InitOptions { force: false })
            .unwrap_err();
        assert!(err.to_string().contains("already exists"));

        init_migrator(temp.path(), &config_path, &InitOptions { force: true }).expect("force");
    }
}
