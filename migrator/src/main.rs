//! `migrator`: apply and revert script-based migrations.
//!
//! Reads `.migrator/config.toml`, loads migrations from the configured
//! directory and tracks applied versions in a JSON state file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use migrator::error::MigrateError;
use migrator::exit_codes;
use migrator::io::config::{DEFAULT_CONFIG_PATH, MigratorConfig, load_config};
use migrator::io::directory::DirectorySource;
use migrator::io::init::{InitOptions, init_migrator};
use migrator::io::state_file::JsonStateStore;
use migrator::logging;
use migrator::runner::MigrationRunner;

#[derive(Parser)]
#[command(
    name = "migrator",
    version,
    about = "Apply and revert versioned migrations"
)]
struct Cli {
    /// Path to the config file.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a default config and create the migrations directory.
    Init {
        /// Overwrite an existing config.
        #[arg(short, long)]
        force: bool,
    },
    /// Apply every migration newer than the latest applied one.
    Up,
    /// Revert the latest applied migration.
    Down {
        /// Number of migrations to revert.
        #[arg(long, default_value_t = 1)]
        steps: u32,
    },
    /// Show the latest applied version and which migrations are pending.
    Status,
}

fn main() {
    logging::init();
    let code = match run() {
        Ok(()) => exit_codes::OK,
        Err(err) => {
            eprintln!("{:#}", err);
            exit_codes::for_error(&err)
        }
    };
    std::process::exit(code);
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let root = std::env::current_dir().context("resolve current directory")?;
    let config_path = root.join(&cli.config);
    match cli.command {
        Command::Init { force } => cmd_init(&root, &config_path, force),
        Command::Up => cmd_up(&root, &config_path),
        Command::Down { steps } => cmd_down(&root, &config_path, steps),
        Command::Status => cmd_status(&root, &config_path),
    }
}

fn cmd_init(root: &Path, config_path: &Path, force: bool) -> Result<()> {
    init_migrator(root, config_path, &InitOptions { force })?;
    Ok(())
}

fn cmd_up(root: &Path, config_path: &Path) -> Result<()> {
    let mut runner = build_runner(root, config_path)?;
    runner.migrate_up()?;
    Ok(())
}

fn cmd_down(root: &Path, config_path: &Path, steps: u32) -> Result<()> {
    let mut runner = build_runner(root, config_path)?;
    for step in 0..steps {
        match runner.migrate_down() {
            Ok(()) => {}
            Err(MigrateError::NothingToRevert) if step > 0 => {
                info!(reverted = step, "nothing left to revert");
                break;
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}

fn cmd_status(root: &Path, config_path: &Path) -> Result<()> {
    let mut runner = build_runner(root, config_path)?;
    let report = runner.status()?;
    print!("{report}");
    Ok(())
}

fn build_runner(
    root: &Path,
    config_path: &Path,
) -> Result<MigrationRunner<DirectorySource, JsonStateStore>> {
    let cfg: MigratorConfig = load_config(config_path)?;
    let source = DirectorySource::load(&cfg.migrations_path(root), &cfg.script)
        .context("load migrations")?;
    let store = JsonStateStore::new(cfg.state_file(root));
    Ok(MigrationRunner::new(source, store))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_down_defaults_to_one_step() {
        let cli = Cli::parse_from(["migrator", "down"]);
        assert!(matches!(cli.command, Command::Down { steps: 1 }));
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_PATH));
    }

    #[test]
    fn parse_down_steps_and_config() {
        let cli = Cli::parse_from(["migrator", "down", "--steps", "3", "--config", "cfg.toml"]);
        assert!(matches!(cli.command, Command::Down { steps: 3 }));
        assert_eq!(cli.config, PathBuf::from("cfg.toml"));
    }

    #[test]
    fn parse_init_force() {
        let cli = Cli::parse_from(["migrator", "init", "--force"]);
        assert!(matches!(cli.command, Command::Init { force: true }));
    }
}
