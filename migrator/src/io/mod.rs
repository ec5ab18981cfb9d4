//! Concrete collaborators and on-disk layout for the `migrator` CLI.

pub mod atomic;
pub mod config;
pub mod directory;
pub mod init;
pub mod memory_store;
pub mod process;
pub mod state_file;
