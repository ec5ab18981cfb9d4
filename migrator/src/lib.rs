//! Orchestration core for applying and reverting versioned migrations.
//!
//! A [`runner::MigrationRunner`] sits between two collaborators and owns the
//! only real decision logic: which migrations run, in what order, and how the
//! "latest applied" marker moves as a result. The crate keeps the same split
//! throughout:
//!
//! - **[`core`]**: Pure logic and the collaborator contracts (migration records,
//!   version ordering, the [`core::ports::MigrationSource`] and
//!   [`core::ports::StateStore`] traits). No I/O.
//! - **[`io`]**: Concrete collaborators (JSON state file, in-memory store,
//!   script-directory source) plus configuration.
//!
//! Orchestration modules ([`runner`], [`status`]) drive the collaborators to
//! implement the CLI commands.

pub mod core;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod runner;
pub mod status;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
