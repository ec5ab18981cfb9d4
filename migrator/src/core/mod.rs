//! Deterministic, pure logic shared by the runner.
//!
//! Core modules must be free of I/O side effects. Collaborators reach the
//! runner only through the traits in [`ports`].

pub mod migration;
pub mod ports;
