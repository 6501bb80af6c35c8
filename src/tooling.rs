//! Tooling
//!
//! Operator command line over existing snapshot databases.

pub mod cli;

pub use cli::{Cli, CliContext, Commands};
