//! CLI module for the request triage system.
//!
//! Provides command-line interface parsing and command dispatch.

pub mod args;
pub mod commands;

pub use args::{Cli, Commands};
