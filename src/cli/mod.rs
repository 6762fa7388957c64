//! Command-line interface.
//!
//! Argument parsing lives in [`args`]; each command has its own module
//! under [`commands`].

pub mod args;
pub mod commands;

pub use args::{CacheAction, Cli, Commands};
