//! CLI module for concierge - command-line interface and subcommands.
//!
//! A thin stand-in for the HTTP front end: every subcommand goes through
//! the same `TurnRunner` a server would use.

pub mod commands;

pub use commands::Cli;
