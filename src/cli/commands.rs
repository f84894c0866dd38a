//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - ask: run one turn and print the answer
//! - chat: interactive turns over stdin
//! - route: show the keyword classification for a query
//! - tools: list each specialist's tools

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Default session id for command-line turns
pub const DEFAULT_SESSION: &str = "cli";

/// Concierge - routes questions to a support or wellness specialist
#[derive(Parser, Debug)]
#[command(name = "concierge")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask one question
    Ask {
        /// The question
        query: String,

        /// Session id the turn belongs to
        #[arg(short, long, default_value = DEFAULT_SESSION)]
        session: String,

        /// Print {"answer": ...} or {"kind": ..., "message": ...}
        #[arg(long)]
        json: bool,
    },

    /// Interactive conversation in one session
    Chat {
        /// Session id for the conversation
        #[arg(short, long, default_value = DEFAULT_SESSION)]
        session: String,
    },

    /// Show which specialist the keyword policy picks (no network)
    Route {
        /// The question to classify
        query: String,
    },

    /// List the tools each specialist offers
    Tools,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["concierge"]).is_err());
    }

    #[test]
    fn test_cli_verbose_flag() {
        let cli = Cli::try_parse_from(["concierge", "-v", "tools"]).unwrap();
        assert!(cli.is_verbose());
        assert!(matches!(cli.command, Commands::Tools));
    }

    #[test]
    fn test_cli_config_option() {
        let cli = Cli::try_parse_from(["concierge", "tools", "--config", "/tmp/concierge.yml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/concierge.yml")));
    }

    #[test]
    fn test_ask_defaults() {
        let cli = Cli::try_parse_from(["concierge", "ask", "What is BMI?"]).unwrap();
        match cli.command {
            Commands::Ask { query, session, json } => {
                assert_eq!(query, "What is BMI?");
                assert_eq!(session, DEFAULT_SESSION);
                assert!(!json);
            }
            other => panic!("expected ask, got {:?}", other),
        }
    }

    #[test]
    fn test_ask_with_session_and_json() {
        let cli = Cli::try_parse_from(["concierge", "ask", "refund?", "-s", "alice", "--json"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Ask { ref session, json: true, .. } if session == "alice"
        ));
    }

    #[test]
    fn test_chat_and_route() {
        let cli = Cli::try_parse_from(["concierge", "chat", "--session", "bob"]).unwrap();
        assert!(matches!(cli.command, Commands::Chat { ref session } if session == "bob"));

        let cli = Cli::try_parse_from(["concierge", "route", "Reschedule my session"]).unwrap();
        assert!(matches!(cli.command, Commands::Route { .. }));
    }

    #[test]
    fn test_cli_debug_assert() {
        Cli::command().debug_assert();
    }
}
