use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::DB_PATH_ENV;

/// Background clipboard history with keyboard-driven navigation.
#[derive(Debug, Parser)]
#[command(name = "clipkeep", version, about)]
pub struct Cli {
    /// History database file
    #[arg(long, global = true, env = DB_PATH_ENV)]
    pub db: Option<PathBuf>,

    /// Verbosity level for logging (-v debug, -vv trace); RUST_LOG wins
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum CliCommand {
    /// Record clipboard changes and browse the history from the terminal
    Shell,
    /// Record clipboard changes in the foreground until killed
    Watch,
    /// Print the stored history, newest first
    List {
        /// Show favorites instead of the general list
        #[arg(long)]
        favorites: bool,
        /// Print both lists as JSON
        #[arg(long)]
        json: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shell_is_the_default() {
        let cli = Cli::try_parse_from(["clipkeep"]).expect("parse");
        assert!(cli.command.is_none());
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn list_flags_and_global_db() {
        let cli = Cli::try_parse_from(["clipkeep", "list", "--favorites", "--db", "h.sqlite3"])
            .expect("parse");
        assert_eq!(cli.db, Some(PathBuf::from("h.sqlite3")));
        assert!(matches!(
            cli.command,
            Some(CliCommand::List {
                favorites: true,
                json: false
            })
        ));
    }
}
