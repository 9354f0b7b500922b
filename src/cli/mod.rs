//! Command-line interface.

mod commands;

use clap::{Parser, Subcommand};

/// FastStack - accounts, roles and a newsletter list over a JSON API and web pages
#[derive(Parser)]
#[command(name = "faststack")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Start the web server (default)
    Serve,

    /// Create a default config.toml in the current directory
    #[command(alias = "--init")]
    Init,

    /// Apply migrations and create the root user
    InitDb,
}

pub use commands::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_means_serve() {
        let cli = Cli::try_parse_from(["faststack"]).unwrap();
        assert_eq!(cli.command, None);
    }

    #[test]
    fn test_parses_subcommands() {
        let cli = Cli::try_parse_from(["faststack", "init-db"]).unwrap();
        assert_eq!(cli.command, Some(Commands::InitDb));

        let cli = Cli::try_parse_from(["faststack", "serve"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Serve));
    }

    #[test]
    fn test_rejects_unknown_subcommand() {
        assert!(Cli::try_parse_from(["faststack", "daemon"]).is_err());
    }
}
