//! Command-line interface definitions for boxform.
//!
//! Uses clap's derive API for type-safe argument parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Headless client for box-protocol form servers.
///
/// boxform connects to a form server over a reconnecting WebSocket, mounts
/// each form the server sends, and seeds every capturing widget with its
/// default value.
#[derive(Parser, Debug)]
#[command(name = "boxform")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,

    /// Path to additional config file.
    ///
    /// This config file is merged on top of system and user configs,
    /// giving it the highest priority (except for CLI flags).
    #[arg(short = 'c', long = "config", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity.
    ///
    /// Can be specified multiple times:
    /// -v    = info level
    /// -vv   = debug level
    /// -vvv  = trace level
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

/// Subcommands for boxform.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Connect to a form server and mount the forms it sends.
    ///
    /// Every mounted form is printed to stdout as one JSON line.
    Connect {
        /// Page URL of the form server (http/https or ws/wss).
        #[arg(short = 'u', long = "page-url", value_name = "URL")]
        page_url: Option<String>,

        /// Socket path on the server.
        #[arg(long = "path", value_name = "PATH")]
        path: Option<String>,

        /// Submit default values as soon as a form is mounted.
        #[arg(long = "auto-submit")]
        auto_submit: bool,
    },

    /// Resolve a box tree from a JSON file without connecting.
    ///
    /// Prints the mounted widget tree and the seeded values.
    Resolve {
        /// JSON file holding one box or an array of boxes.
        #[arg(required = true)]
        file: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_connect_flags() {
        let cli = Cli::try_parse_from([
            "boxform",
            "-vv",
            "connect",
            "--page-url",
            "https://forms.example",
            "--path",
            "/socket",
            "--auto-submit",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Connect {
                page_url,
                path,
                auto_submit,
            } => {
                assert_eq!(page_url.as_deref(), Some("https://forms.example"));
                assert_eq!(path.as_deref(), Some("/socket"));
                assert!(auto_submit);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_connect_defaults() {
        let cli = Cli::try_parse_from(["boxform", "connect"]).unwrap();
        assert!(cli.config.is_none());
        assert!(matches!(
            cli.command,
            Commands::Connect {
                page_url: None,
                path: None,
                auto_submit: false
            }
        ));
    }

    #[test]
    fn test_resolve_requires_file() {
        assert!(Cli::try_parse_from(["boxform", "resolve"]).is_err());
        let cli =
            Cli::try_parse_from(["boxform", "resolve", "form.json", "-c", "extra.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("extra.toml")));
        assert!(matches!(cli.command, Commands::Resolve { ref file } if file == &PathBuf::from("form.json")));
    }

    #[test]
    fn test_missing_subcommand_is_error() {
        assert!(Cli::try_parse_from(["boxform"]).is_err());
    }
}
