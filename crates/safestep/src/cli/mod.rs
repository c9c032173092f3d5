//! Command-line interface for safestep.
//!
//! This module provides the CLI structure for the `safestep` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    ConfigCommand, ContactCommand, ContactUpdate, DaemonCommand, DestinationCommand,
    DestinationTypeArg, DestinationUpdate, FeelingArg, PrefsCommand, SendCommand, StatusCommand,
    TextSizeArg, TripCommand,
};

use crate::logging::Verbosity;

/// safestep - Calm, step-by-step trips
///
/// Plan a trip, follow it one step at a time, and let family know you
/// arrived safely.
#[derive(Debug, Parser)]
#[command(name = "safestep")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start, follow and finish trips
    #[command(subcommand)]
    Trip(TripCommand),

    /// Manage saved destinations
    #[command(subcommand)]
    Destination(DestinationCommand),

    /// Manage family contacts
    #[command(subcommand)]
    Contact(ContactCommand),

    /// View or change preferences
    #[command(subcommand)]
    Prefs(PrefsCommand),

    /// Show trip counts and the active trip
    Status(StatusCommand),

    /// View or check configuration
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Run the request daemon
    #[command(subcommand)]
    Daemon(DaemonCommand),

    /// Send a raw request to a running daemon
    Send(SendCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::Trace,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_cli_name() {
        assert_eq!(Cli::command().get_name(), "safestep");
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbosity() {
        assert_eq!(parse(&["safestep", "-q", "status"]).verbosity(), Verbosity::Quiet);
        assert_eq!(parse(&["safestep", "status"]).verbosity(), Verbosity::Normal);
        assert_eq!(parse(&["safestep", "-v", "status"]).verbosity(), Verbosity::Verbose);
        assert_eq!(parse(&["safestep", "-vv", "status"]).verbosity(), Verbosity::Trace);
    }

    #[test]
    fn test_parse_trip_start() {
        let cli = parse(&["safestep", "trip", "start", "Green Valley Pharmacy", "-t", "pharmacy"]);
        match cli.command {
            Command::Trip(TripCommand::Start {
                destination,
                destination_type,
                no_safe_route,
                steps,
            }) => {
                assert_eq!(destination, "Green Valley Pharmacy");
                assert_eq!(destination_type, DestinationTypeArg::Pharmacy);
                assert!(!no_safe_route);
                assert_eq!(steps, None);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_trip_advance_requires_values() {
        assert!(Cli::try_parse_from(["safestep", "trip", "advance", "t1"]).is_err());
        let cli = parse(&["safestep", "trip", "advance", "t1", "-p", "40", "-s", "2"]);
        assert!(matches!(
            cli.command,
            Command::Trip(TripCommand::Advance {
                progress: 40,
                step: 2,
                ..
            })
        ));
    }

    #[test]
    fn test_parse_feedback() {
        let cli = parse(&["safestep", "trip", "feedback", "uncomfortable"]);
        assert!(matches!(
            cli.command,
            Command::Trip(TripCommand::Feedback {
                feeling: FeelingArg::Uncomfortable
            })
        ));
    }

    #[test]
    fn test_parse_destination_update_conflicting_visit_flags() {
        let result = Cli::try_parse_from([
            "safestep",
            "destination",
            "update",
            "d1",
            "--visited-now",
            "--clear-visited",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_prefs_set() {
        let cli = parse(&[
            "safestep",
            "prefs",
            "set",
            "--text-size",
            "extra-large",
            "--voice",
            "false",
        ]);
        assert!(matches!(
            cli.command,
            Command::Prefs(PrefsCommand::Set {
                text_size: Some(TextSizeArg::ExtraLarge),
                voice: Some(false),
                ..
            })
        ));
    }

    #[test]
    fn test_parse_contact_add() {
        let cli = parse(&[
            "safestep",
            "contact",
            "add",
            "Sarah Johnson",
            "+1 (555) 123-4567",
            "-r",
            "Daughter",
            "--primary",
        ]);
        assert!(matches!(
            cli.command,
            Command::Contact(ContactCommand::Add { primary: true, .. })
        ));
    }

    #[test]
    fn test_parse_send() {
        let cli = parse(&["safestep", "send", "GET", "/api/trips/active"]);
        match cli.command {
            Command::Send(cmd) => {
                assert_eq!(cmd.method, "GET");
                assert_eq!(cmd.body, None);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_with_config() {
        let cli = parse(&["safestep", "-c", "/custom/config.toml", "status"]);
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
    }

    #[test]
    fn test_parse_daemon_start() {
        let cli = parse(&["safestep", "daemon", "start"]);
        assert!(matches!(cli.command, Command::Daemon(DaemonCommand::Start)));
    }
}
