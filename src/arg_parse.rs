// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2024 Tobias Hunger <tobias.hunger@gmail.com>

use clap::{Parser, Subcommand};

use std::path::PathBuf;

/// What to do with a repository
#[derive(Clone, Debug, Subcommand)]
#[command(rename_all = "kebab-case")]
enum CliCommand {
    /// Clone URL into DIRECTORY
    Clone {
        url: String,
        directory: PathBuf,
        /// Open DIRECTORY instead of failing when it exists already
        #[arg(long = "or-open")]
        or_open: bool,
    },
    /// Check that DIRECTORY can be worked with
    Open { directory: PathBuf },
    /// Check out REVISION in DIRECTORY
    Checkout {
        directory: PathBuf,
        revision: String,
    },
    /// Show the commits after FROM up to and including TO
    Log {
        directory: PathBuf,
        #[arg(long = "from", id = "from-rev")]
        from_revision: Option<String>,
        #[arg(long = "to", requires = "from-rev")]
        to_revision: Option<String>,
    },
    /// Fetch and throw away everything not on the remote default branch
    Reset { directory: PathBuf },
    Pull { directory: PathBuf },
    /// Fetch without touching the working copy
    Download { directory: PathBuf },
    ListBackends,
}

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[arg(long = "debug", action = clap::ArgAction::Count, env = "REPOLINK_LOG_LEVEL")]
    debug_level: u8,
    /// Configuration file to use instead of the user configuration
    #[arg(long = "config", value_name = "FILE")]
    config_file: Option<PathBuf>,
    /// Version control system to use (default: git for clone, auto-detect otherwise)
    #[arg(long = "vcs", global = true, value_name = "NAME")]
    vcs: Option<String>,

    #[command(subcommand)]
    action: CliCommand,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Command {
    Clone {
        url: String,
        directory: PathBuf,
        or_open: bool,
    },
    Open {
        directory: PathBuf,
    },
    CheckOut {
        directory: PathBuf,
        revision: String,
    },
    Log {
        directory: PathBuf,
        from_revision: Option<String>,
        to_revision: Option<String>,
    },
    HardReset {
        directory: PathBuf,
    },
    Pull {
        directory: PathBuf,
    },
    Download {
        directory: PathBuf,
    },
    ListBackends,
}

#[derive(Clone, Debug)]
pub struct CommandlineConfiguration {
    pub debug_level: u8,
    pub config_file: Option<PathBuf>,
    pub vcs: Option<String>,
    pub command: Command,
}

impl From<Cli> for CommandlineConfiguration {
    fn from(cli: Cli) -> Self {
        let command = match cli.action {
            CliCommand::Clone {
                url,
                directory,
                or_open,
            } => Command::Clone {
                url,
                directory,
                or_open,
            },
            CliCommand::Open { directory } => Command::Open { directory },
            CliCommand::Checkout {
                directory,
                revision,
            } => Command::CheckOut {
                directory,
                revision,
            },
            CliCommand::Log {
                directory,
                from_revision,
                to_revision,
            } => Command::Log {
                directory,
                from_revision,
                to_revision,
            },
            CliCommand::Reset { directory } => Command::HardReset { directory },
            CliCommand::Pull { directory } => Command::Pull { directory },
            CliCommand::Download { directory } => Command::Download { directory },
            CliCommand::ListBackends => Command::ListBackends,
        };

        CommandlineConfiguration {
            debug_level: cli.debug_level,
            config_file: cli.config_file,
            vcs: cli.vcs,
            command,
        }
    }
}

pub fn command() -> CommandlineConfiguration {
    Cli::parse().into()
}
