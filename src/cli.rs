//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

const MIN_USERNAME_LEN: usize = 3;
const MAX_USERNAME_LEN: usize = 50;
const MIN_PASSWORD_LEN: usize = 6;

/// QuietSignal - mood journaling with paragraph-weighted sentiment
///
/// Write journal entries paragraph by paragraph; every write re-scores the
/// whole entry, weighting longer and more recent paragraphs higher.
///
/// Examples:
///   quietsignal register --name "Ada" --username ada --password s3cret!
///   quietsignal login --username ada --password s3cret!
///   quietsignal entry append --journal 1 --entry 4 --paragraph "Quiet morning."
///   quietsignal analyze --text "What a lovely day"
///   quietsignal init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to configuration file
    ///
    /// If not specified, looks for .quietsignal.toml in the current directory
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// SQLite database file (overrides storage.database_path)
    #[arg(long, value_name = "FILE", env = "QUIETSIGNAL_DATABASE", global = true)]
    pub database: Option<PathBuf>,

    /// Session token (defaults to the one saved by `login`)
    #[arg(long, value_name = "TOKEN", env = "QUIETSIGNAL_TOKEN", global = true)]
    pub token: Option<String>,

    /// Token signing key (overrides auth.secret_key)
    #[arg(
        long,
        value_name = "KEY",
        env = "QUIETSIGNAL_SECRET_KEY",
        hide_env_values = true,
        global = true
    )]
    pub secret_key: Option<String>,

    /// Password for the bootstrap admin account (overrides admin.password)
    #[arg(
        long,
        value_name = "PASSWORD",
        env = "QUIETSIGNAL_ADMIN_PASSWORD",
        hide_env_values = true,
        global = true
    )]
    pub admin_password: Option<String>,

    /// Output format (text, json)
    #[arg(long, value_name = "FORMAT", global = true)]
    pub format: Option<OutputFormat>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Generate a default .quietsignal.toml configuration file
    InitConfig,

    /// Create an account (and its default journal)
    Register {
        /// Display name
        #[arg(long)]
        name: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        password: Password,
    },

    /// Log in and save the session token
    Login {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: Password,
    },

    /// Forget the saved session token
    Logout,

    /// Show the logged-in account
    Whoami,

    /// Score a single text without storing it
    Analyze {
        #[arg(long)]
        text: String,
    },

    /// Manage journals
    #[command(subcommand)]
    Journal(JournalCommand),

    /// Manage journal entries
    #[command(subcommand)]
    Entry(EntryCommand),

    /// Administrative tasks
    #[command(subcommand)]
    Admin(AdminCommand),
}

#[derive(Subcommand, Debug, Clone)]
pub enum JournalCommand {
    /// Create a journal
    Create {
        #[arg(long)]
        title: String,
    },
    /// Show your default journal (the first one created)
    Mine,
    /// List your journals, newest first
    List,
}

#[derive(Subcommand, Debug, Clone)]
pub enum EntryCommand {
    /// Start an empty entry in a journal
    Create {
        #[arg(long, value_name = "ID")]
        journal: i64,
    },

    /// Append one paragraph and re-score the entry
    Append {
        #[arg(long, value_name = "ID")]
        journal: i64,
        #[arg(long, value_name = "ID")]
        entry: i64,
        #[arg(long)]
        paragraph: String,
    },

    /// Append several paragraphs in order and re-score once
    AppendBatch {
        #[arg(long, value_name = "ID")]
        journal: i64,
        #[arg(long, value_name = "ID")]
        entry: i64,
        /// Repeat for each paragraph
        #[arg(long = "paragraph", value_name = "TEXT")]
        paragraphs: Vec<String>,
    },

    /// Show one entry with its paragraphs
    Show {
        #[arg(long, value_name = "ID")]
        journal: i64,
        #[arg(long, value_name = "ID")]
        entry: i64,
    },

    /// List entries of a journal
    List {
        #[arg(long, value_name = "ID")]
        journal: i64,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum AdminCommand {
    /// Re-score every stored entry
    Recompute,
}

/// A password taken from the command line. Its `Debug` form is redacted so
/// logging the parsed command never prints it.
#[derive(Clone, PartialEq, Eq)]
pub struct Password(String);

impl Password {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Password {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(<redacted>)")
    }
}

/// Output format for command results.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text (default)
    #[default]
    Text,
    /// JSON envelope
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        match &self.command {
            Command::Register {
                username, password, ..
            } => {
                validate_username(username)?;
                if password.as_str().chars().count() < MIN_PASSWORD_LEN {
                    return Err(format!(
                        "Password must be at least {} characters",
                        MIN_PASSWORD_LEN
                    ));
                }
            }
            Command::Journal(JournalCommand::Create { title }) => {
                if title.trim().is_empty() {
                    return Err("Journal title cannot be empty".to_string());
                }
            }
            Command::Entry(EntryCommand::AppendBatch { paragraphs, .. }) => {
                if paragraphs.is_empty() {
                    return Err("Provide at least one --paragraph".to_string());
                }
            }
            _ => {}
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

fn validate_username(username: &str) -> Result<(), String> {
    let len = username.chars().count();
    if !(MIN_USERNAME_LEN..=MAX_USERNAME_LEN).contains(&len) {
        return Err(format!(
            "Username must be between {} and {} characters",
            MIN_USERNAME_LEN, MAX_USERNAME_LEN
        ));
    }
    Ok(())
}
