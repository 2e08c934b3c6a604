//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use maildigest_core::TracingOutputFormat;

/// maildigest - AI email digest for your Outlook inbox
#[derive(Debug, Parser)]
#[command(name = "maildigest")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, global = true, env = "MAILDIGEST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v', global = true)]
    pub debug: bool,

    /// Log line format (pretty, compact, json)
    #[arg(long, global = true)]
    pub log_format: Option<TracingOutputFormat>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build and send the digest for a window (default: the last 24 hours)
    Run(RunArgs),

    /// Run the digest as a scheduled job, appending output to cron_<window>.log
    Invoke {
        /// Window to cover: morning or afternoon
        window: Option<String>,

        /// Profile to run as (exported as USER_PROFILE to the run)
        #[arg(long)]
        profile: Option<String>,

        /// Directory for the cron_<window>.log files
        #[arg(long)]
        log_dir: Option<PathBuf>,
    },

    /// Sign in to Microsoft with the device-code flow
    Auth {
        /// Profile whose token is stored
        #[arg(long)]
        profile: Option<String>,

        /// Force re-authentication even if a valid token exists
        #[arg(long, short)]
        force: bool,
    },

    /// Token cache commands
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Arguments of `maildigest run`.
#[derive(Debug, Default, Args)]
pub struct RunArgs {
    /// Window to cover: morning or afternoon
    pub window: Option<String>,

    /// Profile to run as
    #[arg(long)]
    pub profile: Option<String>,

    /// Non-interactive mode: never prompt for sign-in, read the token from
    /// the secret files directory (also enabled by RENDER)
    #[arg(long)]
    pub hosted: bool,

    /// Render the digest without sending it
    #[arg(long)]
    pub dry_run: bool,

    /// Write the dry-run HTML to this file instead of stdout
    #[arg(long, requires = "dry_run")]
    pub output: Option<PathBuf>,

    /// Do not take the per-profile run lock
    #[arg(long)]
    pub no_lock: bool,
}

/// Token cache actions.
#[derive(Debug, Subcommand)]
pub enum TokenAction {
    /// Print the token cache as MSAL_TOKEN_CACHE_BASE64 and write it to
    /// render_token_<profile>.txt
    Export {
        /// Profile whose token is exported
        #[arg(long)]
        profile: Option<String>,

        /// Directory for render_token_<profile>.txt
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
    },

    /// Show where the token for a profile is stored
    Path {
        /// Profile to look up
        #[arg(long)]
        profile: Option<String>,
    },
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}

impl Cli {
    /// The profile given on the command line, if the subcommand takes one.
    pub fn profile_flag(&self) -> Option<&str> {
        match self.command {
            Some(Command::Run(ref args)) => args.profile.as_deref(),
            Some(Command::Invoke { ref profile, .. })
            | Some(Command::Auth { ref profile, .. })
            | Some(Command::Token {
                action: TokenAction::Export { ref profile, .. } | TokenAction::Path { ref profile },
            }) => profile.as_deref(),
            _ => None,
        }
    }
}
