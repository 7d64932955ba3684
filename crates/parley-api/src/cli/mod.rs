//! CLI command definitions for the `parley` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod seed;
pub mod staff;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Conversation practice with AI-played parent personas.
#[derive(Parser)]
#[command(name = "parley", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export spans to stdout through OpenTelemetry.
    #[arg(long, global = true, env = "PARLEY_OTEL")]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the REST API server.
    Serve {
        /// Port to listen on (defaults to the configured port).
        #[arg(long, short, env = "PARLEY_PORT")]
        port: Option<u16>,

        /// Host to bind to (defaults to the configured host).
        #[arg(long, env = "PARLEY_HOST")]
        host: Option<String>,
    },

    /// Load the built-in practice personas.
    SeedPersonas {
        /// Delete personas without a creator before seeding.
        #[arg(long)]
        clear: bool,
    },

    /// Give an account staff rights.
    GrantStaff {
        /// Email of the account.
        email: String,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

impl Cli {
    /// Log filter used when RUST_LOG is not set.
    pub fn default_log_filter(&self) -> &'static str {
        match self.verbose {
            0 if self.quiet => "error",
            0 => "info",
            1 => "info,parley_api=debug,parley_core=debug,parley_infra=debug",
            _ => "trace",
        }
    }
}
