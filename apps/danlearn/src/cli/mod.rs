//! # Danlearn CLI Module
//!
//! This module implements the CLI interface for Danlearn.
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `init` - Initialize a new database
//! - `status` - Show a learner record
//! - `diagnostic-start` - Start (or restart) a learner's diagnostic
//! - `activate` - Activate a subscription plan
//! - `cancel` - Cancel a subscription
//! - `reset` - Replace a learner record with a fresh one
//! - `users` - List stored learners

mod commands;

use crate::config::{AppConfig, BackendKind};
use clap::{Parser, Subcommand};
use danlearn_core::DanlearnError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Danlearn - Learner Server
///
/// Placement diagnostic, daily usage quotas and subscription plans
/// for Danish learners.
#[derive(Parser, Debug)]
#[command(name = "danlearn")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the learner database (overrides configuration)
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Storage backend: "redb" (ACID database) or "memory" (volatile)
    #[arg(short = 'B', long, global = true)]
    pub backend: Option<BackendKind>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to (overrides configuration)
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to (overrides configuration)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Initialize a new empty database
    Init {
        /// Force initialization even if database exists
        #[arg(short, long)]
        force: bool,
    },

    /// Show a learner record with today's usage
    Status {
        /// Learner id
        user_id: String,
    },

    /// Start (or restart) a learner's placement diagnostic
    DiagnosticStart {
        /// Learner id
        user_id: String,
    },

    /// Activate a subscription plan (BASIC_20 or PRO_40)
    Activate {
        /// Learner id
        user_id: String,

        /// Plan name
        plan: String,
    },

    /// Cancel a learner's subscription
    Cancel {
        /// Learner id
        user_id: String,
    },

    /// Replace a learner record with a fresh default one
    Reset {
        /// Learner id
        user_id: String,
    },

    /// List stored learners
    Users,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

impl Cli {
    /// Configuration with explicit flags applied on top.
    pub fn resolve_config(&self) -> Result<AppConfig, DanlearnError> {
        let mut config = AppConfig::load(self.config.as_deref())?;
        if let Some(database) = &self.database {
            config.storage.database = database.clone();
        }
        if let Some(backend) = self.backend {
            config.storage.backend = backend;
        }
        Ok(config)
    }
}

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), DanlearnError> {
    let mut config = cli.resolve_config()?;
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Server { host, port }) => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            cmd_server(&config).await
        }
        Some(Commands::Init { force }) => cmd_init(&config, force),
        Some(Commands::Status { user_id }) => cmd_status(&config, json_mode, &user_id).await,
        Some(Commands::DiagnosticStart { user_id }) => {
            cmd_diagnostic_start(&config, json_mode, &user_id).await
        }
        Some(Commands::Activate { user_id, plan }) => {
            cmd_activate(&config, json_mode, &user_id, &plan).await
        }
        Some(Commands::Cancel { user_id }) => cmd_cancel(&config, json_mode, &user_id).await,
        Some(Commands::Reset { user_id }) => cmd_reset(&config, json_mode, &user_id).await,
        Some(Commands::Users) => cmd_users(&config, json_mode),
        None => {
            // No subcommand - list learners by default
            cmd_users(&config, json_mode)
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
