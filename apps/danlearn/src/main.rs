//! # Danlearn - Learner Server
//!
//! The main binary for the Danlearn learner state machine.
//!
//! This application provides:
//! - HTTP REST API server (axum-based)
//! - CLI interface for inspecting and administering learner records
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                   apps/danlearn (THE BINARY)                 │
//! │                                                              │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────────┐   │
//! │  │   CLI       │    │   HTTP API  │    │   Evaluator     │   │
//! │  │  (clap)     │    │   (axum)    │    │   (reqwest)     │   │
//! │  └──────┬──────┘    └──────┬──────┘    └────────┬────────┘   │
//! │         │                  │                    │            │
//! │         └──────────────────┼────────────────────┘            │
//! │                            ▼                                 │
//! │                    ┌────────────────┐                        │
//! │                    │ danlearn-core  │                        │
//! │                    │  (THE LOGIC)   │                        │
//! │                    └────────────────┘                        │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server
//! danlearn server --host 0.0.0.0 --port 8080
//!
//! # CLI operations
//! danlearn status learner-42
//! danlearn activate learner-42 PRO_40
//! danlearn users
//! ```

use clap::Parser;
use danlearn::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // DANLEARN_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("DANLEARN_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "danlearn=info,tower_http=debug".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the Danlearn startup banner.
fn print_banner() {
    println!(
        r#"
  ██████╗  █████╗ ███╗   ██╗██╗     ███████╗ █████╗ ██████╗ ███╗   ██╗
  ██╔══██╗██╔══██╗████╗  ██║██║     ██╔════╝██╔══██╗██╔══██╗████╗  ██║
  ██║  ██║███████║██╔██╗ ██║██║     █████╗  ███████║██████╔╝██╔██╗ ██║
  ██║  ██║██╔══██║██║╚██╗██║██║     ██╔══╝  ██╔══██║██╔══██╗██║╚██╗██║
  ██████╔╝██║  ██║██║ ╚████║███████╗███████╗██║  ██║██║  ██║██║ ╚████║
  ╚═════╝ ╚═╝  ╚═╝╚═╝  ╚═══╝╚══════╝╚══════╝╚═╝  ╚═╝╚═╝  ╚═╝╚═╝  ╚═══╝

  Learner Server v{}

  Placement • Daily quotas • Plans
"#,
        env!("CARGO_PKG_VERSION")
    );
}
