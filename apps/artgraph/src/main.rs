//! # artgraph
//!
//! The main binary for the artgraph artifact-group graph.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │            apps/artgraph (THE BINARY)        │
//! │                                              │
//! │   ┌─────────────┐        ┌───────────────┐   │
//! │   │    CLI      │        │    Config     │   │
//! │   │  (clap)     │        │ (toml, serde) │   │
//! │   └──────┬──────┘        └───────┬───────┘   │
//! │          └───────────┬───────────┘           │
//! │                      ▼                       │
//! │              ┌───────────────┐               │
//! │              │ artgraph-core │               │
//! │              │ (THE MAPPING) │               │
//! │              └───────────────┘               │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! artgraph init
//! artgraph register -s storage0 -r releases -n commons-io -p commons-io-2.16.jar
//! artgraph show -s storage0 -r releases -n commons-io --json-mode
//! artgraph delete --storage storage0 --repository releases --name commons-io
//! ```

use artgraph::cli::{self, Cli};
use artgraph::config::{Config, LogFormat};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("artgraph: {e}");
            std::process::exit(1);
        }
    };

    // RUST_LOG wins over the configured filter.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.log_filter.as_str().into());

    match config.log_format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli, &config) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the startup banner.
fn print_banner() {
    println!("artgraph v{} - artifact groups on a property graph\n", env!("CARGO_PKG_VERSION"));
}
