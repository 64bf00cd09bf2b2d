//! # hkg
//!
//! Command-line tool over a hyperknowledge graph snapshot.
//!
//! ## Usage
//!
//! ```bash
//! hkg init
//! hkg import -i entities.json
//! hkg fact alice knows bob
//! hkg neighbors alice
//! hkg --json-mode status
//! ```

use clap::Parser;
use hkg::{cli, config::HkgConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    let cli = cli::Cli::parse();

    let config = match HkgConfig::discover(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    init_tracing(&config, cli.verbose);

    if let Err(e) = cli::execute(cli, &config) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// HKG_LOG_FORMAT=json enables machine-parseable output.
fn init_tracing(config: &HkgConfig, verbose: bool) {
    let log_format = std::env::var("HKG_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            "hkg=debug,hyperknowledge_core=debug".into()
        } else {
            config.log_filter.as_str().into()
        }
    });

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
