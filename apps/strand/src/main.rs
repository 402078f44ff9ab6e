//! # Strand
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                 apps/strand (THE BINARY)             │
//! │                                                      │
//! │   ┌──────────┐   ┌──────────────┐   ┌────────────┐   │
//! │   │   CLI    │   │  WebSocket   │   │ Dispatcher │   │
//! │   │  (clap)  │──▶│   (axum)     │──▶│ + events   │   │
//! │   └──────────┘   └──────────────┘   └─────┬──────┘   │
//! │                                           ▼          │
//! │                                   ┌──────────────┐   │
//! │                                   │ strand-core  │   │
//! │                                   └──────────────┘   │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! strand server --port 8090 --snapshot graph.strd
//! strand status --json-mode
//! strand export -o graph.json
//! ```

use clap::Parser;
use strand::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // STRAND_LOG_FORMAT=json switches to machine-parseable output.
    let log_format = std::env::var("STRAND_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "strand=info,tower_http=debug".into());

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

fn print_banner() {
    println!(
        r#"
  ┌─┐┌┬┐┬─┐┌─┐┌┐┌┌┬┐
  └─┐ │ ├┬┘├─┤│││ ││
  └─┘ ┴ ┴└─┴ ┴┘└┘─┴┘

  Graph protocol server v{}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
