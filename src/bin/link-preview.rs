use clap::{Parser, Subcommand};
use link_preview::server::{serve, AppState, BearerTokenGate, DEFAULT_ROUTE};
use link_preview::{PreviewMode, PreviewService, PreviewServiceConfig};
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "link-preview", version, about = "Fetch link previews for untrusted URLs")]
struct Cli {
    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Also write logs to a daily rolling file in this directory
    #[arg(long, global = true)]
    log_dir: Option<std::path::PathBuf>,

    /// Third-party metadata service used when the direct fetch fails
    #[arg(long, env = "LINK_PREVIEW_FALLBACK_ENDPOINT", global = true)]
    fallback_endpoint: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a single preview and print it as JSON
    Fetch {
        url: String,

        /// Add listing enrichment
        #[arg(long)]
        listing: bool,
    },
    /// Serve the authenticated preview endpoint
    Serve {
        #[arg(long, default_value = "127.0.0.1:8080")]
        addr: SocketAddr,

        #[arg(long, default_value = DEFAULT_ROUTE)]
        route: String,

        /// Comma-separated bearer tokens accepted by the endpoint
        #[arg(long, env = "LINK_PREVIEW_TOKENS", value_delimiter = ',')]
        tokens: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    #[cfg(feature = "logging")]
    {
        let log_config = link_preview::LogConfig {
            log_level: cli.log_level.clone(),
            file_output: cli.log_dir.is_some(),
            log_dir: cli.log_dir.clone().unwrap_or_else(|| "logs".into()),
            ..Default::default()
        };
        if let Err(e) = link_preview::setup_logging(log_config) {
            eprintln!("failed to initialize logging: {e}");
        }
    }

    let mut config = PreviewServiceConfig::from_env();
    if let Some(endpoint) = cli.fallback_endpoint {
        config = config.with_fallback_endpoint(endpoint);
    }

    let service = match PreviewService::new_with_config(config) {
        Ok(service) => service,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Command::Fetch { url, listing } => {
            let mode = if listing {
                PreviewMode::Listing
            } else {
                PreviewMode::Standard
            };
            match service.generate_preview(&url, mode).await {
                Ok(response) => {
                    #[cfg(feature = "logging")]
                    link_preview::log_preview_card(&response);
                    match serde_json::to_string_pretty(&response) {
                        Ok(json) => println!("{json}"),
                        Err(e) => {
                            eprintln!("{e}");
                            return ExitCode::FAILURE;
                        }
                    }
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    e.log();
                    eprintln!("{e}");
                    ExitCode::FAILURE
                }
            }
        }
        Command::Serve {
            addr,
            route,
            tokens,
        } => {
            if tokens.is_empty() {
                tracing::warn!("No bearer tokens configured, every request will be rejected");
            }
            let state = AppState {
                service: Arc::new(service),
                auth: Arc::new(BearerTokenGate::new(tokens)),
            };
            match serve(addr, &route, state).await {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    eprintln!("server error: {e}");
                    ExitCode::FAILURE
                }
            }
        }
    }
}
