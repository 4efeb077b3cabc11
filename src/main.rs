//! Web server (v1)
//!
//! # Architecture Overview
//!
//! ```text
//!   configuration/*.toml + APP__* env
//!        │
//!        ▼
//!   ┌──────────┐    ┌─────────────┐    ┌──────────┐    ┌─────────────┐
//!   │  config  │───▶│ provisioner │───▶│  routes  │───▶│ application │
//!   └──────────┘    │ db/queue/   │    │ (handler)│    │ bind/serve  │
//!                   │ search      │    └──────────┘    └──────┬──────┘
//!                   └─────────────┘                           │
//!                                                             ▼
//!                                     signal / listener error → teardown
//!                                     (search, queue, database)
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use web_server::config::{self, Environment};
use web_server::observability::{logging, metrics};
use web_server::{lifecycle, Application, Shutdown};

#[derive(Parser, Debug)]
#[command(name = "web-server", version, about = "Web server with managed backend lifecycle")]
struct Cli {
    /// Directory holding base.toml and <environment>.toml.
    #[arg(long, default_value = "configuration")]
    config_dir: PathBuf,

    /// Environment file to layer over base.toml (overrides APP_ENVIRONMENT).
    #[arg(long)]
    environment: Option<Environment>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let environment = match cli.environment {
        Some(environment) => environment,
        None => Environment::from_env()?,
    };
    let settings = config::load_settings(&cli.config_dir, environment)?;

    logging::init_logging(&settings.telemetry)?;

    tracing::info!(
        environment = environment.as_str(),
        port = settings.application.port,
        queue = settings.queue.is_some(),
        search = settings.search.is_some(),
        "Configuration loaded"
    );

    if let Some(address) = &settings.telemetry.metrics_address {
        match address.parse::<SocketAddr>() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics endpoint");
                }
            }
            Err(_) => tracing::error!(metrics_address = %address, "Failed to parse metrics address"),
        }
    }

    let application = Application::builder(settings)
        .span(logging::application_span(environment.as_str()))
        .build()
        .await
        .inspect_err(|e| tracing::error!(error = %e, "Startup failed"))?;

    let shutdown = Shutdown::new();
    lifecycle::forward_signals(shutdown.clone());

    application
        .start_with_shutdown(shutdown.signalled())
        .await
        .inspect_err(|e| tracing::error!(error = %e, "Server terminated"))?;

    Ok(())
}
