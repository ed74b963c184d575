//! Portal server.
//!
//! # Architecture Overview
//!
//! ```text
//!  process start
//!       │
//!       ▼
//!  ┌──────────┐   ┌──────────────┐   ┌───────────────────────────────────────┐
//!  │  config  │──▶│  lifecycle   │──▶│ secret policy (security::secret)       │
//!  │ file+env │   │   startup    │   │   production + insecure → abort, exit 1 │
//!  └──────────┘   │              │   └───────────────────────────────────────┘
//!                 │              │──▶ core pages  /  /payments/example
//!                 │              │──▶ template context (i18n `t` helper)
//!                 │              │──▶ features: auth → payments → organizations
//!                 │              │              → chat → review → streaming
//!                 │              │    (each isolated: failure = feature skipped)
//!                 └──────┬───────┘
//!                        ▼
//!                 ┌──────────────┐
//!                 │ http server  │  request id, trace, metrics, timeout
//!                 └──────────────┘
//! ```

#[cfg(feature = "server")]
use std::path::PathBuf;

#[cfg(feature = "server")]
use clap::Parser;
#[cfg(feature = "server")]
use tokio::net::TcpListener;

#[cfg(feature = "server")]
use portal_server::{
    config::{load_config, validation::validate_config, ConfigError},
    http::HttpServer,
    lifecycle::{initialize, Shutdown},
    observability::{
        logging::{init_logging, LogFormat},
        metrics::init_metrics,
    },
};

#[cfg(feature = "server")]
#[derive(Parser)]
#[command(name = "portal-server", version, about = "Portal web server")]
struct Cli {
    /// Optional TOML configuration file.
    #[arg(short, long, env = "PORTAL_CONFIG")]
    config: Option<PathBuf>,

    /// Override the bind address (e.g. 127.0.0.1:8080).
    #[arg(short, long)]
    bind: Option<String>,
}

#[cfg(feature = "server")]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is normal.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
        validate_config(&config).map_err(ConfigError::Validation)?;
    }

    init_logging(LogFormat::for_config(&config))?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.environment,
        bind_address = %config.listener.bind_address,
        "portal-server starting"
    );

    let metrics = if config.observability.metrics_enabled {
        match init_metrics() {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::error!(error = %e, "Failed to install metrics recorder");
                None
            }
        }
    } else {
        None
    };

    let app = match initialize(config, metrics) {
        Ok(app) => app,
        Err(e) => {
            tracing::error!(error = %e, "Startup aborted before binding");
            return Err(e.into());
        }
    };

    let listener = TcpListener::bind(&app.config().listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    HttpServer::new(&app)
        .run(listener, shutdown.subscribe())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

#[cfg(not(feature = "server"))]
fn main() {
    println!("{}", portal_server::lifecycle::startup::SERVER_DISABLED_MESSAGE);
}
