//! # Paystack Webhooks Service
//!
//! Binary entry point for the Paystack webhook HTTP service.
//!
//! This executable:
//! - Loads configuration from files and environment
//! - Initializes logging
//! - Builds the stores, handlers and dispatcher
//! - Starts the HTTP server from paystack-webhooks-api

mod settings;
mod subscribers;
mod wiring;

use paystack_webhooks_api::{start_server, LoggingConfig, ServiceError};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let explicit_path = std::env::var(settings::CONFIG_FILE_ENV).ok();

    let service_config = match settings::load_config(explicit_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            init_tracing(&LoggingConfig::default());
            error!(
                error = %e,
                "Could not load service configuration; aborting. \
                 Fix the configuration and restart."
            );
            std::process::exit(3);
        }
    };

    init_tracing(&service_config.logging);
    info!("Starting Paystack Webhooks Service");

    if let Err(e) = service_config.validate() {
        error!(error = %e, "Service configuration is invalid; aborting");
        std::process::exit(3);
    }

    let state = match wiring::build_state(service_config).await {
        Ok(state) => state,
        Err(e) => {
            error!(error = %e, "Failed to build service components; aborting");
            std::process::exit(exit_code(&e));
        }
    };

    info!(
        host = %state.config.server.host,
        port = state.config.server.port,
        endpoint = %state.config.webhooks.endpoint_path,
        "Starting HTTP server"
    );

    if let Err(e) = start_server(state).await {
        error!("Failed to start server: {}", e);
        std::process::exit(exit_code(&e));
    }

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},tower_http=debug", logging.level)));

    let registry = tracing_subscriber::registry().with(filter);
    let result = if logging.json_format {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };

    if let Err(e) = result {
        eprintln!("Failed to initialize logging: {}", e);
    }
}

fn exit_code(error: &ServiceError) -> i32 {
    match error {
        ServiceError::BindFailed { .. } => 1,
        ServiceError::ServerFailed { .. } => 2,
        ServiceError::Configuration(_) => 3,
    }
}
