//! Strategic Compass binary: composition root.
//!
//! 1. Parse CLI flags and load configuration from TOML
//! 2. Initialize tracing
//! 3. Check the session role may use the chat
//! 4. Load the workflow catalog and start the conversation engine
//! 5. Run the interactive terminal session

mod cli;
mod session;

use std::path::Path;
use std::sync::Arc;

use clap::Parser;

use compass_chat::{ConversationEngine, WorkflowCatalog};
use compass_core::config::CompassConfig;
use compass_core::Permission;

use crate::cli::CliArgs;
use crate::session::Session;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config. Tracing needs the resolved log level, so loading is reported
    // after the subscriber is installed.
    let config_file = args.resolve_config_path();
    let loaded = CompassConfig::load(&config_file);
    let mut config = match &loaded {
        Ok(config) => config.clone(),
        Err(_) => CompassConfig::default(),
    };
    args.apply_overrides(&mut config);

    // Tracing.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.general.log_level)),
        )
        .init();

    tracing::info!("Starting Strategic Compass v{}", env!("CARGO_PKG_VERSION"));
    match loaded {
        Ok(_) => tracing::info!(path = %config_file.display(), "Configuration loaded"),
        Err(e) => tracing::warn!(
            path = %config_file.display(),
            error = %e,
            "Failed to load config, using defaults"
        ),
    }

    // Access.
    let role = config.general.role;
    if let Err(e) = role.require(Permission::UseChat) {
        tracing::error!(role = %role, "Role may not use the strategy chat");
        return Err(e.into());
    }

    // Catalog.
    let catalog = match config.chat.catalog_path {
        Some(ref path) => Arc::new(WorkflowCatalog::load(Path::new(path))?),
        None => WorkflowCatalog::builtin(),
    };
    tracing::info!(
        workflows = catalog.len(),
        role = %role,
        delay_ms = config.chat.response_delay_ms,
        "Conversation engine ready"
    );

    let engine = ConversationEngine::new(catalog, &config.chat);
    Session::new(engine, &config).run().await?;

    Ok(())
}
