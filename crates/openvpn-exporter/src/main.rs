//! OpenVPN Exporter binary

use clap::Parser;
use openvpn_exporter::{Cli, Config, OpenVpnExporter, setup_tracing};
use validator::Validate;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Tracing is not initialized yet, so configuration errors go to stderr
    let mut config = Config::load_unvalidated(cli.config.as_deref()).inspect_err(|e| {
        eprintln!("Configuration error: {}", e);
    })?;
    cli.apply(&mut config);
    config.validate().inspect_err(|e| {
        eprintln!("Invalid configuration: {}", e);
    })?;

    let _telemetry_guard = setup_tracing(&config.logging, &config.telemetry).await?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "OpenVPN exporter starting");

    OpenVpnExporter::new(config.to_exporter_config()).run().await?;

    // Telemetry guard will flush spans on drop

    Ok(())
}
