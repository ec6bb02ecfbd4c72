use anyhow::{Context, Result};
use clap::Parser;
use salary_cap_service::{initialize_logging_with_config, load_configuration, run, Cli};
use tracing::{debug, error};
use transfer_service::TransferService;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let config = load_configuration(cli.config.as_deref()).context("Failed to load configuration")?;
    initialize_logging_with_config(&config.logging.level, &config.logging.format)
        .context("Failed to initialize logging")?;
    debug!("Configuration loaded: {:?}", config.transfer.constraints);

    let service = TransferService::new(config.transfer)
        .await
        .context("Failed to initialize transfer service")?;

    if let Err(e) = run(&service, cli.command).await {
        error!("Command failed: {:#}", e);
        return Err(e);
    }
    Ok(())
}
