use crate::cli::Cli;
use crate::error::AppError;

use bridge_core::ProxyNegotiator;
use bridge_core::channel::{KernelChannel, MemoryChannel, WsChannel};
use bridge_core::config::BridgeConfig;

use std::sync::Arc;

use log::info;
use serde_json::{Map, Value};

/// Resolve settings from file, environment and command line, in that order.
pub fn load_config(cli: &Cli) -> Result<BridgeConfig, AppError> {
    let config_dir = match &cli.config_dir {
        Some(dir) => dir.clone(),
        None => BridgeConfig::default_dir()?,
    };

    let mut config = BridgeConfig::from_environment(&config_dir)?;
    cli.apply_to(&mut config);
    config.validate()?;
    Ok(config)
}

/// Negotiate and return the flat config mapping (`{}` when detached).
pub async fn run(cli: &Cli) -> Result<Map<String, Value>, AppError> {
    let config = load_config(cli)?;

    match &cli.frontend_url {
        Some(url) => {
            let channel = WsChannel::connect(url, &config.channel).await?;
            negotiate_with(channel, config).await
        }
        None => {
            info!("No frontend URL given, running detached");
            negotiate_with(MemoryChannel::detached(), config).await
        }
    }
}

async fn negotiate_with<C: KernelChannel>(
    channel: C,
    config: BridgeConfig,
) -> Result<Map<String, Value>, AppError> {
    let mode = config.negotiation.mode;
    let negotiator = ProxyNegotiator::new(Arc::new(channel), config);

    info!("Negotiating proxy config ({mode:?} mode)");
    negotiator.negotiate(None).await?;

    Ok(negotiator.get_config()?.to_map())
}
