use bridge_core::config::{BridgeConfig, NegotiationMode};

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

/// Negotiate the notebook proxy configuration with a frontend and print it as JSON.
#[derive(Debug, Parser)]
#[command(name = "proxy-config")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// WebSocket URL of the frontend bridge (omit to run detached and print `{}`)
    #[arg(long, value_name = "WS_URL")]
    pub frontend_url: Option<String>,

    /// Reply path: `channel` or `listener`
    #[arg(long, value_parser = parse_mode)]
    pub mode: Option<NegotiationMode>,

    /// How long to wait for the frontend, e.g. `2s` or `500ms`
    #[arg(long, value_parser = humantime::parse_duration)]
    pub timeout: Option<Duration>,

    /// Directory holding `bridge.toml` (default: platform config dir)
    #[arg(long, value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    /// Also write logs to `proxy-config.log` in this directory
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,
}

impl Cli {
    /// Command-line values win over file and environment settings.
    pub fn apply_to(&self, config: &mut BridgeConfig) {
        if let Some(mode) = self.mode {
            config.negotiation.mode = mode;
        }
        if let Some(timeout) = self.timeout {
            config.negotiation.request_timeout = timeout;
        }
    }
}

fn parse_mode(value: &str) -> Result<NegotiationMode, String> {
    NegotiationMode::parse(value)
        .ok_or_else(|| format!("unknown mode '{value}' (expected channel or listener)"))
}
