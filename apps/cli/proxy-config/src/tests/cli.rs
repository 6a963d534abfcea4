// Unit tests for command-line parsing

use crate::cli::Cli;

use bridge_core::config::{BridgeConfig, NegotiationMode};

use std::time::Duration;

use clap::Parser;

/// **VALUE**: Verifies command-line values override loaded settings.
///
/// **BUG THIS CATCHES**: Would catch `--timeout` being parsed in the wrong
/// unit or `--mode` being ignored.
#[test]
fn given_mode_and_timeout_args_when_apply_to_then_config_overridden() {
    // GIVEN: Arguments selecting channel mode with a 750ms timeout
    let cli = Cli::try_parse_from(["proxy-config", "--mode", "channel", "--timeout", "750ms"])
        .expect("valid args");

    // WHEN: Applied to defaults
    let mut config = BridgeConfig::default();
    cli.apply_to(&mut config);

    // THEN: Both values are overridden
    assert_eq!(config.negotiation.mode, NegotiationMode::Channel);
    assert_eq!(config.negotiation.request_timeout, Duration::from_millis(750));
    assert!(cli.frontend_url.is_none());
}

#[test]
fn given_no_args_when_apply_to_then_config_unchanged() {
    let cli = Cli::try_parse_from(["proxy-config"]).expect("valid args");

    let mut config = BridgeConfig::default();
    cli.apply_to(&mut config);

    assert_eq!(config, BridgeConfig::default());
}

#[test]
fn given_unknown_mode_when_parsed_then_rejected() {
    let result = Cli::try_parse_from(["proxy-config", "--mode", "smoke-signal"]);

    assert!(result.is_err());
}
