// Unit tests for bridge configuration: file loading, overrides, validation

use crate::config::{
    BridgeConfig, DEFAULT_MAX_CONTENT_LENGTH, DEFAULT_REQUEST_TIMEOUT, ENV_MAX_CONTENT_LENGTH,
    ENV_MODE, ENV_TIMEOUT, NegotiationMode,
};
use crate::error::config::ConfigError;

use std::collections::HashMap;
use std::time::Duration;

use serial_test::serial;
use tempfile::TempDir;

fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |name: &str| map.get(name).cloned()
}

/// **VALUE**: Verifies a missing config file yields the documented defaults.
///
/// **WHY THIS MATTERS**: Most kernels never ship a `bridge.toml`; the defaults
/// are the production behavior.
///
/// **BUG THIS CATCHES**: Would catch a missing file being reported as an
/// error, or a default drifting (2s timeout, 512-byte cap, listener mode).
#[test]
fn given_no_config_file_when_load_then_defaults() {
    // GIVEN: An empty config directory
    let dir = TempDir::new().expect("temp dir");

    // WHEN: Loading
    let config = BridgeConfig::load(dir.path()).expect("defaults");

    // THEN: Defaults apply
    assert_eq!(config, BridgeConfig::default());
    assert_eq!(config.negotiation.request_timeout, DEFAULT_REQUEST_TIMEOUT);
    assert_eq!(config.negotiation.mode, NegotiationMode::Listener);
    assert_eq!(config.listener.max_content_length, DEFAULT_MAX_CONTENT_LENGTH);
    assert_eq!(config.listener.bind_host, "127.0.0.1");
    assert_eq!(config.channel.target_name, "jupyter_dash");
}

/// **VALUE**: Verifies a partial file overrides only the keys it names.
///
/// **BUG THIS CATCHES**: Would catch humantime durations failing to parse, or
/// an absent section wiping defaults.
#[test]
fn given_partial_config_file_when_load_then_merges_with_defaults() {
    // GIVEN: A file setting mode and two durations
    let dir = TempDir::new().expect("temp dir");
    std::fs::write(
        dir.path().join("bridge.toml"),
        r#"
[negotiation]
mode = "channel"
request_timeout = "500ms"

[listener]
poll_interval = "25ms"
"#,
    )
    .expect("write config");

    // WHEN: Loading
    let config = BridgeConfig::load(dir.path()).expect("valid file");

    // THEN: Named keys changed, the rest are defaults
    assert_eq!(config.negotiation.mode, NegotiationMode::Channel);
    assert_eq!(config.negotiation.request_timeout, Duration::from_millis(500));
    assert_eq!(config.listener.poll_interval, Duration::from_millis(25));
    assert_eq!(config.listener.max_content_length, DEFAULT_MAX_CONTENT_LENGTH);
}

#[test]
fn given_invalid_toml_when_load_then_parse_error() {
    let dir = TempDir::new().expect("temp dir");
    std::fs::write(dir.path().join("bridge.toml"), "[negotiation\nmode=").expect("write");

    let result = BridgeConfig::load(dir.path());

    assert!(matches!(result, Err(ConfigError::ParseError { .. })));
}

/// **VALUE**: Verifies the listener cannot be configured onto a public interface.
///
/// **WHY THIS MATTERS**: The listener accepts configuration from anyone who
/// can reach it; it must stay on loopback.
///
/// **BUG THIS CATCHES**: Would catch validation accepting `0.0.0.0`.
#[test]
fn given_non_loopback_bind_host_when_validate_then_validation_error() {
    let mut config = BridgeConfig::default();
    config.listener.bind_host = "0.0.0.0".to_string();

    assert!(matches!(
        config.validate(),
        Err(ConfigError::ValidationError { .. })
    ));

    config.listener.bind_host = "::1".to_string();
    assert!(config.validate().is_ok());
}

#[test]
fn given_zero_values_when_validate_then_validation_error() {
    let mut config = BridgeConfig::default();
    config.negotiation.request_timeout = Duration::ZERO;
    assert!(config.validate().is_err());

    let mut config = BridgeConfig::default();
    config.listener.max_content_length = 0;
    assert!(config.validate().is_err());

    let mut config = BridgeConfig::default();
    config.channel.target_name = "  ".to_string();
    assert!(config.validate().is_err());
}

/// **VALUE**: Verifies environment overrides apply on top of file values.
///
/// **BUG THIS CATCHES**: Would catch an override variable being ignored or
/// parsed with the wrong unit.
#[test]
fn given_override_variables_when_apply_overrides_then_values_replaced() {
    let mut config = BridgeConfig::default();

    config
        .apply_overrides(lookup_from(&[
            (ENV_MODE, "Channel"),
            (ENV_TIMEOUT, "3s"),
            (ENV_MAX_CONTENT_LENGTH, "1024"),
        ]))
        .expect("valid overrides");

    assert_eq!(config.negotiation.mode, NegotiationMode::Channel);
    assert_eq!(config.negotiation.request_timeout, Duration::from_secs(3));
    assert_eq!(config.listener.max_content_length, 1024);
}

#[test]
fn given_bad_override_when_apply_overrides_then_override_error_names_variable() {
    let mut config = BridgeConfig::default();

    let result = config.apply_overrides(lookup_from(&[(ENV_MODE, "carrier-pigeon")]));

    match result {
        Err(ConfigError::OverrideError { variable, .. }) => assert_eq!(variable, ENV_MODE),
        other => panic!("expected OverrideError, got {other:?}"),
    }
}

/// **VALUE**: Verifies `from_environment` reads the real process environment.
///
/// **WHY THIS MATTERS**: This is the path the CLI uses; the closure-based
/// tests above do not prove `std::env` is consulted.
///
/// **BUG THIS CATCHES**: Would catch the production lookup being wired to the
/// wrong variable names.
#[test]
#[serial]
fn given_process_env_override_when_from_environment_then_applied() {
    // GIVEN: An empty config dir and a timeout override in the environment
    let dir = TempDir::new().expect("temp dir");
    // SAFETY: serialized with every other test touching the environment.
    unsafe { std::env::set_var(ENV_TIMEOUT, "750ms") };

    // WHEN: Loading from the environment
    let result = BridgeConfig::from_environment(dir.path());
    unsafe { std::env::remove_var(ENV_TIMEOUT) };

    // THEN: The override applied
    let config = result.expect("valid environment");
    assert_eq!(config.negotiation.request_timeout, Duration::from_millis(750));
}
