//! Integration tests for configuration loading

use matchday_oracle::settings::{LedgerBackend, Settings};
use std::io::Write;

#[test]
fn shipped_config_parses_with_reference_defaults() {
    let settings = Settings::from_toml_str(include_str!("../Config.toml"))
        .expect("Config.toml should parse");

    assert_eq!(settings.oracle.interval_seconds, 60);
    assert_eq!(settings.oracle.confirmation_threshold, 2);
    assert!(settings.oracle.supported_leagues.is_empty());
    assert_eq!(settings.http.retry_attempts, 3);
    assert_eq!(settings.http.retry_delay_ms, 5000);
    assert_eq!(settings.settlement.confirmations, 1);
    assert!(settings.settlement.simulate_before_send);
    assert_eq!(settings.ledger.backend, LedgerBackend::Memory);
    assert!(!settings.providers.sportradar.enabled);
    assert_eq!(settings.providers.sportradar.qps_limit, Some(1));

    // Secrets never come from the file.
    assert!(settings.settlement.private_key.is_none());
    assert!(settings.providers.football_data.api_key.is_none());
}

#[test]
fn config_file_is_loaded_from_path() {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .unwrap();
    writeln!(
        file,
        r#"
[oracle]
interval_seconds = 15
confirmation_threshold = 3
supported_leagues = ["Premier League", "La Liga"]

[ledger]
backend = "file"
path = "/tmp/ledger.json"

[registration]
enabled = true
"#
    )
    .unwrap();

    let settings = Settings::from_file(file.path().to_str().unwrap()).unwrap();
    assert_eq!(settings.oracle.interval_seconds, 15);
    assert_eq!(settings.oracle.confirmation_threshold, 3);
    assert_eq!(
        settings.oracle.supported_leagues,
        vec!["Premier League".to_string(), "La Liga".to_string()]
    );
    assert_eq!(settings.ledger.backend, LedgerBackend::File);
    assert_eq!(settings.ledger.path, "/tmp/ledger.json");
    assert!(settings.registration.enabled);
}

#[test]
fn missing_config_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");
    let settings = Settings::from_file(path.to_str().unwrap()).unwrap();
    assert_eq!(settings.http.timeout_seconds, 10);
    assert_eq!(settings.settlement.confirmation_timeout_seconds, 180);
}

#[test]
fn unknown_ledger_backend_is_an_error() {
    let toml = r#"
        [ledger]
        backend = "redis"
    "#;
    assert!(Settings::from_toml_str(toml).is_err());
}
