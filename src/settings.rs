use config::{Config, ConfigError, File, FileFormat};
use ethers::types::Address;
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;

/// Secret value read from the environment (API keys, signing key).
/// Never printed by `Debug`.
#[derive(Clone, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Oracle {
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,
    /// Minimum number of providers that must agree on a score.
    #[serde(default = "default_confirmation_threshold")]
    pub confirmation_threshold: usize,
    #[serde(default = "default_max_matches_per_cycle")]
    pub max_matches_per_cycle: usize,
    /// League names to settle; empty means every league.
    #[serde(default)]
    pub supported_leagues: Vec<String>,
}

fn default_interval_seconds() -> u64 {
    60
}
fn default_confirmation_threshold() -> usize {
    2
}
fn default_max_matches_per_cycle() -> usize {
    50
}

impl Default for Oracle {
    fn default() -> Self {
        Self {
            interval_seconds: default_interval_seconds(),
            confirmation_threshold: default_confirmation_threshold(),
            max_matches_per_cycle: default_max_matches_per_cycle(),
            supported_leagues: Vec::new(),
        }
    }
}

impl Oracle {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Http {
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Total attempts per provider call, first try included.
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

fn default_timeout_seconds() -> u64 {
    10
}
fn default_retry_attempts() -> u32 {
    3
}
fn default_retry_delay_ms() -> u64 {
    5000
}

impl Default for Http {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout_seconds(),
            retry_attempts: default_retry_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl Http {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ProviderConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Falls back to the vendor's public endpoint when unset.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<Secret>,
    #[serde(default)]
    pub qps_limit: Option<u32>,
    /// Native vendor id -> canonical match id.
    #[serde(default)]
    pub id_map: HashMap<String, u64>,
}

fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}

impl ProviderConfig {
    pub fn base_url_or(&self, default: &str) -> String {
        self.base_url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(default)
            .trim_end_matches('/')
            .to_string()
    }

    fn enabled_default() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Providers {
    #[serde(default = "ProviderConfig::enabled_default")]
    pub football_data: ProviderConfig,
    #[serde(default = "ProviderConfig::enabled_default")]
    pub sports_data: ProviderConfig,
    /// Off unless configured: the trial API is tightly rate limited.
    #[serde(default)]
    pub sportradar: ProviderConfig,
}

impl Default for Providers {
    fn default() -> Self {
        Self {
            football_data: ProviderConfig::enabled_default(),
            sports_data: ProviderConfig::enabled_default(),
            sportradar: ProviderConfig::default(),
        }
    }
}

impl Providers {
    /// (name, config) of every provider switched on.
    pub fn enabled(&self) -> Vec<(&'static str, &ProviderConfig)> {
        [
            ("football_data", &self.football_data),
            ("sports_data", &self.sports_data),
            ("sportradar", &self.sportradar),
        ]
        .into_iter()
        .filter(|(_, cfg)| cfg.enabled)
        .collect()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settlement {
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    #[serde(default)]
    pub contract_address: String,
    /// Read from the node when unset.
    #[serde(default)]
    pub chain_id: Option<u64>,
    #[serde(default = "default_confirmations")]
    pub confirmations: usize,
    #[serde(default = "default_confirmation_timeout_seconds")]
    pub confirmation_timeout_seconds: u64,
    /// Dry-run the call with `eth_call` first so reverts cost no gas.
    #[serde(default = "default_true")]
    pub simulate_before_send: bool,
    #[serde(default)]
    pub gas_limit: Option<u64>,
    /// Only ever set from `ORACLE_PRIVATE_KEY`.
    #[serde(skip)]
    pub private_key: Option<Secret>,
}

fn default_rpc_url() -> String {
    "http://127.0.0.1:8545".to_string()
}
fn default_confirmations() -> usize {
    1
}
fn default_confirmation_timeout_seconds() -> u64 {
    180
}

impl Default for Settlement {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            contract_address: String::new(),
            chain_id: None,
            confirmations: default_confirmations(),
            confirmation_timeout_seconds: default_confirmation_timeout_seconds(),
            simulate_before_send: true,
            gas_limit: None,
            private_key: None,
        }
    }
}

impl Settlement {
    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_seconds)
    }

    pub fn contract_address(&self) -> Result<Address, ConfigError> {
        self.contract_address.trim().parse::<Address>().map_err(|e| {
            ConfigError::Message(format!(
                "settlement.contract_address '{}' is not a valid address: {}",
                self.contract_address, e
            ))
        })
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LedgerBackend {
    Memory,
    File,
    Postgres,
}

impl Default for LedgerBackend {
    fn default() -> Self {
        LedgerBackend::Memory
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Ledger {
    #[serde(default)]
    pub backend: LedgerBackend,
    #[serde(default = "default_ledger_path")]
    pub path: String,
}

fn default_ledger_path() -> String {
    "data/processed_matches.json".to_string()
}

impl Default for Ledger {
    fn default() -> Self {
        Self {
            backend: LedgerBackend::default(),
            path: default_ledger_path(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Registration {
    #[serde(default = "default_false")]
    pub enabled: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Metrics {
    /// Prometheus exporter port (only with the `observability` feature).
    #[serde(default)]
    pub prometheus_port: Option<u16>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub oracle: Oracle,
    #[serde(default)]
    pub http: Http,
    #[serde(default)]
    pub providers: Providers,
    #[serde(default)]
    pub settlement: Settlement,
    #[serde(default)]
    pub ledger: Ledger,
    #[serde(default)]
    pub registration: Registration,
    #[serde(default)]
    pub log: LogSettings,
    #[serde(default)]
    pub metrics: Metrics,
}

impl Settings {
    /// Loads `Config.toml` from the working directory and applies environment overrides.
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_path("Config.toml")
    }

    pub fn from_path(path: &str) -> Result<Self, ConfigError> {
        let mut settings = Self::from_file(path)?;
        settings.apply_env_overrides_from(|key| env::var(key).ok())?;
        Ok(settings)
    }

    /// Reads a config file without environment overrides. A missing file yields defaults.
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name(path).required(false))
            .build()?;
        s.try_deserialize()
    }

    /// Parses settings from TOML text without touching the environment.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?;
        s.try_deserialize()
    }

    /// Secrets and deployment-specific values come from the environment.
    /// A value that fails to parse is a configuration error.
    pub fn apply_env_overrides_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(key) = non_empty("FOOTBALL_DATA_KEY") {
            self.providers.football_data.api_key = Some(Secret::new(key));
        }
        if let Some(key) = non_empty("SPORTS_DATA_KEY") {
            self.providers.sports_data.api_key = Some(Secret::new(key));
        }
        if let Some(key) = non_empty("SPORTRADAR_API_KEY") {
            self.providers.sportradar.api_key = Some(Secret::new(key));
        }
        if let Some(key) = non_empty("ORACLE_PRIVATE_KEY") {
            self.settlement.private_key = Some(Secret::new(key));
        }
        if let Some(url) = non_empty("SETTLEMENT_RPC_URL") {
            self.settlement.rpc_url = url;
        }
        if let Some(address) = non_empty("BETTING_POOL_ADDRESS") {
            self.settlement.contract_address = address;
        }
        if let Some(raw) = non_empty("ORACLE_CONFIRMATION_THRESHOLD") {
            self.oracle.confirmation_threshold = raw.parse::<usize>().map_err(|e| {
                ConfigError::Message(format!(
                    "ORACLE_CONFIRMATION_THRESHOLD '{}' is not a valid count: {}",
                    raw, e
                ))
            })?;
        }
        if let Some(raw) = non_empty("ORACLE_SUPPORTED_LEAGUES") {
            self.oracle.supported_leagues = parse_string_list(&raw);
        }
        Ok(())
    }

    /// Startup checks. Any error here aborts the process before the loop starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.oracle.interval_seconds == 0 {
            return Err(ConfigError::Message(
                "oracle.interval_seconds must be greater than 0".into(),
            ));
        }
        if self.oracle.confirmation_threshold == 0 {
            return Err(ConfigError::Message(
                "oracle.confirmation_threshold must be at least 1".into(),
            ));
        }
        if self.http.retry_attempts == 0 {
            return Err(ConfigError::Message(
                "http.retry_attempts must be at least 1".into(),
            ));
        }

        let enabled = self.providers.enabled();
        if enabled.len() < self.oracle.confirmation_threshold {
            return Err(ConfigError::Message(format!(
                "{} provider(s) enabled but confirmation_threshold is {}: consensus could never be reached",
                enabled.len(),
                self.oracle.confirmation_threshold
            )));
        }
        for (name, cfg) in &enabled {
            if cfg.api_key.as_ref().map_or(true, Secret::is_blank) {
                return Err(ConfigError::Message(format!(
                    "provider '{}' is enabled but has no API key",
                    name
                )));
            }
            if let Some(base_url) = &cfg.base_url {
                url::Url::parse(base_url).map_err(|e| {
                    ConfigError::Message(format!(
                        "provider '{}' has an invalid base_url '{}': {}",
                        name, base_url, e
                    ))
                })?;
            }
        }

        url::Url::parse(&self.settlement.rpc_url).map_err(|e| {
            ConfigError::Message(format!(
                "settlement.rpc_url '{}' is not a valid URL: {}",
                self.settlement.rpc_url, e
            ))
        })?;

        if self.settlement.private_key.as_ref().map_or(true, Secret::is_blank) {
            return Err(ConfigError::Message(
                "ORACLE_PRIVATE_KEY must be set".into(),
            ));
        }
        if self.settlement.contract_address.trim().is_empty() {
            return Err(ConfigError::Message(
                "settlement.contract_address (or BETTING_POOL_ADDRESS) must be set".into(),
            ));
        }
        self.settlement.contract_address()?;
        if self.settlement.confirmations == 0 {
            return Err(ConfigError::Message(
                "settlement.confirmations must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Accepts `a,b,c` or a JSON array of strings.
fn parse_string_list(input: &str) -> Vec<String> {
    let trimmed = input.trim();
    if trimmed.starts_with('[') {
        if let Ok(v) = serde_json::from_str::<Vec<String>>(trimmed) {
            return v;
        }
    }
    trimmed
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(',')
        .map(|s| s.trim().trim_matches('"').trim_matches('\'').to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
