//! # Provider Clients
//!
//! One client per sports-data vendor, all implementing
//! [`MatchProvider`](crate::match_provider::MatchProvider):
//!
//! - **football-data.org** (v4): `X-Auth-Token` header
//! - **SportsData.io** (soccer v3): `Ocp-Apim-Subscription-Key` header
//! - **SportRadar** (soccer v4): `api_key` query parameter
//!
//! The helpers in this module hold the normalization rules shared by every
//! vendor: canonical id mapping, score invariants and timestamp parsing.

pub mod football_data;
pub mod sportradar;
pub mod sports_data;

use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDateTime};
use log::{info, warn};
use std::collections::HashMap;
use std::sync::Arc;

use crate::match_provider::MatchProvider;
use crate::match_result::{MatchId, MatchResult, MatchStatus};
use crate::settings::{ProviderConfig, Secret, Settings};

pub use football_data::FootballDataClient;
pub use sportradar::SportRadarClient;
pub use sports_data::SportsDataClient;

/// Maps vendor-native match ids to canonical ids and back.
///
/// Explicit `id_map` entries win; otherwise the trailing numeric segment of
/// the native id is the canonical id (`"12345"`, `"sr:sport_event:12345"`).
#[derive(Debug, Clone, Default)]
pub struct IdMapping {
    to_canonical: HashMap<String, MatchId>,
    to_native: HashMap<MatchId, String>,
    native_prefix: &'static str,
}

impl IdMapping {
    pub fn new(map: &HashMap<String, MatchId>) -> Self {
        Self {
            to_canonical: map.clone(),
            to_native: map.iter().map(|(native, id)| (*id, native.clone())).collect(),
            native_prefix: "",
        }
    }

    /// Prefix prepended to canonical ids that have no explicit mapping.
    pub fn with_native_prefix(mut self, prefix: &'static str) -> Self {
        self.native_prefix = prefix;
        self
    }

    pub fn canonical(&self, native: &str) -> Option<MatchId> {
        let native = native.trim();
        if let Some(id) = self.to_canonical.get(native) {
            return Some(*id);
        }
        native.rsplit(':').next()?.parse().ok()
    }

    pub fn native(&self, canonical: MatchId) -> String {
        match self.to_native.get(&canonical) {
            Some(native) => native.clone(),
            None => format!("{}{}", self.native_prefix, canonical),
        }
    }
}

/// Final scores are mandatory on finished matches; other states default to 0-0.
pub(crate) fn normalize_scores(
    status: MatchStatus,
    home: Option<i64>,
    away: Option<i64>,
) -> Result<(u32, u32), String> {
    let convert = |side: &str, value: i64| {
        u32::try_from(value).map_err(|_| format!("{} score {} is out of range", side, value))
    };
    match (home, away) {
        (Some(h), Some(a)) => Ok((convert("home", h)?, convert("away", a)?)),
        _ if status == MatchStatus::Finished => {
            Err("finished match reported without a final score".to_string())
        }
        (h, a) => Ok((
            h.map(|v| convert("home", v)).transpose()?.unwrap_or(0),
            a.map(|v| convert("away", v)).transpose()?.unwrap_or(0),
        )),
    }
}

/// RFC 3339 first, then a naive `YYYY-MM-DDTHH:MM:SS` read as UTC. Epoch milliseconds.
pub(crate) fn parse_timestamp_ms(raw: &str) -> Result<i64, String> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.timestamp_millis());
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive.and_utc().timestamp_millis());
        }
    }
    Err(format!("unparseable date '{}'", raw))
}

/// Keeps the records that normalized, logs and drops the rest.
pub(crate) fn keep_normalized<I>(provider: &str, records: I) -> Vec<MatchResult>
where
    I: IntoIterator<Item = Result<MatchResult, String>>,
{
    let mut kept = Vec::new();
    let mut dropped = 0usize;
    for record in records {
        match record {
            Ok(result) => kept.push(result),
            Err(reason) => {
                dropped += 1;
                warn!("⚠️ [{}] Dropping malformed record: {}", provider, reason);
            }
        }
    }
    if dropped > 0 {
        crate::metrics::increment_malformed_records(provider, dropped as u64);
    }
    kept
}

fn require_key(name: &str, cfg: &ProviderConfig) -> Result<String> {
    cfg.api_key
        .as_ref()
        .filter(|k| !k.is_blank())
        .map(Secret::expose)
        .map(str::to_string)
        .ok_or_else(|| anyhow!("provider '{}' has no API key", name))
}

/// Builds a client for every enabled provider.
pub fn build_providers(settings: &Settings) -> Result<Vec<Arc<dyn MatchProvider>>> {
    let mut providers: Vec<Arc<dyn MatchProvider>> = Vec::new();
    let p = &settings.providers;

    if p.football_data.enabled {
        let key = require_key("football_data", &p.football_data)?;
        providers.push(Arc::new(FootballDataClient::new(&p.football_data, key, &settings.http)?));
    }
    if p.sports_data.enabled {
        let key = require_key("sports_data", &p.sports_data)?;
        providers.push(Arc::new(SportsDataClient::new(&p.sports_data, key, &settings.http)?));
    }
    if p.sportradar.enabled {
        let key = require_key("sportradar", &p.sportradar)?;
        providers.push(Arc::new(SportRadarClient::new(&p.sportradar, key, &settings.http)?));
    }

    for provider in &providers {
        info!("✅ Provider enabled: {}", provider.name());
    }
    Ok(providers)
}
