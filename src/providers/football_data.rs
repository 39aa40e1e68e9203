use async_trait::async_trait;
use log::debug;
use serde::Deserialize;

use super::{keep_normalized, normalize_scores, parse_timestamp_ms, IdMapping};
use crate::error::ProviderError;
use crate::http_client::{ApiAuth, ProviderHttp};
use crate::match_provider::MatchProvider;
use crate::match_result::{MatchId, MatchResult, MatchStatus};
use crate::settings::{Http, ProviderConfig};

const NAME: &str = "Football-Data";
const DEFAULT_BASE_URL: &str = "https://api.football-data.org/v4";
const LIVE_STATUSES: &str = "LIVE,IN_PLAY,PAUSED,FINISHED";

#[derive(Debug, Deserialize)]
struct MatchesResponse {
    #[serde(default)]
    matches: Vec<FdMatch>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FdMatch {
    id: u64,
    utc_date: String,
    status: String,
    matchday: Option<u32>,
    competition: Option<FdNamed>,
    season: Option<FdSeason>,
    home_team: FdNamed,
    away_team: FdNamed,
    score: FdScore,
}

#[derive(Debug, Deserialize)]
struct FdNamed {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FdSeason {
    id: Option<u64>,
    start_date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FdScore {
    full_time: FdScoreLine,
}

#[derive(Debug, Deserialize)]
struct FdScoreLine {
    home: Option<i64>,
    away: Option<i64>,
}

fn map_status(raw: &str) -> MatchStatus {
    match raw {
        "FINISHED" => MatchStatus::Finished,
        "IN_PLAY" | "PAUSED" | "LIVE" => MatchStatus::Live,
        _ => MatchStatus::NotStarted,
    }
}

/// Client for the football-data.org v4 API.
pub struct FootballDataClient {
    http: ProviderHttp,
    ids: IdMapping,
}

impl FootballDataClient {
    pub fn new(cfg: &ProviderConfig, api_key: String, http: &Http) -> Result<Self, reqwest::Error> {
        let http = ProviderHttp::new(
            NAME,
            cfg.base_url_or(DEFAULT_BASE_URL),
            ApiAuth::Header("X-Auth-Token"),
            api_key,
            http,
            cfg.qps_limit,
        )?;
        Ok(Self {
            http,
            ids: IdMapping::new(&cfg.id_map),
        })
    }

    fn normalize(&self, m: FdMatch) -> Result<MatchResult, String> {
        let status = map_status(&m.status);
        let match_id = self
            .ids
            .canonical(&m.id.to_string())
            .ok_or_else(|| format!("match {} has no canonical id", m.id))?;
        let (home_score, away_score) =
            normalize_scores(status, m.score.full_time.home, m.score.full_time.away)
                .map_err(|e| format!("match {}: {}", m.id, e))?;
        let timestamp = parse_timestamp_ms(&m.utc_date).map_err(|e| format!("match {}: {}", m.id, e))?;

        let season = m
            .season
            .map(|s| {
                s.id.map(|id| id.to_string())
                    .or(s.start_date)
                    .unwrap_or_default()
            })
            .unwrap_or_default();

        Ok(MatchResult {
            match_id,
            home_team: m.home_team.name.unwrap_or_default(),
            away_team: m.away_team.name.unwrap_or_default(),
            home_score,
            away_score,
            status,
            league: m.competition.and_then(|c| c.name).unwrap_or_default(),
            season,
            match_day: m.matchday.map(|d| format!("Matchday {}", d)).unwrap_or_default(),
            timestamp,
            source: NAME.to_string(),
        })
    }
}

#[async_trait]
impl MatchProvider for FootballDataClient {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn fetch_live_matches(&self) -> Result<Vec<MatchResult>, ProviderError> {
        let response: MatchesResponse = self
            .http
            .get_json("/matches", &[("status", LIVE_STATUSES.to_string())], None)
            .await?;
        debug!("[{}] {} matches in live payload", NAME, response.matches.len());
        Ok(keep_normalized(
            NAME,
            response.matches.into_iter().map(|m| self.normalize(m)),
        ))
    }

    async fn fetch_match_result(&self, match_id: MatchId) -> Result<MatchResult, ProviderError> {
        let native = self.ids.native(match_id);
        let raw: FdMatch = self
            .http
            .get_json(&format!("/matches/{}", native), &[], Some(match_id))
            .await?;
        self.normalize(raw).map_err(|reason| ProviderError::Malformed {
            provider: NAME.to_string(),
            reason,
        })
    }
}
