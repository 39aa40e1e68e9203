use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use log::debug;
use serde::Deserialize;
use serde_json::Value;

use super::{keep_normalized, normalize_scores, parse_timestamp_ms, IdMapping};
use crate::error::ProviderError;
use crate::http_client::{ApiAuth, ProviderHttp};
use crate::match_provider::MatchProvider;
use crate::match_result::{MatchId, MatchResult, MatchStatus};
use crate::settings::{Http, ProviderConfig};

const NAME: &str = "SportsData";
const DEFAULT_BASE_URL: &str = "https://api.sportsdata.io/v3/soccer";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SdGame {
    game_id: i64,
    status: String,
    home_team_name: Option<String>,
    away_team_name: Option<String>,
    home_team_score: Option<i64>,
    away_team_score: Option<i64>,
    competition_name: Option<String>,
    season: Option<Value>,
    round: Option<Value>,
    date_time: Option<String>,
    #[serde(rename = "DateTimeUTC")]
    date_time_utc: Option<String>,
}

fn map_status(raw: &str) -> MatchStatus {
    match raw {
        "Final" | "F/ET" | "F/PK" => MatchStatus::Finished,
        "InProgress" | "Break" => MatchStatus::Live,
        _ => MatchStatus::NotStarted,
    }
}

/// Numbers and strings both show up for Season/Round depending on the feed.
fn value_to_string(value: Option<Value>) -> String {
    match value {
        Some(Value::String(s)) => s,
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Client for the SportsData.io soccer API.
pub struct SportsDataClient {
    http: ProviderHttp,
    ids: IdMapping,
}

impl SportsDataClient {
    pub fn new(cfg: &ProviderConfig, api_key: String, http: &Http) -> Result<Self, reqwest::Error> {
        let http = ProviderHttp::new(
            NAME,
            cfg.base_url_or(DEFAULT_BASE_URL),
            ApiAuth::Header("Ocp-Apim-Subscription-Key"),
            api_key,
            http,
            cfg.qps_limit,
        )?;
        Ok(Self {
            http,
            ids: IdMapping::new(&cfg.id_map),
        })
    }

    fn normalize(&self, g: SdGame) -> Result<MatchResult, String> {
        let status = map_status(&g.status);
        let match_id = self
            .ids
            .canonical(&g.game_id.to_string())
            .ok_or_else(|| format!("game {} has no canonical id", g.game_id))?;
        let (home_score, away_score) = normalize_scores(status, g.home_team_score, g.away_team_score)
            .map_err(|e| format!("game {}: {}", g.game_id, e))?;
        let raw_date = g
            .date_time_utc
            .or(g.date_time)
            .ok_or_else(|| format!("game {}: missing kick-off time", g.game_id))?;
        let timestamp = parse_timestamp_ms(&raw_date).map_err(|e| format!("game {}: {}", g.game_id, e))?;

        let round = value_to_string(g.round);
        Ok(MatchResult {
            match_id,
            home_team: g.home_team_name.unwrap_or_default(),
            away_team: g.away_team_name.unwrap_or_default(),
            home_score,
            away_score,
            status,
            league: g.competition_name.unwrap_or_default(),
            season: value_to_string(g.season),
            match_day: if round.is_empty() {
                round
            } else {
                format!("Round {}", round)
            },
            timestamp,
            source: NAME.to_string(),
        })
    }

    /// The by-id lookup scans the day's schedule; yesterday is included so late
    /// kick-offs finishing after midnight UTC are still found.
    fn lookup_dates(today: NaiveDate) -> [NaiveDate; 2] {
        [today, today - ChronoDuration::days(1)]
    }
}

#[async_trait]
impl MatchProvider for SportsDataClient {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn fetch_live_matches(&self) -> Result<Vec<MatchResult>, ProviderError> {
        let games: Vec<SdGame> = self
            .http
            .get_json("/scores/json/LiveScores", &[], None)
            .await?;
        debug!("[{}] {} games in live payload", NAME, games.len());
        Ok(keep_normalized(NAME, games.into_iter().map(|g| self.normalize(g))))
    }

    async fn fetch_match_result(&self, match_id: MatchId) -> Result<MatchResult, ProviderError> {
        let native = self.ids.native(match_id);
        let native_id: i64 = native.parse().map_err(|_| ProviderError::Malformed {
            provider: NAME.to_string(),
            reason: format!("native id '{}' for match {} is not numeric", native, match_id),
        })?;

        for date in Self::lookup_dates(Utc::now().date_naive()) {
            let path = format!("/stats/json/GamesByDate/{}", date.format("%Y-%m-%d"));
            let games: Vec<SdGame> = self.http.get_json(&path, &[], Some(match_id)).await?;
            if let Some(game) = games.into_iter().find(|g| g.game_id == native_id) {
                return self.normalize(game).map_err(|reason| ProviderError::Malformed {
                    provider: NAME.to_string(),
                    reason,
                });
            }
        }

        Err(ProviderError::NotFound {
            provider: NAME.to_string(),
            match_id,
        })
    }
}
