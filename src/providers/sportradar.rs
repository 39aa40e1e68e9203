use async_trait::async_trait;
use log::debug;
use serde::Deserialize;

use super::{keep_normalized, normalize_scores, parse_timestamp_ms, IdMapping};
use crate::error::ProviderError;
use crate::http_client::{ApiAuth, ProviderHttp};
use crate::match_provider::MatchProvider;
use crate::match_result::{MatchId, MatchResult, MatchStatus};
use crate::settings::{Http, ProviderConfig};

const NAME: &str = "SportRadar";
const DEFAULT_BASE_URL: &str = "https://api.sportradar.com/soccer/trial/v4/en";
const EVENT_PREFIX: &str = "sr:sport_event:";

#[derive(Debug, Deserialize)]
struct LiveSummaries {
    #[serde(default)]
    summaries: Vec<Summary>,
}

#[derive(Debug, Deserialize)]
struct Summary {
    sport_event: SportEvent,
    sport_event_status: EventStatus,
}

#[derive(Debug, Deserialize)]
struct SportEvent {
    id: String,
    start_time: String,
    #[serde(default)]
    competitors: Vec<Competitor>,
    sport_event_context: Option<EventContext>,
}

#[derive(Debug, Deserialize)]
struct Competitor {
    name: String,
    qualifier: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EventContext {
    competition: Option<Named>,
    season: Option<Named>,
    round: Option<Round>,
}

#[derive(Debug, Deserialize)]
struct Named {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Round {
    number: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct EventStatus {
    status: String,
    home_score: Option<i64>,
    away_score: Option<i64>,
}

fn map_status(raw: &str) -> MatchStatus {
    match raw {
        "closed" | "ended" => MatchStatus::Finished,
        "live" => MatchStatus::Live,
        _ => MatchStatus::NotStarted,
    }
}

/// Home/away come from the competitor qualifier, falling back to list order.
fn team_names(competitors: &[Competitor]) -> (String, String) {
    let by_qualifier = |q: &str| {
        competitors
            .iter()
            .find(|c| c.qualifier.as_deref() == Some(q))
            .map(|c| c.name.clone())
    };
    let home = by_qualifier("home")
        .or_else(|| competitors.first().map(|c| c.name.clone()))
        .unwrap_or_default();
    let away = by_qualifier("away")
        .or_else(|| competitors.get(1).map(|c| c.name.clone()))
        .unwrap_or_default();
    (home, away)
}

/// Client for the SportRadar soccer v4 API.
pub struct SportRadarClient {
    http: ProviderHttp,
    ids: IdMapping,
}

impl SportRadarClient {
    pub fn new(cfg: &ProviderConfig, api_key: String, http: &Http) -> Result<Self, reqwest::Error> {
        let http = ProviderHttp::new(
            NAME,
            cfg.base_url_or(DEFAULT_BASE_URL),
            ApiAuth::Query("api_key"),
            api_key,
            http,
            cfg.qps_limit,
        )?;
        Ok(Self {
            http,
            ids: IdMapping::new(&cfg.id_map).with_native_prefix(EVENT_PREFIX),
        })
    }

    fn normalize(&self, s: Summary) -> Result<MatchResult, String> {
        let event = s.sport_event;
        let status = map_status(&s.sport_event_status.status);
        let match_id = self
            .ids
            .canonical(&event.id)
            .ok_or_else(|| format!("event {} has no canonical id", event.id))?;
        let (home_score, away_score) = normalize_scores(
            status,
            s.sport_event_status.home_score,
            s.sport_event_status.away_score,
        )
        .map_err(|e| format!("event {}: {}", event.id, e))?;
        let timestamp =
            parse_timestamp_ms(&event.start_time).map_err(|e| format!("event {}: {}", event.id, e))?;
        let (home_team, away_team) = team_names(&event.competitors);

        let (league, season, match_day) = match event.sport_event_context {
            Some(ctx) => (
                ctx.competition.and_then(|c| c.name).unwrap_or_default(),
                ctx.season.and_then(|s| s.name).unwrap_or_default(),
                ctx.round
                    .and_then(|r| r.number)
                    .map(|n| format!("Round {}", n))
                    .unwrap_or_default(),
            ),
            None => Default::default(),
        };

        Ok(MatchResult {
            match_id,
            home_team,
            away_team,
            home_score,
            away_score,
            status,
            league,
            season,
            match_day,
            timestamp,
            source: NAME.to_string(),
        })
    }
}

#[async_trait]
impl MatchProvider for SportRadarClient {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn fetch_live_matches(&self) -> Result<Vec<MatchResult>, ProviderError> {
        let live: LiveSummaries = self
            .http
            .get_json("/schedules/live/summaries.json", &[], None)
            .await?;
        debug!("[{}] {} events in live payload", NAME, live.summaries.len());
        Ok(keep_normalized(
            NAME,
            live.summaries.into_iter().map(|s| self.normalize(s)),
        ))
    }

    async fn fetch_match_result(&self, match_id: MatchId) -> Result<MatchResult, ProviderError> {
        let native = self.ids.native(match_id);
        let summary: Summary = self
            .http
            .get_json(&format!("/sport_events/{}/summary.json", native), &[], Some(match_id))
            .await?;
        self.normalize(summary).map_err(|reason| ProviderError::Malformed {
            provider: NAME.to_string(),
            reason,
        })
    }
}
