//! # Provider normalization against recorded-shape fixtures
//!
//! Each vendor client is pointed at a wiremock server serving payloads in the
//! vendor's native format. The tests check the normalized `MatchResult`, the
//! auth scheme, and how HTTP failures map onto `ProviderError`.

use matchday_oracle::error::ProviderError;
use matchday_oracle::match_provider::MatchProvider;
use matchday_oracle::match_result::{MatchStatus, Winner};
use matchday_oracle::providers::{FootballDataClient, SportRadarClient, SportsDataClient};
use matchday_oracle::settings::{Http, ProviderConfig};
use std::collections::HashMap;
use wiremock::matchers::{header, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const KEY: &str = "test-key";

fn fast_http() -> Http {
    Http {
        timeout_seconds: 5,
        retry_attempts: 2,
        retry_delay_ms: 10,
    }
}

fn provider_config(server: &MockServer, id_map: HashMap<String, u64>) -> ProviderConfig {
    ProviderConfig {
        enabled: true,
        base_url: Some(server.uri()),
        api_key: None,
        qps_limit: None,
        id_map,
    }
}

// ── Football-Data ────────────────────────────────────────────────────────

fn fd_match(id: u64, status: &str, home: Option<i64>, away: Option<i64>) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "utcDate": "2024-03-01T20:00:00Z",
        "status": status,
        "matchday": 27,
        "competition": { "id": 2021, "name": "Premier League" },
        "season": { "id": 1564, "startDate": "2023-08-11" },
        "homeTeam": { "id": 57, "name": "Arsenal FC" },
        "awayTeam": { "id": 61, "name": "Chelsea FC" },
        "score": {
            "winner": null,
            "fullTime": { "home": home, "away": away },
            "halfTime": { "home": null, "away": null }
        }
    })
}

fn football_data(server: &MockServer) -> FootballDataClient {
    FootballDataClient::new(&provider_config(server, HashMap::new()), KEY.into(), &fast_http())
        .expect("client")
}

#[tokio::test]
async fn football_data_live_matches_are_normalized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/matches"))
        .and(query_param("status", "LIVE,IN_PLAY,PAUSED,FINISHED"))
        .and(header("X-Auth-Token", KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "matches": [
                fd_match(42, "FINISHED", Some(2), Some(1)),
                fd_match(43, "IN_PLAY", Some(0), Some(0)),
                fd_match(44, "TIMED", None, None),
                // finished without a final score: dropped
                fd_match(45, "FINISHED", None, None),
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let matches = football_data(&server).fetch_live_matches().await.unwrap();
    assert_eq!(matches.len(), 3);

    let finished = &matches[0];
    assert_eq!(finished.match_id, 42);
    assert_eq!(finished.status, MatchStatus::Finished);
    assert_eq!(finished.score(), (2, 1));
    assert_eq!(Winner::from_score(finished.home_score, finished.away_score), Winner::HomeWin);
    assert_eq!(finished.home_team, "Arsenal FC");
    assert_eq!(finished.away_team, "Chelsea FC");
    assert_eq!(finished.league, "Premier League");
    assert_eq!(finished.season, "1564");
    assert_eq!(finished.match_day, "Matchday 27");
    assert_eq!(finished.timestamp, 1_709_323_200_000);
    assert_eq!(finished.source, "Football-Data");

    assert_eq!(matches[1].status, MatchStatus::Live);
    assert_eq!(matches[2].status, MatchStatus::NotStarted);
    assert_eq!(matches[2].score(), (0, 0));
}

#[tokio::test]
async fn football_data_single_match() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/matches/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(fd_match(42, "FINISHED", Some(1), Some(1))))
        .mount(&server)
        .await;

    let result = football_data(&server).fetch_match_result(42).await.unwrap();
    assert_eq!(result.score(), (1, 1));
    assert!(result.is_finished());
}

#[tokio::test]
async fn football_data_missing_match_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/matches/404"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let err = football_data(&server).fetch_match_result(404).await.unwrap_err();
    assert!(matches!(err, ProviderError::NotFound { match_id: 404, .. }));
}

#[tokio::test]
async fn bad_api_key_is_rejected_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/matches"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    let err = football_data(&server).fetch_live_matches().await.unwrap_err();
    assert!(matches!(err, ProviderError::Rejected { status: 403, .. }));
}

#[tokio::test]
async fn server_errors_are_retried_then_succeed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/matches"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/matches"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "matches": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let matches = football_data(&server).fetch_live_matches().await.unwrap();
    assert!(matches.is_empty());
}

#[tokio::test]
async fn request_timeout_status_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/matches/42"))
        .respond_with(ResponseTemplate::new(408))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/matches/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(fd_match(42, "FINISHED", Some(2), Some(0))))
        .expect(1)
        .mount(&server)
        .await;

    let result = football_data(&server).fetch_match_result(42).await.unwrap();
    assert_eq!(result.winner, Winner::HomeWin);
}

#[tokio::test]
async fn persistent_server_errors_exhaust_the_budget() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/matches"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let err = football_data(&server).fetch_live_matches().await.unwrap_err();
    match err {
        ProviderError::Unavailable { attempts, .. } => assert_eq!(attempts, 2),
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn garbage_body_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/matches/42"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let err = football_data(&server).fetch_match_result(42).await.unwrap_err();
    assert!(matches!(err, ProviderError::Malformed { .. }));
}

// ── SportsData.io ────────────────────────────────────────────────────────

fn sd_game(id: i64, status: &str, home: Option<i64>, away: Option<i64>) -> serde_json::Value {
    serde_json::json!({
        "GameId": id,
        "RoundId": 1,
        "Season": 2024,
        "Status": status,
        "Day": "2024-03-01T00:00:00",
        "DateTime": "2024-03-01T20:00:00",
        "DateTimeUTC": "2024-03-01T20:00:00",
        "HomeTeamName": "Arsenal FC",
        "AwayTeamName": "Chelsea FC",
        "HomeTeamScore": home,
        "AwayTeamScore": away,
        "CompetitionName": "Premier League",
        "Round": 27
    })
}

fn sports_data(server: &MockServer) -> SportsDataClient {
    SportsDataClient::new(&provider_config(server, HashMap::new()), KEY.into(), &fast_http())
        .expect("client")
}

#[tokio::test]
async fn sports_data_live_scores_are_normalized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/scores/json/LiveScores"))
        .and(header("Ocp-Apim-Subscription-Key", KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            sd_game(42, "Final", Some(2), Some(1)),
            sd_game(43, "F/PK", Some(1), Some(1)),
            sd_game(44, "InProgress", Some(0), Some(3)),
            sd_game(45, "Scheduled", None, None),
        ])))
        .mount(&server)
        .await;

    let matches = sports_data(&server).fetch_live_matches().await.unwrap();
    assert_eq!(matches.len(), 4);

    assert_eq!(matches[0].match_id, 42);
    assert_eq!(matches[0].status, MatchStatus::Finished);
    assert_eq!(matches[0].score(), (2, 1));
    assert_eq!(matches[0].season, "2024");
    assert_eq!(matches[0].match_day, "Round 27");
    assert_eq!(matches[0].timestamp, 1_709_323_200_000);
    assert_eq!(matches[0].source, "SportsData");

    assert_eq!(matches[1].status, MatchStatus::Finished);
    assert_eq!(matches[2].status, MatchStatus::Live);
    assert_eq!(matches[2].score(), (0, 3));
    assert_eq!(matches[3].status, MatchStatus::NotStarted);
}

#[tokio::test]
async fn sports_data_single_match_scans_the_schedule() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/stats/json/GamesByDate/\d{4}-\d{2}-\d{2}$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            sd_game(41, "Final", Some(0), Some(0)),
            sd_game(42, "Final", Some(0), Some(2)),
        ])))
        .mount(&server)
        .await;

    let result = sports_data(&server).fetch_match_result(42).await.unwrap();
    assert_eq!(result.match_id, 42);
    assert_eq!(result.score(), (0, 2));
}

#[tokio::test]
async fn sports_data_unknown_game_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/stats/json/GamesByDate/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(2)
        .mount(&server)
        .await;

    let err = sports_data(&server).fetch_match_result(42).await.unwrap_err();
    assert!(matches!(err, ProviderError::NotFound { match_id: 42, .. }));
}

// ── SportRadar ───────────────────────────────────────────────────────────

fn sr_summary(event_id: &str, status: &str, home: Option<i64>, away: Option<i64>) -> serde_json::Value {
    serde_json::json!({
        "sport_event": {
            "id": event_id,
            "start_time": "2024-03-01T20:00:00+00:00",
            "start_time_confirmed": true,
            "sport_event_context": {
                "competition": { "id": "sr:competition:17", "name": "Premier League" },
                "season": { "id": "sr:season:105353", "name": "Premier League 23/24" },
                "round": { "number": 27 }
            },
            "competitors": [
                { "id": "sr:competitor:38", "name": "Chelsea FC", "qualifier": "away" },
                { "id": "sr:competitor:42", "name": "Arsenal FC", "qualifier": "home" }
            ]
        },
        "sport_event_status": {
            "status": status,
            "match_status": "ended",
            "home_score": home,
            "away_score": away
        }
    })
}

fn sportradar(server: &MockServer, id_map: HashMap<String, u64>) -> SportRadarClient {
    SportRadarClient::new(&provider_config(server, id_map), KEY.into(), &fast_http()).expect("client")
}

#[tokio::test]
async fn sportradar_summaries_use_query_key_and_id_map() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/schedules/live/summaries.json"))
        .and(query_param("api_key", KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "generated_at": "2024-03-01T22:00:00+00:00",
            "summaries": [
                sr_summary("sr:sport_event:41762641", "closed", Some(2), Some(1)),
                sr_summary("sr:sport_event:41762650", "live", Some(0), Some(0)),
            ]
        })))
        .mount(&server)
        .await;

    let mut id_map = HashMap::new();
    id_map.insert("sr:sport_event:41762641".to_string(), 42u64);
    let matches = sportradar(&server, id_map).fetch_live_matches().await.unwrap();

    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].match_id, 42);
    assert_eq!(matches[0].status, MatchStatus::Finished);
    assert_eq!(matches[0].home_team, "Arsenal FC");
    assert_eq!(matches[0].away_team, "Chelsea FC");
    assert_eq!(matches[0].season, "Premier League 23/24");
    assert_eq!(matches[0].match_day, "Round 27");
    assert_eq!(matches[0].source, "SportRadar");

    // No mapping entry: the numeric tail of the URN is the canonical id.
    assert_eq!(matches[1].match_id, 41762650);
    assert_eq!(matches[1].status, MatchStatus::Live);
}

#[tokio::test]
async fn sportradar_single_match_uses_native_urn() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sport_events/sr:sport_event:41762641/summary.json"))
        .and(query_param("api_key", KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(sr_summary(
            "sr:sport_event:41762641",
            "ended",
            Some(3),
            Some(3),
        )))
        .expect(1)
        .mount(&server)
        .await;

    let mut id_map = HashMap::new();
    id_map.insert("sr:sport_event:41762641".to_string(), 42u64);
    let result = sportradar(&server, id_map).fetch_match_result(42).await.unwrap();
    assert_eq!(result.match_id, 42);
    assert_eq!(result.score(), (3, 3));
    assert_eq!(Winner::from_score(result.home_score, result.away_score), Winner::Draw);
}
