//! # Match Results
//!
//! Canonical, provider-agnostic representation of a match as reported by one
//! sports-data provider, plus the values derived from it downstream
//! (consensus outcome, settlement receipt).
//!
//! Every provider client normalizes its native payload into a [`MatchResult`]
//! before anything else in the crate sees it. Consensus and settlement only
//! ever work with these types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical match identifier shared by all providers for one real-world match.
pub type MatchId = u64;

/// Lifecycle of a match as seen by a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    NotStarted,
    Live,
    Finished,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::NotStarted => "NOT_STARTED",
            MatchStatus::Live => "LIVE",
            MatchStatus::Finished => "FINISHED",
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One provider's normalized view of a match.
///
/// Immutable once built. A `Finished` record always carries the final score;
/// provider clients reject finished payloads without scores instead of
/// filling in placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub match_id: MatchId,
    pub home_team: String,
    pub away_team: String,
    pub home_score: u32,
    pub away_score: u32,
    pub status: MatchStatus,
    /// Informational only, never used in consensus.
    pub league: String,
    pub season: String,
    pub match_day: String,
    /// Kick-off time, epoch milliseconds.
    pub timestamp: i64,
    /// Name of the provider that produced this record.
    pub source: String,
}

impl MatchResult {
    pub fn is_finished(&self) -> bool {
        self.status == MatchStatus::Finished
    }

    pub fn score(&self) -> (u32, u32) {
        (self.home_score, self.away_score)
    }

    /// Kick-off time in whole seconds, the unit the settlement contract uses.
    pub fn start_time_secs(&self) -> u64 {
        (self.timestamp.max(0) / 1000) as u64
    }
}

/// Final outcome of a match from the home side's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Winner {
    HomeWin,
    AwayWin,
    Draw,
}

impl Winner {
    /// Purely numeric: forfeits, abandonments and voided matches get no special case.
    pub fn from_score(home_score: u32, away_score: u32) -> Self {
        use std::cmp::Ordering;
        match home_score.cmp(&away_score) {
            Ordering::Greater => Winner::HomeWin,
            Ordering::Less => Winner::AwayWin,
            Ordering::Equal => Winner::Draw,
        }
    }

    /// Result code expected by the settlement contract.
    pub fn code(&self) -> u8 {
        match self {
            Winner::HomeWin => 1,
            Winner::AwayWin => 2,
            Winner::Draw => 3,
        }
    }
}

impl fmt::Display for Winner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Winner::HomeWin => "HOME_WIN",
            Winner::AwayWin => "AWAY_WIN",
            Winner::Draw => "DRAW",
        };
        f.write_str(s)
    }
}

/// Result agreed on by a quorum of providers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsensusOutcome {
    pub match_id: MatchId,
    pub home_score: u32,
    pub away_score: u32,
    pub winner: Winner,
    /// How many providers reported the winning score.
    pub agreement_count: usize,
    /// Provider whose record was taken as canonical.
    pub chosen_source: String,
    /// Team names from the canonical record, for logs.
    pub home_team: String,
    pub away_team: String,
}

impl ConsensusOutcome {
    pub fn score(&self) -> (u32, u32) {
        (self.home_score, self.away_score)
    }
}

/// Outcome of one settlement submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    pub match_id: MatchId,
    /// Transaction hash, `0x`-prefixed hex.
    pub transaction_id: String,
    pub confirmed: bool,
    #[serde(default)]
    pub block_number: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn winner_is_derived_from_score_only() {
        assert_eq!(Winner::from_score(2, 1), Winner::HomeWin);
        assert_eq!(Winner::from_score(0, 3), Winner::AwayWin);
        assert_eq!(Winner::from_score(0, 0), Winner::Draw);
        assert_eq!(Winner::from_score(4, 4), Winner::Draw);
    }

    #[test]
    fn winner_codes_match_contract() {
        assert_eq!(Winner::HomeWin.code(), 1);
        assert_eq!(Winner::AwayWin.code(), 2);
        assert_eq!(Winner::Draw.code(), 3);
    }

    #[test]
    fn status_serializes_in_canonical_form() {
        let json = serde_json::to_string(&MatchStatus::NotStarted).unwrap();
        assert_eq!(json, "\"NOT_STARTED\"");
        assert_eq!(MatchStatus::Finished.to_string(), "FINISHED");
    }

    #[test]
    fn start_time_is_truncated_to_seconds() {
        let result = MatchResult {
            match_id: 1,
            home_team: "A".into(),
            away_team: "B".into(),
            home_score: 0,
            away_score: 0,
            status: MatchStatus::NotStarted,
            league: String::new(),
            season: String::new(),
            match_day: String::new(),
            timestamp: 1_700_000_000_999,
            source: "test".into(),
        };
        assert_eq!(result.start_time_secs(), 1_700_000_000);
    }
}
