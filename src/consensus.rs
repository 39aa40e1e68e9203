//! # Result Validator
//!
//! Quorum check over the normalized results several providers reported for
//! one match.
//!
//! ## Algorithm
//!
//! 1. Fewer results than the confirmation threshold: no decision.
//! 2. Group results by the literal `(home_score, away_score)` pair, keeping
//!    groups in first-seen order.
//! 3. Take the largest group. Ties go to the group seen first in the input.
//! 4. If that group is still below the threshold: no decision.
//! 5. Otherwise the group's first record is canonical and the winner is
//!    derived numerically from its score.
//!
//! "No decision" (`None`) is the normal wait-and-retry signal, not an error.
//! The validator does not group by match id; callers pass one match at a time.
//!
//! The first-seen tie-break only matters when two different scores have the
//! same support, which with the default threshold of 2 requires at least four
//! providers. It is a simple ordering artifact, not a reliability weighting.

use indexmap::IndexMap;
use log::debug;

use crate::match_result::{ConsensusOutcome, MatchResult, Winner};

/// Default number of providers that must agree on a score.
pub const DEFAULT_CONFIRMATION_THRESHOLD: usize = 2;

#[derive(Debug, Clone, Copy)]
pub struct ResultValidator {
    confirmation_threshold: usize,
}

impl Default for ResultValidator {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIRMATION_THRESHOLD)
    }
}

impl ResultValidator {
    pub fn new(confirmation_threshold: usize) -> Self {
        Self {
            confirmation_threshold,
        }
    }

    pub fn confirmation_threshold(&self) -> usize {
        self.confirmation_threshold
    }

    /// Deterministic for a given input order; no side effects beyond debug logs.
    pub fn validate(&self, results: &[MatchResult]) -> Option<ConsensusOutcome> {
        if results.len() < self.confirmation_threshold {
            debug!(
                "Not enough results to validate: need {}, got {}",
                self.confirmation_threshold,
                results.len()
            );
            return None;
        }

        let mut groups: IndexMap<(u32, u32), Vec<&MatchResult>> = IndexMap::new();
        for result in results {
            groups.entry(result.score()).or_default().push(result);
        }

        // Strictly-greater keeps the earliest group on ties.
        let mut best: Option<&Vec<&MatchResult>> = None;
        for group in groups.values() {
            if best.map_or(true, |b| group.len() > b.len()) {
                best = Some(group);
            }
        }
        let group = best?;

        if group.len() < self.confirmation_threshold {
            debug!(
                "No score has enough confirmations: need {}, best has {} ({} distinct scores)",
                self.confirmation_threshold,
                group.len(),
                groups.len()
            );
            return None;
        }

        let canonical = group[0];
        Some(ConsensusOutcome {
            match_id: canonical.match_id,
            home_score: canonical.home_score,
            away_score: canonical.away_score,
            winner: Winner::from_score(canonical.home_score, canonical.away_score),
            agreement_count: group.len(),
            chosen_source: canonical.source.clone(),
            home_team: canonical.home_team.clone(),
            away_team: canonical.away_team.clone(),
        })
    }
}
