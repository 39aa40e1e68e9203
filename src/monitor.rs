//! # Oracle Monitor
//!
//! The loop that ties providers, consensus, settlement and the ledger together.
//!
//! ## One cycle
//!
//! 1. Fan out `fetch_live_matches` to every provider and wait for all of them.
//!    A failing provider is logged and contributes nothing this cycle.
//! 2. Group the records by `match_id` (first-seen order), apply the league
//!    filter, and register upcoming games when registration is enabled.
//! 3. Every group with at least one FINISHED record whose id is not in the
//!    ledger becomes a candidate (bounded by `max_matches_per_cycle`).
//!    Matches with a rejected submission are queued after the others.
//! 4. For each candidate, fetch a fresh record from every provider, keep the
//!    FINISHED ones and run consensus.
//! 5. Submit the outcome. Only a confirmed submission enters the ledger.
//!
//! ## Phases
//!
//! `Unseen → Observed → FinishedPendingSubmit → Submitted`. Only `Submitted`
//! is terminal. Failed submissions leave the match pending so a later cycle
//! retries it, except that a contract rejection is not repeated with the same
//! score and winner. Matches that drop out of every feed are forgotten unless
//! they are still pending settlement.
//!
//! ## Scheduling
//!
//! [`OracleMonitor::start`] is fixed-delay: the next cycle starts `interval`
//! after the previous one finished, so cycles never overlap and the ledger
//! has a single writer.

use futures::future::join_all;
use indexmap::IndexMap;
use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::watch;

use crate::consensus::ResultValidator;
use crate::error::{ProviderError, SubmissionError};
use crate::ledger::ProcessedMatchesLedger;
use crate::match_provider::MatchProvider;
use crate::match_result::{ConsensusOutcome, MatchId, MatchResult, Winner};
use crate::metrics;
use crate::registrar::GameRegistrar;
use crate::settings::Oracle;
use crate::settlement::ResultSubmitter;

/// Lifecycle of one match as seen by the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPhase {
    Unseen,
    Observed,
    FinishedPendingSubmit,
    Submitted,
}

impl fmt::Display for MatchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MatchPhase::Unseen => "UNSEEN",
            MatchPhase::Observed => "OBSERVED",
            MatchPhase::FinishedPendingSubmit => "FINISHED_PENDING_SUBMIT",
            MatchPhase::Submitted => "SUBMITTED",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub interval: Duration,
    /// Empty means every league.
    pub supported_leagues: Vec<String>,
    /// 0 means unbounded.
    pub max_matches_per_cycle: usize,
}

impl MonitorConfig {
    pub fn from_settings(oracle: &Oracle) -> Self {
        Self {
            interval: oracle.interval(),
            supported_leagues: oracle.supported_leagues.clone(),
            max_matches_per_cycle: oracle.max_matches_per_cycle,
        }
    }

    fn league_allowed(&self, league: &str) -> bool {
        self.supported_leagues.is_empty()
            || self
                .supported_leagues
                .iter()
                .any(|l| l.trim().eq_ignore_ascii_case(league.trim()))
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            supported_leagues: Vec::new(),
            max_matches_per_cycle: 50,
        }
    }
}

/// What happened during one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub provider_failures: usize,
    pub matches_observed: usize,
    pub finished_candidates: usize,
    pub consensus_reached: usize,
    pub consensus_deferred: usize,
    pub submitted: Vec<MatchId>,
    pub failed: Vec<MatchId>,
    /// Outcomes not sent because the contract already rejected identical parameters.
    pub skipped_rejected: Vec<MatchId>,
    pub registered: usize,
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "observed={} finished={} consensus={}/{} submitted={} failed={} provider_failures={}",
            self.matches_observed,
            self.finished_candidates,
            self.consensus_reached,
            self.consensus_reached + self.consensus_deferred,
            self.submitted.len(),
            self.failed.len(),
            self.provider_failures
        )
    }
}

pub struct OracleMonitor {
    providers: Vec<Arc<dyn MatchProvider>>,
    validator: ResultValidator,
    submitter: Arc<dyn ResultSubmitter>,
    ledger: Arc<ProcessedMatchesLedger>,
    registrar: Option<GameRegistrar>,
    config: MonitorConfig,
    phases: Mutex<HashMap<MatchId, MatchPhase>>,
    /// Parameters the contract rejected, per match.
    rejected: Mutex<HashMap<MatchId, ((u32, u32), Winner)>>,
}

impl OracleMonitor {
    pub fn new(
        providers: Vec<Arc<dyn MatchProvider>>,
        validator: ResultValidator,
        submitter: Arc<dyn ResultSubmitter>,
        ledger: Arc<ProcessedMatchesLedger>,
        config: MonitorConfig,
    ) -> Self {
        Self {
            providers,
            validator,
            submitter,
            ledger,
            registrar: None,
            config,
            phases: Mutex::new(HashMap::new()),
            rejected: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_registrar(mut self, registrar: GameRegistrar) -> Self {
        self.registrar = Some(registrar);
        self
    }

    pub fn ledger(&self) -> &Arc<ProcessedMatchesLedger> {
        &self.ledger
    }

    pub fn phase(&self, match_id: MatchId) -> MatchPhase {
        self.phases
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&match_id)
            .copied()
            .unwrap_or(MatchPhase::Unseen)
    }

    /// Runs cycles until `shutdown` turns true (or its sender is dropped).
    /// An in-flight cycle always completes.
    pub async fn start(&self, mut shutdown: watch::Receiver<bool>) {
        info!("🚀 Starting oracle monitor");
        info!("   Providers: {}", self.providers.len());
        info!("   Confirmation threshold: {}", self.validator.confirmation_threshold());
        info!("   Interval: {:?}", self.config.interval);
        if !self.config.supported_leagues.is_empty() {
            info!("   Leagues: {}", self.config.supported_leagues.join(", "));
        }

        let mut iteration = 0u64;
        loop {
            if *shutdown.borrow() {
                break;
            }
            iteration += 1;
            let report = self.run_cycle().await;
            info!("✅ [Cycle #{}] {}", iteration, report);

            tokio::select! {
                _ = tokio::time::sleep(self.config.interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("🛑 Oracle monitor stopped after {} cycle(s)", iteration);
    }

    pub async fn run_cycle(&self) -> CycleReport {
        let started = Instant::now();
        let mut report = CycleReport::default();

        let observed = self.fetch_live(&mut report).await;
        let groups = self.group_by_match(observed);
        report.matches_observed = groups.len();

        if let Some(registrar) = &self.registrar {
            let all: Vec<MatchResult> = groups.values().flatten().cloned().collect();
            report.registered = registrar.register_upcoming(&all).await;
        }

        let mut candidates = Vec::new();
        for (match_id, records) in &groups {
            if self.ledger.contains(*match_id) {
                self.transition(*match_id, MatchPhase::Submitted);
                continue;
            }
            if records.iter().any(MatchResult::is_finished) {
                self.transition(*match_id, MatchPhase::FinishedPendingSubmit);
                candidates.push(*match_id);
            } else {
                self.transition(*match_id, MatchPhase::Observed);
            }
        }

        self.prune_phases(&groups);

        // Matches the contract already rejected go behind new ones.
        let (mut candidates, retries): (Vec<MatchId>, Vec<MatchId>) = {
            let rejected = self.lock_rejected();
            candidates
                .into_iter()
                .partition(|match_id| !rejected.contains_key(match_id))
        };
        candidates.extend(retries);

        if self.config.max_matches_per_cycle > 0 && candidates.len() > self.config.max_matches_per_cycle {
            info!(
                "Processing {} of {} finished matches this cycle",
                self.config.max_matches_per_cycle,
                candidates.len()
            );
            candidates.truncate(self.config.max_matches_per_cycle);
        }
        report.finished_candidates = candidates.len();

        for match_id in candidates {
            self.process_finished(match_id, &mut report).await;
        }

        metrics::record_cycle(started.elapsed());
        report
    }

    async fn fetch_live(&self, report: &mut CycleReport) -> Vec<MatchResult> {
        let fetches = self.providers.iter().map(|provider| async move {
            (provider.name(), provider.fetch_live_matches().await)
        });

        let mut observed = Vec::new();
        for (name, result) in join_all(fetches).await {
            match result {
                Ok(matches) => {
                    debug!("[{}] {} live/recent matches", name, matches.len());
                    metrics::record_provider_fetch(name, "ok");
                    observed.extend(matches);
                }
                Err(e) => {
                    report.provider_failures += 1;
                    metrics::record_provider_fetch(name, e.kind());
                    warn!("⚠️ [{}] Live fetch failed: {}", name, e);
                }
            }
        }
        observed
    }

    fn group_by_match(&self, observed: Vec<MatchResult>) -> IndexMap<MatchId, Vec<MatchResult>> {
        let mut groups: IndexMap<MatchId, Vec<MatchResult>> = IndexMap::new();
        for result in observed {
            if !self.config.league_allowed(&result.league) {
                debug!(
                    "Skipping match {} from unsupported league '{}'",
                    result.match_id, result.league
                );
                continue;
            }
            groups.entry(result.match_id).or_default().push(result);
        }
        groups
    }

    /// Fresh FINISHED records for `match_id` from every provider.
    async fn fetch_fresh(&self, match_id: MatchId) -> Vec<MatchResult> {
        let fetches = self.providers.iter().map(|provider| async move {
            (provider.name(), provider.fetch_match_result(match_id).await)
        });

        let mut fresh = Vec::new();
        for (name, result) in join_all(fetches).await {
            match result {
                Ok(record) if record.match_id != match_id => {
                    warn!(
                        "⚠️ [{}] Asked for match {} but got match {}",
                        name, match_id, record.match_id
                    );
                    metrics::record_provider_fetch(name, "malformed");
                }
                Ok(record) if record.is_finished() => {
                    metrics::record_provider_fetch(name, "ok");
                    fresh.push(record);
                }
                Ok(record) => {
                    metrics::record_provider_fetch(name, "ok");
                    debug!(
                        "[{}] Match {} is {}, not counted for consensus",
                        name, match_id, record.status
                    );
                }
                Err(e @ ProviderError::NotFound { .. }) => {
                    metrics::record_provider_fetch(name, e.kind());
                    debug!("[{}] {}", name, e);
                }
                Err(e) => {
                    metrics::record_provider_fetch(name, e.kind());
                    warn!("⚠️ [{}] Fetch of match {} failed: {}", name, match_id, e);
                }
            }
        }
        fresh
    }

    async fn process_finished(&self, match_id: MatchId, report: &mut CycleReport) {
        let fresh = self.fetch_fresh(match_id).await;
        let sources: Vec<String> = fresh
            .iter()
            .map(|r| format!("{}={}-{}", r.source, r.home_score, r.away_score))
            .collect();

        let outcome = match self.validator.validate(&fresh) {
            Some(outcome) => outcome,
            None => {
                report.consensus_deferred += 1;
                metrics::record_consensus(false);
                info!(
                    "⏳ No consensus for match {} yet ({} finished report(s): [{}])",
                    match_id,
                    fresh.len(),
                    sources.join(", ")
                );
                return;
            }
        };
        report.consensus_reached += 1;
        metrics::record_consensus(true);
        info!(
            "🤝 Consensus for match {}: {}-{} {} ({} of {} agree, canonical source {})",
            match_id,
            outcome.home_score,
            outcome.away_score,
            outcome.winner,
            outcome.agreement_count,
            fresh.len(),
            outcome.chosen_source
        );

        if self.previously_rejected(&outcome) {
            warn!(
                "⏭️ Not resubmitting match {}: the contract already rejected {}-{} {}",
                match_id, outcome.home_score, outcome.away_score, outcome.winner
            );
            report.skipped_rejected.push(match_id);
            return;
        }

        match self.submitter.submit(&outcome).await {
            Ok(receipt) if receipt.confirmed => {
                info!(
                    "✅ Result for match {} confirmed in tx {} (block {:?})",
                    match_id, receipt.transaction_id, receipt.block_number
                );
                metrics::record_submission("confirmed");
                match self.ledger.mark_submitted(&receipt).await {
                    Ok(_) => debug!("Ledger now holds {} match(es)", self.ledger.len()),
                    Err(e) => error!(
                        "❌ Match {} confirmed but the ledger store write failed: {}",
                        match_id, e
                    ),
                }
                self.lock_rejected().remove(&match_id);
                self.transition(match_id, MatchPhase::Submitted);
                report.submitted.push(match_id);
            }
            Ok(receipt) => {
                warn!(
                    "⚠️ Tx {} for match {} is not confirmed, retrying next cycle",
                    receipt.transaction_id, match_id
                );
                metrics::record_submission("transient");
                report.failed.push(match_id);
            }
            Err(e) => {
                self.handle_submission_error(&outcome, &e);
                report.failed.push(match_id);
            }
        }
    }

    fn handle_submission_error(&self, outcome: &ConsensusOutcome, err: &SubmissionError) {
        match err {
            SubmissionError::Transient { .. } => {
                metrics::record_submission("transient");
                warn!("⚠️ {}; retrying next cycle", err);
            }
            SubmissionError::Rejected { transaction_id, .. } => {
                let tx = transaction_id.as_deref().unwrap_or("none");
                if err.is_already_finalized() {
                    metrics::record_submission("already_finalized");
                    error!(
                        "🚨 Match {} is already finalized on-chain but not in the ledger (tx {}): {}",
                        outcome.match_id, tx, err
                    );
                } else {
                    metrics::record_submission("rejected");
                    error!("🚨 {} (tx {}). Check the oracle signer and contract state.", err, tx);
                }
                self.lock_rejected()
                    .insert(outcome.match_id, (outcome.score(), outcome.winner));
            }
        }
    }

    fn previously_rejected(&self, outcome: &ConsensusOutcome) -> bool {
        self.lock_rejected()
            .get(&outcome.match_id)
            .map_or(false, |params| *params == (outcome.score(), outcome.winner))
    }

    fn lock_rejected(&self) -> std::sync::MutexGuard<'_, HashMap<MatchId, ((u32, u32), Winner)>> {
        self.rejected
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Forgets matches that left every feed, unless they still await settlement.
    fn prune_phases(&self, groups: &IndexMap<MatchId, Vec<MatchResult>>) {
        let mut phases = self
            .phases
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        phases.retain(|match_id, phase| {
            groups.contains_key(match_id) || *phase == MatchPhase::FinishedPendingSubmit
        });
    }

    fn transition(&self, match_id: MatchId, next: MatchPhase) {
        let mut phases = self
            .phases
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let current = phases.get(&match_id).copied().unwrap_or(MatchPhase::Unseen);
        // SUBMITTED is terminal; a finished match does not go back to OBSERVED.
        let allowed = match (current, next) {
            (a, b) if a == b => false,
            (MatchPhase::Submitted, _) => false,
            (MatchPhase::FinishedPendingSubmit, MatchPhase::Observed) => false,
            _ => true,
        };
        if allowed {
            info!("🔁 Match {}: {} → {}", match_id, current, next);
            phases.insert(match_id, next);
        }
    }
}
