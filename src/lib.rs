//! # Matchday Oracle
//!
//! Off-chain oracle for a sports-betting settlement contract. It polls several
//! independent sports-data providers, reconciles their scores, and submits a
//! single result per match on-chain once a quorum of providers agrees.
//!
//! ## Architecture
//!
//! ### Provider Layer
//! One client per vendor behind the [`MatchProvider`] trait. Clients normalize
//! native payloads into [`MatchResult`] and own retry, auth and rate limiting.
//!
//! ### Consensus Layer
//! [`ResultValidator`] groups results by score and returns an outcome only when
//! the largest group reaches the confirmation threshold.
//!
//! ### Settlement Layer
//! [`ResultSubmitter`] sends the outcome to the betting pool contract and
//! waits for confirmation. [`ProcessedMatchesLedger`] records confirmed matches
//! so none is submitted twice.
//!
//! ### Monitor
//! [`OracleMonitor`] runs the fixed-delay loop that drives all of the above.

// Core Types
/// Canonical match records and derived outcomes
pub mod match_result;
/// Error taxonomy
pub mod error;
/// Provider capability trait
pub mod match_provider;

// Provider Layer
/// Shared HTTP plumbing (retry, auth, rate limit)
pub mod http_client;
/// Vendor clients
pub mod providers;

// Consensus Layer
pub mod consensus;

// Settlement Layer
/// Settlement contract bindings
pub mod contracts;
pub mod settlement;
/// Upcoming game registration
pub mod registrar;
/// Processed matches ledger and stores
pub mod ledger;
/// Postgres ledger store
pub mod database;

// Orchestration
pub mod monitor;

// Infrastructure
pub mod metrics;
pub mod settings;

pub use consensus::ResultValidator;
pub use error::{LedgerError, ProviderError, SubmissionError};
pub use ledger::ProcessedMatchesLedger;
pub use match_provider::MatchProvider;
pub use match_result::{ConsensusOutcome, MatchId, MatchResult, MatchStatus, SubmissionReceipt, Winner};
pub use monitor::{CycleReport, MatchPhase, MonitorConfig, OracleMonitor};
pub use settings::Settings;
pub use settlement::{ChainSubmitter, GameRegistry, ResultSubmitter};
