//! # Match Provider Trait
//!
//! This module defines the core abstraction for integrating third-party
//! sports-data vendors into the oracle. The `MatchProvider` trait gives the
//! monitor loop one interface for every vendor, so the loop and the consensus
//! engine never care how many providers are configured.
//!
//! ## Adding a New Provider
//!
//! 1. Implement `MatchProvider` for the vendor's client (see `providers/`)
//! 2. Normalize the vendor's payload into [`MatchResult`] inside the client
//! 3. Register the client in `providers::build_providers`
//!
//! ## Example
//!
//! ```rust,no_run
//! use matchday_oracle::match_provider::MatchProvider;
//! use matchday_oracle::match_result::{MatchId, MatchResult};
//! use matchday_oracle::error::ProviderError;
//! use async_trait::async_trait;
//!
//! struct MyVendor;
//!
//! #[async_trait]
//! impl MatchProvider for MyVendor {
//!     fn name(&self) -> &'static str {
//!         "MyVendor"
//!     }
//!
//!     async fn fetch_live_matches(&self) -> Result<Vec<MatchResult>, ProviderError> {
//!         // Query the vendor and normalize each record
//!         Ok(vec![])
//!     }
//!
//!     async fn fetch_match_result(&self, match_id: MatchId) -> Result<MatchResult, ProviderError> {
//!         Err(ProviderError::NotFound { provider: self.name().to_string(), match_id })
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::match_result::{MatchId, MatchResult};

/// The main trait for all sports-data provider clients.
///
/// # Guarantees expected from implementations
///
/// - Every returned `MatchResult` is fully normalized: canonical `match_id`,
///   three-state status, final scores on finished matches.
/// - A missing match is `ProviderError::NotFound`, never a partial record.
/// - Transient network failures are retried inside the client; once the retry
///   budget is spent the call fails with `ProviderError::Unavailable`.
/// - No local state is mutated; the only side effect is the outbound request.
///
/// # Thread Safety
///
/// Providers are queried concurrently by the monitor loop, so they must be
/// `Send + Sync`.
#[async_trait]
pub trait MatchProvider: Send + Sync {
    /// Vendor name, used as `MatchResult::source`, in logs and metric labels.
    fn name(&self) -> &'static str;

    /// Live and recently finished matches known to the vendor.
    ///
    /// Records that fail normalization are dropped individually (and logged)
    /// rather than failing the whole call.
    async fn fetch_live_matches(&self) -> Result<Vec<MatchResult>, ProviderError>;

    /// Fresh, complete record for one match by canonical id.
    async fn fetch_match_result(&self, match_id: MatchId) -> Result<MatchResult, ProviderError>;
}
