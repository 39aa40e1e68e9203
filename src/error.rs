// Error taxonomy for the oracle pipeline.
//
// Nothing here is fatal to the monitor loop: every variant is caught and
// logged at the cycle boundary. Only configuration errors abort startup, and
// those are reported through `anyhow` by the binary.

use crate::match_result::MatchId;

/// Failure of a provider client call.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Transient failures (timeouts, connection resets, 5xx, 429) exhausted the retry budget.
    #[error("{provider} unavailable after {attempts} attempt(s): {reason}")]
    Unavailable {
        provider: String,
        attempts: u32,
        reason: String,
    },
    #[error("{provider}: match {match_id} not found")]
    NotFound { provider: String, match_id: MatchId },
    /// Payload could not be normalized (missing final score, bad date, unknown id).
    #[error("{provider}: malformed data: {reason}")]
    Malformed { provider: String, reason: String },
    /// Non-retryable HTTP status such as 401/403 (bad API key).
    #[error("{provider}: request rejected with HTTP {status}")]
    Rejected { provider: String, status: u16 },
}

impl ProviderError {
    pub fn provider(&self) -> &str {
        match self {
            ProviderError::Unavailable { provider, .. }
            | ProviderError::NotFound { provider, .. }
            | ProviderError::Malformed { provider, .. }
            | ProviderError::Rejected { provider, .. } => provider,
        }
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::Unavailable { .. } => "unavailable",
            ProviderError::NotFound { .. } => "not_found",
            ProviderError::Malformed { .. } => "malformed",
            ProviderError::Rejected { .. } => "rejected",
        }
    }
}

/// Failure of a settlement submission.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmissionError {
    /// Node or network failure while sending or awaiting confirmation; safe to retry next cycle.
    #[error("transient submission failure for match {match_id}: {reason}")]
    Transient { match_id: MatchId, reason: String },
    /// The settlement contract refused the call. Retrying with the same parameters wastes fees.
    #[error("settlement contract rejected match {match_id}: {reason}")]
    Rejected {
        match_id: MatchId,
        reason: String,
        transaction_id: Option<String>,
    },
}

impl SubmissionError {
    pub fn match_id(&self) -> MatchId {
        match self {
            SubmissionError::Transient { match_id, .. }
            | SubmissionError::Rejected { match_id, .. } => *match_id,
        }
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, SubmissionError::Rejected { .. })
    }

    /// True when the revert reason says the match already has a result on-chain.
    pub fn is_already_finalized(&self) -> bool {
        match self {
            SubmissionError::Rejected { reason, .. } => {
                let reason = reason.to_ascii_lowercase();
                reason.contains("already finalized")
                    || reason.contains("already set")
                    || reason.contains("already proposed")
                    || reason.contains("already settled")
            }
            SubmissionError::Transient { .. } => false,
        }
    }
}

/// Failure of a ledger persistence backend.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("ledger io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("ledger file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("ledger database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn already_finalized_is_detected_from_revert_reason() {
        let err = SubmissionError::Rejected {
            match_id: 42,
            reason: "execution reverted: Game already finalized".into(),
            transaction_id: None,
        };
        assert!(err.is_rejected());
        assert!(err.is_already_finalized());

        let unauthorized = SubmissionError::Rejected {
            match_id: 42,
            reason: "execution reverted: caller is not the oracle".into(),
            transaction_id: None,
        };
        assert!(!unauthorized.is_already_finalized());
    }

    #[test]
    fn transient_is_never_finalized() {
        let err = SubmissionError::Transient {
            match_id: 7,
            reason: "already finalized".into(),
        };
        assert!(!err.is_rejected());
        assert!(!err.is_already_finalized());
        assert_eq!(err.match_id(), 7);
    }
}
