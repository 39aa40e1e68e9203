//! # Settlement Submitter
//!
//! Sends a consensus outcome to the betting pool contract and waits for it to
//! be confirmed.
//!
//! ## Flow
//!
//! 1. Build `proposeResult(matchId, result, homeScore, awayScore)` with the
//!    winner code (1 = home win, 2 = away win, 3 = draw).
//! 2. Optionally dry-run it with `eth_call`. A revert here costs no gas and is
//!    reported as [`SubmissionError::Rejected`].
//! 3. Sign and broadcast, then wait for the configured number of
//!    confirmations, bounded by `confirmation_timeout_seconds`.
//! 4. A mined receipt with status 0 is `Rejected`. Timeouts, dropped
//!    transactions and node errors are `Transient`.
//!
//! The same client registers upcoming games through `createGame`
//! (see [`GameRegistry`]).

use async_trait::async_trait;
use ethers::contract::{parse_log, ContractCall, ContractError};
use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, Middleware, Provider};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{TransactionReceipt, U256};
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;

use crate::contracts::{result_name, BettingPool, GameResultSetFilter};
use crate::error::SubmissionError;
use crate::match_result::{ConsensusOutcome, MatchId, MatchResult, SubmissionReceipt};
use crate::settings::Settlement;

/// Signed JSON-RPC client used in production.
pub type SignedClient = SignerMiddleware<Provider<Http>, LocalWallet>;

/// Records a consensus outcome on the settlement system.
#[async_trait]
pub trait ResultSubmitter: Send + Sync {
    async fn submit(&self, outcome: &ConsensusOutcome) -> Result<SubmissionReceipt, SubmissionError>;
}

/// Registers upcoming games so bets can be placed before kick-off.
#[async_trait]
pub trait GameRegistry: Send + Sync {
    /// True if the contract already knows the game.
    async fn is_registered(&self, match_id: MatchId) -> Result<bool, SubmissionError>;

    async fn create_game(&self, game: &MatchResult) -> Result<SubmissionReceipt, SubmissionError>;
}

pub struct ChainSubmitter<M: Middleware> {
    contract: BettingPool<M>,
    confirmations: usize,
    confirmation_timeout: Duration,
    simulate: bool,
    gas_limit: Option<U256>,
}

impl ChainSubmitter<SignedClient> {
    /// Connects to `rpc_url` with the oracle key. The chain id comes from the
    /// config when set, otherwise from the node.
    pub async fn connect(settings: &Settlement) -> anyhow::Result<Self> {
        let provider = Provider::<Http>::try_from(settings.rpc_url.as_str())?;

        let key = settings
            .private_key
            .as_ref()
            .filter(|k| !k.is_blank())
            .ok_or_else(|| anyhow::anyhow!("ORACLE_PRIVATE_KEY must be set"))?;
        let wallet: LocalWallet = key.expose().trim().parse()?;

        let chain_id = match settings.chain_id {
            Some(id) => id,
            None => provider.get_chainid().await?.as_u64(),
        };
        let wallet = wallet.with_chain_id(chain_id);
        info!(
            "🔑 Oracle account {:?} on chain {} via {}",
            wallet.address(),
            chain_id,
            settings.rpc_url
        );

        let client = Arc::new(SignerMiddleware::new(provider, wallet));
        Ok(Self::new(client, settings)?)
    }
}

impl<M: Middleware + 'static> ChainSubmitter<M> {
    pub fn new(client: Arc<M>, settings: &Settlement) -> Result<Self, config::ConfigError> {
        let address = settings.contract_address()?;
        Ok(Self {
            contract: BettingPool::new(address, client),
            confirmations: settings.confirmations.max(1),
            confirmation_timeout: settings.confirmation_timeout(),
            simulate: settings.simulate_before_send,
            gas_limit: settings.gas_limit.map(U256::from),
        })
    }

    pub fn contract(&self) -> &BettingPool<M> {
        &self.contract
    }

    /// Dry-run, broadcast and confirm one contract call.
    async fn execute(
        &self,
        match_id: MatchId,
        mut call: ContractCall<M, ()>,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        if let Some(gas) = self.gas_limit {
            call = call.gas(gas);
        }

        if self.simulate {
            call.call()
                .await
                .map_err(|e| classify_contract_error(match_id, &e))?;
            debug!("Dry-run passed for match {}", match_id);
        }

        let pending = call
            .send()
            .await
            .map_err(|e| classify_contract_error(match_id, &e))?;
        let tx_hash = format!("{:?}", pending.tx_hash());
        info!("📤 Sent transaction {} for match {}", tx_hash, match_id);

        let receipt = tokio::time::timeout(
            self.confirmation_timeout,
            pending.confirmations(self.confirmations),
        )
        .await
        .map_err(|_| SubmissionError::Transient {
            match_id,
            reason: format!(
                "transaction {} not confirmed within {:?}",
                tx_hash, self.confirmation_timeout
            ),
        })?
        .map_err(|e| SubmissionError::Transient {
            match_id,
            reason: e.to_string(),
        })?
        .ok_or_else(|| SubmissionError::Transient {
            match_id,
            reason: format!("transaction {} was dropped", tx_hash),
        })?;

        let submitted = interpret_receipt(
            match_id,
            &tx_hash,
            receipt.status.map(|s| s.as_u64()),
            receipt.block_number.map(|b| b.as_u64()),
        )?;
        self.log_result_events(&receipt);
        Ok(submitted)
    }

    fn log_result_events(&self, receipt: &TransactionReceipt) {
        let address = self.contract.address();
        for log in receipt.logs.iter().filter(|l| l.address == address) {
            if let Ok(event) = parse_log::<GameResultSetFilter>(log.clone()) {
                info!(
                    "🏁 GameResultSet: game {} result {}",
                    event.game_id,
                    result_name(event.result)
                );
            }
        }
    }
}

#[async_trait]
impl<M: Middleware + 'static> ResultSubmitter for ChainSubmitter<M> {
    async fn submit(&self, outcome: &ConsensusOutcome) -> Result<SubmissionReceipt, SubmissionError> {
        info!(
            "⚖️ Proposing result for match {}: {} {}-{} {} ({})",
            outcome.match_id,
            outcome.home_team,
            outcome.home_score,
            outcome.away_score,
            outcome.away_team,
            outcome.winner
        );
        let call = self.contract.propose_result(
            U256::from(outcome.match_id),
            outcome.winner.code(),
            U256::from(outcome.home_score),
            U256::from(outcome.away_score),
        );
        self.execute(outcome.match_id, call).await
    }
}

#[async_trait]
impl<M: Middleware + 'static> GameRegistry for ChainSubmitter<M> {
    async fn is_registered(&self, match_id: MatchId) -> Result<bool, SubmissionError> {
        let (id, ..) = self
            .contract
            .games(U256::from(match_id))
            .call()
            .await
            .map_err(|e| SubmissionError::Transient {
                match_id,
                reason: e.to_string(),
            })?;
        Ok(!id.is_zero())
    }

    async fn create_game(&self, game: &MatchResult) -> Result<SubmissionReceipt, SubmissionError> {
        info!(
            "🆕 Creating game {}: {} vs {}",
            game.match_id, game.home_team, game.away_team
        );
        let call = self.contract.create_game(
            U256::from(game.match_id),
            game.home_team.clone(),
            game.away_team.clone(),
            U256::from(game.start_time_secs()),
        );
        self.execute(game.match_id, call).await
    }
}

fn classify_contract_error<M: Middleware>(
    match_id: MatchId,
    err: &ContractError<M>,
) -> SubmissionError {
    if let Some(reason) = err.decode_revert::<String>() {
        return SubmissionError::Rejected {
            match_id,
            reason: format!("execution reverted: {}", reason),
            transaction_id: None,
        };
    }
    if err.is_revert() {
        return SubmissionError::Rejected {
            match_id,
            reason: err.to_string(),
            transaction_id: None,
        };
    }
    classify_message(match_id, &err.to_string())
}

/// Node errors without decodable revert data still mention the revert in text.
pub(crate) fn classify_message(match_id: MatchId, message: &str) -> SubmissionError {
    if message.to_ascii_lowercase().contains("revert") {
        SubmissionError::Rejected {
            match_id,
            reason: message.to_string(),
            transaction_id: None,
        }
    } else {
        SubmissionError::Transient {
            match_id,
            reason: message.to_string(),
        }
    }
}

pub(crate) fn interpret_receipt(
    match_id: MatchId,
    tx_hash: &str,
    status: Option<u64>,
    block_number: Option<u64>,
) -> Result<SubmissionReceipt, SubmissionError> {
    if status == Some(0) {
        warn!("❌ Transaction {} for match {} reverted", tx_hash, match_id);
        return Err(SubmissionError::Rejected {
            match_id,
            reason: "transaction reverted on-chain".to_string(),
            transaction_id: Some(tx_hash.to_string()),
        });
    }
    Ok(SubmissionReceipt {
        match_id,
        transaction_id: tx_hash.to_string(),
        confirmed: true,
        block_number,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revert_messages_are_rejections() {
        let err = classify_message(
            42,
            "(code: 3, message: execution reverted: Game already finalized, data: None)",
        );
        assert!(err.is_rejected());
        assert!(err.is_already_finalized());
    }

    #[test]
    fn network_errors_are_transient() {
        let err = classify_message(42, "error sending request for url (http://localhost:8545/)");
        assert_eq!(
            err,
            SubmissionError::Transient {
                match_id: 42,
                reason: "error sending request for url (http://localhost:8545/)".into()
            }
        );
    }

    #[test]
    fn failed_receipt_keeps_transaction_id() {
        let err = interpret_receipt(7, "0xabc", Some(0), Some(100)).unwrap_err();
        match err {
            SubmissionError::Rejected { transaction_id, .. } => {
                assert_eq!(transaction_id.as_deref(), Some("0xabc"))
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn successful_receipt_is_confirmed() {
        let receipt = interpret_receipt(7, "0xabc", Some(1), Some(100)).unwrap();
        assert!(receipt.confirmed);
        assert_eq!(receipt.block_number, Some(100));
        assert_eq!(receipt.transaction_id, "0xabc");
    }
}
