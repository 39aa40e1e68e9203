// Registers NOT_STARTED matches on the betting pool so bets can open before kick-off.
//
// Each match is registered at most once per process. Games the contract
// already knows are remembered without sending a transaction.

use log::{debug, info, warn};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::match_result::{MatchId, MatchResult, MatchStatus};
use crate::settlement::GameRegistry;

pub struct GameRegistrar {
    registry: Arc<dyn GameRegistry>,
    registered: Mutex<HashSet<MatchId>>,
}

impl GameRegistrar {
    pub fn new(registry: Arc<dyn GameRegistry>) -> Self {
        Self {
            registry,
            registered: Mutex::new(HashSet::new()),
        }
    }

    /// Registers every not-yet-seen NOT_STARTED match. Returns how many games were created.
    pub async fn register_upcoming(&self, matches: &[MatchResult]) -> usize {
        let mut created = 0;
        for game in matches.iter().filter(|m| m.status == MatchStatus::NotStarted) {
            if self.registered.lock().await.contains(&game.match_id) {
                continue;
            }

            match self.registry.is_registered(game.match_id).await {
                Ok(true) => {
                    debug!("Game {} already registered on-chain", game.match_id);
                    self.registered.lock().await.insert(game.match_id);
                    continue;
                }
                Ok(false) => {}
                Err(e) => {
                    warn!("⚠️ Could not check registration of game {}: {}", game.match_id, e);
                    continue;
                }
            }

            match self.registry.create_game(game).await {
                Ok(receipt) => {
                    info!(
                        "✅ Registered game {} ({} vs {}) in tx {}",
                        game.match_id, game.home_team, game.away_team, receipt.transaction_id
                    );
                    self.registered.lock().await.insert(game.match_id);
                    created += 1;
                }
                Err(e) if e.is_rejected() => {
                    // Rejected registrations are not retried.
                    warn!("❌ Registration of game {} rejected: {}", game.match_id, e);
                    self.registered.lock().await.insert(game.match_id);
                }
                Err(e) => warn!("⚠️ Registration of game {} failed: {}", game.match_id, e),
            }
        }
        created
    }

    pub async fn is_known(&self, match_id: MatchId) -> bool {
        self.registered.lock().await.contains(&match_id)
    }
}
