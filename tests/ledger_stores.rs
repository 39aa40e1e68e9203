//! Ledger persistence across process restarts

use matchday_oracle::database::{self, PgLedgerStore};
use matchday_oracle::ledger::{JsonFileStore, LedgerStore, ProcessedMatchesLedger};
use matchday_oracle::match_result::SubmissionReceipt;
use matchday_oracle::settings::{Ledger, LedgerBackend};
use std::sync::Arc;

fn receipt(match_id: u64) -> SubmissionReceipt {
    SubmissionReceipt {
        match_id,
        transaction_id: format!("0x{:064x}", match_id),
        confirmed: true,
        block_number: Some(19_000_000 + match_id),
    }
}

#[tokio::test]
async fn file_backend_reloads_processed_matches() {
    let dir = tempfile::tempdir().unwrap();
    let settings = Ledger {
        backend: LedgerBackend::File,
        path: dir.path().join("processed.json").to_string_lossy().into_owned(),
    };

    {
        let ledger = ProcessedMatchesLedger::from_settings(&settings).await.unwrap();
        assert!(ledger.is_empty());
        assert!(ledger.mark_submitted(&receipt(42)).await.unwrap());
        assert!(ledger.mark_submitted(&receipt(7)).await.unwrap());
    }

    let restarted = ProcessedMatchesLedger::from_settings(&settings).await.unwrap();
    assert_eq!(restarted.snapshot(), vec![7, 42]);
    assert!(!restarted.mark_submitted(&receipt(42)).await.unwrap());
}

#[tokio::test]
async fn file_contents_keep_transaction_ids() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("processed.json");
    let store = JsonFileStore::new(&path);
    store.record(&receipt(42)).await.unwrap();
    store.record(&receipt(42)).await.unwrap();

    let raw: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    let entries = raw["processed"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["matchId"], 42);
    assert_eq!(entries[0]["transactionId"], receipt(42).transaction_id);
    assert_eq!(entries[0]["blockNumber"], 19_000_042);
}

#[tokio::test]
async fn memory_backend_starts_empty() {
    let ledger = ProcessedMatchesLedger::from_settings(&Ledger::default()).await.unwrap();
    assert!(ledger.is_empty());
}

#[tokio::test]
#[ignore] // needs DATABASE_URL pointing at a disposable Postgres
async fn postgres_store_round_trips_ids() {
    let pool = database::connect().await.unwrap();
    sqlx::query("DELETE FROM oracle.processed_matches WHERE match_id IN (900001, 900002)")
        .execute(&pool)
        .await
        .unwrap();

    let store = Arc::new(PgLedgerStore::new(pool));
    let ledger = ProcessedMatchesLedger::with_store(store.clone()).await.unwrap();
    ledger.mark_submitted(&receipt(900001)).await.unwrap();
    ledger.mark_submitted(&receipt(900002)).await.unwrap();
    // ON CONFLICT DO NOTHING
    store.record(&receipt(900001)).await.unwrap();

    let ids = store.load().await.unwrap();
    assert!(ids.contains(&900001));
    assert!(ids.contains(&900002));
}
