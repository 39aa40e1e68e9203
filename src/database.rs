use crate::error::LedgerError;
use crate::ledger::LedgerStore;
use crate::match_result::{MatchId, SubmissionReceipt};
use anyhow::Result;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, Connection, Pool, Postgres, Row};
use std::collections::HashSet;
use std::env;
use std::time::Duration;

/// PostgreSQL connection pool type alias.
pub type DbPool = Pool<Postgres>;

/// Database schema name
pub const SCHEMA: &str = "oracle";

/// Connects using `DATABASE_URL`, retrying with backoff, and creates the schema.
pub async fn connect() -> Result<DbPool> {
    let database_url = env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set for the postgres ledger"))?;
    connect_to(&database_url).await
}

pub async fn connect_to(database_url: &str) -> Result<DbPool> {
    let mut last_err: Option<anyhow::Error> = None;
    let max_attempts: u32 = 10;
    for attempt in 1..=max_attempts {
        match PgPoolOptions::new()
            .max_connections(2)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await
        {
            Ok(pool) => {
                log::info!(
                    "✅ Connected to ledger database (attempt {}/{}).",
                    attempt,
                    max_attempts
                );
                if let Err(e) = initialize_database(&pool).await {
                    last_err = Some(e);
                } else {
                    return Ok(pool);
                }
            }
            Err(e) => {
                last_err = Some(e.into());
            }
        }
        let delay_ms = (1u64 << attempt.min(6)) * 200; // 400ms, 800ms, ... capped at 12.8s
        log::warn!(
            "DB connect/init attempt {}/{} failed. Retrying in {} ms...",
            attempt,
            max_attempts,
            delay_ms
        );
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }
    Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Unknown DB connection error")))
}

pub async fn initialize_database(pool: &DbPool) -> Result<()> {
    const MIGRATION_LOCK_ID: i64 = 0x4F5241434C45; // "ORACLE"

    let mut conn = pool.acquire().await?;
    let mut tx = conn.begin().await?;

    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(MIGRATION_LOCK_ID)
        .execute(tx.as_mut())
        .await?;

    sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS {}", SCHEMA))
        .execute(tx.as_mut())
        .await?;

    // match_id holds the u64 bit pattern in a BIGINT.
    sqlx::query(&format!(
        "CREATE TABLE IF NOT EXISTS {}.processed_matches (
            match_id BIGINT PRIMARY KEY,
            transaction_id TEXT NOT NULL,
            block_number BIGINT,
            processed_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
        SCHEMA
    ))
    .execute(tx.as_mut())
    .await?;

    tx.commit().await?;
    log::info!("✅ Ledger schema ready ({}.processed_matches).", SCHEMA);
    Ok(())
}

/// Ledger store backed by `oracle.processed_matches`.
pub struct PgLedgerStore {
    pool: DbPool,
}

impl PgLedgerStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn load(&self) -> Result<HashSet<MatchId>, LedgerError> {
        let rows = sqlx::query(&format!(
            "SELECT match_id FROM {}.processed_matches",
            SCHEMA
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                row.try_get::<i64, _>("match_id")
                    .map(|id| id as MatchId)
                    .map_err(LedgerError::from)
            })
            .collect()
    }

    async fn record(&self, receipt: &SubmissionReceipt) -> Result<(), LedgerError> {
        sqlx::query(&format!(
            "INSERT INTO {}.processed_matches (match_id, transaction_id, block_number)
             VALUES ($1, $2, $3)
             ON CONFLICT (match_id) DO NOTHING",
            SCHEMA
        ))
        .bind(receipt.match_id as i64)
        .bind(&receipt.transaction_id)
        .bind(receipt.block_number.map(|b| b as i64))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
