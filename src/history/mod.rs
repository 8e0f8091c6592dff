//! Prediction ledger.
//!
//! An embedded sqlite table keyed by record id: records are appended once,
//! resolved at most once (the single mutation path updates one row), and
//! never deleted. The ledger is the sole carrier of adaptive state across
//! process restarts.

use crate::error::{AgentError, Result};
use crate::types::{PredictionRecord, Resolution, Trend};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS predictions (
    id TEXT PRIMARY KEY,
    symbol TEXT NOT NULL,
    created_at TEXT NOT NULL,
    horizon_bars INTEGER NOT NULL,
    current_price REAL NOT NULL,
    predicted_price REAL NOT NULL,
    predicted_trend TEXT NOT NULL,
    confidence REAL NOT NULL,
    applied_threshold REAL NOT NULL,
    actual_price REAL,
    actual_trend TEXT,
    is_correct INTEGER,
    adjusted_threshold REAL
)
"#;

const RECORD_COLUMNS: &str = "rowid AS seq, id, symbol, created_at, horizon_bars, \
     current_price, predicted_price, predicted_trend, confidence, \
     applied_threshold, actual_price, actual_trend, is_correct, adjusted_threshold";

pub struct HistoryStore {
    pool: SqlitePool,
}

impl HistoryStore {
    pub async fn connect(path: &str) -> Result<Self> {
        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| AgentError::Persistence(sqlx::Error::Io(e)))?;
            }
        }
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        Self::with_options(options).await
    }

    /// Ephemeral in-memory ledger, used by tests.
    pub async fn in_memory() -> Result<Self> {
        Self::with_options(SqliteConnectOptions::new().in_memory(true)).await
    }

    async fn with_options(options: SqliteConnectOptions) -> Result<Self> {
        // A single connection both serializes writers and keeps an
        // in-memory database alive for the pool's lifetime.
        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .connect_with(options)
            .await?;
        sqlx::query(SCHEMA).execute(&pool).await?;
        Ok(Self { pool })
    }

    /// Append new records. Resolution fields start empty.
    pub async fn append(&self, records: &[PredictionRecord]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for record in records {
            sqlx::query(
                "INSERT INTO predictions (id, symbol, created_at, horizon_bars, \
                 current_price, predicted_price, predicted_trend, confidence, \
                 applied_threshold) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )
            .bind(record.id.to_string())
            .bind(&record.symbol)
            .bind(record.created_at)
            .bind(record.horizon_bars as i64)
            .bind(record.current_price)
            .bind(record.predicted_price)
            .bind(record.predicted_trend.as_str())
            .bind(record.confidence)
            .bind(record.applied_threshold)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        tracing::info!("appended {} prediction(s) to the ledger", records.len());
        Ok(())
    }

    pub async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM predictions")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("n")?)
    }

    /// The most recent `limit` records still lacking a resolution,
    /// oldest-appended-first within that tail. A bounded lookback keeps
    /// backtest cost bounded; older unresolved records are left behind.
    pub async fn scan_unresolved(&self, limit: u32) -> Result<Vec<PredictionRecord>> {
        let query = format!(
            "SELECT * FROM (SELECT {RECORD_COLUMNS} FROM predictions \
             WHERE is_correct IS NULL ORDER BY seq DESC LIMIT ?1) \
             ORDER BY seq ASC"
        );
        let rows = sqlx::query(&query)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(record_from_row).collect()
    }

    /// The most recent `limit` resolved records, oldest-first.
    pub async fn tail_resolved(&self, limit: u32) -> Result<Vec<PredictionRecord>> {
        let query = format!(
            "SELECT * FROM (SELECT {RECORD_COLUMNS} FROM predictions \
             WHERE is_correct IS NOT NULL ORDER BY seq DESC LIMIT ?1) \
             ORDER BY seq ASC"
        );
        let rows = sqlx::query(&query)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(record_from_row).collect()
    }

    /// The most recent `limit` records of any status, newest-first.
    pub async fn tail(&self, limit: u32) -> Result<Vec<PredictionRecord>> {
        let query = format!(
            "SELECT {RECORD_COLUMNS} FROM predictions ORDER BY seq DESC LIMIT ?1"
        );
        let rows = sqlx::query(&query)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(record_from_row).collect()
    }

    /// Sole mutation path. Only rows still unresolved match the guard, so
    /// a record already resolved is left untouched.
    pub async fn resolve(
        &self,
        id: &Uuid,
        actual_price: f64,
        actual_trend: Trend,
        is_correct: bool,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE predictions SET actual_price = ?1, actual_trend = ?2, \
             is_correct = ?3 WHERE id = ?4 AND is_correct IS NULL",
        )
        .bind(actual_price)
        .bind(actual_trend.as_str())
        .bind(is_correct)
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            tracing::debug!("record {} already resolved, skipping", id);
        }
        Ok(())
    }

    /// Write the threshold that is now in effect onto the ledger for audit.
    pub async fn record_adjusted_threshold(&self, value: f64) -> Result<()> {
        sqlx::query("UPDATE predictions SET adjusted_threshold = ?1")
            .bind(value)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// The adjusted threshold most recently written, if any.
    pub async fn last_adjusted_threshold(&self) -> Result<Option<f64>> {
        let row = sqlx::query(
            "SELECT adjusted_threshold FROM predictions \
             WHERE adjusted_threshold IS NOT NULL ORDER BY rowid DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => Ok(Some(row.try_get("adjusted_threshold")?)),
            None => Ok(None),
        }
    }
}

fn record_from_row(row: &SqliteRow) -> Result<PredictionRecord> {
    let id_raw: String = row.try_get("id")?;
    let id = Uuid::parse_str(&id_raw)
        .map_err(|e| AgentError::Persistence(sqlx::Error::Decode(Box::new(e))))?;

    let trend_raw: String = row.try_get("predicted_trend")?;
    let predicted_trend = Trend::parse(&trend_raw).ok_or_else(|| {
        AgentError::Persistence(sqlx::Error::Decode(
            format!("unknown trend '{trend_raw}'").into(),
        ))
    })?;

    let actual_price: Option<f64> = row.try_get("actual_price")?;
    let actual_trend_raw: Option<String> = row.try_get("actual_trend")?;
    let is_correct: Option<bool> = row.try_get("is_correct")?;

    let resolution = match (actual_price, actual_trend_raw, is_correct) {
        (Some(price), Some(trend_raw), Some(is_correct)) => {
            let actual_trend = Trend::parse(&trend_raw).ok_or_else(|| {
                AgentError::Persistence(sqlx::Error::Decode(
                    format!("unknown trend '{trend_raw}'").into(),
                ))
            })?;
            Resolution::Resolved {
                actual_price: price,
                actual_trend,
                is_correct,
            }
        }
        _ => Resolution::Unresolved,
    };

    Ok(PredictionRecord {
        id,
        symbol: row.try_get("symbol")?,
        created_at: row.try_get("created_at")?,
        horizon_bars: row.try_get::<i64, _>("horizon_bars")? as u32,
        current_price: row.try_get("current_price")?,
        predicted_price: row.try_get("predicted_price")?,
        predicted_trend,
        confidence: row.try_get("confidence")?,
        applied_threshold: row.try_get("applied_threshold")?,
        resolution,
        adjusted_threshold: row.try_get("adjusted_threshold")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn make_record(symbol: &str, hours_offset: i64) -> PredictionRecord {
        PredictionRecord {
            id: Uuid::new_v4(),
            symbol: symbol.to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
                + chrono::Duration::hours(hours_offset),
            horizon_bars: 4,
            current_price: 1.1,
            predicted_price: 1.105,
            predicted_trend: Trend::Up,
            confidence: 82.5,
            applied_threshold: 75.0,
            resolution: Resolution::Unresolved,
            adjusted_threshold: None,
        }
    }

    #[tokio::test]
    async fn append_then_scan_round_trips() {
        let store = HistoryStore::in_memory().await.unwrap();
        let records = vec![
            make_record("EUR/USD", 0),
            make_record("USD/JPY", 1),
            make_record("GBP/USD", 2),
        ];
        store.append(&records).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 3);
        let pending = store.scan_unresolved(10).await.unwrap();
        assert_eq!(pending.len(), 3);
        // Oldest-appended-first within the tail.
        assert_eq!(pending[0].symbol, "EUR/USD");
        assert_eq!(pending[2].symbol, "GBP/USD");
        assert_eq!(pending[0].predicted_trend, Trend::Up);
        assert!(!pending[0].is_resolved());
    }

    #[tokio::test]
    async fn scan_unresolved_is_a_bounded_tail() {
        let store = HistoryStore::in_memory().await.unwrap();
        for i in 0..5 {
            store
                .append(&[make_record(&format!("SYM{i}"), i)])
                .await
                .unwrap();
        }
        let pending = store.scan_unresolved(3).await.unwrap();
        assert_eq!(pending.len(), 3);
        // The three most recent, oldest-first within the tail.
        assert_eq!(pending[0].symbol, "SYM2");
        assert_eq!(pending[2].symbol, "SYM4");
    }

    #[tokio::test]
    async fn resolve_applies_exactly_once() {
        let store = HistoryStore::in_memory().await.unwrap();
        let record = make_record("EUR/USD", 0);
        store.append(std::slice::from_ref(&record)).await.unwrap();

        store
            .resolve(&record.id, 1.108, Trend::Up, true)
            .await
            .unwrap();

        assert!(store.scan_unresolved(10).await.unwrap().is_empty());
        let resolved = store.tail_resolved(10).await.unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(
            resolved[0].resolution,
            Resolution::Resolved {
                actual_price: 1.108,
                actual_trend: Trend::Up,
                is_correct: true,
            }
        );

        // A second resolution attempt with different values is a no-op.
        store
            .resolve(&record.id, 0.9, Trend::Down, false)
            .await
            .unwrap();
        let resolved = store.tail_resolved(10).await.unwrap();
        assert_eq!(
            resolved[0].resolution,
            Resolution::Resolved {
                actual_price: 1.108,
                actual_trend: Trend::Up,
                is_correct: true,
            }
        );
    }

    #[tokio::test]
    async fn adjusted_threshold_round_trips() {
        let store = HistoryStore::in_memory().await.unwrap();
        assert!(store.last_adjusted_threshold().await.unwrap().is_none());

        store.append(&[make_record("EUR/USD", 0)]).await.unwrap();
        store.record_adjusted_threshold(80.0).await.unwrap();
        assert_eq!(store.last_adjusted_threshold().await.unwrap(), Some(80.0));

        let tail = store.tail(10).await.unwrap();
        assert_eq!(tail[0].adjusted_threshold, Some(80.0));
    }

    #[tokio::test]
    async fn ledger_survives_reconnect() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");
        let path = path.to_str().unwrap();

        {
            let store = HistoryStore::connect(path).await.unwrap();
            store.append(&[make_record("EUR/USD", 0)]).await.unwrap();
        }

        let store = HistoryStore::connect(path).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn tail_returns_newest_first() {
        let store = HistoryStore::in_memory().await.unwrap();
        for i in 0..3 {
            store
                .append(&[make_record(&format!("SYM{i}"), i)])
                .await
                .unwrap();
        }
        let tail = store.tail(2).await.unwrap();
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].symbol, "SYM2");
        assert_eq!(tail[1].symbol, "SYM1");
    }
}
