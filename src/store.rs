//! Store (C4): append-only time-series persistence with
//! concurrent-read journaling (WAL) and time-windowed purge.
//! Inserts accumulate in one transaction per cycle and become visible
//! to readers only on commit.

use std::path::Path;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Executor, Pool, Sqlite, Transaction};
use tracing::info;

use crate::error::StoreError;
use crate::model::{Sample, StoredRow};

const SCHEMA: &str = "\
CREATE TABLE IF NOT EXISTS readings (
    id        INTEGER PRIMARY KEY AUTOINCREMENT,
    ts        INTEGER NOT NULL,
    addr      INTEGER NOT NULL,
    temp_0    INTEGER,
    temp_1    INTEGER,
    temp_2    INTEGER,
    temp_3    INTEGER
);
CREATE INDEX IF NOT EXISTS idx_readings_addr_ts ON readings (addr, ts);
";

/// Owns the SQLite connection pool and the lifetime of the database
/// file. A single writer (this process); WAL permits external reader
/// processes.
pub struct Store {
    pool: Pool<Sqlite>,
    /// Pending, uncommitted inserts for the current cycle.
    pending: Option<Transaction<'static, Sqlite>>,
}

impl Store {
    /// Opens (or creates) the database at `db_path`, creating its
    /// parent directory if needed, enabling WAL, and ensuring the
    /// schema exists.
    pub async fn open(db_path: &str) -> Result<Self, StoreError> {
        if db_path != ":memory:" {
            if let Some(parent) = Path::new(db_path).parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        pool.execute(SCHEMA).await?;

        Ok(Store {
            pool,
            pending: None,
        })
    }

    /// Appends one row: `addr` + exactly four channel samples, with
    /// the current wall-clock arrival time. Does not commit -- call
    /// [`Store::commit`] to flush the batch.
    ///
    /// Fails with [`StoreError::BadChannelCount`] if `temps` does not
    /// contain exactly four elements. [`crate::model::Reading`] always
    /// produces four, but any other caller's slice is checked too.
    pub async fn insert(&mut self, addr: u8, temps: &[Sample]) -> Result<(), StoreError> {
        let [t0, t1, t2, t3]: [Option<i64>; 4] = temps
            .iter()
            .map(|s| s.as_db_value())
            .collect::<Vec<_>>()
            .try_into()
            .map_err(|v: Vec<Option<i64>>| StoreError::BadChannelCount(v.len()))?;

        let ts = now_unix();

        if self.pending.is_none() {
            self.pending = Some(self.pool.begin().await?);
        }
        let tx = self.pending.as_mut().expect("just initialized");

        sqlx::query(
            "INSERT INTO readings (ts, addr, temp_0, temp_1, temp_2, temp_3) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(ts)
        .bind(addr as i64)
        .bind(t0)
        .bind(t1)
        .bind(t2)
        .bind(t3)
        .execute(&mut *tx)
        .await?;

        Ok(())
    }

    /// Flushes the pending batch of inserts. A crash between `insert`
    /// and `commit` loses at most the current cycle's readings;
    /// already-committed rows are durable.
    pub async fn commit(&mut self) -> Result<(), StoreError> {
        if let Some(tx) = self.pending.take() {
            tx.commit().await?;
        }
        Ok(())
    }

    /// Returns the newest `count` rows, ordered by id descending.
    pub async fn fetch(&self, count: i64) -> Result<Vec<StoredRow>, StoreError> {
        let rows = sqlx::query_as::<_, RawRow>(
            "SELECT id, ts, addr, temp_0, temp_1, temp_2, temp_3 \
             FROM readings ORDER BY id DESC LIMIT ?",
        )
        .bind(count)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(RawRow::into_stored_row).collect())
    }

    /// Deletes rows older than `now - days*86400` and, if any were
    /// removed, reclaims space with `VACUUM`. Returns the count of
    /// deleted rows.
    pub async fn purge(&self, days: i64) -> Result<u64, StoreError> {
        let cutoff = now_unix() - days * 86400;
        let result = sqlx::query("DELETE FROM readings WHERE ts < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        let deleted = result.rows_affected();
        if deleted > 0 {
            self.pool.execute("VACUUM").await?;
            info!(deleted, days, "purged old readings");
        }
        Ok(deleted)
    }

    /// Flushes any pending batch and closes the pool.
    pub async fn close(mut self) -> Result<(), StoreError> {
        self.commit().await?;
        self.pool.close().await;
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct RawRow {
    id: i64,
    ts: i64,
    addr: i64,
    temp_0: Option<i64>,
    temp_1: Option<i64>,
    temp_2: Option<i64>,
    temp_3: Option<i64>,
}

impl RawRow {
    fn into_stored_row(self) -> StoredRow {
        StoredRow {
            id: self.id,
            ts: self.ts,
            addr: self.addr,
            temps: [self.temp_0, self.temp_1, self.temp_2, self.temp_3],
        }
    }
}

fn now_unix() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
