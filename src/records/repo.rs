use anyhow::Context;
use sqlx::SqlitePool;
use time::{macros::format_description, PrimitiveDateTime};

use super::repo_types::Record;

/// Owned handle over the `records` table.
#[derive(Clone, Debug)]
pub struct RecordStore {
    db: SqlitePool,
}

impl RecordStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Creates the table if it does not exist yet.
    pub async fn init(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS records (
                id        INTEGER PRIMARY KEY AUTOINCREMENT,
                filename  TEXT NOT NULL,
                food_name TEXT,
                calories  REAL NOT NULL,
                date      TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.db)
        .await
        .context("create records table")?;
        Ok(())
    }

    pub async fn insert(
        &self,
        filename: &str,
        food_name: Option<&str>,
        calories: f64,
    ) -> anyhow::Result<Record> {
        let record = sqlx::query_as::<_, Record>(
            r#"
            INSERT INTO records (filename, food_name, calories)
            VALUES (?1, ?2, ?3)
            RETURNING id, filename, food_name, calories, date
            "#,
        )
        .bind(filename)
        .bind(food_name)
        .bind(calories)
        .fetch_one(&self.db)
        .await
        .context("insert record")?;
        Ok(record)
    }

    /// Sum of calories recorded today (UTC); 0 when nothing matches.
    pub async fn daily_total(&self) -> anyhow::Result<f64> {
        let total = sqlx::query_scalar::<_, f64>(
            r#"
            SELECT COALESCE(SUM(calories), 0.0)
              FROM records
             WHERE date(date) = date('now')
            "#,
        )
        .fetch_one(&self.db)
        .await
        .context("sum daily calories")?;
        Ok(total)
    }

    /// Every record, newest first.
    pub async fn list_all(&self) -> anyhow::Result<Vec<Record>> {
        let rows = sqlx::query_as::<_, Record>(
            r#"
            SELECT id, filename, food_name, calories, date
              FROM records
             ORDER BY date DESC, id DESC
            "#,
        )
        .fetch_all(&self.db)
        .await
        .context("list records")?;
        Ok(rows)
    }

    pub async fn stale_filenames(&self, cutoff: PrimitiveDateTime) -> anyhow::Result<Vec<String>> {
        let names = sqlx::query_scalar::<_, String>(
            r#"
            SELECT filename
              FROM records
             WHERE datetime(date) < datetime(?1)
             ORDER BY id ASC
            "#,
        )
        .bind(sql_timestamp(cutoff)?)
        .fetch_all(&self.db)
        .await
        .context("list stale filenames")?;
        Ok(names)
    }

    /// Deletes every row older than `cutoff`, returning how many went.
    pub async fn purge_older_than(&self, cutoff: PrimitiveDateTime) -> anyhow::Result<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM records
             WHERE datetime(date) < datetime(?1)
            "#,
        )
        .bind(sql_timestamp(cutoff)?)
        .execute(&self.db)
        .await
        .context("purge old records")?;
        Ok(result.rows_affected())
    }
}

/// Same layout SQLite uses for CURRENT_TIMESTAMP.
pub fn sql_timestamp(ts: PrimitiveDateTime) -> anyhow::Result<String> {
    ts.format(format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second]"
    ))
    .context("format timestamp")
}
