// devenvtool/src/store/postgres.rs
use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{Column, PgPool, Postgres, Row, Transaction};
use tokio::sync::Mutex;

use crate::errors::{AppError, Result};
use crate::store::{QueryExecutor, QueryOutput};

/// sqlx-backed query executor with a single scoped transaction slot. The tool
/// runs one operation at a time, so one slot is all the seed loader needs.
pub struct PgQueryExecutor {
    pool: PgPool,
    tx: Mutex<Option<Transaction<'static, Postgres>>>,
}

impl PgQueryExecutor {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        Ok(PgQueryExecutor {
            pool,
            tx: Mutex::new(None),
        })
    }
}

#[async_trait]
impl QueryExecutor for PgQueryExecutor {
    async fn execute(&self, sql: &str, params: &[Option<String>]) -> Result<QueryOutput> {
        let mut query = sqlx::query(sql);
        for param in params {
            query = query.bind(param.clone());
        }

        let mut guard = self.tx.lock().await;
        let returns_rows = sql.trim_start().to_uppercase().starts_with("SELECT");

        if returns_rows {
            let rows = match guard.as_mut() {
                Some(tx) => query.fetch_all(&mut **tx).await?,
                None => query.fetch_all(&self.pool).await?,
            };
            Ok(rows_to_output(&rows)?)
        } else {
            let result = match guard.as_mut() {
                Some(tx) => query.execute(&mut **tx).await?,
                None => query.execute(&self.pool).await?,
            };
            Ok(QueryOutput {
                columns: Vec::new(),
                rows: Vec::new(),
                rowcount: result.rows_affected(),
            })
        }
    }

    async fn begin(&self) -> Result<()> {
        let mut guard = self.tx.lock().await;
        if guard.is_some() {
            return Err(AppError::Database(
                "A transaction is already open; nested transactions are not supported".to_string(),
            ));
        }
        *guard = Some(self.pool.begin().await?);
        Ok(())
    }

    async fn commit(&self) -> Result<()> {
        let mut guard = self.tx.lock().await;
        let tx = guard
            .take()
            .ok_or_else(|| AppError::Database("No open transaction to commit".to_string()))?;
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(&self) -> Result<()> {
        let mut guard = self.tx.lock().await;
        let tx = guard
            .take()
            .ok_or_else(|| AppError::Database("No open transaction to roll back".to_string()))?;
        tx.rollback().await?;
        Ok(())
    }
}

fn rows_to_output(rows: &[PgRow]) -> Result<QueryOutput> {
    let columns: Vec<String> = rows
        .first()
        .map(|row| row.columns().iter().map(|c| c.name().to_string()).collect())
        .unwrap_or_default();

    let mut output_rows: Vec<Vec<Option<String>>> = Vec::with_capacity(rows.len());
    for row in rows {
        let mut values = Vec::with_capacity(columns.len());
        for idx in 0..row.columns().len() {
            values.push(decode_text(row, idx)?);
        }
        output_rows.push(values);
    }

    let rowcount = output_rows.len() as u64;
    Ok(QueryOutput {
        columns,
        rows: output_rows,
        rowcount,
    })
}

/// Renders a column value as text, trying the common Postgres types in turn.
/// Fixture tables in a dev environment stick to these; anything more exotic
/// surfaces as a database error rather than silently corrupting a dump.
fn decode_text(row: &PgRow, idx: usize) -> Result<Option<String>> {
    if let Ok(val) = row.try_get::<Option<String>, _>(idx) {
        return Ok(val);
    }
    if let Ok(val) = row.try_get::<Option<i64>, _>(idx) {
        return Ok(val.map(|v| v.to_string()));
    }
    if let Ok(val) = row.try_get::<Option<i32>, _>(idx) {
        return Ok(val.map(|v| v.to_string()));
    }
    if let Ok(val) = row.try_get::<Option<i16>, _>(idx) {
        return Ok(val.map(|v| v.to_string()));
    }
    if let Ok(val) = row.try_get::<Option<f64>, _>(idx) {
        return Ok(val.map(|v| v.to_string()));
    }
    if let Ok(val) = row.try_get::<Option<f32>, _>(idx) {
        return Ok(val.map(|v| v.to_string()));
    }
    if let Ok(val) = row.try_get::<Option<bool>, _>(idx) {
        return Ok(val.map(|v| v.to_string()));
    }
    if let Ok(val) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(idx) {
        return Ok(val.map(|v| v.to_rfc3339()));
    }
    if let Ok(val) = row.try_get::<Option<chrono::NaiveDateTime>, _>(idx) {
        return Ok(val.map(|v| v.to_string()));
    }
    if let Ok(val) = row.try_get::<Option<chrono::NaiveDate>, _>(idx) {
        return Ok(val.map(|v| v.to_string()));
    }
    if let Ok(val) = row.try_get::<Option<serde_json::Value>, _>(idx) {
        return Ok(val.map(|v| v.to_string()));
    }

    Err(AppError::Database(format!(
        "Unsupported data type for column {} ({})",
        idx,
        row.columns()
            .get(idx)
            .map(|c| c.name())
            .unwrap_or("unknown")
    )))
}
