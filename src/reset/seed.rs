// devenvtool/src/reset/seed.rs
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::errors::{AppError, Result};
use crate::registry::{TableSpec, quote_identifier};
use crate::store::QueryExecutor;

/// Ordered fixture rows for one table: column names plus nullable text
/// values. The same shape is used for snapshot row dumps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeedBatch {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl SeedBatch {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!(
                "Failed to read seed fixture {}: {}",
                path.display(),
                e
            ))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            AppError::Config(format!(
                "Failed to parse seed fixture {}: {}",
                path.display(),
                e
            ))
        })
    }
}

/// Loads fixture rows into tables. Each table is seeded inside its own
/// transaction: a row failure rolls the whole table back, so a table is
/// either fully seeded or left empty, and other tables are unaffected.
pub struct SeedLoader {
    executor: Arc<dyn QueryExecutor>,
}

impl SeedLoader {
    pub fn new(executor: Arc<dyn QueryExecutor>) -> Self {
        SeedLoader { executor }
    }

    /// Seeds one table from its fixture file. Tables without a seed source
    /// are a no-op. Returns the number of rows inserted.
    pub async fn seed(&self, table: &TableSpec) -> Result<usize> {
        let Some(path) = &table.seed else {
            return Ok(0);
        };
        let batch = SeedBatch::load(path)?;
        self.insert_rows(&table.name, &batch.columns, &batch.rows)
            .await
    }

    /// Bulk insert in row order inside a single transaction. Also the
    /// insert path snapshot restore replays row dumps through.
    pub async fn insert_rows(
        &self,
        table: &str,
        columns: &[String],
        rows: &[Vec<Option<String>>],
    ) -> Result<usize> {
        if rows.is_empty() {
            return Ok(0);
        }

        for (idx, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(AppError::Seed {
                    table: table.to_string(),
                    row_index: idx,
                    message: format!(
                        "row has {} values but {} columns are declared",
                        row.len(),
                        columns.len()
                    ),
                });
            }
        }

        let column_list = columns
            .iter()
            .map(|c| quote_identifier(c))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=columns.len())
            .map(|i| format!("${}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_identifier(table),
            column_list,
            placeholders
        );

        self.executor.begin().await?;
        for (idx, row) in rows.iter().enumerate() {
            if let Err(e) = self.executor.execute(&sql, row).await {
                // Best effort: the transaction is already doomed
                let _ = self.executor.rollback().await;
                return Err(AppError::Seed {
                    table: table.to_string(),
                    row_index: idx,
                    message: e.to_string(),
                });
            }
        }
        self.executor.commit().await?;

        println!("🌱 Seeded {} rows into {}", rows.len(), table);
        Ok(rows.len())
    }
}
