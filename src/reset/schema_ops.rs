// devenvtool/src/reset/schema_ops.rs
use std::sync::Arc;

use crate::errors::{AppError, Result};
use crate::registry::{TableSpec, quote_identifier};
use crate::store::QueryExecutor;

/// Creates and drops registered tables through the query executor. DDL is
/// not transactional here; a failure aborts the remaining statements and the
/// partial state is left for the operator to inspect.
pub struct SchemaOperator {
    executor: Arc<dyn QueryExecutor>,
}

impl SchemaOperator {
    pub fn new(executor: Arc<dyn QueryExecutor>) -> Self {
        SchemaOperator { executor }
    }

    /// Drops tables in reverse dependency order. Missing tables are fine
    /// (the drop is idempotent); any other database error aborts the
    /// remaining drops.
    pub async fn drop_all(&self, tables: &[TableSpec]) -> Result<()> {
        for table in tables.iter().rev() {
            self.drop_table(&table.name).await?;
        }
        Ok(())
    }

    pub async fn drop_table(&self, table: &str) -> Result<()> {
        let sql = format!("DROP TABLE IF EXISTS {} CASCADE", quote_identifier(table));
        match self.executor.execute(&sql, &[]).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_missing_relation() => Ok(()),
            Err(e) => Err(AppError::Schema {
                table: table.to_string(),
                message: e.to_string(),
            }),
        }
    }

    /// Creates tables in dependency order, aborting on the first failure.
    pub async fn create_all(&self, tables: &[TableSpec]) -> Result<()> {
        for table in tables {
            self.create_table(table).await?;
        }
        Ok(())
    }

    pub async fn create_table(&self, table: &TableSpec) -> Result<()> {
        println!("🛠 Creating table {}", table.name);
        self.executor
            .execute(&table.create_sql, &[])
            .await
            .map_err(|e| AppError::Schema {
                table: table.name.clone(),
                message: e.to_string(),
            })?;
        Ok(())
    }
}
