// devenvtool/src/store/mock.rs
//
// In-memory collaborator fakes for tests. The executor understands exactly
// the statement shapes the operators emit (DROP TABLE IF EXISTS, CREATE
// TABLE, INSERT INTO, SELECT * FROM) and supports scripted failures so
// rollback and abort paths can be exercised without a live database.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::errors::{AppError, Result};
use crate::store::{BlobStore, QueryExecutor, QueryOutput};

#[derive(Debug, Clone, Default)]
pub struct MockTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

#[derive(Debug, Default)]
struct MockDb {
    tables: BTreeMap<String, MockTable>,
    tx_backup: Option<BTreeMap<String, MockTable>>,
    executed: Vec<String>,
    fail_contains: Vec<(String, String)>,
    poison_param: Option<String>,
}

#[derive(Default)]
pub struct MockExecutor {
    db: Mutex<MockDb>,
}

impl MockExecutor {
    pub fn new() -> Self {
        MockExecutor::default()
    }

    pub fn with_table(self, name: &str, columns: &[&str], rows: Vec<Vec<Option<String>>>) -> Self {
        {
            let mut db = self.db.lock().unwrap();
            db.tables.insert(
                name.to_string(),
                MockTable {
                    columns: columns.iter().map(|c| c.to_string()).collect(),
                    rows,
                },
            );
        }
        self
    }

    /// Any statement containing `pattern` fails with a database error
    /// carrying `message`.
    pub fn fail_when(&self, pattern: &str, message: &str) {
        self.db
            .lock()
            .unwrap()
            .fail_contains
            .push((pattern.to_string(), message.to_string()));
    }

    /// Any bound parameter equal to `value` fails the statement, simulating
    /// a constraint violation on a specific row.
    pub fn poison_param(&self, value: &str) {
        self.db.lock().unwrap().poison_param = Some(value.to_string());
    }

    pub fn executed(&self) -> Vec<String> {
        self.db.lock().unwrap().executed.clone()
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.db.lock().unwrap().tables.contains_key(name)
    }

    pub fn table_rows(&self, name: &str) -> Option<Vec<Vec<Option<String>>>> {
        self.db
            .lock()
            .unwrap()
            .tables
            .get(name)
            .map(|t| t.rows.clone())
    }

}

fn strip_quotes(ident: &str) -> String {
    ident.trim().trim_matches('"').to_string()
}

/// First identifier after `prefix`, stopping at whitespace or '('.
fn ident_after(sql: &str, prefix_len: usize) -> String {
    let rest = sql[prefix_len..].trim_start();
    let end = rest
        .find(|c: char| c.is_whitespace() || c == '(' || c == ';')
        .unwrap_or(rest.len());
    strip_quotes(&rest[..end])
}

/// Column names from the first parenthesized group of a CREATE TABLE
/// statement, skipping table-level constraint clauses.
fn create_columns(sql: &str) -> Vec<String> {
    let open = match sql.find('(') {
        Some(i) => i,
        None => return Vec::new(),
    };
    let close = sql.rfind(')').unwrap_or(sql.len());
    let inner = &sql[open + 1..close];

    let mut columns = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    for c in inner.chars() {
        match c {
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if depth == 0 => {
                columns.push(current.clone());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    columns.push(current);

    columns
        .iter()
        .filter_map(|def| {
            let first = def.split_whitespace().next()?;
            let upper = first.to_uppercase();
            if matches!(
                upper.as_str(),
                "PRIMARY" | "FOREIGN" | "UNIQUE" | "CONSTRAINT" | "CHECK"
            ) {
                return None;
            }
            Some(strip_quotes(first))
        })
        .collect()
}

#[async_trait]
impl QueryExecutor for MockExecutor {
    async fn execute(&self, sql: &str, params: &[Option<String>]) -> Result<QueryOutput> {
        let mut db = self.db.lock().unwrap();
        db.executed.push(sql.to_string());

        for (pattern, message) in db.fail_contains.clone() {
            if sql.contains(&pattern) {
                return Err(AppError::Database(message));
            }
        }
        if let Some(poison) = db.poison_param.clone() {
            if params.iter().any(|p| p.as_deref() == Some(poison.as_str())) {
                return Err(AppError::Database(format!(
                    "duplicate key value violates unique constraint (value: {})",
                    poison
                )));
            }
        }

        let upper = sql.trim_start().to_uppercase();

        if upper.starts_with("DROP TABLE IF EXISTS") {
            let table = ident_after(sql.trim_start(), "DROP TABLE IF EXISTS".len());
            db.tables.remove(&table);
            return Ok(QueryOutput::default());
        }

        if upper.starts_with("CREATE TABLE") {
            let table = ident_after(sql.trim_start(), "CREATE TABLE".len());
            if db.tables.contains_key(&table) {
                return Err(AppError::Database(format!(
                    "relation \"{}\" already exists",
                    table
                )));
            }
            let columns = create_columns(sql);
            db.tables.insert(
                table,
                MockTable {
                    columns,
                    rows: Vec::new(),
                },
            );
            return Ok(QueryOutput::default());
        }

        if upper.starts_with("INSERT INTO") {
            let table = ident_after(sql.trim_start(), "INSERT INTO".len());
            if !db.tables.contains_key(&table) {
                return Err(AppError::Database(format!(
                    "relation \"{}\" does not exist",
                    table
                )));
            }
            let entry = db.tables.get_mut(&table).unwrap();
            entry.rows.push(params.to_vec());
            return Ok(QueryOutput {
                columns: Vec::new(),
                rows: Vec::new(),
                rowcount: 1,
            });
        }

        if upper.starts_with("SELECT * FROM") {
            let table = ident_after(sql.trim_start(), "SELECT * FROM".len());
            let entry = db.tables.get(&table).ok_or_else(|| {
                AppError::Database(format!("relation \"{}\" does not exist", table))
            })?;
            let rowcount = entry.rows.len() as u64;
            return Ok(QueryOutput {
                columns: entry.columns.clone(),
                rows: entry.rows.clone(),
                rowcount,
            });
        }

        Err(AppError::Database(format!(
            "MockExecutor does not understand statement: {}",
            sql
        )))
    }

    async fn begin(&self) -> Result<()> {
        let mut db = self.db.lock().unwrap();
        if db.tx_backup.is_some() {
            return Err(AppError::Database(
                "A transaction is already open".to_string(),
            ));
        }
        db.tx_backup = Some(db.tables.clone());
        Ok(())
    }

    async fn commit(&self) -> Result<()> {
        let mut db = self.db.lock().unwrap();
        db.tx_backup
            .take()
            .ok_or_else(|| AppError::Database("No open transaction to commit".to_string()))?;
        Ok(())
    }

    async fn rollback(&self) -> Result<()> {
        let mut db = self.db.lock().unwrap();
        let backup = db
            .tx_backup
            .take()
            .ok_or_else(|| AppError::Database("No open transaction to roll back".to_string()))?;
        db.tables = backup;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryBlobStore {
    buckets: Mutex<BTreeMap<String, BTreeMap<String, Vec<u8>>>>,
    fail_put_contains: Mutex<Option<(String, String)>>,
    fail_delete_contains: Mutex<Option<(String, String)>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        MemoryBlobStore::default()
    }

    pub fn with_bucket(self, name: &str) -> Self {
        self.buckets
            .lock()
            .unwrap()
            .insert(name.to_string(), BTreeMap::new());
        self
    }

    pub fn with_object(self, bucket: &str, key: &str, bytes: &[u8]) -> Self {
        {
            let mut buckets = self.buckets.lock().unwrap();
            buckets
                .entry(bucket.to_string())
                .or_default()
                .insert(key.to_string(), bytes.to_vec());
        }
        self
    }

    /// Puts whose key contains `pattern` fail with a storage error.
    pub fn fail_put_when(&self, pattern: &str, message: &str) {
        *self.fail_put_contains.lock().unwrap() =
            Some((pattern.to_string(), message.to_string()));
    }

    /// Deletes whose key contains `pattern` fail with a storage error.
    pub fn fail_delete_when(&self, pattern: &str, message: &str) {
        *self.fail_delete_contains.lock().unwrap() =
            Some((pattern.to_string(), message.to_string()));
    }

    pub fn clear_failures(&self) {
        *self.fail_put_contains.lock().unwrap() = None;
        *self.fail_delete_contains.lock().unwrap() = None;
    }

    pub fn objects(&self, bucket: &str) -> BTreeMap<String, Vec<u8>> {
        self.buckets
            .lock()
            .unwrap()
            .get(bucket)
            .cloned()
            .unwrap_or_default()
    }

    pub fn bucket_names(&self) -> Vec<String> {
        self.buckets.lock().unwrap().keys().cloned().collect()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> Result<()> {
        if let Some((pattern, message)) = self.fail_put_contains.lock().unwrap().clone() {
            if key.contains(&pattern) {
                return Err(AppError::Storage(message));
            }
        }
        let mut buckets = self.buckets.lock().unwrap();
        let objects = buckets
            .get_mut(bucket)
            .ok_or_else(|| AppError::Storage(format!("NoSuchBucket: {}", bucket)))?;
        objects.insert(key.to_string(), bytes);
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let buckets = self.buckets.lock().unwrap();
        buckets
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("s3://{}/{}", bucket, key)))
    }

    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>> {
        let buckets = self.buckets.lock().unwrap();
        let objects = buckets
            .get(bucket)
            .ok_or_else(|| AppError::Storage(format!("NoSuchBucket: {}", bucket)))?;
        Ok(objects
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<()> {
        if let Some((pattern, message)) = self.fail_delete_contains.lock().unwrap().clone() {
            if key.contains(&pattern) {
                return Err(AppError::Storage(message));
            }
        }
        let mut buckets = self.buckets.lock().unwrap();
        let objects = buckets
            .get_mut(bucket)
            .ok_or_else(|| AppError::Storage(format!("NoSuchBucket: {}", bucket)))?;
        objects.remove(key);
        Ok(())
    }

    async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        Ok(self.buckets.lock().unwrap().contains_key(bucket))
    }

    async fn create_bucket(&self, bucket: &str) -> Result<()> {
        let mut buckets = self.buckets.lock().unwrap();
        if buckets.contains_key(bucket) {
            return Err(AppError::Storage(format!(
                "BucketAlreadyOwnedByYou: {}",
                bucket
            )));
        }
        buckets.insert(bucket.to_string(), BTreeMap::new());
        Ok(())
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<()> {
        let mut buckets = self.buckets.lock().unwrap();
        match buckets.get(bucket) {
            None => Err(AppError::Storage(format!("NoSuchBucket: {}", bucket))),
            Some(objects) if !objects.is_empty() => Err(AppError::Storage(format!(
                "BucketNotEmpty: {}",
                bucket
            ))),
            Some(_) => {
                buckets.remove(bucket);
                Ok(())
            }
        }
    }
}
