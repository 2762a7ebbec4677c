// devenvtool/src/registry/mod.rs
//
// Static catalog of the tables and buckets this tool manages. Loaded once at
// startup from a JSON registry file and passed around read-only; table order
// is resolved to dependency order (foreign-key predecessors first) at load
// time, so callers never re-sort.

use regex::Regex;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{AppError, Result};

#[derive(Debug, Clone)]
pub struct TableSpec {
    pub name: String,
    pub create_sql: String,
    /// Tables this one references, declared and/or parsed from create_sql.
    pub depends_on: Vec<String>,
    /// Optional seed fixture file, resolved against the data directory.
    pub seed: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BucketSpec {
    pub name: String,
    pub purpose: String,
}

#[derive(Debug, Clone, Deserialize)]
struct RawTableSpec {
    name: String,
    create_sql: String,
    #[serde(default)]
    depends_on: Vec<String>,
    seed: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    tables: Vec<RawTableSpec>,
    #[serde(default)]
    buckets: Vec<BucketSpec>,
}

#[derive(Debug, Clone)]
pub struct Registry {
    tables: Vec<TableSpec>,
    buckets: Vec<BucketSpec>,
}

impl Registry {
    pub fn load(registry_path: &Path, data_dir: &Path) -> Result<Self> {
        let content = fs::read_to_string(registry_path).map_err(|e| {
            AppError::Config(format!(
                "Failed to read registry file {}: {}",
                registry_path.display(),
                e
            ))
        })?;
        let file: RegistryFile = serde_json::from_str(&content).map_err(|e| {
            AppError::Config(format!(
                "Failed to parse registry file {}: {}",
                registry_path.display(),
                e
            ))
        })?;
        Registry::from_file(file, data_dir)
    }

    fn from_file(file: RegistryFile, data_dir: &Path) -> Result<Self> {
        let mut specs: Vec<TableSpec> = Vec::with_capacity(file.tables.len());
        let mut seen: HashSet<String> = HashSet::new();

        for raw in file.tables {
            if !seen.insert(raw.name.clone()) {
                return Err(AppError::Config(format!(
                    "Table '{}' is defined more than once in the registry",
                    raw.name
                )));
            }

            // Merge declared dependencies with REFERENCES clauses from the DDL
            let mut depends_on = raw.depends_on;
            for parsed in parse_references(&raw.create_sql, &raw.name) {
                if !depends_on.contains(&parsed) {
                    depends_on.push(parsed);
                }
            }

            specs.push(TableSpec {
                name: raw.name,
                create_sql: raw.create_sql,
                depends_on,
                seed: raw.seed.map(|p| data_dir.join(p)),
            });
        }

        // Every dependency must name a registered table
        for spec in &specs {
            for dep in &spec.depends_on {
                if !seen.contains(dep) {
                    return Err(AppError::Config(format!(
                        "Table '{}' depends on '{}', which is not defined in the registry",
                        spec.name, dep
                    )));
                }
            }
        }

        let order = topological_sort(&specs)?;
        let mut by_name: HashMap<String, TableSpec> =
            specs.into_iter().map(|s| (s.name.clone(), s)).collect();
        let tables = order
            .into_iter()
            .map(|name| by_name.remove(&name).expect("sorted name came from specs"))
            .collect();

        let mut bucket_names: HashSet<String> = HashSet::new();
        for bucket in &file.buckets {
            if !bucket_names.insert(bucket.name.clone()) {
                return Err(AppError::Config(format!(
                    "Bucket '{}' is defined more than once in the registry",
                    bucket.name
                )));
            }
        }

        Ok(Registry {
            tables,
            buckets: file.buckets,
        })
    }

    /// Test constructor; `tables` must already be in dependency order.
    #[cfg(test)]
    pub(crate) fn from_specs(tables: Vec<TableSpec>, buckets: Vec<BucketSpec>) -> Self {
        Registry { tables, buckets }
    }

    /// Tables in dependency order: a table never precedes its dependencies.
    pub fn tables(&self) -> &[TableSpec] {
        &self.tables
    }

    /// Drop order is the reverse of create order.
    pub fn tables_reverse(&self) -> Vec<&TableSpec> {
        self.tables.iter().rev().collect()
    }

    pub fn buckets(&self) -> &[BucketSpec] {
        &self.buckets
    }

    pub fn table(&self, name: &str) -> Option<&TableSpec> {
        self.tables.iter().find(|t| t.name == name)
    }
}

/// Extract referenced tables from REFERENCES clauses in a CREATE TABLE
/// statement. Handles quoted and unquoted identifiers, with or without a
/// column list after the table (PostgreSQL defaults to the primary key);
/// self-references are excluded and the result is deduplicated in
/// first-seen order.
pub fn parse_references(create_sql: &str, table_name: &str) -> Vec<String> {
    // The leading [^"\w] keeps a quoted "references" column name from
    // matching as a keyword.
    let pattern =
        Regex::new(r#"(?i)(?:^|[^"\w])REFERENCES\s+(?:"([^"]+)"|([A-Za-z_][A-Za-z0-9_]*))"#)
            .expect("REFERENCES pattern is valid");

    let mut seen: HashSet<String> = HashSet::new();
    let mut result: Vec<String> = Vec::new();

    for caps in pattern.captures_iter(create_sql) {
        let referenced = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str().to_string())
            .expect("one alternative always matches");

        if referenced == table_name {
            continue;
        }
        if seen.insert(referenced.clone()) {
            result.push(referenced);
        }
    }

    result
}

/// Kahn's algorithm over the declared dependency edges. Ties are broken by
/// registry file order so the resulting plan is deterministic. A cycle is a
/// configuration error.
fn topological_sort(specs: &[TableSpec]) -> Result<Vec<String>> {
    let positions: HashMap<&str, usize> = specs
        .iter()
        .enumerate()
        .map(|(i, s)| (s.name.as_str(), i))
        .collect();

    let mut in_degree: Vec<usize> = specs.iter().map(|s| s.depends_on.len()).collect();
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); specs.len()];
    for (i, spec) in specs.iter().enumerate() {
        for dep in &spec.depends_on {
            let dep_idx = positions[dep.as_str()];
            dependents[dep_idx].push(i);
        }
    }

    let mut ready: Vec<usize> = (0..specs.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut result: Vec<String> = Vec::with_capacity(specs.len());

    while let Some(&next) = ready.iter().min() {
        ready.retain(|&i| i != next);
        result.push(specs[next].name.clone());

        for &dependent in &dependents[next] {
            in_degree[dependent] -= 1;
            if in_degree[dependent] == 0 {
                ready.push(dependent);
            }
        }
    }

    if result.len() != specs.len() {
        let unresolved: Vec<&str> = specs
            .iter()
            .filter(|s| !result.contains(&s.name))
            .map(|s| s.name.as_str())
            .collect();
        return Err(AppError::Config(format!(
            "Cycle detected in table dependency graph, unresolved tables: {}",
            unresolved.join(", ")
        )));
    }

    Ok(result)
}

/// Quote a PostgreSQL identifier if needed (digit prefix, uppercase, or
/// characters outside alphanumerics/underscore).
pub fn quote_identifier(identifier: &str) -> String {
    if identifier.starts_with('"') && identifier.ends_with('"') && identifier.len() >= 2 {
        return identifier.to_string();
    }

    let needs_quote = identifier
        .chars()
        .next()
        .map(|c| c.is_ascii_digit())
        .unwrap_or(false)
        || identifier.chars().any(|c| c.is_ascii_uppercase())
        || !identifier
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');

    if needs_quote {
        format!("\"{}\"", identifier.replace('"', "\"\""))
    } else {
        identifier.to_string()
    }
}
