use regex::Regex;
use sqlx::{Pool, Row, Sqlite, SqlitePool};
use std::collections::{HashMap, HashSet};
use tracing::{info, instrument};

use crate::error::AppError;

/// Differences between the live database and the target schema. Computed by
/// diffing `sqlite_master` against a pristine in-memory database built from
/// the target schema string.
#[derive(Debug, Default)]
pub struct SchemaDiff {
    pub new_tables: Vec<String>,
    pub removed_tables: Vec<String>,
    pub modified_tables: Vec<TableDiff>,
    pub new_indices: Vec<String>,
    pub removed_indices: Vec<String>,
    pub changed_indices: Vec<String>,
}

#[derive(Debug)]
pub struct TableDiff {
    pub name: String,
    pub added_columns: Vec<String>,
    pub removed_columns: Vec<String>,
}

impl SchemaDiff {
    pub fn is_empty(&self) -> bool {
        self.new_tables.is_empty()
            && self.removed_tables.is_empty()
            && self.modified_tables.is_empty()
            && self.new_indices.is_empty()
            && self.removed_indices.is_empty()
            && self.changed_indices.is_empty()
    }

    pub fn is_destructive(&self) -> bool {
        !self.removed_tables.is_empty()
            || !self.removed_indices.is_empty()
            || self
                .modified_tables
                .iter()
                .any(|t| !t.removed_columns.is_empty())
    }
}

#[instrument(skip(pool, target_schema))]
pub async fn get_schema_changes(
    pool: Pool<Sqlite>,
    target_schema: &str,
) -> Result<SchemaDiff, AppError> {
    let pristine = pristine_pool(target_schema).await?;

    let current_tables = get_tables(&pool).await?;
    let target_tables = get_tables(&pristine).await?;
    let current_indices = get_indices(&pool).await?;
    let target_indices = get_indices(&pristine).await?;

    let mut diff = SchemaDiff::default();

    for name in target_tables.keys() {
        if !current_tables.contains_key(name) {
            diff.new_tables.push(name.clone());
        }
    }

    for name in current_tables.keys() {
        if !target_tables.contains_key(name) {
            diff.removed_tables.push(name.clone());
        }
    }

    for (name, current_sql) in &current_tables {
        let Some(target_sql) = target_tables.get(name) else {
            continue;
        };
        if normalize_sql(current_sql) == normalize_sql(target_sql) {
            continue;
        }

        let current_columns: HashSet<String> =
            get_table_columns(&pool, name).await?.into_iter().collect();
        let target_columns: HashSet<String> = get_table_columns(&pristine, name)
            .await?
            .into_iter()
            .collect();

        diff.modified_tables.push(TableDiff {
            name: name.clone(),
            added_columns: target_columns
                .difference(&current_columns)
                .cloned()
                .collect(),
            removed_columns: current_columns
                .difference(&target_columns)
                .cloned()
                .collect(),
        });
    }

    for (name, target_sql) in &target_indices {
        match current_indices.get(name) {
            None => diff.new_indices.push(name.clone()),
            Some(current_sql) if normalize_sql(current_sql) != normalize_sql(target_sql) => {
                diff.changed_indices.push(name.clone());
            }
            Some(_) => {}
        }
    }

    for name in current_indices.keys() {
        if !target_indices.contains_key(name) {
            diff.removed_indices.push(name.clone());
        }
    }

    Ok(diff)
}

/// Bring the database in line with `target_schema`. Returns whether any
/// schema change was applied. Refuses destructive changes unless
/// `allow_deletions` is set.
#[instrument(skip(pool, target_schema))]
pub async fn migrate_database_declaratively(
    pool: Pool<Sqlite>,
    target_schema: &str,
    allow_deletions: bool,
) -> Result<bool, AppError> {
    info!("Starting declarative database migration");

    let diff = get_schema_changes(pool.clone(), target_schema).await?;

    if diff.is_empty() {
        info!("No schema changes needed");
        return Ok(false);
    }

    if diff.is_destructive() && !allow_deletions {
        return Err(AppError::Internal(format!(
            "Migration requires destructive changes (tables {:?}, indices {:?}, column removals {:?}), but allow_deletions=false",
            diff.removed_tables,
            diff.removed_indices,
            diff.modified_tables
                .iter()
                .filter(|t| !t.removed_columns.is_empty())
                .map(|t| t.name.clone())
                .collect::<Vec<_>>(),
        )));
    }

    let pristine = pristine_pool(target_schema).await?;
    let target_tables = get_tables(&pristine).await?;
    let target_indices = get_indices(&pristine).await?;

    let mut tx = pool.begin().await?;
    sqlx::query("PRAGMA defer_foreign_keys = TRUE")
        .execute(&mut *tx)
        .await?;

    let mut changes_made = 0u32;

    for name in &diff.new_tables {
        if let Some(sql) = target_tables.get(name) {
            info!("Database migration: create table {}", name);
            sqlx::query(sql).execute(&mut *tx).await?;
            changes_made += 1;
        }
    }

    for table in &diff.modified_tables {
        let Some(target_sql) = target_tables.get(&table.name) else {
            continue;
        };
        rebuild_table(&mut tx, &pristine, &table.name, target_sql).await?;
        changes_made += 1;
    }

    for name in &diff.removed_tables {
        info!("Database migration: drop table {}", name);
        sqlx::query(&format!("DROP TABLE {}", name))
            .execute(&mut *tx)
            .await?;
        changes_made += 1;
    }

    // Index state is re-read inside the transaction: rebuilding a table
    // implicitly drops its indices, and those need recreating even when the
    // original diff saw them as unchanged.
    let current_indices = get_indices(&mut *tx).await?;

    for (name, sql) in &current_indices {
        let keep = target_indices
            .get(name)
            .is_some_and(|target| normalize_sql(target) == normalize_sql(sql));
        if !keep {
            info!("Database migration: drop index {}", name);
            sqlx::query(&format!("DROP INDEX {}", name))
                .execute(&mut *tx)
                .await?;
            changes_made += 1;
        }
    }

    for (name, sql) in &target_indices {
        let exists = current_indices
            .get(name)
            .is_some_and(|current| normalize_sql(current) == normalize_sql(sql));
        if !exists {
            info!("Database migration: create index {}", name);
            sqlx::query(sql.as_str()).execute(&mut *tx).await?;
            changes_made += 1;
        }
    }

    tx.commit().await?;

    if changes_made > 0 {
        info!("Running VACUUM after migration");
        sqlx::query("VACUUM").execute(&pool).await?;
    }

    info!("Migration completed. Schema changes made: {}", changes_made);
    Ok(changes_made > 0)
}

/// Replace a table whose definition changed: create under a temporary name,
/// copy the columns both versions share, then swap.
async fn rebuild_table(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    pristine: &SqlitePool,
    table_name: &str,
    target_sql: &str,
) -> Result<(), AppError> {
    info!("Database migration: rebuild table {}", table_name);

    let temp_name = format!("{}_migration_new", table_name);
    let temp_sql = create_table_sql_with_name(target_sql, table_name, &temp_name);
    sqlx::query(&temp_sql).execute(&mut **tx).await?;

    let current_columns: HashSet<String> = get_table_columns(&mut **tx, table_name)
        .await?
        .into_iter()
        .collect();
    let target_columns: HashSet<String> = get_table_columns(pristine, table_name)
        .await?
        .into_iter()
        .collect();

    let common: Vec<&String> = current_columns.intersection(&target_columns).collect();
    if !common.is_empty() {
        let columns = common
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let copy_sql = format!(
            "INSERT INTO {} ({}) SELECT {} FROM {}",
            temp_name, columns, columns, table_name
        );
        sqlx::query(&copy_sql).execute(&mut **tx).await?;
    }

    sqlx::query(&format!("DROP TABLE {}", table_name))
        .execute(&mut **tx)
        .await?;
    sqlx::query(&format!(
        "ALTER TABLE {} RENAME TO {}",
        temp_name, table_name
    ))
    .execute(&mut **tx)
    .await?;

    Ok(())
}

fn create_table_sql_with_name(sql: &str, old_name: &str, new_name: &str) -> String {
    // sqlite_master keeps the original statement text, so the IF NOT EXISTS
    // spelling has to be handled alongside the plain one.
    let if_not_exists = format!("CREATE TABLE IF NOT EXISTS {}", old_name);
    let plain = format!("CREATE TABLE {}", old_name);
    let replacement = format!("CREATE TABLE {}", new_name);

    if sql.contains(&if_not_exists) {
        sql.replacen(&if_not_exists, &replacement, 1)
    } else {
        sql.replacen(&plain, &replacement, 1)
    }
}

async fn pristine_pool(target_schema: &str) -> Result<SqlitePool, AppError> {
    let pristine = SqlitePool::connect("sqlite::memory:").await?;
    if !target_schema.trim().is_empty() {
        sqlx::raw_sql(target_schema)
            .execute(&pristine)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to create pristine schema: {}", e)))?;
    }
    Ok(pristine)
}

async fn get_tables(
    executor: impl sqlx::Executor<'_, Database = Sqlite>,
) -> Result<HashMap<String, String>, AppError> {
    let rows = sqlx::query(
        "SELECT name, sql FROM sqlite_master WHERE type = 'table' AND name != 'sqlite_sequence'",
    )
    .fetch_all(executor)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| (row.get(0), row.get(1)))
        .collect())
}

async fn get_indices(
    executor: impl sqlx::Executor<'_, Database = Sqlite>,
) -> Result<HashMap<String, String>, AppError> {
    let rows =
        sqlx::query("SELECT name, sql FROM sqlite_master WHERE type = 'index' AND sql IS NOT NULL")
            .fetch_all(executor)
            .await?;

    Ok(rows
        .into_iter()
        .map(|row| (row.get(0), row.get(1)))
        .collect())
}

async fn get_table_columns(
    executor: impl sqlx::Executor<'_, Database = Sqlite>,
    table_name: &str,
) -> Result<Vec<String>, AppError> {
    let rows = sqlx::query(&format!("PRAGMA table_info({})", table_name))
        .fetch_all(executor)
        .await?;

    Ok(rows.into_iter().map(|row| row.get(1)).collect())
}

pub fn normalize_sql(sql: &str) -> String {
    // Remove comments
    let re = Regex::new(r"--[^\n]*\n").unwrap();
    let sql = re.replace_all(sql, "");

    // Normalize whitespace
    let re = Regex::new(r"\s+").unwrap();
    let sql = re.replace_all(&sql, " ");

    // Remove spaces around punctuation
    let re = Regex::new(r" *([(),]) *").unwrap();
    let sql = re.replace_all(&sql, "$1");

    // Remove unnecessary quotes from identifiers
    let re = Regex::new(r#""(\w+)""#).unwrap();
    let sql = re.replace_all(&sql, "$1");

    sql.trim().to_string()
}
