pub mod comments;
pub mod followers;
pub mod media;
pub mod models;
pub mod posts;
pub mod users;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::config::DatabaseConfig;
use crate::error::{DbError, DbResult};
use crate::schema::Schema;

pub type DbPool = Pool<SqliteConnectionManager>;

fn configure_connection(conn: &mut Connection, busy_timeout: Duration) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        PRAGMA foreign_keys = ON;
        PRAGMA synchronous = NORMAL;
        ",
    )?;
    conn.busy_timeout(busy_timeout)
}

pub fn create_pool(db_path: &Path, config: &DatabaseConfig) -> anyhow::Result<DbPool> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Foreign keys are a per-connection setting, so every pooled connection
    // gets the pragmas, not just the first one.
    let busy_timeout = Duration::from_millis(config.busy_timeout_ms);
    let manager = SqliteConnectionManager::file(db_path)
        .with_init(move |conn| configure_connection(conn, busy_timeout));
    let pool = Pool::builder()
        .max_size(config.max_connections)
        .build(manager)?;

    let conn = pool.get()?;
    conn.execute_batch("PRAGMA journal_mode = WAL;")?;

    Ok(pool)
}

/// Single-connection pool over a private in-memory database.
pub fn create_memory_pool() -> anyhow::Result<DbPool> {
    let manager = SqliteConnectionManager::memory()
        .with_init(|conn| configure_connection(conn, Duration::from_secs(5)));
    Ok(Pool::builder().max_size(1).build(manager)?)
}

/// Migrations rendered from the schema description, in apply order.
pub fn migrations(schema: &Schema) -> Vec<(&'static str, String)> {
    vec![
        ("001_tables", schema.create_statements().join("\n")),
        ("002_indexes", schema.index_statements().join("\n")),
    ]
}

pub fn run_migrations(pool: &DbPool, schema: &Schema) -> anyhow::Result<()> {
    let conn = pool.get()?;

    // Create migrations tracking table
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            name TEXT PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    for (name, sql) in migrations(schema) {
        let already_applied: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM schema_version WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )?;

        if !already_applied {
            tracing::info!("Applying migration: {}", name);
            conn.execute_batch(&sql)?;
            conn.execute(
                "INSERT INTO schema_version (name) VALUES (?1)",
                params![name],
            )?;
        }
    }

    tracing::info!("Database migrations complete");
    Ok(())
}

/// Handle through which callers read and write records.
///
/// Cheap to clone; clones share the pool and the schema.
#[derive(Clone)]
pub struct Store {
    pool: DbPool,
    schema: Arc<Schema>,
}

impl Store {
    pub fn new(pool: DbPool, schema: Schema) -> Self {
        Self {
            pool,
            schema: Arc::new(schema),
        }
    }

    /// Open a migrated store over a fresh in-memory database.
    pub fn open_in_memory() -> anyhow::Result<Self> {
        let pool = create_memory_pool()?;
        let schema = Schema::social();
        run_migrations(&pool, &schema)?;
        Ok(Self::new(pool, schema))
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Validate a string column of `table` against the schema.
    fn check_text(&self, table: &str, column: &str, value: Option<&str>) -> DbResult<()> {
        match self.schema.table(table) {
            Some(t) => t.check_text(column, value),
            None => Ok(()),
        }
    }

    /// Row counts for every table, in schema order.
    pub fn row_counts(&self) -> DbResult<Vec<(&'static str, i64)>> {
        let conn = self.pool.get()?;
        self.schema
            .tables
            .iter()
            .map(|t| {
                let count = conn.query_row(
                    &format!("SELECT COUNT(*) FROM \"{}\"", t.name),
                    [],
                    |row| row.get(0),
                )?;
                Ok((t.name, count))
            })
            .collect()
    }
}

/// Open a write transaction that holds the write lock from the start.
///
/// Reads inside it (foreign key checks, dependent scans) stay valid until
/// commit, and contention waits out `busy_timeout` instead of failing.
pub(crate) fn begin_write(conn: &mut Connection) -> rusqlite::Result<Transaction<'_>> {
    conn.transaction_with_behavior(TransactionBehavior::Immediate)
}

/// Fail with `ReferentialIntegrity` unless `table` has a row with this id.
pub(crate) fn ensure_exists(
    conn: &Connection,
    table: &'static str,
    referencing: &'static str,
    column: &'static str,
    id: i64,
) -> DbResult<()> {
    let found = conn
        .query_row(
            &format!("SELECT 1 FROM \"{}\" WHERE id = ?1", table),
            params![id],
            |_| Ok(()),
        )
        .optional()?;

    match found {
        Some(()) => Ok(()),
        None => Err(DbError::ReferentialIntegrity {
            table: referencing,
            column,
            id,
        }),
    }
}
