//! Database Connection Pool Module
//!
//! PostgreSQL durable tier over a deadpool-postgres connection pool.
//!
//! One table holds one row per note. `seq` records insertion order so full
//! scans come back in the order notes were migrated; `id` is the primary key
//! so re-inserting a migrated note is skipped.

use std::time::Duration;

use async_trait::async_trait;
use deadpool_postgres::{Config, ManagerConfig, Pool, RecyclingMethod, Runtime};
use tiernote_core::{NoteError, NoteRecord, NoteResult};
use tiernote_storage::DurableTier;
use tokio_postgres::NoTls;
use tracing::{debug, info};

use crate::config::{parse_var, process_env, string_var};
use crate::error::{ApiError, ApiResult};

/// Table used when none is configured.
pub const DEFAULT_TABLE: &str = "assignment_siddhartha";

// ============================================================================
// CONNECTION POOL CONFIGURATION
// ============================================================================

/// Database connection pool configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// PostgreSQL host
    pub host: String,
    /// PostgreSQL port
    pub port: u16,
    /// Database name
    pub dbname: String,
    /// Database user
    pub user: String,
    /// Database password
    pub password: String,
    /// Maximum pool size
    pub max_size: usize,
    /// Wait/create/recycle timeout for pooled connections
    pub timeout: Duration,
    /// Table holding durable notes
    pub table: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "tiernote".to_string(),
            user: "postgres".to_string(),
            password: "".to_string(),
            max_size: 16,
            timeout: Duration::from_secs(30),
            table: DEFAULT_TABLE.to_string(),
        }
    }
}

impl DbConfig {
    /// Create a new database configuration from `TIERNOTE_DB_*` variables.
    pub fn from_env() -> ApiResult<Self> {
        Self::from_lookup(process_env)
    }

    pub fn from_lookup<F>(lookup: F) -> ApiResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let table = string_var(&lookup, "TIERNOTE_DB_TABLE", &defaults.table);
        validate_table_name(&table)?;

        Ok(Self {
            host: string_var(&lookup, "TIERNOTE_DB_HOST", &defaults.host),
            port: parse_var(&lookup, "TIERNOTE_DB_PORT", defaults.port)?,
            dbname: string_var(&lookup, "TIERNOTE_DB_NAME", &defaults.dbname),
            user: string_var(&lookup, "TIERNOTE_DB_USER", &defaults.user),
            password: lookup("TIERNOTE_DB_PASSWORD").unwrap_or_default(),
            max_size: parse_var(&lookup, "TIERNOTE_DB_POOL_SIZE", defaults.max_size)?,
            timeout: Duration::from_secs(parse_var(
                &lookup,
                "TIERNOTE_DB_TIMEOUT",
                defaults.timeout.as_secs(),
            )?),
            table,
        })
    }

    /// Create a connection pool from this configuration.
    pub fn create_pool(&self) -> ApiResult<Pool> {
        let mut cfg = Config::new();
        cfg.host = Some(self.host.clone());
        cfg.port = Some(self.port);
        cfg.dbname = Some(self.dbname.clone());
        cfg.user = Some(self.user.clone());
        cfg.password = Some(self.password.clone());

        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        let mut pool_cfg = deadpool_postgres::PoolConfig::new(self.max_size);
        pool_cfg.timeouts.wait = Some(self.timeout);
        pool_cfg.timeouts.create = Some(self.timeout);
        pool_cfg.timeouts.recycle = Some(self.timeout);
        cfg.pool = Some(pool_cfg);

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| ApiError::database_error(format!("Failed to create pool: {}", e)))?;

        Ok(pool)
    }
}

/// The table name is interpolated into SQL, so only plain identifiers pass.
fn validate_table_name(table: &str) -> ApiResult<()> {
    let mut chars = table.chars();
    let valid_start = chars
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false);
    if valid_start && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') && table.len() <= 63 {
        Ok(())
    } else {
        Err(ApiError::invalid_input(format!(
            "Invalid value for TIERNOTE_DB_TABLE: {:?} is not a plain identifier",
            table
        )))
    }
}

fn durable_error(context: &str, err: impl std::fmt::Display) -> NoteError {
    NoteError::durable_unavailable(format!("{}: {}", context, err))
}

// ============================================================================
// POSTGRES DURABLE TIER
// ============================================================================

/// Durable tier storing one row per note.
#[derive(Clone)]
pub struct PgDurableTier {
    pool: Pool,
    table: String,
}

impl PgDurableTier {
    pub fn new(pool: Pool, table: impl Into<String>) -> ApiResult<Self> {
        let table = table.into();
        validate_table_name(&table)?;
        Ok(Self { pool, table })
    }

    pub fn from_config(config: &DbConfig) -> ApiResult<Self> {
        Self::new(config.create_pool()?, config.table.clone())
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Get the current pool size for observability.
    pub fn pool_size(&self) -> usize {
        self.pool.status().size
    }

    /// Create the notes table if it does not exist yet.
    pub async fn ensure_schema(&self) -> ApiResult<()> {
        let conn = self.pool.get().await?;
        conn.batch_execute(&format!(
            "CREATE TABLE IF NOT EXISTS \"{table}\" (
                seq BIGSERIAL,
                id TEXT PRIMARY KEY,
                text TEXT NOT NULL,
                completed BOOLEAN NOT NULL DEFAULT FALSE,
                created_at TIMESTAMPTZ NOT NULL
            );
            CREATE INDEX IF NOT EXISTS \"{table}_seq_idx\" ON \"{table}\" (seq);",
            table = self.table
        ))
        .await?;
        info!(table = %self.table, "Durable tier schema ready");
        Ok(())
    }

    /// Stop handing out connections and drop idle ones.
    pub fn close(&self) {
        self.pool.close();
    }

    async fn get_conn(&self) -> NoteResult<deadpool_postgres::Object> {
        self.pool
            .get()
            .await
            .map_err(|e| durable_error("connection pool", e))
    }
}

#[async_trait]
impl DurableTier for PgDurableTier {
    async fn scan_all(&self) -> NoteResult<Vec<NoteRecord>> {
        let conn = self.get_conn().await?;
        let rows = conn
            .query(
                &format!(
                    "SELECT id, text, completed, created_at FROM \"{}\" ORDER BY seq",
                    self.table
                ),
                &[],
            )
            .await
            .map_err(|e| durable_error("scan", e))?;

        rows.iter()
            .map(|row| {
                Ok(NoteRecord {
                    id: row.try_get(0).map_err(|e| durable_error("decode id", e))?,
                    text: row.try_get(1).map_err(|e| durable_error("decode text", e))?,
                    completed: row
                        .try_get(2)
                        .map_err(|e| durable_error("decode completed", e))?,
                    created_at: row
                        .try_get(3)
                        .map_err(|e| durable_error("decode created_at", e))?,
                })
            })
            .collect()
    }

    async fn insert_many(&self, records: &[NoteRecord]) -> NoteResult<()> {
        if records.is_empty() {
            return Ok(());
        }

        let mut conn = self.get_conn().await?;
        let tx = conn
            .transaction()
            .await
            .map_err(|e| durable_error("begin", e))?;
        let stmt = tx
            .prepare_cached(&format!(
                "INSERT INTO \"{}\" (id, text, completed, created_at) VALUES ($1, $2, $3, $4)
                 ON CONFLICT (id) DO NOTHING",
                self.table
            ))
            .await
            .map_err(|e| durable_error("prepare insert", e))?;

        let mut inserted = 0u64;
        for record in records {
            inserted += tx
                .execute(
                    &stmt,
                    &[&record.id, &record.text, &record.completed, &record.created_at],
                )
                .await
                .map_err(|e| durable_error("insert", e))?;
        }
        tx.commit().await.map_err(|e| durable_error("commit", e))?;

        debug!(
            requested = records.len(),
            inserted = inserted,
            "Inserted notes into durable tier"
        );
        Ok(())
    }

    async fn delete_by_id(&self, id: &str) -> NoteResult<()> {
        let conn = self.get_conn().await?;
        let deleted = conn
            .execute(
                &format!("DELETE FROM \"{}\" WHERE id = $1", self.table),
                &[&id],
            )
            .await
            .map_err(|e| durable_error("delete", e))?;
        debug!(id = %id, deleted = deleted, "Durable delete");
        Ok(())
    }

    async fn ping(&self) -> NoteResult<()> {
        let conn = self.get_conn().await?;
        conn.simple_query("SELECT 1")
            .await
            .map_err(|e| durable_error("ping", e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_db_config_defaults() {
        let config = DbConfig::from_lookup(env(&[])).unwrap();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 5432);
        assert_eq!(config.table, "assignment_siddhartha");
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_db_config_rejects_bad_values() {
        assert!(DbConfig::from_lookup(env(&[("TIERNOTE_DB_PORT", "x")])).is_err());
        assert!(DbConfig::from_lookup(env(&[("TIERNOTE_DB_TABLE", "notes; drop")])).is_err());
        assert!(DbConfig::from_lookup(env(&[("TIERNOTE_DB_TABLE", "1notes")])).is_err());
        assert!(DbConfig::from_lookup(env(&[("TIERNOTE_DB_TABLE", "my_notes_2")])).is_ok());
    }

    #[tokio::test]
    async fn test_pool_creation_is_lazy() {
        // Building the pool does not connect; the first checkout does.
        let tier = PgDurableTier::from_config(&DbConfig::default()).unwrap();
        assert_eq!(tier.table(), DEFAULT_TABLE);
        assert_eq!(tier.pool_size(), 0);
    }
}
