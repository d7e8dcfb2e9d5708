use deadpool_postgres::Pool;
use tiernote_api::{DbConfig, PgDurableTier};
use tiernote_core::new_note_id;

/// A durable tier over its own freshly named table, so tests never share rows.
pub struct TestTable {
    pub pool: Pool,
    pub tier: PgDurableTier,
}

impl TestTable {
    pub fn new() -> Self {
        let config = DbConfig::from_env().expect("Invalid TIERNOTE_DB_* configuration");
        let pool = config.create_pool().expect("Failed to create database pool");
        let table = format!("tiernote_test_{}", new_note_id().replace('-', "_"));
        let tier = PgDurableTier::new(pool.clone(), table).expect("Invalid test table name");
        Self { pool, tier }
    }

    pub async fn drop_table(&self) {
        let conn = self.pool.get().await.expect("Failed to get connection");
        conn.batch_execute(&format!("DROP TABLE IF EXISTS \"{}\"", self.tier.table()))
            .await
            .expect("Failed to drop test table");
    }
}
