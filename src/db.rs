// ============================================================================
// src/db.rs - PostgreSQL pool and table namespace
// ============================================================================
use anyhow::{anyhow, Result};
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use tokio_postgres::{Config as PgConfig, NoTls};

/// Build a connection pool from a postgres:// URL.
pub fn build_pool(conn_string: &str, max_size: usize) -> Result<Pool> {
    let cfg: PgConfig = conn_string
        .parse()
        .map_err(|e| anyhow!("invalid pg conn string: {e}"))?;
    let mgr = Manager::from_config(
        cfg,
        NoTls,
        ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        },
    );
    Pool::builder(mgr)
        .max_size(max_size.max(1))
        .build()
        .map_err(|e| anyhow!("pool build failed: {e}"))
}

/// The schema all tables live in, resolved once at startup.
///
/// Local installs keep the tables in a `claims` schema; hosted deployments
/// only have `public`. Queries qualify table names with this value instead
/// of relying on a per-connection search_path, which a pool cannot
/// guarantee.
#[derive(Debug, Clone)]
pub struct TableNamespace(String);

impl TableNamespace {
    pub fn new(schema: impl Into<String>) -> Self {
        Self(schema.into())
    }

    /// Probe for the `claims` schema, falling back to `public`.
    pub async fn detect(pool: &Pool) -> Result<Self> {
        let client = pool.get().await?;
        let rows = client
            .query(
                "SELECT schema_name FROM information_schema.schemata WHERE schema_name = 'claims'",
                &[],
            )
            .await?;
        let schema = if rows.is_empty() { "public" } else { "claims" };
        tracing::info!("📦 Using schema: {}", schema);
        Ok(Self(schema.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn table(&self, name: &str) -> String {
        format!("{}.{}", self.0, name)
    }
}

/// Connectivity check used by `db test`.
pub async fn test_connection(pool: &Pool) -> Result<()> {
    let client = pool.get().await?;
    client.query_one("SELECT 1", &[]).await?;
    Ok(())
}

/// Create the inventory/spaces tables if they do not exist.
pub async fn ensure_schema(pool: &Pool, ns: &TableNamespace) -> Result<()> {
    let client = pool.get().await?;
    client.batch_execute(&schema_sql(ns)).await?;
    Ok(())
}

pub fn schema_sql(ns: &TableNamespace) -> String {
    let mut s = String::new();

    s.push_str(&format!(
        "CREATE TABLE IF NOT EXISTS {} (\n\
         id BIGSERIAL PRIMARY KEY,\n\
         line_number BIGINT NOT NULL UNIQUE,\n\
         client_id TEXT,\n\
         room_area TEXT,\n\
         quantity DOUBLE PRECISION,\n\
         description TEXT,\n\
         brand TEXT,\n\
         model TEXT,\n\
         unit_rcv DOUBLE PRECISION,\n\
         edited_unit_rcv DOUBLE PRECISION,\n\
         extended_rcv DOUBLE PRECISION,\n\
         acv_percent DOUBLE PRECISION,\n\
         acv DOUBLE PRECISION,\n\
         source_link TEXT,\n\
         notes TEXT,\n\
         status SMALLINT NOT NULL DEFAULT 1,\n\
         last_edit_date TIMESTAMPTZ\n\
        );\n\
        CREATE INDEX IF NOT EXISTS idx_inventory_items_client ON {}(client_id);\n\
        CREATE INDEX IF NOT EXISTS idx_inventory_items_status ON {}(status);\n\n",
        ns.table("inventory_items"),
        ns.table("inventory_items"),
        ns.table("inventory_items"),
    ));

    s.push_str(&format!(
        "CREATE TABLE IF NOT EXISTS {} (\n\
         edit_id BIGSERIAL PRIMARY KEY,\n\
         item_id BIGINT NOT NULL,\n\
         field_name TEXT NOT NULL,\n\
         old_value TEXT,\n\
         new_value TEXT,\n\
         edited_by TEXT,\n\
         edited_at TIMESTAMPTZ NOT NULL DEFAULT now()\n\
        );\n\
        CREATE INDEX IF NOT EXISTS idx_inventory_edits_item ON {}(item_id, edited_at DESC);\n\n",
        ns.table("inventory_edits"),
        ns.table("inventory_edits"),
    ));

    s.push_str(&format!(
        "CREATE TABLE IF NOT EXISTS {} (\n\
         space_id BIGSERIAL PRIMARY KEY,\n\
         client_id TEXT NOT NULL DEFAULT '',\n\
         space_name TEXT NOT NULL,\n\
         image_url TEXT,\n\
         UNIQUE (client_id, space_name)\n\
        );\n\n",
        ns.table("spaces"),
    ));

    s.push_str(&format!(
        "CREATE TABLE IF NOT EXISTS {} (\n\
         label_id BIGSERIAL PRIMARY KEY,\n\
         space_id BIGINT NOT NULL,\n\
         item_id BIGINT,\n\
         x_percent DOUBLE PRECISION NOT NULL,\n\
         y_percent DOUBLE PRECISION NOT NULL,\n\
         label_text TEXT\n\
        );\n\
        CREATE INDEX IF NOT EXISTS idx_space_labels_space ON {}(space_id);\n\
        CREATE INDEX IF NOT EXISTS idx_space_labels_item ON {}(item_id);\n\n",
        ns.table("space_labels"),
        ns.table("space_labels"),
        ns.table("space_labels"),
    ));

    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_qualifies_tables() {
        let ns = TableNamespace::new("claims");
        assert_eq!(ns.table("inventory_items"), "claims.inventory_items");
        let ns = TableNamespace::new("public");
        assert_eq!(ns.table("spaces"), "public.spaces");
    }

    #[test]
    fn test_schema_sql_contains_all_tables() {
        let sql = schema_sql(&TableNamespace::new("public"));
        assert!(sql.contains("CREATE TABLE IF NOT EXISTS public.inventory_items"));
        assert!(sql.contains("CREATE TABLE IF NOT EXISTS public.inventory_edits"));
        assert!(sql.contains("CREATE TABLE IF NOT EXISTS public.spaces"));
        assert!(sql.contains("CREATE TABLE IF NOT EXISTS public.space_labels"));
        assert!(sql.contains("UNIQUE (client_id, space_name)"));
    }

    #[test]
    fn test_build_pool_rejects_garbage_url() {
        assert!(build_pool("not a url", 4).is_err());
    }
}
