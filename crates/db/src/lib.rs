//! SQLite connection pool factory and migration runner.

use std::str::FromStr;

use anyhow::Context;
use catalog_kernel::settings::DatabaseSettings;
use catalog_kernel::Migration;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

/// Ledger of applied migrations, keyed by module and migration id.
const MIGRATIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS _catalog_migrations (
    module TEXT NOT NULL,
    id TEXT NOT NULL,
    applied_at TEXT NOT NULL,
    PRIMARY KEY (module, id)
)
"#;

/// Process-wide database handle. Cloning shares the same pool.
#[derive(Clone, Debug)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open a pool for the configured URL with foreign keys enforced.
    ///
    /// In-memory databases are private to a connection, so their pool is
    /// pinned to a single connection that is never recycled.
    pub async fn connect(settings: &DatabaseSettings) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(&settings.url)
            .with_context(|| format!("invalid database url '{}'", settings.url))?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool_options = if settings.is_in_memory() {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(settings.max_connections.max(1))
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .with_context(|| format!("failed to connect to '{}'", settings.url))?;

        tracing::info!(
            target: "catalog-db",
            url = %settings.url,
            max_connections = settings.max_connections,
            "database pool ready"
        );

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Apply every migration not yet recorded in the ledger.
    ///
    /// Each migration runs in its own transaction together with its ledger
    /// row. Returns the number of migrations applied by this call.
    pub async fn migrate(&self, migrations: &[(String, Migration)]) -> anyhow::Result<usize> {
        sqlx::query(MIGRATIONS_TABLE)
            .execute(&self.pool)
            .await
            .context("failed to create migration ledger")?;

        let mut applied = 0;
        for (module, migration) in migrations {
            let mut tx = self.pool.begin().await?;

            let seen: Option<(String,)> =
                sqlx::query_as("SELECT id FROM _catalog_migrations WHERE module = ? AND id = ?")
                    .bind(module)
                    .bind(migration.id)
                    .fetch_optional(&mut *tx)
                    .await?;
            if seen.is_some() {
                tracing::debug!(target: "catalog-db", %module, id = migration.id, "migration already applied");
                continue;
            }

            sqlx::raw_sql(migration.up)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("migration {}/{} failed", module, migration.id))?;

            sqlx::query("INSERT INTO _catalog_migrations (module, id, applied_at) VALUES (?, ?, ?)")
                .bind(module)
                .bind(migration.id)
                .bind(Utc::now())
                .execute(&mut *tx)
                .await?;

            tx.commit().await?;
            applied += 1;
            tracing::info!(target: "catalog-db", %module, id = migration.id, "migration applied");
        }

        Ok(applied)
    }

    /// Round-trip a trivial statement to prove connectivity.
    pub async fn ping(&self) -> anyhow::Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("database ping failed")?;
        Ok(())
    }

    /// Close every pooled connection. Further use of the pool fails.
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!(target: "catalog-db", "database pool closed");
    }
}
