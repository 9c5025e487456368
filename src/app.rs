//! Process bootstrap: one database pool, one store, the registered modules.

use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use catalog_db::Database;
use catalog_kernel::{settings::Settings, InitCtx, ModuleRegistry};

use crate::modules;
use crate::store::{CatalogStore, SqliteCatalogStore};

/// A migrated catalog: the shared store handle and the modules serving it.
pub struct Catalog {
    settings: Settings,
    database: Database,
    store: Arc<dyn CatalogStore>,
    registry: ModuleRegistry,
}

impl Catalog {
    /// Connect to the configured database, register the modules and apply
    /// their pending migrations.
    pub async fn open(settings: Settings) -> anyhow::Result<Self> {
        let database = Database::connect(&settings.database).await?;
        database.ping().await?;

        let store: Arc<dyn CatalogStore> =
            Arc::new(SqliteCatalogStore::new(database.pool().clone()));

        let mut registry = ModuleRegistry::new();
        modules::register_all(&mut registry, store.clone());

        let applied = database
            .migrate(&registry.collect_migrations())
            .await
            .context("failed to migrate catalog schema")?;
        tracing::info!(applied, modules = registry.len(), "catalog schema ready");

        Ok(Self {
            settings,
            database,
            store,
            registry,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> Arc<dyn CatalogStore> {
        self.store.clone()
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// The full HTTP application: banner, health, docs and module routes.
    pub fn router(&self) -> Router {
        catalog_http::build_router(&self.registry, &self.settings)
    }

    pub async fn init(&self) -> anyhow::Result<()> {
        let ctx = InitCtx {
            settings: &self.settings,
        };
        self.registry.init_modules(&ctx).await
    }

    /// Serve HTTP until a shutdown signal, then stop the modules.
    pub async fn serve(&self) -> anyhow::Result<()> {
        let ctx = InitCtx {
            settings: &self.settings,
        };
        self.registry.start_modules(&ctx).await?;

        let served = catalog_http::start_server(&self.registry, &self.settings).await;
        if let Err(error) = self.registry.stop_modules().await {
            tracing::error!(error = %format!("{:#}", error), "module shutdown failed");
        }
        served
    }

    pub async fn close(self) {
        self.database.close().await;
    }
}

/// Run the catalog service with the given settings until shutdown.
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    let catalog = Catalog::open(settings).await?;
    catalog.init().await?;

    let result = catalog.serve().await;
    catalog.close().await;

    tracing::info!("catalog service stopped");
    result
}
