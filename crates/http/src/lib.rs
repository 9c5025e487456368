//! HTTP server facade for the catalog service with Axum, error handling,
//! and OpenAPI support.

use std::sync::Arc;

use anyhow::Context;
use axum::{routing::get, Json, Router};
use serde_json::json;

use catalog_kernel::{settings::Settings, Module, ModuleRegistry};

pub mod error;
pub mod extract;
pub mod router;

pub use error::AppError;
pub use extract::{ApiJson, ApiPath, ApiQuery};
use router::RouterBuilder;

/// Start the HTTP server and serve until ctrl-c or SIGTERM
pub async fn start_server(registry: &ModuleRegistry, settings: &Settings) -> anyhow::Result<()> {
    let address = format!("{}:{}", settings.server.host, settings.server.port);
    tracing::info!("starting HTTP server on {}", address);

    let app = build_router(registry, settings);

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind to {}", address))?;

    tracing::info!("HTTP server listening on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

/// Build the main HTTP router with all module routes mounted
pub fn build_router(registry: &ModuleRegistry, settings: &Settings) -> Router {
    let modules: Arc<Vec<Arc<dyn Module>>> = Arc::new(registry.modules().to_vec());
    let banner = banner(registry, settings);

    let mut router_builder = RouterBuilder::new()
        .route(
            "/",
            get(move || {
                let banner = banner.clone();
                async move { Json(banner) }
            }),
        )
        .route(
            "/health",
            get(move || {
                let modules = modules.clone();
                async move { health_check(&modules).await }
            }),
        );

    for module in registry.modules() {
        let path = settings.server.module_path(module.name());
        tracing::info!(module = module.name(), "mounting module routes under {}", path);
        router_builder = router_builder.mount_module(&path, module.routes());
    }

    router_builder
        .with_openapi(registry, &settings.server)
        .with_tracing()
        .with_cors()
        .with_timeout(settings.server.request_timeout_ms)
        .with_request_id()
        .build()
}

fn banner(registry: &ModuleRegistry, settings: &Settings) -> serde_json::Value {
    let modules: Vec<serde_json::Value> = registry
        .modules()
        .iter()
        .map(|m| json!({ "name": m.name(), "path": settings.server.module_path(m.name()) }))
        .collect();

    json!({
        "service": settings.server.name,
        "version": env!("CARGO_PKG_VERSION"),
        "environment": settings.environment,
        "modules": modules,
        "docs": "/docs/openapi.json",
    })
}

/// Health check endpoint. Always answers 200; failing modules turn the
/// overall status to `degraded`.
async fn health_check(modules: &[Arc<dyn Module>]) -> Json<serde_json::Value> {
    let mut checks = serde_json::Map::new();
    let mut healthy = true;

    for module in modules {
        let outcome = match module.health().await {
            Ok(()) => "ok".to_string(),
            Err(error) => {
                healthy = false;
                tracing::warn!(module = module.name(), error = %format!("{:#}", error), "health check failed");
                format!("{:#}", error)
            }
        };
        checks.insert(module.name().to_string(), json!(outcome));
    }

    Json(json!({
        "status": if healthy { "ok" } else { "degraded" },
        "checks": checks,
    }))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!(%error, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::error!(%error, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::StatusCode;
    use tower::ServiceExt;

    struct Probe {
        name: &'static str,
        healthy: bool,
    }

    #[async_trait]
    impl Module for Probe {
        fn name(&self) -> &'static str {
            self.name
        }

        fn routes(&self) -> Router {
            Router::new().route("/", get(|| async { "probe" }))
        }

        async fn health(&self) -> anyhow::Result<()> {
            if self.healthy {
                Ok(())
            } else {
                anyhow::bail!("store unreachable")
            }
        }
    }

    async fn get_json(router: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = router
            .oneshot(axum::http::Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn registry(healthy: bool) -> ModuleRegistry {
        let mut registry = ModuleRegistry::new();
        registry.register(Arc::new(Probe {
            name: "probe",
            healthy,
        }));
        registry
    }

    #[tokio::test]
    async fn banner_lists_modules() {
        let router = build_router(&registry(true), &Settings::default());
        let (status, body) = get_json(router, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["service"], "catalog");
        assert_eq!(body["modules"][0]["path"], "/probe");
    }

    #[tokio::test]
    async fn health_reports_degraded_modules_with_200() {
        let (status, body) = get_json(build_router(&registry(true), &Settings::default()), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["checks"]["probe"], "ok");

        let (status, body) = get_json(build_router(&registry(false), &Settings::default()), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["checks"]["probe"], "store unreachable");
    }

    #[tokio::test]
    async fn openapi_document_is_served() {
        let router = build_router(&registry(true), &Settings::default());
        let (status, body) = get_json(router, "/docs/openapi.json").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["info"]["title"], "Catalog API");
    }
}
