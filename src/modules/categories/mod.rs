pub mod models;
pub mod routes;

use async_trait::async_trait;
use axum::{routing::get, Router};
use catalog_kernel::{InitCtx, Migration, Module};
use serde_json::json;

use routes::Store;

/// Categories module: a named grouping for books, unique by title
pub struct CategoriesModule {
    store: Store,
}

impl CategoriesModule {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

/// Schema owned by this module. Must run before the books migrations.
pub fn migrations() -> Vec<Migration> {
    vec![Migration {
        id: "001_create_categories",
        up: r#"
            CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL
            );
            "#,
    }]
}

#[async_trait]
impl Module for CategoriesModule {
    fn name(&self) -> &'static str {
        "categories"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let count = self.store.count_categories().await?;
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            categories = count,
            "categories module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route(
                "/",
                get(routes::list_categories).post(routes::create_category),
            )
            .route(
                "/{id}",
                get(routes::get_category)
                    .head(routes::category_exists)
                    .put(routes::update_category)
                    .delete(routes::delete_category),
            )
            .route("/{id}/books", get(routes::category_books))
            .with_state(self.store.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let id_param = json!([{
            "name": "id",
            "in": "path",
            "required": true,
            "schema": { "type": "integer", "format": "int64" }
        }]);
        let error = json!({
            "application/json": {
                "schema": { "$ref": "#/components/schemas/ErrorResponse" }
            }
        });
        let category = json!({
            "application/json": {
                "schema": { "$ref": "#/components/schemas/Category" }
            }
        });
        let title_body = json!({
            "required": true,
            "content": {
                "application/json": {
                    "schema": { "$ref": "#/components/schemas/CategoryInput" }
                }
            }
        });

        Some(json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "List categories ordered by title",
                        "tags": ["Categories"],
                        "responses": {
                            "200": {
                                "description": "All categories",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "array",
                                            "items": { "$ref": "#/components/schemas/Category" }
                                        }
                                    }
                                }
                            },
                            "500": { "description": "Store error", "content": error }
                        }
                    },
                    "post": {
                        "summary": "Create a category",
                        "tags": ["Categories"],
                        "requestBody": title_body,
                        "responses": {
                            "201": { "description": "Created", "content": category },
                            "400": { "description": "Blank or duplicate title", "content": error }
                        }
                    }
                },
                "/{id}": {
                    "get": {
                        "summary": "Get a category",
                        "tags": ["Categories"],
                        "parameters": id_param,
                        "responses": {
                            "200": { "description": "The category", "content": category },
                            "404": { "description": "Unknown id", "content": error }
                        }
                    },
                    "head": {
                        "summary": "Check that a category exists",
                        "tags": ["Categories"],
                        "parameters": id_param,
                        "responses": {
                            "200": { "description": "Exists" },
                            "404": { "description": "Unknown id" }
                        }
                    },
                    "put": {
                        "summary": "Rename a category",
                        "tags": ["Categories"],
                        "parameters": id_param,
                        "requestBody": title_body,
                        "responses": {
                            "200": { "description": "Updated", "content": category },
                            "400": { "description": "Blank or duplicate title", "content": error },
                            "404": { "description": "Unknown id", "content": error }
                        }
                    },
                    "delete": {
                        "summary": "Delete a category; its books lose their category",
                        "tags": ["Categories"],
                        "parameters": id_param,
                        "responses": {
                            "204": { "description": "Deleted" },
                            "404": { "description": "Unknown id", "content": error }
                        }
                    }
                },
                "/{id}/books": {
                    "get": {
                        "summary": "Get a category with its books",
                        "tags": ["Categories"],
                        "parameters": id_param,
                        "responses": {
                            "200": {
                                "description": "Category and books ordered by title",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/CategoryWithBooks" }
                                    }
                                }
                            },
                            "404": { "description": "Unknown id", "content": error }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Category": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "integer", "format": "int64" },
                            "title": { "type": "string" },
                            "created_at": { "type": "string", "format": "date-time" }
                        },
                        "required": ["id", "title", "created_at"]
                    },
                    "CategoryInput": {
                        "type": "object",
                        "properties": {
                            "title": { "type": "string", "description": "Non-blank, unique title" }
                        },
                        "required": ["title"]
                    },
                    "CategoryWithBooks": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "integer", "format": "int64" },
                            "title": { "type": "string" },
                            "created_at": { "type": "string", "format": "date-time" },
                            "books": {
                                "type": "array",
                                "items": { "$ref": "#/components/schemas/Book" }
                            }
                        },
                        "required": ["id", "title", "created_at", "books"]
                    }
                }
            }
        }))
    }

    fn migrations(&self) -> Vec<Migration> {
        migrations()
    }

    async fn health(&self) -> anyhow::Result<()> {
        self.store.ping().await?;
        Ok(())
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "categories module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "categories module stopped");
        Ok(())
    }
}

/// Create a new instance of the categories module
pub fn create_module(store: Store) -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(CategoriesModule::new(store))
}
