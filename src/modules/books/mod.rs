pub mod models;
pub mod routes;

use async_trait::async_trait;
use axum::{routing::get, Router};
use catalog_kernel::{InitCtx, Migration, Module};
use serde_json::json;

use crate::modules::categories::routes::Store;

/// Books module: priced catalog items, optionally filed under a category
pub struct BooksModule {
    store: Store,
}

impl BooksModule {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

/// Schema owned by this module. References `categories`, so the categories
/// migrations have to be applied first.
pub fn migrations() -> Vec<Migration> {
    vec![Migration {
        id: "001_create_books",
        up: r#"
            CREATE TABLE IF NOT EXISTS books (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                description TEXT,
                price REAL NOT NULL,
                url TEXT,
                category_id INTEGER REFERENCES categories(id) ON DELETE SET NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                title_folded TEXT NOT NULL,
                description_folded TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_books_category ON books(category_id);
            "#,
    }]
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let count = self.store.count_books(None).await?;
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            books = count,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/", get(routes::list_books).post(routes::create_book))
            .route("/search", get(routes::search_books))
            .route(
                "/{id}",
                get(routes::get_book)
                    .put(routes::update_book)
                    .delete(routes::delete_book),
            )
            .with_state(self.store.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let id_param = json!({
            "name": "id",
            "in": "path",
            "required": true,
            "schema": { "type": "integer", "format": "int64" }
        });
        let error = json!({
            "application/json": {
                "schema": { "$ref": "#/components/schemas/ErrorResponse" }
            }
        });
        let book = json!({
            "application/json": {
                "schema": { "$ref": "#/components/schemas/Book" }
            }
        });
        let book_list = json!({
            "application/json": {
                "schema": {
                    "type": "array",
                    "items": { "$ref": "#/components/schemas/Book" }
                }
            }
        });

        Some(json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "List books ordered by title",
                        "tags": ["Books"],
                        "parameters": [{
                            "name": "category_id",
                            "in": "query",
                            "required": false,
                            "schema": { "type": "integer", "format": "int64" }
                        }],
                        "responses": {
                            "200": { "description": "Books", "content": book_list },
                            "404": { "description": "Unknown category", "content": error }
                        }
                    },
                    "post": {
                        "summary": "Create a book",
                        "tags": ["Books"],
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/NewBook" }
                                }
                            }
                        },
                        "responses": {
                            "201": { "description": "Created", "content": book },
                            "400": { "description": "Blank title or price not above zero", "content": error },
                            "404": { "description": "Unknown category", "content": error }
                        }
                    }
                },
                "/search": {
                    "get": {
                        "summary": "Case-insensitive search on title and description",
                        "tags": ["Books"],
                        "parameters": [{
                            "name": "q",
                            "in": "query",
                            "required": true,
                            "schema": { "type": "string", "minLength": 2 }
                        }],
                        "responses": {
                            "200": { "description": "Matching books", "content": book_list },
                            "400": { "description": "Query too short", "content": error }
                        }
                    }
                },
                "/{id}": {
                    "get": {
                        "summary": "Get a book",
                        "tags": ["Books"],
                        "parameters": [id_param],
                        "responses": {
                            "200": { "description": "The book", "content": book },
                            "404": { "description": "Unknown id", "content": error }
                        }
                    },
                    "put": {
                        "summary": "Partially update a book",
                        "tags": ["Books"],
                        "parameters": [id_param],
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/BookPatch" }
                                }
                            }
                        },
                        "responses": {
                            "200": { "description": "Updated", "content": book },
                            "400": { "description": "Invalid field", "content": error },
                            "404": { "description": "Unknown book or category", "content": error }
                        }
                    },
                    "delete": {
                        "summary": "Delete a book",
                        "tags": ["Books"],
                        "parameters": [id_param],
                        "responses": {
                            "204": { "description": "Deleted" },
                            "404": { "description": "Unknown id", "content": error }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Book": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "integer", "format": "int64" },
                            "title": { "type": "string" },
                            "description": { "type": ["string", "null"] },
                            "price": { "type": "number", "exclusiveMinimum": 0 },
                            "url": { "type": ["string", "null"] },
                            "category_id": { "type": ["integer", "null"], "format": "int64" },
                            "category_title": { "type": ["string", "null"] },
                            "created_at": { "type": "string", "format": "date-time" },
                            "updated_at": { "type": "string", "format": "date-time" }
                        },
                        "required": ["id", "title", "price", "created_at", "updated_at"]
                    },
                    "NewBook": {
                        "type": "object",
                        "properties": {
                            "title": { "type": "string" },
                            "description": { "type": ["string", "null"] },
                            "price": { "type": "number", "exclusiveMinimum": 0 },
                            "url": { "type": ["string", "null"] },
                            "category_id": { "type": ["integer", "null"], "format": "int64" }
                        },
                        "required": ["title", "price"]
                    },
                    "BookPatch": {
                        "type": "object",
                        "description": "Absent fields are left unchanged; null clears description, url or category_id",
                        "properties": {
                            "title": { "type": "string" },
                            "description": { "type": ["string", "null"] },
                            "price": { "type": "number", "exclusiveMinimum": 0 },
                            "url": { "type": ["string", "null"] },
                            "category_id": { "type": ["integer", "null"], "format": "int64" }
                        }
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
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

/// Create a new instance of the books module
pub fn create_module(store: Store) -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(BooksModule::new(store))
}
