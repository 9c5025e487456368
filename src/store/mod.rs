//! Data-access layer for the catalog.
//!
//! [`CatalogStore`] is the only way request handlers reach the database.
//! Expected outcomes never surface as errors: a missing row is `Ok(None)` or
//! `Ok(false)`, and [`StoreError`] is reserved for statements the store
//! refused or could not run.

mod sqlite;

use async_trait::async_trait;
use catalog_http::AppError;
use thiserror::Error;

use crate::modules::books::models::{Book, BookPatch, NewBook};
use crate::modules::categories::models::Category;

pub use sqlite::SqliteCatalogStore;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique constraint rejected the write (duplicate category title).
    #[error("unique constraint violated: {0}")]
    Conflict(String),

    /// A foreign key pointed at a row that does not exist.
    #[error("referenced row does not exist: {0}")]
    MissingReference(String),

    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_error) = &error {
            if db_error.is_unique_violation() {
                return StoreError::Conflict(db_error.message().to_string());
            }
            if db_error.is_foreign_key_violation() {
                return StoreError::MissingReference(db_error.message().to_string());
            }
        }
        StoreError::Database(error)
    }
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn create_category(&self, title: &str) -> StoreResult<Category>;

    async fn get_category(&self, id: i64) -> StoreResult<Option<Category>>;

    /// All categories ordered by title.
    async fn list_categories(&self) -> StoreResult<Vec<Category>>;

    async fn update_category(&self, id: i64, title: &str) -> StoreResult<Option<Category>>;

    /// Books filed under the category keep existing with `category_id` cleared.
    async fn delete_category(&self, id: i64) -> StoreResult<bool>;

    async fn create_book(&self, book: &NewBook) -> StoreResult<Book>;

    async fn get_book(&self, id: i64) -> StoreResult<Option<Book>>;

    /// Books ordered by title, optionally restricted to one category.
    async fn list_books(&self, category_id: Option<i64>) -> StoreResult<Vec<Book>>;

    /// Applies only the fields present in `patch` and always refreshes
    /// `updated_at`.
    async fn update_book(&self, id: i64, patch: &BookPatch) -> StoreResult<Option<Book>>;

    async fn delete_book(&self, id: i64) -> StoreResult<bool>;

    /// Case-insensitive substring match on title or description.
    async fn search_books(&self, query: &str) -> StoreResult<Vec<Book>>;

    async fn count_books(&self, category_id: Option<i64>) -> StoreResult<i64>;

    async fn count_categories(&self) -> StoreResult<i64>;

    async fn ping(&self) -> StoreResult<()>;
}

impl From<StoreError> for AppError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Conflict(message) => AppError::conflict(vec![], message),
            StoreError::MissingReference(message) => AppError::not_found(message),
            StoreError::Database(source) => {
                AppError::Internal(anyhow::Error::new(source).context("store failure"))
            }
        }
    }
}
