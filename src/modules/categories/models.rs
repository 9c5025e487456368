use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::modules::books::models::Book;

/// A row from the `categories` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Category {
    /// Store-generated identifier
    pub id: i64,
    /// Display title, unique across categories
    pub title: String,
    /// Set once at insert
    pub created_at: DateTime<Utc>,
}

/// Request body for creating a category.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCategory {
    pub title: String,
}

/// Request body for updating a category.
///
/// `title` is optional at the wire level so an empty body is reported as a
/// validation failure rather than a decoding error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCategory {
    #[serde(default)]
    pub title: Option<String>,
}

/// A category together with the books filed under it.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryWithBooks {
    #[serde(flatten)]
    pub category: Category,
    pub books: Vec<Book>,
}
