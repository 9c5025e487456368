use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;

/// Read representation of a book, carrying its category title so clients
/// do not need a second lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub price: f64,
    pub url: Option<String>,
    pub category_id: Option<i64>,
    /// Joined from `categories.title`, `None` when the book has no category
    pub category_title: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Refreshed on every update
    pub updated_at: DateTime<Utc>,
}

/// Fields accepted when creating a book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBook {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: f64,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub category_id: Option<i64>,
}

/// Partial update of a book. `None` leaves the stored value untouched.
///
/// The nullable columns use a nested option: `Some(None)` (an explicit JSON
/// `null`) clears the value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BookPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "present")]
    pub url: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub category_id: Option<Option<i64>>,
}

impl BookPatch {
    /// True when the patch would only refresh `updated_at`.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.url.is_none()
            && self.category_id.is_none()
    }
}

/// Prices are kept to whole cents.
pub fn round_price(price: f64) -> f64 {
    (price * 100.0).round() / 100.0
}

/// Marks a field as present, keeping an explicit `null` as `Some(None)`.
fn present<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Query string for `GET /books`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListBooksQuery {
    pub category_id: Option<i64>,
}

/// Query string for `GET /books/search`.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchQuery {
    pub q: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn patch_distinguishes_absent_from_null() {
        let patch: BookPatch =
            serde_json::from_value(json!({ "description": null, "price": 12.5 })).unwrap();

        assert_eq!(patch.description, Some(None));
        assert_eq!(patch.url, None);
        assert_eq!(patch.category_id, None);
        assert_eq!(patch.price, Some(12.5));
        assert!(!patch.is_empty());
    }

    #[test]
    fn empty_patch_changes_nothing() {
        let patch: BookPatch = serde_json::from_value(json!({})).unwrap();
        assert!(patch.is_empty());
        assert_eq!(patch, BookPatch::default());
    }

    #[test]
    fn prices_round_to_cents() {
        assert_eq!(round_price(19.999), 20.0);
        assert_eq!(round_price(1799.99), 1799.99);
        assert_eq!(round_price(0.004), 0.0);
        assert_eq!(round_price(0.005), 0.01);
    }

    #[test]
    fn new_book_requires_price() {
        let missing = serde_json::from_value::<NewBook>(json!({ "title": "Dune" }));
        assert!(missing.is_err());

        let book: NewBook =
            serde_json::from_value(json!({ "title": "Dune", "price": 9.99 })).unwrap();
        assert_eq!(book.category_id, None);
        assert_eq!(book.description, None);
    }
}
