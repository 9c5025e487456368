use async_trait::async_trait;
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use super::{CatalogStore, StoreResult};
use crate::modules::books::models::{round_price, Book, BookPatch, NewBook};
use crate::modules::categories::models::Category;

const BOOK_SELECT: &str = r#"
    SELECT b.id, b.title, b.description, b.price, b.url, b.category_id,
           c.title AS category_title, b.created_at, b.updated_at
    FROM books b
    LEFT JOIN categories c ON c.id = b.category_id
"#;

const BOOK_ORDER: &str = " ORDER BY b.title COLLATE NOCASE, b.id";

/// [`CatalogStore`] backed by a shared SQLite pool. Each call checks a
/// connection out of the pool and returns it when the future completes.
#[derive(Clone)]
pub struct SqliteCatalogStore {
    pool: SqlitePool,
}

impl SqliteCatalogStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn fetch_book(conn: &mut SqliteConnection, id: i64) -> StoreResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(&format!("{BOOK_SELECT} WHERE b.id = ?"))
            .bind(id)
            .fetch_optional(conn)
            .await?;
        Ok(book)
    }
}

/// Search key for a text column. SQLite `LIKE` only folds ASCII, so the
/// folded copy is kept next to the original and compared instead.
fn fold(text: &str) -> String {
    text.to_lowercase()
}

/// `LIKE` pattern matching `query` anywhere, with wildcards in the query
/// taken literally. Pair with `ESCAPE '\'`.
fn contains_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for ch in query.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

#[async_trait]
impl CatalogStore for SqliteCatalogStore {
    async fn create_category(&self, title: &str) -> StoreResult<Category> {
        let category = sqlx::query_as::<_, Category>(
            "INSERT INTO categories (title, created_at) VALUES (?, ?) RETURNING id, title, created_at",
        )
        .bind(title)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(category_id = category.id, "category created");
        Ok(category)
    }

    async fn get_category(&self, id: i64) -> StoreResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(
            "SELECT id, title, created_at FROM categories WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(category)
    }

    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, title, created_at FROM categories ORDER BY title COLLATE NOCASE, id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    async fn update_category(&self, id: i64, title: &str) -> StoreResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(
            "UPDATE categories SET title = ? WHERE id = ? RETURNING id, title, created_at",
        )
        .bind(title)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(category)
    }

    async fn delete_category(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_book(&self, book: &NewBook) -> StoreResult<Book> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO books (title, description, price, url, category_id, created_at, updated_at,
                               title_folded, description_folded)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&book.title)
        .bind(&book.description)
        .bind(round_price(book.price))
        .bind(&book.url)
        .bind(book.category_id)
        .bind(now)
        .bind(now)
        .bind(fold(&book.title))
        .bind(book.description.as_deref().map(fold))
        .fetch_one(&mut *tx)
        .await?;

        let created = Self::fetch_book(&mut *tx, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;
        tx.commit().await?;

        tracing::debug!(book_id = id, "book created");
        Ok(created)
    }

    async fn get_book(&self, id: i64) -> StoreResult<Option<Book>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_book(&mut *conn, id).await
    }

    async fn list_books(&self, category_id: Option<i64>) -> StoreResult<Vec<Book>> {
        let books = match category_id {
            Some(category_id) => {
                sqlx::query_as::<_, Book>(&format!(
                    "{BOOK_SELECT} WHERE b.category_id = ?{BOOK_ORDER}"
                ))
                .bind(category_id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Book>(&format!("{BOOK_SELECT}{BOOK_ORDER}"))
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        Ok(books)
    }

    async fn update_book(&self, id: i64, patch: &BookPatch) -> StoreResult<Option<Book>> {
        let mut tx = self.pool.begin().await?;

        let mut query = QueryBuilder::<Sqlite>::new("UPDATE books SET updated_at = ");
        query.push_bind(Utc::now());
        if let Some(title) = &patch.title {
            query.push(", title = ").push_bind(title.clone());
            query.push(", title_folded = ").push_bind(fold(title));
        }
        if let Some(description) = &patch.description {
            query.push(", description = ").push_bind(description.clone());
            query
                .push(", description_folded = ")
                .push_bind(description.as_deref().map(fold));
        }
        if let Some(price) = patch.price {
            query.push(", price = ").push_bind(round_price(price));
        }
        if let Some(url) = &patch.url {
            query.push(", url = ").push_bind(url.clone());
        }
        if let Some(category_id) = patch.category_id {
            query.push(", category_id = ").push_bind(category_id);
        }
        query.push(" WHERE id = ").push_bind(id);

        let result = query.build().execute(&mut *tx).await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }

        let updated = Self::fetch_book(&mut *tx, id).await?;
        tx.commit().await?;

        tracing::debug!(book_id = id, "book updated");
        Ok(updated)
    }

    async fn delete_book(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM books WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn search_books(&self, query: &str) -> StoreResult<Vec<Book>> {
        let pattern = contains_pattern(&fold(query));
        let books = sqlx::query_as::<_, Book>(&format!(
            r"{BOOK_SELECT} WHERE b.title_folded LIKE ? ESCAPE '\' OR b.description_folded LIKE ? ESCAPE '\'{BOOK_ORDER}"
        ))
        .bind(&pattern)
        .bind(&pattern)
        .fetch_all(&self.pool)
        .await?;
        Ok(books)
    }

    async fn count_books(&self, category_id: Option<i64>) -> StoreResult<i64> {
        let (count,): (i64,) = match category_id {
            Some(category_id) => {
                sqlx::query_as("SELECT COUNT(*) FROM books WHERE category_id = ?")
                    .bind(category_id)
                    .fetch_one(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_as("SELECT COUNT(*) FROM books")
                    .fetch_one(&self.pool)
                    .await?
            }
        };
        Ok(count)
    }

    async fn count_categories(&self) -> StoreResult<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM categories")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::{books, categories};
    use crate::store::StoreError;
    use catalog_db::Database;
    use catalog_kernel::settings::DatabaseSettings;
    use catalog_kernel::Migration;

    async fn store() -> SqliteCatalogStore {
        let db = Database::connect(&DatabaseSettings {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
        })
        .await
        .unwrap();

        let migrations: Vec<(String, Migration)> = categories::migrations()
            .into_iter()
            .map(|m| ("categories".to_string(), m))
            .chain(books::migrations().into_iter().map(|m| ("books".to_string(), m)))
            .collect();
        db.migrate(&migrations).await.unwrap();

        SqliteCatalogStore::new(db.pool().clone())
    }

    fn new_book(title: &str, description: &str, price: f64, category_id: Option<i64>) -> NewBook {
        NewBook {
            title: title.to_string(),
            description: Some(description.to_string()),
            price,
            url: None,
            category_id,
        }
    }

    #[test]
    fn pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("py"), "%py%");
        assert_eq!(contains_pattern("50%_off"), r"%50\%\_off%");
        assert_eq!(contains_pattern(r"a\b"), r"%a\\b%");
    }

    #[tokio::test]
    async fn categories_crud() {
        let store = store().await;

        let web = store.create_category("Web").await.unwrap();
        let data = store.create_category("Data Science").await.unwrap();
        assert!(web.id > 0);

        let titles: Vec<String> = store
            .list_categories()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.title)
            .collect();
        assert_eq!(titles, vec!["Data Science", "Web"]);

        let renamed = store
            .update_category(web.id, "Web Development")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(renamed.title, "Web Development");
        assert_eq!(renamed.created_at, web.created_at);

        assert!(store.update_category(9999, "Ghost").await.unwrap().is_none());
        assert_eq!(store.get_category(data.id).await.unwrap(), Some(data.clone()));
        assert!(store.delete_category(data.id).await.unwrap());
        assert!(!store.delete_category(data.id).await.unwrap());
        assert!(store.get_category(data.id).await.unwrap().is_none());
        assert_eq!(store.count_categories().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn duplicate_category_title_is_a_conflict() {
        let store = store().await;
        let first = store.create_category("Databases").await.unwrap();

        let duplicate = store.create_category("Databases").await;
        assert!(matches!(duplicate, Err(StoreError::Conflict(_))));

        let other = store.create_category("Programming").await.unwrap();
        let rename = store.update_category(other.id, "Databases").await;
        assert!(matches!(rename, Err(StoreError::Conflict(_))));

        assert_eq!(store.count_categories().await.unwrap(), 2);
        assert_eq!(
            store.get_category(first.id).await.unwrap().unwrap().title,
            "Databases"
        );
    }

    #[tokio::test]
    async fn book_round_trip_includes_category_title() {
        let store = store().await;
        let category = store.create_category("Programming").await.unwrap();

        let submitted = NewBook {
            title: "Clean Code".to_string(),
            description: Some("Refactoring and craftsmanship".to_string()),
            price: 1799.99,
            url: Some("https://example.com/clean-code".to_string()),
            category_id: Some(category.id),
        };
        let created = store.create_book(&submitted).await.unwrap();
        let fetched = store.get_book(created.id).await.unwrap().unwrap();

        assert_eq!(fetched, created);
        assert_eq!(fetched.title, submitted.title);
        assert_eq!(fetched.description, submitted.description);
        assert_eq!(fetched.price, submitted.price);
        assert_eq!(fetched.url, submitted.url);
        assert_eq!(fetched.category_id, Some(category.id));
        assert_eq!(fetched.category_title.as_deref(), Some("Programming"));
        assert_eq!(fetched.created_at, fetched.updated_at);

        let loose = store
            .create_book(&new_book("Loose Leaf", "no shelf", 5.0, None))
            .await
            .unwrap();
        assert_eq!(loose.category_id, None);
        assert_eq!(loose.category_title, None);
    }

    #[tokio::test]
    async fn create_book_with_unknown_category_is_rejected() {
        let store = store().await;
        let result = store
            .create_book(&new_book("Orphan", "nowhere", 10.0, Some(404)))
            .await;
        assert!(matches!(result, Err(StoreError::MissingReference(_))));
        assert_eq!(store.count_books(None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn deleting_category_detaches_books() {
        let store = store().await;
        let category = store.create_category("Web").await.unwrap();
        let book = store
            .create_book(&new_book("HTML and CSS", "Design", 1299.99, Some(category.id)))
            .await
            .unwrap();

        assert!(store.delete_category(category.id).await.unwrap());

        let detached = store.get_book(book.id).await.unwrap().unwrap();
        assert_eq!(detached.category_id, None);
        assert_eq!(detached.category_title, None);
        assert_eq!(store.count_books(None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn list_books_filters_and_orders_by_title() {
        let store = store().await;
        let web = store.create_category("Web").await.unwrap();
        let data = store.create_category("Data").await.unwrap();

        for (title, category) in [
            ("JavaScript Guide", web.id),
            ("Django for Beginners", web.id),
            ("Deep Learning", data.id),
            ("FastAPI", web.id),
        ] {
            store
                .create_book(&new_book(title, "", 10.0, Some(category)))
                .await
                .unwrap();
        }

        let web_titles: Vec<String> = store
            .list_books(Some(web.id))
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.title)
            .collect();
        assert_eq!(
            web_titles,
            vec!["Django for Beginners", "FastAPI", "JavaScript Guide"]
        );

        let all = store.list_books(None).await.unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(all[0].title, "Deep Learning");

        assert_eq!(store.count_books(Some(web.id)).await.unwrap(), 3);
        assert_eq!(store.count_books(Some(data.id)).await.unwrap(), 1);
        assert!(store.list_books(Some(9999)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn partial_update_touches_only_supplied_fields() {
        let store = store().await;
        let web = store.create_category("Web").await.unwrap();
        let book = store
            .create_book(&NewBook {
                url: Some("https://example.com/a".to_string()),
                ..new_book("Learning Python", "Games and data", 1999.99, Some(web.id))
            })
            .await
            .unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let renamed = store
            .update_book(
                book.id,
                &BookPatch {
                    title: Some("Learning Python, 3rd ed.".to_string()),
                    ..BookPatch::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(renamed.title, "Learning Python, 3rd ed.");
        assert_eq!(renamed.price, 1999.99);
        assert_eq!(renamed.description, book.description);
        assert_eq!(renamed.url, book.url);
        assert_eq!(renamed.category_id, Some(web.id));
        assert!(renamed.updated_at > book.updated_at);
        assert_eq!(renamed.created_at, book.created_at);

        let cleared = store
            .update_book(
                book.id,
                &BookPatch {
                    url: Some(None),
                    category_id: Some(None),
                    price: Some(10.5),
                    ..BookPatch::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cleared.url, None);
        assert_eq!(cleared.category_id, None);
        assert_eq!(cleared.category_title, None);
        assert_eq!(cleared.price, 10.5);
        assert_eq!(cleared.title, "Learning Python, 3rd ed.");

        assert!(store
            .update_book(9999, &BookPatch::default())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn empty_patch_only_refreshes_updated_at() {
        let store = store().await;
        let book = store
            .create_book(&new_book("Statistics", "A basic course", 1899.99, None))
            .await
            .unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let touched = store
            .update_book(book.id, &BookPatch::default())
            .await
            .unwrap()
            .unwrap();

        assert!(touched.updated_at > book.updated_at);
        assert_eq!(
            Book {
                updated_at: book.updated_at,
                ..touched
            },
            book
        );
    }

    #[tokio::test]
    async fn prices_are_stored_in_whole_cents() {
        let store = store().await;
        let book = store
            .create_book(&new_book("Rounded", "", 19.999, None))
            .await
            .unwrap();
        assert_eq!(book.price, 20.0);

        let repriced = store
            .update_book(
                book.id,
                &BookPatch {
                    price: Some(7.126),
                    ..BookPatch::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(repriced.price, 7.13);
    }

    #[tokio::test]
    async fn search_folds_case_beyond_ascii() {
        let store = store().await;
        let book = store
            .create_book(&new_book(
                "Изучаем Python",
                "Программирование на Python",
                1999.99,
                None,
            ))
            .await
            .unwrap();
        store
            .create_book(&new_book("Чистый код", "Рефакторинг", 1799.99, None))
            .await
            .unwrap();

        for query in ["ПРОГРАММИРОВАНИЕ", "изучаем", "ИЗУЧАЕМ python"] {
            let hits = store.search_books(query).await.unwrap();
            assert_eq!(hits.len(), 1, "query {query:?}");
            assert_eq!(hits[0].id, book.id);
        }

        let renamed = store
            .update_book(
                book.id,
                &BookPatch {
                    title: Some("Python. К вершинам мастерства".to_string()),
                    description: Some(None),
                    ..BookPatch::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(store.search_books("ВЕРШИНАМ").await.unwrap(), vec![renamed]);
        assert!(store.search_books("изучаем").await.unwrap().is_empty());
        assert!(store.search_books("программирование").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn search_matches_title_or_description_case_insensitively() {
        let store = store().await;
        for (title, description) in [
            ("Fluent Python", "Deep dive"),
            ("Data Analysis", "Wrangling with PYTHON and pandas"),
            ("Clean Code", "Refactoring"),
            ("100% Coverage", "Testing"),
        ] {
            store
                .create_book(&new_book(title, description, 20.0, None))
                .await
                .unwrap();
        }

        let found: Vec<String> = store
            .search_books("python")
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.title)
            .collect();
        assert_eq!(found, vec!["Data Analysis", "Fluent Python"]);

        let literal: Vec<String> = store
            .search_books("0%")
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.title)
            .collect();
        assert_eq!(literal, vec!["100% Coverage"]);

        assert!(store.search_books("rust").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_book_reports_missing_rows() {
        let store = store().await;
        let book = store
            .create_book(&new_book("Short Lived", "", 1.0, None))
            .await
            .unwrap();

        assert!(store.delete_book(book.id).await.unwrap());
        assert!(!store.delete_book(book.id).await.unwrap());
        assert!(store.get_book(book.id).await.unwrap().is_none());
        store.ping().await.unwrap();
    }
}
