//! Demo catalog content and a summary view used by the command line.

use std::fmt;

use anyhow::Context;

use crate::modules::books::models::{Book, NewBook};
use crate::modules::categories::models::Category;
use crate::store::CatalogStore;

struct DemoCategory {
    title: &'static str,
    books: &'static [(&'static str, &'static str, f64)],
}

const DEMO: &[DemoCategory] = &[
    DemoCategory {
        title: "Programming",
        books: &[
            ("Fluent Python", "A deep dive into Python", 2499.99),
            ("Python Crash Course", "Games, data visualisation and web apps", 1999.99),
            ("Clean Code", "Writing, reviewing and refactoring code", 1799.99),
            ("Algorithms in Python", "Design and implementation", 2899.99),
        ],
    },
    DemoCategory {
        title: "Databases",
        books: &[
            ("PostgreSQL Fundamentals", "Working with relational databases", 1599.99),
            ("SQL Cookbook", "Solutions to everyday query problems", 1899.99),
            ("Designing Data-Intensive Applications", "Scaling databases", 3299.99),
        ],
    },
    DemoCategory {
        title: "Web Development",
        books: &[
            ("Django for Beginners", "Building websites with Python", 2199.99),
            ("HTML and CSS", "Designing and building websites", 1299.99),
            ("JavaScript: The Definitive Guide", "Client-side development", 2799.99),
            ("FastAPI", "Asynchronous web development", 2399.99),
        ],
    },
    DemoCategory {
        title: "Data Science",
        books: &[
            ("Python for Data Analysis", "Data wrangling with pandas", 2599.99),
            ("Deep Learning", "Theory and practice", 3999.99),
            ("Statistics for Data Science", "An introductory course", 1899.99),
        ],
    },
];

/// What a seed run changed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeedReport {
    pub categories_created: usize,
    pub categories_reused: usize,
    pub books_created: usize,
}

/// Insert the demo categories and books.
///
/// Categories that already exist are reused by title, and books are only
/// added to categories that have none, so repeated runs do not duplicate.
pub async fn seed(store: &dyn CatalogStore) -> anyhow::Result<SeedReport> {
    let existing = store.list_categories().await?;
    let mut report = SeedReport::default();

    for demo in DEMO {
        let category = match existing.iter().find(|c| c.title == demo.title) {
            Some(category) => {
                report.categories_reused += 1;
                category.clone()
            }
            None => {
                report.categories_created += 1;
                store
                    .create_category(demo.title)
                    .await
                    .with_context(|| format!("failed to create category '{}'", demo.title))?
            }
        };

        if store.count_books(Some(category.id)).await? > 0 {
            tracing::debug!(category = %category.title, "category already stocked");
            continue;
        }

        for (title, description, price) in demo.books {
            store
                .create_book(&NewBook {
                    title: title.to_string(),
                    description: Some(description.to_string()),
                    price: *price,
                    url: None,
                    category_id: Some(category.id),
                })
                .await
                .with_context(|| format!("failed to create book '{title}'"))?;
            report.books_created += 1;
        }
    }

    tracing::info!(
        categories_created = report.categories_created,
        categories_reused = report.categories_reused,
        books_created = report.books_created,
        "demo catalog seeded"
    );
    Ok(report)
}

#[derive(Debug, Clone)]
pub struct CategorySummary {
    pub category: Category,
    pub book_count: i64,
    pub first_books: Vec<Book>,
}

/// Counts plus each category with a preview of its books.
#[derive(Debug, Clone)]
pub struct Stats {
    pub categories: i64,
    pub books: i64,
    pub per_category: Vec<CategorySummary>,
}

pub async fn stats(store: &dyn CatalogStore, preview: usize) -> anyhow::Result<Stats> {
    let categories = store.count_categories().await?;
    let books = store.count_books(None).await?;

    let mut per_category = Vec::new();
    for category in store.list_categories().await? {
        let book_count = store.count_books(Some(category.id)).await?;
        let mut first_books = store.list_books(Some(category.id)).await?;
        first_books.truncate(preview);
        per_category.push(CategorySummary {
            category,
            book_count,
            first_books,
        });
    }

    Ok(Stats {
        categories,
        books,
        per_category,
    })
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "categories: {}", self.categories)?;
        writeln!(f, "books: {}", self.books)?;
        for summary in &self.per_category {
            writeln!(
                f,
                "\n[{}] {} ({} books)",
                summary.category.id, summary.category.title, summary.book_count
            )?;
            for book in &summary.first_books {
                writeln!(f, "  - {} ({:.2})", book.title, book.price)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::Catalog;
    use catalog_kernel::settings::{DatabaseSettings, Settings};

    async fn catalog() -> Catalog {
        Catalog::open(Settings {
            database: DatabaseSettings {
                url: "sqlite::memory:".to_string(),
                max_connections: 1,
            },
            ..Settings::default()
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn seeding_twice_does_not_duplicate() {
        let catalog = catalog().await;
        let store = catalog.store();

        let first = seed(store.as_ref()).await.unwrap();
        assert_eq!(first.categories_created, 4);
        assert_eq!(first.books_created, 14);

        let second = seed(store.as_ref()).await.unwrap();
        assert_eq!(second.categories_created, 0);
        assert_eq!(second.categories_reused, 4);
        assert_eq!(second.books_created, 0);

        assert_eq!(store.count_books(None).await.unwrap(), 14);
    }

    #[tokio::test]
    async fn existing_empty_category_gets_stocked() {
        let catalog = catalog().await;
        let store = catalog.store();
        let databases = store.create_category("Databases").await.unwrap();

        let report = seed(store.as_ref()).await.unwrap();
        assert_eq!(report.categories_reused, 1);
        assert_eq!(report.categories_created, 3);
        assert_eq!(store.count_books(Some(databases.id)).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn stats_preview_is_ordered_and_truncated() {
        let catalog = catalog().await;
        let store = catalog.store();
        seed(store.as_ref()).await.unwrap();

        let stats = stats(store.as_ref(), 2).await.unwrap();
        assert_eq!(stats.categories, 4);
        assert_eq!(stats.books, 14);

        let programming = stats
            .per_category
            .iter()
            .find(|s| s.category.title == "Programming")
            .unwrap();
        assert_eq!(programming.book_count, 4);
        let titles: Vec<&str> = programming.first_books.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, vec!["Algorithms in Python", "Clean Code"]);

        let rendered = stats.to_string();
        assert!(rendered.contains("categories: 4"));
        assert!(rendered.contains("Programming (4 books)"));
    }
}
