//! Bookstore catalog service.
//!
//! Categories and books over SQLite, exposed as kernel modules and served
//! through `catalog-http`.

pub mod app;
pub mod modules;
pub mod seed;
pub mod store;
pub mod utils;

pub use app::{run, Catalog};
pub use store::{CatalogStore, SqliteCatalogStore, StoreError};
