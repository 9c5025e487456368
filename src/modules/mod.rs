pub mod books;
pub mod categories;

use catalog_kernel::ModuleRegistry;

use crate::store::CatalogStore;
use std::sync::Arc;

/// Register the catalog modules with the registry.
///
/// Categories go first: the books table references it, and migrations
/// run in registration order.
pub fn register_all(registry: &mut ModuleRegistry, store: Arc<dyn CatalogStore>) {
    registry.register(categories::create_module(store.clone()));
    registry.register(books::create_module(store));
}
