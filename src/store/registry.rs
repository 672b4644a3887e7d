//! Process-wide store registry
//!
//! Stores are installed at boot; tests may replace the whole set. Lookup
//! returns the first store whose declared types intersect the query's.

use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;

use crate::models::Query;
use crate::store::IndexStore;

static GLOBAL: OnceLock<StoreRegistry> = OnceLock::new();

/// Registry routing queries to the store claiming their content type
#[derive(Default)]
pub struct StoreRegistry {
    stores: RwLock<Vec<Arc<IndexStore>>>,
}

impl StoreRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry
    pub fn global() -> &'static StoreRegistry {
        GLOBAL.get_or_init(StoreRegistry::new)
    }

    pub fn install(&self, store: Arc<IndexStore>) {
        self.stores.write().push(store);
    }

    /// Replace the installed stores; intended for tests
    pub fn override_stores(&self, stores: Vec<Arc<IndexStore>>) {
        *self.stores.write() = stores;
    }

    pub fn clear(&self) {
        self.stores.write().clear();
    }

    pub fn stores(&self) -> Vec<Arc<IndexStore>> {
        self.stores.read().clone()
    }

    /// First store whose declared types intersect the query's types
    pub fn store_for_query(&self, query: &Query) -> Option<Arc<IndexStore>> {
        let stores = self.stores.read();
        stores
            .iter()
            .find(|store| {
                query
                    .types
                    .iter()
                    .any(|ty| store.types().iter().any(|t| t == ty))
            })
            .cloned()
    }
}
