//! # Cart Store
//!
//! Owns the canonical [`CartState`] and mirrors it through a
//! [`PersistenceAdapter`]. Each mutation commits in memory first and is then
//! persisted; persistence is suppressed until [`CartStore::load`] has run so
//! an empty pre-load cart never overwrites a stored snapshot.

use crate::cart::{CartCommand, CartItem, CartState};
use crate::persistence::PersistenceAdapter;
use crate::pricing::{CheckoutCalculator, CheckoutTotals};
use crate::product::ProductSnapshot;
use tracing::{debug, info};

/// Single-writer cart store
#[derive(Debug)]
pub struct CartStore {
    state: CartState,
    persistence: PersistenceAdapter,
}

impl CartStore {
    /// Create an empty, unloaded store
    pub fn new(persistence: PersistenceAdapter) -> Self {
        Self {
            state: CartState::new(),
            persistence,
        }
    }

    /// Populate from the persisted snapshot. Runs once; later calls are no-ops.
    pub async fn load(&mut self) {
        if self.state.is_initialized() {
            return;
        }
        let items = self.persistence.load().await;
        if self.state.initialize(items) {
            info!(
                items = self.state.len(),
                count = self.state.item_count(),
                "Cart initialized"
            );
        }
    }

    /// Apply a command and persist if anything changed
    pub async fn dispatch(&mut self, command: CartCommand) -> bool {
        let name = command.name();
        let changed = self.state.apply(command);
        debug!(command = name, changed, "Applied cart command");

        if changed && self.state.is_initialized() {
            self.persistence.save(self.state.items()).await;
        }
        changed
    }

    pub async fn add(&mut self, product: ProductSnapshot, quantity: i64) -> bool {
        self.dispatch(CartCommand::Add { product, quantity }).await
    }

    pub async fn remove(&mut self, id: &str) -> bool {
        self.dispatch(CartCommand::Remove { id: id.to_string() }).await
    }

    pub async fn remove_many(&mut self, ids: Vec<String>) -> bool {
        self.dispatch(CartCommand::RemoveMany { ids }).await
    }

    pub async fn set_quantity(&mut self, id: &str, quantity: i64) -> bool {
        self.dispatch(CartCommand::SetQuantity {
            id: id.to_string(),
            quantity,
        })
        .await
    }

    pub async fn clear(&mut self) -> bool {
        self.dispatch(CartCommand::Clear).await
    }

    pub fn items(&self) -> &[CartItem] {
        self.state.items()
    }

    pub fn item_count(&self) -> u64 {
        self.state.item_count()
    }

    pub fn total_price(&self) -> f64 {
        self.state.total_price()
    }

    pub fn get_item(&self, id: &str) -> Option<&CartItem> {
        self.state.get(id)
    }

    pub fn is_initialized(&self) -> bool {
        self.state.is_initialized()
    }

    /// Order summary for the current subtotal
    pub fn totals(&self, calculator: &CheckoutCalculator) -> CheckoutTotals {
        calculator.compute_totals(self.total_price())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::{MemoryBackend, SnapshotBackend, CART_SNAPSHOT_KEY};
    use std::sync::Arc;

    fn tomatoes() -> ProductSnapshot {
        ProductSnapshot::new("p1", "Roma Tomatoes", 300.0)
    }

    fn store_with_backend() -> (CartStore, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        let store = CartStore::new(PersistenceAdapter::new(backend.clone()));
        (store, backend)
    }

    #[tokio::test]
    async fn test_merge_scenario() {
        let (mut store, _) = store_with_backend();
        store.load().await;

        store.add(tomatoes(), 2).await;
        assert_eq!(store.get_item("p1").unwrap().total_price, 600.0);

        store.add(ProductSnapshot::new("p1", "", 0.0), 3).await;
        let item = store.get_item("p1").unwrap();
        assert_eq!(item.quantity, 5);
        assert_eq!(item.total_price, 1500.0);
        assert_eq!(store.item_count(), 5);
        assert_eq!(store.total_price(), 1500.0);
    }

    #[tokio::test]
    async fn test_writes_suppressed_before_load() {
        let seeded = serde_json::to_string(&vec![CartItem::new(tomatoes(), 4)]).unwrap();
        let backend = Arc::new(MemoryBackend::with_entry(CART_SNAPSHOT_KEY, seeded.clone()));
        let mut store = CartStore::new(PersistenceAdapter::new(backend.clone()));

        store.clear().await;
        store
            .add(ProductSnapshot::new("p2", "Puna Yams", 1250.0), 1)
            .await;

        // Snapshot untouched until the store has loaded it.
        assert_eq!(backend.get(CART_SNAPSHOT_KEY).await.unwrap(), seeded);

        store.load().await;
        assert_eq!(store.get_item("p1").unwrap().quantity, 4);
        assert!(store.get_item("p2").is_none());
    }

    #[tokio::test]
    async fn test_mutations_persist_after_load() {
        let (mut store, backend) = store_with_backend();
        store.load().await;

        store.add(tomatoes(), 2).await;
        store.set_quantity("p1", 6).await;

        let mut reloaded = CartStore::new(PersistenceAdapter::new(backend.clone()));
        reloaded.load().await;
        assert_eq!(reloaded.items(), store.items());
        assert_eq!(reloaded.get_item("p1").unwrap().total_price, 1800.0);

        store.clear().await;
        let mut emptied = CartStore::new(PersistenceAdapter::new(backend));
        emptied.load().await;
        assert!(emptied.items().is_empty());
    }

    #[tokio::test]
    async fn test_noop_does_not_write() {
        let (mut store, backend) = store_with_backend();
        store.load().await;

        assert!(!store.remove("missing").await);
        assert!(!store.set_quantity("missing", 0).await);
        assert!(backend.get(CART_SNAPSHOT_KEY).await.is_none());
    }

    #[tokio::test]
    async fn test_load_runs_once() {
        let (mut store, backend) = store_with_backend();
        store.load().await;
        store.add(tomatoes(), 1).await;

        backend
            .write(CART_SNAPSHOT_KEY, "[]".to_string())
            .await
            .unwrap();
        store.load().await;

        assert_eq!(store.item_count(), 1);
    }

    #[tokio::test]
    async fn test_totals_from_store() {
        let (mut store, _) = store_with_backend();
        store.load().await;
        store.add(tomatoes(), 20).await;

        let totals = store.totals(&CheckoutCalculator::default());
        assert_eq!(totals.subtotal, 6000.0);
        assert_eq!(totals.shipping, 0.0);
        assert_eq!(totals.total, 6600.0);
    }
}
