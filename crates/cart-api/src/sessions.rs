//! # Checkout Session Registry
//!
//! Live payment sessions keyed by session id. Each entry sits behind its own
//! async mutex so transitions of one session are serialized without blocking
//! the others. Sessions are dropped on close or once their lifetime runs
//! out; a verified session lingers only long enough for repeat verifies.

use cart_core::PaymentSession;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

/// How long an unsettled session stays reachable
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(30 * 60);

/// How long a verified, settled session stays around for repeat verifies
pub const DEFAULT_SETTLED_TTL: Duration = Duration::from_secs(5 * 60);

/// A payment session plus the cart lines it pays for
#[derive(Debug)]
pub struct CheckoutEntry {
    pub session: PaymentSession,
    /// Cart item ids priced into the order, removed once the payment is confirmed
    pub item_ids: Vec<String>,
    /// Set once the paid lines have left the cart
    pub cart_settled: bool,
}

pub type SharedEntry = Arc<Mutex<CheckoutEntry>>;

#[derive(Debug)]
struct Slot {
    entry: SharedEntry,
    expires_at: Instant,
}

impl Slot {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Sessions expire `ttl` after creation, or `settled_ttl` after their cart
/// lines are settled. Expired entries are dropped lazily.
#[derive(Debug, Clone)]
pub struct SessionRegistry {
    entries: Arc<RwLock<HashMap<Uuid, Slot>>>,
    ttl: Duration,
    settled_ttl: Duration,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::with_ttl(DEFAULT_SESSION_TTL, DEFAULT_SETTLED_TTL)
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl: Duration, settled_ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
            settled_ttl,
        }
    }

    /// Register a session and return its shared entry
    pub async fn insert(&self, session: PaymentSession, item_ids: Vec<String>) -> SharedEntry {
        let id = session.id();
        let entry = Arc::new(Mutex::new(CheckoutEntry {
            session,
            item_ids,
            cart_settled: false,
        }));

        let now = Instant::now();
        let mut entries = self.entries.write().await;
        purge(&mut entries, now);
        entries.insert(
            id,
            Slot {
                entry: entry.clone(),
                expires_at: now + self.ttl,
            },
        );
        entry
    }

    /// Live entry for `id`; expired entries are removed and reported missing
    pub async fn get(&self, id: Uuid) -> Option<SharedEntry> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(&id) {
                Some(slot) if !slot.is_expired(now) => return Some(slot.entry.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        let mut entries = self.entries.write().await;
        if entries.get(&id).is_some_and(|slot| slot.is_expired(now)) {
            entries.remove(&id);
            debug!(session_id = %id, "Checkout session expired");
        }
        None
    }

    /// Shorten the lifetime of a session whose cart lines are settled
    pub async fn mark_settled(&self, id: Uuid) {
        let expires_at = Instant::now() + self.settled_ttl;
        if let Some(slot) = self.entries.write().await.get_mut(&id) {
            slot.expires_at = slot.expires_at.min(expires_at);
        }
    }

    pub async fn remove(&self, id: Uuid) -> Option<SharedEntry> {
        self.entries.write().await.remove(&id).map(|slot| slot.entry)
    }

    /// Drop every expired entry, returning how many were removed
    pub async fn purge_expired(&self) -> usize {
        purge(&mut *self.entries.write().await, Instant::now())
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

fn purge(entries: &mut HashMap<Uuid, Slot>, now: Instant) -> usize {
    let before = entries.len();
    entries.retain(|_, slot| !slot.is_expired(now));
    let removed = before - entries.len();
    if removed > 0 {
        debug!(removed, "Purged expired checkout sessions");
    }
    removed
}

/// Background task dropping expired sessions that nobody looks up again
pub async fn cleanup_task(registry: SessionRegistry, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        let removed = registry.purge_expired().await;
        if removed > 0 {
            debug!(removed, "Purged expired checkout sessions");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cart_core::{
        CheckoutOrder, InitializeRequest, InitializeResponse, PaymentGateway, PaymentProvider,
        PaymentResult, VerifyResponse, VerifyStatus,
    };

    struct NoopGateway;

    #[async_trait]
    impl PaymentGateway for NoopGateway {
        async fn initialize(&self, _request: &InitializeRequest) -> PaymentResult<InitializeResponse> {
            Ok(InitializeResponse::default())
        }

        async fn verify(&self, _reference: &str) -> PaymentResult<VerifyResponse> {
            Ok(VerifyResponse::new(VerifyStatus::Pending))
        }

        fn provider(&self) -> PaymentProvider {
            PaymentProvider::Paystack
        }
    }

    fn session() -> PaymentSession {
        PaymentSession::new(CheckoutOrder::new("ord-1", 1200.0), Arc::new(NoopGateway))
    }

    #[tokio::test]
    async fn test_insert_get_remove() {
        let registry = SessionRegistry::new();
        assert!(registry.is_empty().await);

        let entry = registry.insert(session(), vec!["p1".to_string()]).await;
        let id = entry.lock().await.session.id();
        assert_eq!(registry.len().await, 1);

        let found = registry.get(id).await.unwrap();
        assert_eq!(found.lock().await.item_ids, vec!["p1".to_string()]);
        assert!(!found.lock().await.cart_settled);

        assert!(registry.remove(id).await.is_some());
        assert!(registry.remove(id).await.is_none());
        assert!(registry.get(id).await.is_none());
    }

    #[tokio::test]
    async fn test_clones_share_entries() {
        let registry = SessionRegistry::new();
        let other = registry.clone();

        let entry = registry.insert(session(), Vec::new()).await;
        let id = entry.lock().await.session.id();

        assert!(other.get(id).await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sessions_expire() {
        let registry =
            SessionRegistry::with_ttl(Duration::from_secs(60), Duration::from_secs(10));

        let entry = registry.insert(session(), Vec::new()).await;
        let id = entry.lock().await.session.id();

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(registry.get(id).await.is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(registry.get(id).await.is_none());
        assert!(registry.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_settled_sessions_expire_sooner() {
        let registry =
            SessionRegistry::with_ttl(Duration::from_secs(60), Duration::from_secs(10));

        let settled = registry.insert(session(), Vec::new()).await;
        let settled_id = settled.lock().await.session.id();
        let pending = registry.insert(session(), Vec::new()).await;
        let pending_id = pending.lock().await.session.id();

        registry.mark_settled(settled_id).await;
        tokio::time::advance(Duration::from_secs(11)).await;

        assert!(registry.get(settled_id).await.is_none());
        assert!(registry.get(pending_id).await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_insert_purges_expired() {
        let registry =
            SessionRegistry::with_ttl(Duration::from_secs(60), Duration::from_secs(10));

        registry.insert(session(), Vec::new()).await;
        registry.insert(session(), Vec::new()).await;
        tokio::time::advance(Duration::from_secs(61)).await;

        registry.insert(session(), Vec::new()).await;
        assert_eq!(registry.len().await, 1);
        assert_eq!(registry.purge_expired().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_task_purges_idle_sessions() {
        let registry =
            SessionRegistry::with_ttl(Duration::from_secs(60), Duration::from_secs(10));
        let sweeper = tokio::spawn(cleanup_task(registry.clone(), Duration::from_secs(30)));

        registry.insert(session(), Vec::new()).await;
        registry.insert(session(), Vec::new()).await;

        tokio::time::advance(Duration::from_secs(61)).await;
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(registry.is_empty().await);

        sweeper.abort();
    }
}
