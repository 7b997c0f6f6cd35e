//! # Cart Actor
//!
//! The [`CartStore`] lives inside one task; handlers talk to it through a
//! [`CartHandle`]. Commands are applied one at a time in arrival order, each
//! fully (apply, then persist) before the next, so no caller ever sees a
//! half-applied mutation and the snapshot written after a command reflects
//! at least that command.

use cart_core::{CartCommand, CartItem, CartStore};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

const MAILBOX_SIZE: usize = 64;

/// The cart store task has stopped
#[derive(Debug, Error)]
#[error("cart store is not running")]
pub struct CartUnavailable;

/// Point-in-time copy of the cart
#[derive(Debug, Clone, Serialize)]
pub struct CartSnapshot {
    pub items: Vec<CartItem>,
    pub item_count: u64,
    pub subtotal: f64,
}

impl CartSnapshot {
    fn of(store: &CartStore) -> Self {
        Self {
            items: store.items().to_vec(),
            item_count: store.item_count(),
            subtotal: store.total_price(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&CartItem> {
        self.items.iter().find(|item| item.id == id)
    }
}

/// Reply to a command
#[derive(Debug, Clone)]
pub struct Dispatched {
    pub changed: bool,
    pub cart: CartSnapshot,
}

enum CartRequest {
    Dispatch {
        command: CartCommand,
        reply: oneshot::Sender<Dispatched>,
    },
    Snapshot {
        reply: oneshot::Sender<CartSnapshot>,
    },
}

/// Cloneable handle to the cart task
#[derive(Debug, Clone)]
pub struct CartHandle {
    tx: mpsc::Sender<CartRequest>,
}

impl std::fmt::Debug for CartRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CartRequest::Dispatch { command, .. } => write!(f, "Dispatch({})", command.name()),
            CartRequest::Snapshot { .. } => f.write_str("Snapshot"),
        }
    }
}

impl CartHandle {
    /// Spawn the cart task. The persisted snapshot is loaded before the first
    /// request is served.
    pub fn spawn(mut store: CartStore) -> Self {
        let (tx, mut rx) = mpsc::channel::<CartRequest>(MAILBOX_SIZE);

        tokio::spawn(async move {
            store.load().await;

            while let Some(request) = rx.recv().await {
                match request {
                    CartRequest::Dispatch { command, reply } => {
                        let changed = store.dispatch(command).await;
                        let _ = reply.send(Dispatched {
                            changed,
                            cart: CartSnapshot::of(&store),
                        });
                    }
                    CartRequest::Snapshot { reply } => {
                        let _ = reply.send(CartSnapshot::of(&store));
                    }
                }
            }

            info!("Cart task stopped");
        });

        Self { tx }
    }

    /// Handle whose cart task is already gone
    #[cfg(test)]
    pub(crate) fn detached() -> Self {
        let (tx, _) = mpsc::channel(1);
        Self { tx }
    }

    /// Apply a command
    pub async fn dispatch(&self, command: CartCommand) -> Result<Dispatched, CartUnavailable> {
        debug!(command = command.name(), "Sending cart command");
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(CartRequest::Dispatch { command, reply })
            .await
            .map_err(|_| CartUnavailable)?;
        rx.await.map_err(|_| CartUnavailable)
    }

    /// Read the current cart
    pub async fn snapshot(&self) -> Result<CartSnapshot, CartUnavailable> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(CartRequest::Snapshot { reply })
            .await
            .map_err(|_| CartUnavailable)?;
        rx.await.map_err(|_| CartUnavailable)
    }
}
