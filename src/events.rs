//! Event Bus - Typed Subscriptions with Owned Handles
//!
//! Each bus is an ordinary value owned by whoever creates it. Subscribing
//! returns a `Subscription`; dropping it unsubscribes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};
use tracing::trace;

use crate::avatar::AvatarConfig;

/// Profile-level notifications raised by the avatar editor and coin balance updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ProfileEvent {
    AvatarUpdated {
        fingerprint: String,
        config: AvatarConfig,
    },
    CoinBalanceChanged {
        balance: u64,
    },
}

type Handler<E> = Arc<dyn Fn(&E) + Send + Sync>;

struct Registry<E> {
    next_id: AtomicU64,
    handlers: RwLock<BTreeMap<u64, Handler<E>>>,
}

pub struct EventBus<E> {
    registry: Arc<Registry<E>>,
}

impl<E: 'static> EventBus<E> {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Registry {
                next_id: AtomicU64::new(1),
                handlers: RwLock::new(BTreeMap::new()),
            }),
        }
    }

    /// Register a handler. It stays registered until the returned handle is dropped.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe(&self, handler: impl Fn(&E) + Send + Sync + 'static) -> Subscription {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        self.registry
            .handlers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(id, Arc::new(handler));
        trace!(id, "subscribed");

        let weak: Weak<Registry<E>> = Arc::downgrade(&self.registry);
        Subscription {
            id,
            unsubscribe: Some(Box::new(move || {
                if let Some(registry) = weak.upgrade() {
                    let mut handlers = registry
                        .handlers
                        .write()
                        .unwrap_or_else(|poisoned| poisoned.into_inner());
                    handlers.remove(&id);
                }
            })),
        }
    }

    /// Deliver to every current subscriber in subscription order; returns how many ran.
    pub fn emit(&self, event: &E) -> usize {
        // Snapshot so handlers may subscribe or unsubscribe while running.
        let snapshot: Vec<Handler<E>> = self
            .registry
            .handlers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .values()
            .cloned()
            .collect();
        for handler in &snapshot {
            handler(event);
        }
        snapshot.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry
            .handlers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

impl<E: 'static> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for EventBus<E> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<E> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus").finish_non_exhaustive()
    }
}

/// Handle for a registered handler.
pub struct Subscription {
    id: u64,
    unsubscribe: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn cancel(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
            trace!(id = self.id, "unsubscribed");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Subscription({})", self.id)
    }
}
