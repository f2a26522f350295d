//! Active subscription set.
//!
//! Records the encoded subscribe message of every subscription the caller
//! asked for, keyed by message type, so the whole set can be replayed in
//! insertion order after a reconnection.

use std::sync::{PoisonError, RwLock};

use bytes::Bytes;

/// One recorded subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSubscription {
    /// Identity of the subscription (the message type tag)
    pub key: String,
    /// Encoded subscribe message, replayed verbatim
    pub frame: Bytes,
}

/// Ordered set of active subscriptions.
///
/// Re-inserting an existing key replaces its message but keeps its position.
#[derive(Debug, Default)]
pub struct SubscriptionSet {
    entries: RwLock<Vec<ActiveSubscription>>,
}

impl SubscriptionSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the subscription stored under `key`.
    pub fn insert<K: Into<String>>(&self, key: K, frame: Bytes) {
        let key = key.into();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);

        if let Some(existing) = entries.iter_mut().find(|s| s.key == key) {
            existing.frame = frame;
        } else {
            entries.push(ActiveSubscription { key, frame });
        }
    }

    /// Remove the subscription stored under `key`, returning it if present.
    pub fn remove(&self, key: &str) -> Option<ActiveSubscription> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let index = entries.iter().position(|s| s.key == key)?;
        Some(entries.remove(index))
    }

    /// Replace the whole set.
    pub fn replace(&self, subscriptions: Vec<ActiveSubscription>) {
        let mut deduplicated: Vec<ActiveSubscription> = Vec::with_capacity(subscriptions.len());
        for subscription in subscriptions {
            if let Some(existing) = deduplicated.iter_mut().find(|s| s.key == subscription.key) {
                existing.frame = subscription.frame;
            } else {
                deduplicated.push(subscription);
            }
        }

        *self.entries.write().unwrap_or_else(PoisonError::into_inner) = deduplicated;
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|s| s.key == key)
    }

    /// Snapshot of the set in insertion order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ActiveSubscription> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Keys of the set in insertion order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|s| s.key.clone())
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
