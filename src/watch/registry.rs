//! Registry of suspended long-poll requests, addressed by watch key.
//!
//! ```text
//! register(keys) ──► DashMap<watch key, Vec<holder>>  (one entry per key)
//!                               │
//! release message(key) ─► remove(key) ─► complete each holder ─► drop holder from its other keys
//! ```
//!
//! - Taking a key's holder list is atomic; a holder registered after the take
//!   does not see that message and relies on its own freshness check instead.
//! - A holder leaves the registry exactly once, whether it completed, timed out
//!   or its request was dropped ([`HolderRegistration`] is an RAII guard).
//! - A hot key with more than `notification_batch_size` holders is completed in
//!   paced batches on a spawned task.

use std::collections::HashMap;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::oneshot;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::trace;

use super::DeferredNotification;
use crate::config::LongPollConfig;
use crate::constants::RELEASE_MESSAGE_TOPIC;
use crate::keys::namespace_of;
use crate::message::ReleaseMessageListener;
use crate::metrics::record_long_poll_event;
use crate::metrics::PENDING_LONG_POLLS;
use crate::model::ConfigNotification;
use crate::model::ReleaseMessage;

struct RegistryInner {
    /// Holders grouped by watch key
    holders: DashMap<String, Vec<Arc<DeferredNotification>>>,

    next_id: AtomicU64,

    config: LongPollConfig,
}

impl RegistryInner {
    /// Removes `holder` from every key it was registered under
    fn deregister(
        &self,
        holder: &DeferredNotification,
    ) {
        if !holder.mark_deregistered() {
            return;
        }
        self.remove_from_keys(holder);
        PENDING_LONG_POLLS.dec();
        trace!(holder_id = holder.id(), "holder deregistered");
    }

    fn remove_from_keys(
        &self,
        holder: &DeferredNotification,
    ) {
        for key in holder.watch_keys() {
            self.holders.remove_if_mut(key, |_, holders| {
                holders.retain(|h| h.id() != holder.id());
                holders.is_empty()
            });
        }
    }

    /// Completes `holder` for a message on `watch_key`, naming the namespace
    /// the way the client requested it
    fn complete(
        &self,
        holder: &DeferredNotification,
        watch_key: &str,
        notification: &ConfigNotification,
    ) {
        let mut notification = notification.clone();
        if let Some(namespace) = holder.namespace_for(watch_key) {
            notification.namespace_name = namespace.to_string();
        }
        if holder.complete(vec![notification]) {
            record_long_poll_event("changed");
        }
        self.deregister(holder);
    }
}

/// Handle of a registered long-poll request.
///
/// Dropping it cancels the request if it is still pending and removes it from
/// the registry.
pub struct HolderRegistration {
    holder: Arc<DeferredNotification>,
    receiver: oneshot::Receiver<Vec<ConfigNotification>>,
    registry: Arc<RegistryInner>,
}

impl std::fmt::Debug for HolderRegistration {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("HolderRegistration")
            .field("holder", &self.holder)
            .finish_non_exhaustive()
    }
}

impl HolderRegistration {
    pub fn holder(&self) -> &Arc<DeferredNotification> {
        &self.holder
    }

    /// Waits for a notification for at most `timeout`.
    ///
    /// Returns `None` if the request timed out.
    pub async fn wait(
        mut self,
        timeout: Duration,
    ) -> Option<Vec<ConfigNotification>> {
        match tokio::time::timeout(timeout, &mut self.receiver).await {
            Ok(Ok(notifications)) => Some(notifications),
            Ok(Err(_)) => None,
            Err(_) => {
                if self.holder.time_out() {
                    record_long_poll_event("not_modified");
                    None
                } else {
                    // completed at the deadline; the result is already in the channel
                    self.receiver.try_recv().ok()
                }
            }
        }
    }
}

impl Drop for HolderRegistration {
    fn drop(&mut self) {
        if self.holder.cancel() {
            record_long_poll_event("cancelled");
            debug!(holder_id = self.holder.id(), "long poll request dropped before completion");
        }
        self.registry.deregister(&self.holder);
    }
}

/// Long-poll holder registry.
///
/// Cheap to clone; clones share the same registry.
#[derive(Clone)]
pub struct NotificationRegistry {
    inner: Arc<RegistryInner>,
}

impl std::fmt::Debug for NotificationRegistry {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("NotificationRegistry")
            .field("watched_keys", &self.inner.holders.len())
            .field("config", &self.inner.config)
            .finish()
    }
}

impl NotificationRegistry {
    pub fn new(config: LongPollConfig) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                holders: DashMap::new(),
                next_id: AtomicU64::new(1),
                config,
            }),
        }
    }

    /// Registers a pending request under every distinct watch key.
    ///
    /// Each key is paired with the namespace the client requested it for;
    /// a notification for the key carries that name. The first pairing of a
    /// repeated key wins.
    pub fn register<I>(
        &self,
        watch_keys: I,
    ) -> HolderRegistration
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut keys = HashMap::new();
        for (key, namespace) in watch_keys {
            keys.entry(key).or_insert(namespace);
        }

        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (holder, receiver) = DeferredNotification::new(id, keys);
        let holder = Arc::new(holder);

        PENDING_LONG_POLLS.inc();
        for key in holder.watch_keys() {
            self.inner.holders.entry(key.to_string()).or_default().push(holder.clone());
        }
        // A delivery on an early key may have completed and deregistered the
        // holder before the later keys were inserted.
        if holder.is_deregistered() {
            self.inner.remove_from_keys(&holder);
        }
        record_long_poll_event("registered");

        trace!(holder_id = id, keys = ?holder.watch_keys().collect::<Vec<_>>(), "holder registered");

        HolderRegistration {
            holder,
            receiver,
            registry: self.inner.clone(),
        }
    }

    /// Bounded wait for a request asking for `requested` (or the default)
    pub fn effective_timeout(
        &self,
        requested: Option<Duration>,
    ) -> Duration {
        let max = self.inner.config.timeout();
        requested.map_or(max, |requested| requested.min(max))
    }

    /// Number of distinct watch keys with at least one pending holder
    pub fn watched_key_count(&self) -> usize {
        self.inner.holders.len()
    }

    /// Number of holders currently registered under `watch_key`
    pub fn holder_count(
        &self,
        watch_key: &str,
    ) -> usize {
        self.inner.holders.get(watch_key).map_or(0, |holders| holders.len())
    }

    /// Completes every holder waiting on the message's watch key.
    pub fn deliver(
        &self,
        message: &ReleaseMessage,
    ) {
        let Some(namespace) = namespace_of(&message.message) else {
            error!(key = %message.message, "release message with malformed watch key");
            return;
        };

        let Some((_, holders)) = self.inner.holders.remove(&message.message) else {
            return;
        };

        let mut notification = ConfigNotification::new(namespace, message.id);
        notification.add_message(message.message.clone(), message.id);

        let batch_size = self.inner.config.notification_batch_size;
        if holders.len() > batch_size {
            let interval = self.inner.config.notification_batch_interval();
            info!(
                key = %message.message,
                holders = holders.len(),
                batch_size,
                "completing long polls in batches"
            );
            let inner = self.inner.clone();
            let watch_key = message.message.clone();
            tokio::spawn(async move {
                for (round, batch) in holders.chunks(batch_size).enumerate() {
                    if round > 0 {
                        tokio::time::sleep(interval).await;
                    }
                    for holder in batch {
                        inner.complete(holder, &watch_key, &notification);
                    }
                }
            });
            return;
        }

        debug!(key = %message.message, holders = holders.len(), "completing long polls");
        for holder in &holders {
            self.inner.complete(holder, &message.message, &notification);
        }
    }
}

#[async_trait]
impl ReleaseMessageListener for NotificationRegistry {
    async fn handle_message(
        &self,
        message: &ReleaseMessage,
        channel: &str,
    ) {
        if channel != RELEASE_MESSAGE_TOPIC || message.message.is_empty() {
            return;
        }
        self.deliver(message);
    }
}
