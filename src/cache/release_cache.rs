//! Notification-aware release cache.
//!
//! Fronts the durable store with two single-flight caches:
//!
//! - watch key → [`ConfigCacheEntry`] (latest notification id + latest active release)
//! - release id → release
//!
//! A reader that already holds a notification id newer than the cached entry
//! forces one synchronous reload, so a client never reads a release older than
//! a change notification it has received. Release messages invalidate the
//! matching entry and warm it up again on a background task.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use super::SingleFlightCache;
use crate::config::CacheConfig;
use crate::constants::NOTIFICATION_ID_PLACEHOLDER;
use crate::constants::RELEASE_MESSAGE_TOPIC;
use crate::keys::split_watch_key;
use crate::message::ReleaseMessageListener;
use crate::metrics::record_cache_event;
use crate::metrics::CACHE_LOAD_DURATION_METRIC;
use crate::metrics::CONFIG_CACHE_EVENTS;
use crate::model::Coordinate;
use crate::model::NotificationMessages;
use crate::model::Release;
use crate::model::ReleaseMessage;
use crate::ReleaseMessageStore;
use crate::ReleaseStore;
use crate::Result;
use crate::StorageError;

/// Cached state of one watch key
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigCacheEntry {
    /// Id of the latest release message seen for the key, or the placeholder
    pub notification_id: i64,
    pub release: Option<Arc<Release>>,
}

impl ConfigCacheEntry {
    /// Cached for keys with neither a message nor a release
    fn absent() -> Self {
        Self {
            notification_id: NOTIFICATION_ID_PLACEHOLDER,
            release: None,
        }
    }
}

struct ReleaseCacheInner {
    config_cache: SingleFlightCache<String, ConfigCacheEntry>,
    config_id_cache: SingleFlightCache<i64, Option<Arc<Release>>>,
    release_store: Arc<dyn ReleaseStore>,
    message_store: Arc<dyn ReleaseMessageStore>,
}

#[derive(Clone)]
pub struct ReleaseCache {
    inner: Arc<ReleaseCacheInner>,
}

impl std::fmt::Debug for ReleaseCache {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("ReleaseCache")
            .field("config_cache", &self.inner.config_cache)
            .field("config_id_cache", &self.inner.config_id_cache)
            .finish_non_exhaustive()
    }
}

impl ReleaseCache {
    pub fn new(
        release_store: Arc<dyn ReleaseStore>,
        message_store: Arc<dyn ReleaseMessageStore>,
        config: &CacheConfig,
    ) -> Self {
        Self {
            inner: Arc::new(ReleaseCacheInner {
                config_cache: SingleFlightCache::new(config.expire_after_access()),
                config_id_cache: SingleFlightCache::new(config.expire_after_access()),
                release_store,
                message_store,
            }),
        }
    }

    /// Latest active release of `coordinate`.
    ///
    /// If `client_notification_id` is newer than the cached entry, the entry is
    /// reloaded before answering.
    pub async fn find_latest_active_release(
        &self,
        coordinate: &Coordinate,
        client_notification_id: Option<i64>,
    ) -> Result<Option<Arc<Release>>> {
        let key = coordinate.watch_key();
        record_cache_event("get");

        let mut entry = self.entry(&key).await?;

        if let Some(client_id) = client_notification_id {
            if client_id > entry.notification_id {
                // Many readers may present the same newer id at once; only an
                // entry still older than it is dropped, later readers join the reload.
                if self
                    .inner
                    .config_cache
                    .invalidate_if(&key, |current| current.notification_id < client_id)
                {
                    record_cache_event("invalidate");
                    debug!(
                        key = %key,
                        cached = entry.notification_id,
                        client = client_id,
                        "cache is out of date, reloading"
                    );
                }
                entry = self.entry(&key).await?;
            }
        }

        Ok(entry.release)
    }

    /// Same as [`Self::find_latest_active_release`], taking the id the client
    /// echoed back for this coordinate's watch key
    pub async fn find_latest_active_release_with_messages(
        &self,
        coordinate: &Coordinate,
        client_messages: Option<&NotificationMessages>,
    ) -> Result<Option<Arc<Release>>> {
        let client_notification_id = client_messages.and_then(|m| m.get(&coordinate.watch_key()));
        self.find_latest_active_release(coordinate, client_notification_id).await
    }

    /// Active release by id, independent of any coordinate
    pub async fn find_active_release(
        &self,
        release_id: i64,
    ) -> Result<Option<Arc<Release>>> {
        record_cache_event("get_by_id");
        let store = &self.inner.release_store;

        let release = self
            .inner
            .config_id_cache
            .get_or_load(&release_id, || async move {
                record_cache_event("load_by_id");
                let started = Instant::now();
                let result = store.find_active_release_by_id(release_id).await;
                observe_load_duration("id", started);
                result
                    .map(|release| release.map(Arc::new))
                    .map_err(|e| {
                        warn!(release_id, error = %e, "failed to load release by id");
                        record_cache_event("load_failure");
                        e
                    })
            })
            .await?;
        Ok(release)
    }

    /// Cached entry for `watch_key`, loading it if absent
    pub async fn entry(
        &self,
        watch_key: &str,
    ) -> Result<ConfigCacheEntry> {
        let key = watch_key.to_string();
        let entry = self.inner.config_cache.get_or_load(&key, || self.load(watch_key)).await?;
        Ok(entry)
    }

    /// Drops the entry of `watch_key`; the next read reloads it
    pub fn invalidate(
        &self,
        watch_key: &str,
    ) {
        if self.inner.config_cache.invalidate(&watch_key.to_string()) {
            record_cache_event("invalidate");
            debug!(key = %watch_key, "cache invalidated");
        }
    }

    /// Removes idle entries from both caches; returns how many were removed
    pub fn evict_idle(&self) -> usize {
        let evicted = self.inner.config_cache.evict_idle() + self.inner.config_id_cache.evict_idle();
        if evicted > 0 {
            CONFIG_CACHE_EVENTS.with_label_values(&["evict"]).inc_by(evicted as u64);
        }
        evicted
    }

    /// Runs [`Self::evict_idle`] every `interval` until shutdown
    pub fn spawn_sweeper(
        &self,
        interval: Duration,
        mut shutdown: watch::Receiver<()>,
    ) -> JoinHandle<()> {
        let cache = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let evicted = cache.evict_idle();
                        if evicted > 0 {
                            debug!(evicted, "idle cache entries evicted");
                        }
                    }
                    _ = shutdown.changed() => {
                        debug!("cache sweeper received shutdown signal");
                        break;
                    }
                }
            }
        })
    }

    pub fn len(&self) -> usize {
        self.inner.config_cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.config_cache.is_empty()
    }

    fn spawn_warm_up(
        &self,
        watch_key: String,
    ) -> JoinHandle<()> {
        let cache = self.clone();
        tokio::spawn(async move {
            if let Err(e) = cache.entry(&watch_key).await {
                record_cache_event("warm_up_failure");
                debug!(key = %watch_key, error = %e, "cache warm up failed");
            }
        })
    }

    async fn load(
        &self,
        watch_key: &str,
    ) -> std::result::Result<ConfigCacheEntry, StorageError> {
        let Some(parts) = split_watch_key(watch_key) else {
            error!(key = %watch_key, "Invalid cache load key");
            record_cache_event("malformed_key");
            return Ok(ConfigCacheEntry::absent());
        };

        record_cache_event("load");
        let started = Instant::now();

        // Message first: a release published in between makes the entry look
        // older than it is, which at worst costs one extra reload.
        let watch_keys = [watch_key.to_string()];
        let loaded = async {
            let latest_message = self.inner.message_store.find_latest_release_message(&watch_keys).await?;
            let latest_release = self
                .inner
                .release_store
                .find_latest_active_release(parts.app_id, parts.cluster, parts.env, parts.namespace)
                .await?;
            Ok::<_, StorageError>((latest_message, latest_release))
        }
        .await;
        observe_load_duration("config", started);

        let (latest_message, latest_release) = loaded.map_err(|e| {
            warn!(key = %watch_key, error = %e, "failed to load config cache entry");
            record_cache_event("load_failure");
            e
        })?;

        let notification_id = latest_message
            .map(|message| message.id)
            .unwrap_or(NOTIFICATION_ID_PLACEHOLDER);

        if notification_id == NOTIFICATION_ID_PLACEHOLDER && latest_release.is_none() {
            return Ok(ConfigCacheEntry::absent());
        }

        Ok(ConfigCacheEntry {
            notification_id,
            release: latest_release.map(Arc::new),
        })
    }
}

fn observe_load_duration(
    cache: &str,
    started: Instant,
) {
    CACHE_LOAD_DURATION_METRIC
        .with_label_values(&[cache])
        .observe(started.elapsed().as_secs_f64() * 1000.0);
}

#[async_trait]
impl ReleaseMessageListener for ReleaseCache {
    async fn handle_message(
        &self,
        message: &ReleaseMessage,
        channel: &str,
    ) {
        info!(channel, message = ?message, "message received");
        if channel != RELEASE_MESSAGE_TOPIC || message.message.is_empty() {
            return;
        }

        self.invalidate(&message.message);
        // warm up the cache
        self.spawn_warm_up(message.message.clone());
    }
}
