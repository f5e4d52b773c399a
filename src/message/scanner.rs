//! Tails the durable release message log and feeds new messages to the bus.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::ReleaseMessageBus;
use crate::config::MessageScanConfig;
use crate::constants::RELEASE_MESSAGE_TOPIC;
use crate::ReleaseMessageStore;
use crate::Result;

pub struct ReleaseMessageScanner {
    store: Arc<dyn ReleaseMessageStore>,
    bus: Arc<ReleaseMessageBus>,
    config: MessageScanConfig,
    /// Highest message id already published
    cursor: i64,
}

impl std::fmt::Debug for ReleaseMessageScanner {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("ReleaseMessageScanner")
            .field("cursor", &self.cursor)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ReleaseMessageScanner {
    /// Positions the cursor at the newest message in the store; only messages
    /// persisted afterwards are delivered.
    pub async fn new(
        store: Arc<dyn ReleaseMessageStore>,
        bus: Arc<ReleaseMessageBus>,
        config: MessageScanConfig,
    ) -> Result<Self> {
        let cursor = store.find_max_message_id().await?.unwrap_or(0);
        info!(cursor, "release message scanner initialized");
        Ok(Self {
            store,
            bus,
            config,
            cursor,
        })
    }

    pub fn cursor(&self) -> i64 {
        self.cursor
    }

    /// Publishes everything persisted after the cursor; returns how many messages
    /// were delivered.
    ///
    /// On a store failure the cursor stays after the last delivered message.
    pub async fn scan_once(&mut self) -> Result<usize> {
        let mut delivered = 0;
        loop {
            let messages = self
                .store
                .find_release_messages_after(self.cursor, self.config.scan_batch_size)
                .await?;
            let fetched = messages.len();

            for message in messages {
                self.bus.publish(&message, RELEASE_MESSAGE_TOPIC).await;
                self.cursor = self.cursor.max(message.id);
                delivered += 1;
            }

            if fetched < self.config.scan_batch_size {
                break;
            }
        }

        if delivered > 0 {
            debug!(delivered, cursor = self.cursor, "release messages scanned");
        }
        Ok(delivered)
    }

    /// Scans every `scan_interval_in_ms` until the shutdown signal fires
    pub async fn run(
        mut self,
        mut shutdown_signal: watch::Receiver<()>,
    ) {
        let mut interval = tokio::time::interval(self.config.scan_interval());
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.scan_once().await {
                        warn!(cursor = self.cursor, error = %e, "release message scan failed");
                    }
                }
                _ = shutdown_signal.changed() => {
                    info!("release message scanner received shutdown signal");
                    break;
                }
            }
        }
        debug!(cursor = self.cursor, "release message scanner stopped");
    }

    pub fn spawn(
        self,
        shutdown_signal: watch::Receiver<()>,
    ) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown_signal))
    }
}
