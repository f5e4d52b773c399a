use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::debug;
use tracing::error;

use super::ReleaseMessageListener;
use crate::constants::RELEASE_MESSAGE_TOPIC;
use crate::metrics::RELEASE_MESSAGES_RECEIVED;
use crate::model::ReleaseMessage;

/// Fans release messages out to every registered listener.
///
/// Listeners are called one after another in registration order. A listener
/// that panics is logged and skipped; the remaining listeners still run.
#[derive(Default)]
pub struct ReleaseMessageBus {
    listeners: Vec<Arc<dyn ReleaseMessageListener>>,
}

impl fmt::Debug for ReleaseMessageBus {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("ReleaseMessageBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl ReleaseMessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_listener(
        mut self,
        listener: Arc<dyn ReleaseMessageListener>,
    ) -> Self {
        self.add_listener(listener);
        self
    }

    pub fn add_listener(
        &mut self,
        listener: Arc<dyn ReleaseMessageListener>,
    ) {
        self.listeners.push(listener);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// A release for `watch_key` was published (or rolled back) and recorded
    /// as message `notification_id`.
    ///
    /// Safe to call more than once for the same message.
    pub async fn on_release_published(
        &self,
        watch_key: &str,
        notification_id: i64,
    ) {
        let message = ReleaseMessage::new(notification_id, watch_key);
        self.publish(&message, RELEASE_MESSAGE_TOPIC).await;
    }

    pub async fn publish(
        &self,
        message: &ReleaseMessage,
        channel: &str,
    ) {
        RELEASE_MESSAGES_RECEIVED.with_label_values(&[channel]).inc();
        debug!(id = message.id, key = %message.message, channel, "dispatching release message");

        for listener in &self.listeners {
            let delivery = AssertUnwindSafe(listener.handle_message(message, channel));
            if let Err(panic) = delivery.catch_unwind().await {
                error!(
                    id = message.id,
                    key = %message.message,
                    reason = panic_message(panic.as_ref()),
                    "release message listener panicked"
                );
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(text) = payload.downcast_ref::<&str>() {
        text
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.as_str()
    } else {
        "unknown"
    }
}
