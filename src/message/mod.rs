//! Release message delivery.
//!
//! The administrative layer appends a [`ReleaseMessage`] to the durable log
//! every time it publishes or rolls back a release. Messages reach the
//! in-process listeners (release cache invalidation, long-poll wake-up) in
//! two ways:
//!
//! - [`ReleaseMessageScanner`] tails the log in the durable store
//! - [`ReleaseMessageBus::on_release_published`] is called directly by a
//!   publisher living in the same process
//!
//! Delivery is at-least-once: a message may reach a listener twice (for
//! example once directly and once through the scanner). Listeners are
//! idempotent and never report errors back to the bus.

mod bus;
mod scanner;
pub use bus::*;
pub use scanner::*;


use async_trait::async_trait;

use crate::model::ReleaseMessage;

/// Receiver of release messages published on a channel
#[async_trait]
pub trait ReleaseMessageListener: Send + Sync + 'static {
    /// Must not block for long; heavy follow-up work belongs on a spawned task
    async fn handle_message(
        &self,
        message: &ReleaseMessage,
        channel: &str,
    );
}
