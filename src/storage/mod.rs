//! Durable store abstraction.
//!
//! The config service never writes releases itself. It reads three narrow
//! views of the store owned by the administrative layer:
//!
//! - [`ReleaseStore`]: active releases by coordinate or id
//! - [`ReleaseMessageStore`]: the append-only release message log
//! - [`NamespaceRegistry`]: namespace ownership and public namespaces
//!
//! Implementations must be safe to call concurrently; calls may block on I/O.
//! A returned `StorageError` is surfaced to the reader that triggered the call
//! and is never cached.

mod adaptors;
pub use adaptors::*;

use async_trait::async_trait;
#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

use crate::model::AppNamespace;
use crate::model::Release;
use crate::model::ReleaseMessage;
use crate::StorageError;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait ReleaseStore: Send + Sync + 'static {
    /// Latest non-abandoned release of the coordinate
    async fn find_latest_active_release(
        &self,
        app_id: &str,
        cluster: &str,
        env: &str,
        namespace: &str,
    ) -> Result<Option<Release>, StorageError>;

    /// Release by id, if it exists and is not abandoned
    async fn find_active_release_by_id(
        &self,
        id: i64,
    ) -> Result<Option<Release>, StorageError>;
}

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait ReleaseMessageStore: Send + Sync + 'static {
    /// Message with the highest id among those addressed to any of `watch_keys`
    async fn find_latest_release_message(
        &self,
        watch_keys: &[String],
    ) -> Result<Option<ReleaseMessage>, StorageError>;

    /// Latest message per watch key; keys without messages are left out
    async fn find_latest_release_messages_group_by_keys(
        &self,
        watch_keys: &[String],
    ) -> Result<Vec<ReleaseMessage>, StorageError>;

    /// Up to `limit` messages with id greater than `after_id`, ascending by id
    async fn find_release_messages_after(
        &self,
        after_id: i64,
        limit: usize,
    ) -> Result<Vec<ReleaseMessage>, StorageError>;

    /// Highest message id in the log
    async fn find_max_message_id(&self) -> Result<Option<i64>, StorageError>;
}

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait NamespaceRegistry: Send + Sync + 'static {
    /// Public namespace definitions whose names match any of `names`, ignoring case
    async fn find_public_namespaces_by_names(
        &self,
        names: &[String],
    ) -> Result<Vec<AppNamespace>, StorageError>;

    /// Subset of `names` owned by `app_id`, in their registered spelling
    async fn find_namespaces_owned_by_app(
        &self,
        app_id: &str,
        names: &[String],
    ) -> Result<Vec<String>, StorageError>;

    /// Namespace of `app_id` whose name matches `name` ignoring case
    async fn find_app_namespace(
        &self,
        app_id: &str,
        name: &str,
    ) -> Result<Option<AppNamespace>, StorageError>;

    /// Public namespace whose name matches `name` ignoring case
    async fn find_public_namespace(
        &self,
        name: &str,
    ) -> Result<Option<AppNamespace>, StorageError>;
}
