//! Watch-key and release-key generation.
//!
//! A watch key names one (app, cluster, env, namespace) config stream. It is
//! the unit of release-cache identity and of change-notification addressing.

mod release_key;
pub use release_key::*;

#[cfg(test)]
mod keys_test;

use crate::constants::CLUSTER_NAMESPACE_SEPARATOR;

/// Components of a well-formed watch key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchKeyParts<'a> {
    pub app_id: &'a str,
    pub cluster: &'a str,
    pub env: &'a str,
    pub namespace: &'a str,
}

pub fn watch_key(
    app_id: &str,
    cluster: &str,
    env: &str,
    namespace: &str,
) -> String {
    [app_id, cluster, env, namespace].join(CLUSTER_NAMESPACE_SEPARATOR)
}

/// Splits a watch key, omitting empty segments.
///
/// Returns `None` unless exactly four non-empty components remain.
pub fn split_watch_key(key: &str) -> Option<WatchKeyParts<'_>> {
    let mut parts = key.split(CLUSTER_NAMESPACE_SEPARATOR).filter(|s| !s.is_empty());
    let parsed = WatchKeyParts {
        app_id: parts.next()?,
        cluster: parts.next()?,
        env: parts.next()?,
        namespace: parts.next()?,
    };
    if parts.next().is_some() {
        return None;
    }
    Some(parsed)
}

/// Namespace component of a watch key, if the key is well formed
pub fn namespace_of(key: &str) -> Option<&str> {
    split_watch_key(key).map(|parts| parts.namespace)
}
