//! Records exchanged between the store, the caches and clients.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::keys;

/// Identifies one logical config stream.
///
/// `data_center` takes part in fallback resolution only; it is not part of the
/// stream's storage identity and never appears in its watch key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Coordinate {
    pub app_id: String,
    pub cluster: String,
    pub env: String,
    pub namespace: String,
    pub data_center: Option<String>,
}

impl Coordinate {
    pub fn new(
        app_id: impl Into<String>,
        cluster: impl Into<String>,
        env: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            cluster: cluster.into(),
            env: env.into(),
            namespace: namespace.into(),
            data_center: None,
        }
    }

    pub fn with_data_center(
        mut self,
        data_center: impl Into<String>,
    ) -> Self {
        self.data_center = Some(data_center.into());
        self
    }

    pub fn watch_key(&self) -> String {
        keys::watch_key(&self.app_id, &self.cluster, &self.env, &self.namespace)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}", self.watch_key())
    }
}

/// Immutable snapshot of a namespace's configuration at publish time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Release {
    pub id: i64,
    pub release_key: String,
    pub app_id: String,
    pub cluster: String,
    pub env: String,
    pub namespace: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub configurations: BTreeMap<String, String>,
    #[serde(default)]
    pub abandoned: bool,
}

/// "The release behind this watch key has changed."
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseMessage {
    pub id: i64,
    /// The watch key of the changed stream
    pub message: String,
}

impl ReleaseMessage {
    pub fn new(
        id: i64,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id,
            message: message.into(),
        }
    }
}

/// Namespace definition from the namespace registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppNamespace {
    pub app_id: String,
    pub name: String,
    #[serde(default)]
    pub is_public: bool,
}

impl AppNamespace {
    pub fn new(
        app_id: impl Into<String>,
        name: impl Into<String>,
        is_public: bool,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            name: name.into(),
            is_public,
        }
    }
}

/// Latest notification id per watch key, as last seen by a client.
///
/// Handed out with every change notification and echoed back by the client on
/// its next config read so the release cache can tell whether it is behind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationMessages {
    #[serde(default)]
    pub details: HashMap<String, i64>,
}

impl NotificationMessages {
    pub fn put(
        &mut self,
        key: impl Into<String>,
        notification_id: i64,
    ) {
        self.details.insert(key.into(), notification_id);
    }

    pub fn get(
        &self,
        key: &str,
    ) -> Option<i64> {
        self.details.get(key).copied()
    }

    pub fn has(
        &self,
        key: &str,
    ) -> bool {
        self.details.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.details.is_empty()
    }

    /// Keeps the larger id for keys present on both sides.
    pub fn merge_from(
        &mut self,
        other: &NotificationMessages,
    ) {
        for (key, id) in &other.details {
            let current = self.details.entry(key.clone()).or_insert(*id);
            if *id > *current {
                *current = *id;
            }
        }
    }
}

/// One changed namespace reported to a long-polling client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigNotification {
    pub namespace_name: String,
    pub notification_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<NotificationMessages>,
}

impl ConfigNotification {
    pub fn new(
        namespace_name: impl Into<String>,
        notification_id: i64,
    ) -> Self {
        Self {
            namespace_name: namespace_name.into(),
            notification_id,
            messages: None,
        }
    }

    pub fn add_message(
        &mut self,
        key: impl Into<String>,
        notification_id: i64,
    ) {
        self.messages
            .get_or_insert_with(NotificationMessages::default)
            .put(key, notification_id);
    }
}

/// Effective configuration returned to a client read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApolloConfig {
    pub app_id: String,
    pub cluster: String,
    pub namespace_name: String,
    pub configurations: BTreeMap<String, String>,
    pub release_key: String,
}
