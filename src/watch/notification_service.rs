use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::NotificationRegistry;
use super::WatchKeyAssembler;
use crate::constants::NOTIFICATION_ID_PLACEHOLDER;
use crate::metrics::record_long_poll_event;
use crate::model::ConfigNotification;
use crate::utils::namespace::filter_namespace_name;
use crate::utils::namespace::normalize_namespace;
use crate::Error;
use crate::NamespaceRegistry;
use crate::ReleaseMessageStore;
use crate::Result;

/// A client's long-poll request
#[derive(Debug, Clone)]
pub struct PollRequest {
    pub app_id: String,
    pub cluster: String,
    pub env: String,
    pub data_center: Option<String>,
    /// Latest notification id the client holds per namespace
    pub notifications: Vec<ConfigNotification>,
    /// Client-requested wait, capped by the configured timeout
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Changed(Vec<ConfigNotification>),
    NotModified,
}

/// What the client told us about one namespace
#[derive(Debug)]
struct ClientNamespace {
    /// Name as sent, minus any `.properties` suffix
    original: String,
    notification_id: i64,
}

/// Long-poll entry point: answers at once if the client is already behind,
/// otherwise holds the request until a relevant release message or timeout.
#[derive(Clone)]
pub struct NotificationService {
    registry: NotificationRegistry,
    assembler: WatchKeyAssembler,
    namespace_registry: Arc<dyn NamespaceRegistry>,
    message_store: Arc<dyn ReleaseMessageStore>,
}

impl std::fmt::Debug for NotificationService {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("NotificationService")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl NotificationService {
    pub fn new(
        registry: NotificationRegistry,
        namespace_registry: Arc<dyn NamespaceRegistry>,
        message_store: Arc<dyn ReleaseMessageStore>,
    ) -> Self {
        Self {
            registry,
            assembler: WatchKeyAssembler::new(namespace_registry.clone()),
            namespace_registry,
            message_store,
        }
    }

    pub fn registry(&self) -> &NotificationRegistry {
        &self.registry
    }

    pub async fn poll_notifications(
        &self,
        request: PollRequest,
    ) -> Result<PollOutcome> {
        let client_namespaces = self.filter_notifications(&request.app_id, &request.notifications).await?;
        if client_namespaces.is_empty() {
            return Err(Error::InvalidRequest("Invalid format of notifications".to_string()));
        }

        let namespaces: Vec<String> = client_namespaces.keys().cloned().collect();
        let watched = self
            .assembler
            .assemble_all_watch_keys(
                &request.app_id,
                &request.cluster,
                &request.env,
                &namespaces,
                request.data_center.as_deref(),
            )
            .await?;
        // watch key → namespace as the client spelled it
        let key_namespaces: HashMap<String, String> = watched
            .iter()
            .filter_map(|(normalized, keys)| client_namespaces.get(normalized).map(|client| (keys, client)))
            .flat_map(|(keys, client)| keys.iter().map(move |key| (key.clone(), client.original.clone())))
            .collect();
        let watch_keys: Vec<String> = key_namespaces.keys().cloned().collect();

        // Registered before reading the latest messages, so a release landing
        // in between is caught by one of the two.
        let registration = self.registry.register(key_namespaces);

        let latest: HashMap<String, i64> = self
            .message_store
            .find_latest_release_messages_group_by_keys(&watch_keys)
            .await?
            .into_iter()
            .map(|message| (message.message, message.id))
            .collect();

        let changed = changed_notifications(&client_namespaces, &watched, &latest);
        if !changed.is_empty() && registration.holder().complete(changed) {
            record_long_poll_event("immediate");
            debug!(app_id = %request.app_id, "client is behind, answering immediately");
        }

        let timeout = self.registry.effective_timeout(request.timeout);
        Ok(match registration.wait(timeout).await {
            Some(notifications) => PollOutcome::Changed(notifications),
            None => PollOutcome::NotModified,
        })
    }

    /// Normalized namespace name → client view.
    ///
    /// When several client spellings normalize to the same name, the one with
    /// the smallest notification id is kept so that it gets updated.
    async fn filter_notifications(
        &self,
        app_id: &str,
        notifications: &[ConfigNotification],
    ) -> Result<HashMap<String, ClientNamespace>> {
        let mut filtered: HashMap<String, ClientNamespace> = HashMap::new();
        for notification in notifications {
            if notification.namespace_name.is_empty() {
                continue;
            }
            let original = filter_namespace_name(&notification.namespace_name).to_string();
            let normalized = normalize_namespace(self.namespace_registry.as_ref(), app_id, &original).await?;

            if filtered
                .get(&normalized)
                .is_some_and(|existing| existing.notification_id < notification.notification_id)
            {
                continue;
            }
            filtered.insert(
                normalized,
                ClientNamespace {
                    original,
                    notification_id: notification.notification_id,
                },
            );
        }
        Ok(filtered)
    }
}

/// Namespaces whose latest message is newer than what the client holds,
/// named the way the client sent them
fn changed_notifications(
    client_namespaces: &HashMap<String, ClientNamespace>,
    watched: &HashMap<String, HashSet<String>>,
    latest: &HashMap<String, i64>,
) -> Vec<ConfigNotification> {
    let mut changed = Vec::new();
    for (namespace, client) in client_namespaces {
        let Some(keys) = watched.get(namespace) else {
            continue;
        };

        let latest_id = keys
            .iter()
            .filter_map(|key| latest.get(key))
            .copied()
            .max()
            .unwrap_or(NOTIFICATION_ID_PLACEHOLDER);
        if latest_id <= client.notification_id {
            continue;
        }

        let mut notification = ConfigNotification::new(client.original.clone(), latest_id);
        for key in keys {
            if let Some(id) = latest.get(key) {
                notification.add_message(key.clone(), *id);
            }
        }
        changed.push(notification);
    }
    changed
}
