use std::collections::BTreeMap;
use std::collections::HashSet;
use std::ops::Bound;
use std::path::Path;
use std::sync::atomic::AtomicI64;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Deserialize;
use tracing::debug;
use tracing::info;

use crate::constants::CLUSTER_NAMESPACE_SEPARATOR;
use crate::keys::generate_release_key;
use crate::model::AppNamespace;
use crate::model::Coordinate;
use crate::model::Release;
use crate::model::ReleaseMessage;
use crate::utils::CaseInsensitiveMap;
use crate::NamespaceRegistry;
use crate::ReleaseMessageStore;
use crate::ReleaseStore;
use crate::Result;
use crate::StorageError;

/// Namespace definitions indexed case-insensitively
#[derive(Debug, Default)]
struct NamespaceIndex {
    /// `{app_id}+{name}` → definition
    by_app: CaseInsensitiveMap<AppNamespace>,
    /// public namespace name → definition
    public: CaseInsensitiveMap<AppNamespace>,
}

fn app_namespace_key(
    app_id: &str,
    name: &str,
) -> String {
    format!("{app_id}{CLUSTER_NAMESPACE_SEPARATOR}{name}")
}

/// Contents of a seed file loaded by [`MemoryConfigStore::load_seed`]
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedData {
    #[serde(default)]
    pub namespaces: Vec<AppNamespace>,
    #[serde(default)]
    pub releases: Vec<SeedRelease>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedRelease {
    pub app_id: String,
    pub cluster: String,
    pub env: String,
    pub namespace: String,
    #[serde(default)]
    pub configurations: BTreeMap<String, String>,
}

/// In-memory implementation of all three store views.
///
/// Stands in for the administrative layer's database in tests and in the
/// standalone binary: the `publish_release`/`rollback_release` calls do what
/// the admin portal does on publish, appending a release message for the
/// affected watch key.
#[derive(Debug)]
pub struct MemoryConfigStore {
    releases: RwLock<BTreeMap<i64, Release>>,
    messages: RwLock<BTreeMap<i64, ReleaseMessage>>,
    namespaces: RwLock<NamespaceIndex>,
    next_release_id: AtomicI64,
    next_message_id: AtomicI64,
}

impl Default for MemoryConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self {
            releases: RwLock::new(BTreeMap::new()),
            messages: RwLock::new(BTreeMap::new()),
            namespaces: RwLock::new(NamespaceIndex::default()),
            next_release_id: AtomicI64::new(1),
            next_message_id: AtomicI64::new(1),
        }
    }

    /// Loads namespaces and releases from a JSON seed file.
    pub async fn load_seed(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<()> {
        let raw = tokio::fs::read_to_string(path.as_ref()).await?;
        let seed: SeedData = serde_json::from_str(&raw)?;
        self.apply_seed(seed);
        info!(path = %path.as_ref().display(), "seed data loaded");
        Ok(())
    }

    pub fn apply_seed(
        &self,
        seed: SeedData,
    ) {
        for namespace in seed.namespaces {
            self.register_namespace(namespace);
        }
        for release in seed.releases {
            let coordinate = Coordinate::new(release.app_id, release.cluster, release.env, release.namespace);
            self.publish_release(&coordinate, release.configurations);
        }
    }

    /// Registers (or replaces) a namespace definition
    pub fn register_namespace(
        &self,
        namespace: AppNamespace,
    ) {
        let mut index = self.namespaces.write();
        if namespace.is_public {
            index.public.put(&namespace.name, namespace.clone());
        }
        index
            .by_app
            .put(&app_namespace_key(&namespace.app_id, &namespace.name), namespace);
    }

    /// Stores a new release for `coordinate` and appends a release message for
    /// its watch key.
    pub fn publish_release(
        &self,
        coordinate: &Coordinate,
        configurations: BTreeMap<String, String>,
    ) -> (Release, ReleaseMessage) {
        let id = self.next_release_id.fetch_add(1, Ordering::SeqCst);
        let release = Release {
            id,
            release_key: generate_release_key(&coordinate.app_id, &coordinate.cluster, &coordinate.namespace),
            app_id: coordinate.app_id.clone(),
            cluster: coordinate.cluster.clone(),
            env: coordinate.env.clone(),
            namespace: coordinate.namespace.clone(),
            name: format!("release-{id}"),
            configurations,
            abandoned: false,
        };
        self.releases.write().insert(id, release.clone());
        let message = self.append_release_message(coordinate.watch_key());

        debug!(release_id = id, watch_key = %message.message, "release published");
        (release, message)
    }

    /// Abandons a release so that the previous one becomes active again.
    ///
    /// Returns the release message appended for the affected watch key, or
    /// `None` if no active release has this id.
    pub fn rollback_release(
        &self,
        release_id: i64,
    ) -> Option<ReleaseMessage> {
        let watch_key = {
            let mut releases = self.releases.write();
            let release = releases.get_mut(&release_id).filter(|r| !r.abandoned)?;
            release.abandoned = true;
            Coordinate::new(&release.app_id, &release.cluster, &release.env, &release.namespace).watch_key()
        };
        Some(self.append_release_message(watch_key))
    }

    /// Appends a message to the release message log
    pub fn append_release_message(
        &self,
        watch_key: impl Into<String>,
    ) -> ReleaseMessage {
        let mut messages = self.messages.write();
        let id = self.next_message_id.fetch_add(1, Ordering::SeqCst);
        let message = ReleaseMessage::new(id, watch_key);
        messages.insert(id, message.clone());
        message
    }

    fn latest_message_for(
        messages: &BTreeMap<i64, ReleaseMessage>,
        watch_key: &str,
    ) -> Option<ReleaseMessage> {
        messages.values().rev().find(|m| m.message == watch_key).cloned()
    }
}

#[async_trait]
impl ReleaseStore for MemoryConfigStore {
    async fn find_latest_active_release(
        &self,
        app_id: &str,
        cluster: &str,
        env: &str,
        namespace: &str,
    ) -> std::result::Result<Option<Release>, StorageError> {
        let releases = self.releases.read();
        Ok(releases
            .values()
            .rev()
            .find(|r| {
                !r.abandoned && r.app_id == app_id && r.cluster == cluster && r.env == env && r.namespace == namespace
            })
            .cloned())
    }

    async fn find_active_release_by_id(
        &self,
        id: i64,
    ) -> std::result::Result<Option<Release>, StorageError> {
        Ok(self.releases.read().get(&id).filter(|r| !r.abandoned).cloned())
    }
}

#[async_trait]
impl ReleaseMessageStore for MemoryConfigStore {
    async fn find_latest_release_message(
        &self,
        watch_keys: &[String],
    ) -> std::result::Result<Option<ReleaseMessage>, StorageError> {
        let wanted: HashSet<&str> = watch_keys.iter().map(String::as_str).collect();
        let messages = self.messages.read();
        Ok(messages.values().rev().find(|m| wanted.contains(m.message.as_str())).cloned())
    }

    async fn find_latest_release_messages_group_by_keys(
        &self,
        watch_keys: &[String],
    ) -> std::result::Result<Vec<ReleaseMessage>, StorageError> {
        let messages = self.messages.read();
        let unique: HashSet<&String> = watch_keys.iter().collect();
        Ok(unique
            .into_iter()
            .filter_map(|key| Self::latest_message_for(&messages, key))
            .collect())
    }

    async fn find_release_messages_after(
        &self,
        after_id: i64,
        limit: usize,
    ) -> std::result::Result<Vec<ReleaseMessage>, StorageError> {
        let messages = self.messages.read();
        Ok(messages
            .range((Bound::Excluded(after_id), Bound::Unbounded))
            .take(limit)
            .map(|(_, m)| m.clone())
            .collect())
    }

    async fn find_max_message_id(&self) -> std::result::Result<Option<i64>, StorageError> {
        Ok(self.messages.read().keys().next_back().copied())
    }
}

#[async_trait]
impl NamespaceRegistry for MemoryConfigStore {
    async fn find_public_namespaces_by_names(
        &self,
        names: &[String],
    ) -> std::result::Result<Vec<AppNamespace>, StorageError> {
        let index = self.namespaces.read();
        let mut found: Vec<AppNamespace> = Vec::new();
        for name in names {
            if let Some(namespace) = index.public.get(name) {
                if !found.contains(namespace) {
                    found.push(namespace.clone());
                }
            }
        }
        Ok(found)
    }

    async fn find_namespaces_owned_by_app(
        &self,
        app_id: &str,
        names: &[String],
    ) -> std::result::Result<Vec<String>, StorageError> {
        let index = self.namespaces.read();
        Ok(names
            .iter()
            .filter_map(|name| index.by_app.get(&app_namespace_key(app_id, name)))
            .map(|namespace| namespace.name.clone())
            .collect())
    }

    async fn find_app_namespace(
        &self,
        app_id: &str,
        name: &str,
    ) -> std::result::Result<Option<AppNamespace>, StorageError> {
        Ok(self.namespaces.read().by_app.get(&app_namespace_key(app_id, name)).cloned())
    }

    async fn find_public_namespace(
        &self,
        name: &str,
    ) -> std::result::Result<Option<AppNamespace>, StorageError> {
        Ok(self.namespaces.read().public.get(name).cloned())
    }
}
