//! Client config read path.
//!
//! Resolution order for one (app, cluster, env, namespace):
//!
//! 1. the requested cluster, unless it is `default`
//! 2. the client's data center, if set and different from the cluster
//! 3. the `default` cluster
//!
//! If the namespace is a public namespace owned by another app, the owner's
//! release is resolved the same way and merged underneath the app's own one.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::cache::ReleaseCache;
use crate::constants::CLUSTER_NAME_DEFAULT;
use crate::constants::NAMESPACE_APPLICATION;
use crate::constants::NO_APPID_PLACEHOLDER;
use crate::constants::RELEASE_KEY_SEPARATOR;
use crate::model::ApolloConfig;
use crate::model::Coordinate;
use crate::model::NotificationMessages;
use crate::model::Release;
use crate::utils::namespace::filter_namespace_name;
use crate::utils::namespace::normalize_namespace;
use crate::NamespaceRegistry;
use crate::Result;

/// A client's config read
#[derive(Debug, Clone)]
pub struct ConfigQuery {
    pub app_id: String,
    pub cluster: String,
    pub env: String,
    pub namespace: String,
    pub data_center: Option<String>,
    /// Release key of the config the client already holds
    pub client_release_key: Option<String>,
    /// Notification ids the client received with its last change notification
    pub messages: Option<NotificationMessages>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigQueryResult {
    Found(ApolloConfig),
    NotModified,
    NotFound,
}

#[derive(Clone)]
pub struct ConfigService {
    cache: ReleaseCache,
    namespace_registry: Arc<dyn NamespaceRegistry>,
}

impl std::fmt::Debug for ConfigService {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("ConfigService")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl ConfigService {
    pub fn new(
        cache: ReleaseCache,
        namespace_registry: Arc<dyn NamespaceRegistry>,
    ) -> Self {
        Self {
            cache,
            namespace_registry,
        }
    }

    pub fn cache(&self) -> &ReleaseCache {
        &self.cache
    }

    pub async fn query_config(
        &self,
        query: &ConfigQuery,
    ) -> Result<ConfigQueryResult> {
        let namespace = filter_namespace_name(&query.namespace);
        let namespace = normalize_namespace(self.namespace_registry.as_ref(), &query.app_id, namespace).await?;
        let data_center = query.data_center.as_deref();
        let messages = query.messages.as_ref();

        let mut releases: Vec<Arc<Release>> = Vec::with_capacity(2);
        let mut cluster_loaded = query.cluster.clone();

        if !query.app_id.eq_ignore_ascii_case(NO_APPID_PLACEHOLDER) {
            if let Some(release) = self
                .load_config(&query.app_id, &query.cluster, &query.env, &namespace, data_center, messages)
                .await?
            {
                cluster_loaded = release.cluster.clone();
                releases.push(release);
            }
        }

        if !self.namespace_belongs_to_app(&query.app_id, &namespace).await? {
            if let Some(release) = self.find_public_config(query, &namespace, messages).await? {
                releases.push(release);
            }
        }

        if releases.is_empty() {
            debug!(
                app_id = %query.app_id,
                cluster = %query.cluster,
                namespace = %namespace,
                "no release found"
            );
            return Ok(ConfigQueryResult::NotFound);
        }

        let merged_release_key = releases
            .iter()
            .map(|release| release.release_key.as_str())
            .collect::<Vec<_>>()
            .join(RELEASE_KEY_SEPARATOR);

        if query.client_release_key.as_deref() == Some(merged_release_key.as_str()) {
            return Ok(ConfigQueryResult::NotModified);
        }

        Ok(ConfigQueryResult::Found(ApolloConfig {
            app_id: query.app_id.clone(),
            cluster: cluster_loaded,
            namespace_name: query.namespace.clone(),
            configurations: merge_configurations(&releases),
            release_key: merged_release_key,
        }))
    }

    /// Active release by id
    pub async fn find_release_by_id(
        &self,
        release_id: i64,
    ) -> Result<Option<Arc<Release>>> {
        self.cache.find_active_release(release_id).await
    }

    /// Release of one app's copy of `namespace`, with cluster fallback
    async fn load_config(
        &self,
        app_id: &str,
        cluster: &str,
        env: &str,
        namespace: &str,
        data_center: Option<&str>,
        messages: Option<&NotificationMessages>,
    ) -> Result<Option<Arc<Release>>> {
        if cluster != CLUSTER_NAME_DEFAULT {
            let coordinate = Coordinate::new(app_id, cluster, env, namespace);
            if let Some(release) = self.find_release(&coordinate, messages).await? {
                return Ok(Some(release));
            }
        }

        if let Some(data_center) = data_center.filter(|dc| !dc.is_empty() && *dc != cluster) {
            let coordinate = Coordinate::new(app_id, data_center, env, namespace);
            if let Some(release) = self.find_release(&coordinate, messages).await? {
                return Ok(Some(release));
            }
        }

        let coordinate = Coordinate::new(app_id, CLUSTER_NAME_DEFAULT, env, namespace);
        self.find_release(&coordinate, messages).await
    }

    async fn find_release(
        &self,
        coordinate: &Coordinate,
        messages: Option<&NotificationMessages>,
    ) -> Result<Option<Arc<Release>>> {
        self.cache
            .find_latest_active_release_with_messages(coordinate, messages)
            .await
    }

    async fn namespace_belongs_to_app(
        &self,
        app_id: &str,
        namespace: &str,
    ) -> Result<bool> {
        if namespace == NAMESPACE_APPLICATION {
            return Ok(true);
        }
        if app_id.eq_ignore_ascii_case(NO_APPID_PLACEHOLDER) {
            return Ok(false);
        }
        Ok(self.namespace_registry.find_app_namespace(app_id, namespace).await?.is_some())
    }

    async fn find_public_config(
        &self,
        query: &ConfigQuery,
        namespace: &str,
        messages: Option<&NotificationMessages>,
    ) -> Result<Option<Arc<Release>>> {
        let Some(public) = self.namespace_registry.find_public_namespace(namespace).await? else {
            return Ok(None);
        };
        if public.app_id == query.app_id {
            return Ok(None);
        }

        self.load_config(
            &public.app_id,
            &query.cluster,
            &query.env,
            &public.name,
            query.data_center.as_deref(),
            messages,
        )
        .await
    }
}

/// Earlier releases win over later ones
fn merge_configurations(releases: &[Arc<Release>]) -> BTreeMap<String, String> {
    let mut merged = BTreeMap::new();
    for release in releases.iter().rev() {
        merged.extend(release.configurations.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    merged
}
