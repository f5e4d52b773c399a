use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;

use crate::constants::CLUSTER_NAME_DEFAULT;
use crate::constants::NAMESPACE_APPLICATION;
use crate::constants::NO_APPID_PLACEHOLDER;
use crate::keys::watch_key;
use crate::NamespaceRegistry;
use crate::Result;

/// Computes the watch keys whose release messages concern a client.
///
/// A client of (app, cluster, env) watching a namespace also watches the
/// `default` cluster, its data center and, for public namespaces owned by
/// another app, the owner's copies of all of these.
#[derive(Clone)]
pub struct WatchKeyAssembler {
    namespace_registry: Arc<dyn NamespaceRegistry>,
}

impl std::fmt::Debug for WatchKeyAssembler {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("WatchKeyAssembler").finish_non_exhaustive()
    }
}

impl WatchKeyAssembler {
    pub fn new(namespace_registry: Arc<dyn NamespaceRegistry>) -> Self {
        Self { namespace_registry }
    }

    pub async fn assemble_watch_keys_for_namespace(
        &self,
        app_id: &str,
        cluster: &str,
        env: &str,
        namespace: &str,
        data_center: Option<&str>,
    ) -> Result<HashSet<String>> {
        let mut watched = self
            .assemble_all_watch_keys(app_id, cluster, env, &[namespace.to_string()], data_center)
            .await?;
        Ok(watched.remove(namespace).unwrap_or_default())
    }

    /// Watch keys per requested namespace.
    ///
    /// Namespaces that resolve to no key at all are left out of the map.
    pub async fn assemble_all_watch_keys(
        &self,
        app_id: &str,
        cluster: &str,
        env: &str,
        namespaces: &[String],
        data_center: Option<&str>,
    ) -> Result<HashMap<String, HashSet<String>>> {
        let mut watched: HashMap<String, HashSet<String>> = HashMap::new();
        for namespace in namespaces {
            merge_keys(
                &mut watched,
                namespace,
                app_watch_keys(app_id, cluster, env, namespace, data_center),
            );
        }

        // every app has its own `application` namespace
        if is_application_only(namespaces) {
            return Ok(watched);
        }

        let owned = self.namespaces_owned_by(app_id, namespaces).await?;
        let candidates: Vec<String> = namespaces
            .iter()
            .filter(|ns| !owned.iter().any(|o| o.eq_ignore_ascii_case(ns)))
            .cloned()
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        if candidates.is_empty() {
            return Ok(watched);
        }

        let public_namespaces = self.namespace_registry.find_public_namespaces_by_names(&candidates).await?;
        for public in public_namespaces {
            if public.app_id == app_id {
                continue;
            }
            let keys = app_watch_keys(&public.app_id, cluster, env, &public.name, data_center);
            // filed under every requested spelling of the public name
            for requested in candidates.iter().filter(|c| c.eq_ignore_ascii_case(&public.name)) {
                merge_keys(&mut watched, requested, keys.clone());
            }
        }

        Ok(watched)
    }

    async fn namespaces_owned_by(
        &self,
        app_id: &str,
        namespaces: &[String],
    ) -> Result<Vec<String>> {
        if app_id.eq_ignore_ascii_case(NO_APPID_PLACEHOLDER) {
            return Ok(Vec::new());
        }
        Ok(self.namespace_registry.find_namespaces_owned_by_app(app_id, namespaces).await?)
    }
}

fn is_application_only(namespaces: &[String]) -> bool {
    !namespaces.is_empty() && namespaces.iter().all(|ns| ns == NAMESPACE_APPLICATION)
}

fn merge_keys(
    watched: &mut HashMap<String, HashSet<String>>,
    namespace: &str,
    keys: HashSet<String>,
) {
    if keys.is_empty() {
        return;
    }
    watched.entry(namespace.to_string()).or_default().extend(keys);
}

/// Keys of one app's copy of `namespace`
fn app_watch_keys(
    app_id: &str,
    cluster: &str,
    env: &str,
    namespace: &str,
    data_center: Option<&str>,
) -> HashSet<String> {
    let mut keys = HashSet::new();
    if app_id.eq_ignore_ascii_case(NO_APPID_PLACEHOLDER) {
        return keys;
    }

    keys.insert(watch_key(app_id, CLUSTER_NAME_DEFAULT, env, namespace));

    if cluster != CLUSTER_NAME_DEFAULT {
        keys.insert(watch_key(app_id, cluster, env, namespace));
    }

    if let Some(data_center) = data_center.filter(|dc| !dc.is_empty() && *dc != cluster) {
        keys.insert(watch_key(app_id, data_center, env, namespace));
    }

    keys
}
