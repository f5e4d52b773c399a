//! Client-supplied namespace name cleanup.

use crate::constants::PROPERTIES_SUFFIX;
use crate::NamespaceRegistry;
use crate::StorageError;

/// Strips a trailing `.properties` (any case); other formats keep their suffix
pub fn filter_namespace_name(name: &str) -> &str {
    let Some(split) = name.len().checked_sub(PROPERTIES_SUFFIX.len()) else {
        return name;
    };
    match name.get(split..) {
        Some(suffix) if suffix.eq_ignore_ascii_case(PROPERTIES_SUFFIX) => &name[..split],
        _ => name,
    }
}

/// Registered spelling of `namespace` as seen by `app_id`.
///
/// The app's own namespaces take precedence over public ones; unknown names
/// are returned unchanged.
pub async fn normalize_namespace(
    registry: &dyn NamespaceRegistry,
    app_id: &str,
    namespace: &str,
) -> std::result::Result<String, StorageError> {
    if let Some(owned) = registry.find_app_namespace(app_id, namespace).await? {
        return Ok(owned.name);
    }
    if let Some(public) = registry.find_public_namespace(namespace).await? {
        return Ok(public.name);
    }
    Ok(namespace.to_string())
}
