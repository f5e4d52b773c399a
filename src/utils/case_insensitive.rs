use std::collections::HashMap;

/// Map whose keys are ASCII-case-folded at the boundary.
///
/// `put("NamespaceA", v)` and `get("namespacea")` address the same entry.
/// Folding is ASCII-only so lookups do not depend on the platform locale.
/// The spelling used at write time is not kept here; callers that must hand a
/// name back to a client keep the original alongside.
#[derive(Debug, Clone)]
pub struct CaseInsensitiveMap<V> {
    delegate: HashMap<String, V>,
}

impl<V> Default for CaseInsensitiveMap<V> {
    fn default() -> Self {
        Self {
            delegate: HashMap::new(),
        }
    }
}

impl<V> CaseInsensitiveMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(
        &self,
        key: &str,
    ) -> Option<&V> {
        self.delegate.get(&fold(key))
    }

    pub fn get_mut(
        &mut self,
        key: &str,
    ) -> Option<&mut V> {
        self.delegate.get_mut(&fold(key))
    }

    /// Returns the previous value stored under any casing of `key`
    pub fn put(
        &mut self,
        key: &str,
        value: V,
    ) -> Option<V> {
        self.delegate.insert(fold(key), value)
    }

    pub fn remove(
        &mut self,
        key: &str,
    ) -> Option<V> {
        self.delegate.remove(&fold(key))
    }

    pub fn contains_key(
        &self,
        key: &str,
    ) -> bool {
        self.delegate.contains_key(&fold(key))
    }

    pub fn len(&self) -> usize {
        self.delegate.len()
    }

    pub fn is_empty(&self) -> bool {
        self.delegate.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.delegate.values()
    }
}

#[inline]
fn fold(key: &str) -> String {
    key.to_ascii_lowercase()
}
