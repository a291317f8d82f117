// Copyright 2024 The Kubernetes Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Namespace cache consulted by namespace-scoped admission policies.

use crate::api::core::Namespace;
use std::collections::HashMap;
use std::sync::RwLock;
use thiserror::Error;

/// Errors returned by a namespace cache lookup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    #[error("namespace \"{0}\" not found")]
    NotFound(String),

    #[error("namespace cache unavailable: {0}")]
    Unavailable(String),
}

/// NamespaceCache resolves namespaces by name.
///
/// Implementations own their consistency and timeout policy; callers treat
/// any error as "no reliable answer".
pub trait NamespaceCache: Send + Sync {
    fn get_namespace(&self, name: &str) -> Result<Namespace, CacheError>;
}

/// In-memory namespace store.
#[derive(Debug, Default)]
pub struct InMemoryNamespaceCache {
    namespaces: RwLock<HashMap<String, Namespace>>,
}

impl InMemoryNamespaceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a namespace.
    pub fn add(&self, namespace: Namespace) {
        self.namespaces
            .write()
            .expect("namespace cache lock poisoned")
            .insert(namespace.name.clone(), namespace);
    }

    /// Remove a namespace, returning it if it was present.
    pub fn remove(&self, name: &str) -> Option<Namespace> {
        self.namespaces
            .write()
            .expect("namespace cache lock poisoned")
            .remove(name)
    }
}

impl NamespaceCache for InMemoryNamespaceCache {
    fn get_namespace(&self, name: &str) -> Result<Namespace, CacheError> {
        self.namespaces
            .read()
            .expect("namespace cache lock poisoned")
            .get(name)
            .cloned()
            .ok_or_else(|| CacheError::NotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_namespace() {
        let cache = InMemoryNamespaceCache::new();
        cache.add(Namespace::new("team-a").with_annotation("k", "v"));

        let ns = cache.get_namespace("team-a").unwrap();
        assert_eq!(ns.annotations.get("k").map(String::as_str), Some("v"));
        assert_eq!(
            cache.get_namespace("team-b"),
            Err(CacheError::NotFound("team-b".to_string()))
        );
    }

    #[test]
    fn test_add_replaces_and_remove() {
        let cache = InMemoryNamespaceCache::new();
        cache.add(Namespace::new("team-a"));
        cache.add(Namespace::new("team-a").with_annotation("k", "v2"));
        assert_eq!(cache.get_namespace("team-a").unwrap().annotations.len(), 1);

        assert!(cache.remove("team-a").is_some());
        assert!(cache.get_namespace("team-a").is_err());
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            CacheError::NotFound("x".to_string()).to_string(),
            "namespace \"x\" not found"
        );
        assert_eq!(
            CacheError::Unavailable("not synced".to_string()).to_string(),
            "namespace cache unavailable: not synced"
        );
    }
}
