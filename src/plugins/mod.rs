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

//! Admission plugins module.

pub mod clusterresourceoverride;
pub mod limitranger;

use crate::admission::Plugins;
use crate::cache::NamespaceCache;
use limitranger::LimitRangeLister;
use std::sync::Arc;

/// All ordered plugins in execution order.
///
/// ClusterResourceOverride runs ahead of LimitRanger so that the later
/// LimitRanger pass sees the rewritten values.
pub const ALL_ORDERED_PLUGINS: &[&str] = &[
    clusterresourceoverride::PLUGIN_NAME,
    limitranger::PLUGIN_NAME,
];

/// Plugins that are ON by default.
pub const DEFAULT_ON_PLUGINS: &[&str] = &[limitranger::PLUGIN_NAME];

/// Get the list of plugins that are OFF by default.
pub fn default_off_plugins() -> Vec<&'static str> {
    ALL_ORDERED_PLUGINS
        .iter()
        .filter(|p| !DEFAULT_ON_PLUGINS.contains(p))
        .copied()
        .collect()
}

/// Collaborators handed to plugin factories by the composition root.
#[derive(Clone, Default)]
pub struct PluginDependencies {
    pub namespace_cache: Option<Arc<dyn NamespaceCache>>,
    pub limit_range_lister: Option<Arc<dyn LimitRangeLister>>,
}

impl PluginDependencies {
    pub fn new(
        namespace_cache: Arc<dyn NamespaceCache>,
        limit_range_lister: Arc<dyn LimitRangeLister>,
    ) -> Self {
        Self {
            namespace_cache: Some(namespace_cache),
            limit_range_lister: Some(limit_range_lister),
        }
    }
}

/// Register all admission plugins.
pub fn register_all_admission_plugins(plugins: &Plugins, deps: &PluginDependencies) {
    clusterresourceoverride::register(
        plugins,
        deps.namespace_cache.clone(),
        deps.limit_range_lister.clone(),
    );
    limitranger::register(plugins, deps.limit_range_lister.clone());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admission::{
        AdmissionConfig, AttributesRecord, Interface, MutationInterface, Operation,
    };
    use crate::api::core::{Container, Namespace, Pod, ResourceList};
    use crate::api::resource::Quantity;
    use crate::cache::InMemoryNamespaceCache;
    use crate::plugins::limitranger::{
        InMemoryLimitRangeStore, LimitRange, LimitRangeItem, LimitType, LIMIT_RANGER_ANNOTATION,
    };

    fn deps() -> PluginDependencies {
        let namespaces = InMemoryNamespaceCache::new();
        namespaces.add(Namespace::new("team-a"));
        namespaces.add(Namespace::new("team-b").with_annotation(
            clusterresourceoverride::CLUSTER_RESOURCE_OVERRIDE_ANNOTATION,
            "false",
        ));

        let ranges = InMemoryLimitRangeStore::new();
        for ns in ["team-a", "team-b"] {
            let mut range = LimitRange::new("defaults", ns);
            let mut default = ResourceList::new();
            default.insert("memory".to_string(), Quantity::parse("1Gi").unwrap());
            range.spec.limits.push(LimitRangeItem {
                limit_type: Some(LimitType::Container),
                default,
                default_request: ResourceList::new(),
            });
            ranges.add(range);
        }

        PluginDependencies::new(Arc::new(namespaces), Arc::new(ranges))
    }

    fn create_pod(namespace: &str) -> AttributesRecord {
        let mut pod = Pod::new("web", namespace);
        pod.spec.containers.push(Container::new("app", "nginx"));
        AttributesRecord::new_pod("web", namespace, Operation::Create, pod)
    }

    #[test]
    fn test_plugin_order() {
        assert_eq!(
            ALL_ORDERED_PLUGINS,
            &["ClusterResourceOverride", "LimitRanger"]
        );
    }

    #[test]
    fn test_cluster_resource_override_is_off_by_default() {
        assert_eq!(default_off_plugins(), vec!["ClusterResourceOverride"]);
        assert!(DEFAULT_ON_PLUGINS.contains(&"LimitRanger"));
    }

    #[test]
    fn test_register_all_admission_plugins() {
        let plugins = Plugins::new();
        register_all_admission_plugins(&plugins, &deps());
        assert_eq!(
            plugins.registered_names(),
            vec!["ClusterResourceOverride", "LimitRanger"]
        );
    }

    #[test]
    fn test_missing_dependencies_fail_chain_construction() {
        let plugins = Plugins::new();
        register_all_admission_plugins(&plugins, &PluginDependencies::default());
        let result = plugins.new_chain(ALL_ORDERED_PLUGINS, &AdmissionConfig::default(), None);
        assert!(result.is_err());
    }

    #[test]
    fn test_chain_end_to_end() {
        let plugins = Plugins::new();
        register_all_admission_plugins(&plugins, &deps());
        let config = AdmissionConfig::from_yaml(
            "pluginConfig:\n\
             \x20 ClusterResourceOverride:\n\
             \x20   configuration:\n\
             \x20     apiVersion: v1\n\
             \x20     kind: ClusterResourceOverrideConfig\n\
             \x20     limitCPUToMemoryPercent: 200\n\
             \x20     cpuRequestToLimitPercent: 25\n\
             \x20     memoryRequestToLimitPercent: 50\n",
        )
        .unwrap();

        let chain = plugins
            .new_chain(ALL_ORDERED_PLUGINS, &config, None)
            .unwrap();
        assert!(chain.validate_initialization().is_ok());

        let mut enabled = create_pod("team-a");
        chain.admit(&mut enabled).unwrap();
        let pod = enabled.get_pod().unwrap();
        let resources = &pod.spec.containers[0].resources;
        assert_eq!(resources.limits_memory(), Quantity::parse("1Gi").unwrap());
        assert_eq!(resources.limits_cpu(), Quantity::parse("2").unwrap());
        assert_eq!(resources.requests_cpu(), Quantity::parse("500m").unwrap());
        assert_eq!(resources.requests_memory(), Quantity::parse("512Mi").unwrap());
        assert!(pod.annotations.contains_key(LIMIT_RANGER_ANNOTATION));

        let mut disabled = create_pod("team-b");
        chain.admit(&mut disabled).unwrap();
        let resources = &disabled.get_pod().unwrap().spec.containers[0].resources;
        assert_eq!(resources.limits_memory(), Quantity::parse("1Gi").unwrap());
        assert!(!resources.limits.contains_key("cpu"));
        assert!(resources.requests.is_empty());
    }
}
