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

//! ClusterResourceOverride admission controller.
//!
//! Rewrites the resources of newly created pods from their memory limit using
//! cluster-wide ratios:
//!
//! - `limitCPUToMemoryPercent` derives the CPU limit, 1Gi of memory being
//!   worth one core at 100%.
//! - `cpuRequestToLimitPercent` derives the CPU request from the CPU limit.
//! - `memoryRequestToLimitPercent` derives the memory request from the memory
//!   limit.
//!
//! Namespace LimitRange defaults are applied first so that pods without a
//! memory limit still get one to work from. A namespace opts out by setting
//! the `quota.openshift.io/cluster-resource-override-enabled` annotation to
//! anything other than `"true"`.

pub mod config;
pub mod resources;

use crate::admission::{
    AdmissionError, AdmissionResult, Attributes, Handler, Interface, MutationInterface,
    Operation, Plugins,
};
use crate::api::core::Pod;
use crate::cache::{CacheError, NamespaceCache};
use crate::plugins::limitranger::{LimitRangeLister, LimitRanger};
use config::{read_config, ClusterResourceOverrideConfig, ConfigError, OverrideRatios};
use std::io::Read;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Plugin name for the ClusterResourceOverride admission controller.
pub const PLUGIN_NAME: &str = "ClusterResourceOverride";

/// Namespace annotation that enables or disables the overrides.
pub const CLUSTER_RESOURCE_OVERRIDE_ANNOTATION: &str =
    "quota.openshift.io/cluster-resource-override-enabled";

/// Register the ClusterResourceOverride plugin.
///
/// The namespace cache and limit range lister are captured by the factory and
/// handed to every instance it builds.
pub fn register(
    plugins: &Plugins,
    namespace_cache: Option<Arc<dyn NamespaceCache>>,
    limit_range_lister: Option<Arc<dyn LimitRangeLister>>,
) {
    plugins.register(PLUGIN_NAME, move |config: Option<&mut dyn Read>| {
        let config =
            read_config(config).map_err(|e| AdmissionError::invalid_config(PLUGIN_NAME, e))?;
        let mut plugin =
            Plugin::new(config).map_err(|e| AdmissionError::invalid_config(PLUGIN_NAME, e))?;
        if let Some(lister) = &limit_range_lister {
            plugin = plugin.with_limit_ranger(Arc::new(LimitRanger::with_lister(lister.clone())));
        }
        if let Some(cache) = &namespace_cache {
            plugin.set_namespace_cache(cache.clone());
        }
        Ok(Arc::new(plugin) as Arc<dyn MutationInterface>)
    });
}

/// Plugin implements the ClusterResourceOverride admission controller.
pub struct Plugin {
    handler: Handler,
    ratios: Option<OverrideRatios>,
    namespace_cache: Option<Arc<dyn NamespaceCache>>,
    limit_ranger: Arc<dyn MutationInterface>,
}

impl Plugin {
    /// Create the plugin from an optional configuration.
    ///
    /// Without a configuration the plugin admits everything untouched. A
    /// configuration with invalid ratios is rejected here.
    pub fn new(config: Option<ClusterResourceOverrideConfig>) -> Result<Self, ConfigError> {
        let ratios = match config {
            Some(config) => {
                let ratios = OverrideRatios::from_config(&config)?;
                debug!(
                    limit_cpu_to_memory_percent = config.limit_cpu_to_memory_percent,
                    cpu_request_to_limit_percent = config.cpu_request_to_limit_percent,
                    memory_request_to_limit_percent = config.memory_request_to_limit_percent,
                    "{} configured",
                    PLUGIN_NAME
                );
                Some(ratios)
            }
            None => {
                debug!("{} loaded without configuration, pods are left untouched", PLUGIN_NAME);
                None
            }
        };

        Ok(Self {
            handler: Handler::new_create(),
            ratios,
            namespace_cache: None,
            limit_ranger: Arc::new(LimitRanger::new()),
        })
    }

    /// Builder-style variant of [`Plugin::set_namespace_cache`].
    pub fn with_namespace_cache(mut self, cache: Arc<dyn NamespaceCache>) -> Self {
        self.set_namespace_cache(cache);
        self
    }

    /// Set the namespace cache consulted for the opt-out annotation.
    pub fn set_namespace_cache(&mut self, cache: Arc<dyn NamespaceCache>) {
        self.namespace_cache = Some(cache);
    }

    /// Replace the stage that fills in LimitRange defaults before the overrides.
    pub fn with_limit_ranger(mut self, limit_ranger: Arc<dyn MutationInterface>) -> Self {
        self.limit_ranger = limit_ranger;
        self
    }

    /// The active ratios, if the plugin was configured.
    pub fn ratios(&self) -> Option<&OverrideRatios> {
        self.ratios.as_ref()
    }

    /// Whether the overrides apply to pods in `namespace`.
    ///
    /// A missing annotation enables them; any value other than `"true"`
    /// disables them. Lookup failures are returned, never defaulted.
    pub fn is_enabled_for(&self, namespace: &str) -> Result<bool, CacheError> {
        let cache = self
            .namespace_cache
            .as_ref()
            .ok_or_else(|| CacheError::Unavailable("no namespace cache configured".to_string()))?;
        let ns = cache.get_namespace(namespace)?;
        Ok(ns
            .annotations
            .get(CLUSTER_RESOURCE_OVERRIDE_ANNOTATION)
            .map_or(true, |v| v == "true"))
    }

    /// Only creation of pods through the main resource is rewritten.
    fn applies_to(&self, attributes: &dyn Attributes) -> bool {
        attributes.get_resource().is_core("pods")
            && attributes.get_subresource().is_empty()
            && attributes.get_operation() == Operation::Create
    }
}

fn holds_pod(attributes: &dyn Attributes) -> bool {
    attributes
        .get_object()
        .map_or(false, |o| o.as_any().is::<Pod>())
}

fn unexpected_object(attributes: &dyn Attributes) -> AdmissionError {
    let kind = attributes.get_object().map_or("<none>", |o| o.kind());
    AdmissionError::new_forbidden(attributes, format!("unexpected object: {}", kind))
}

impl Interface for Plugin {
    fn handles(&self, operation: Operation) -> bool {
        self.handler.handles(operation)
    }

    fn validate_initialization(&self) -> AdmissionResult<()> {
        if self.namespace_cache.is_none() {
            return Err(AdmissionError::missing_dependency(PLUGIN_NAME, "namespace cache"));
        }
        Ok(())
    }
}

impl MutationInterface for Plugin {
    fn admit(&self, attributes: &mut dyn Attributes) -> AdmissionResult<()> {
        trace!("{} admission controller is invoked", PLUGIN_NAME);
        let ratios = match &self.ratios {
            Some(r) => r,
            None => return Ok(()),
        };
        if !self.applies_to(attributes) {
            return Ok(());
        }

        if !holds_pod(attributes) {
            return Err(unexpected_object(attributes));
        }

        let namespace = attributes.get_namespace().to_string();
        debug!(pod = %attributes.get_name(), %namespace, "{} is looking at creating pod", PLUGIN_NAME);

        match self.is_enabled_for(&namespace) {
            Ok(true) => {}
            Ok(false) => {
                debug!(%namespace, "{} is disabled for namespace", PLUGIN_NAME);
                return Ok(());
            }
            Err(e) => {
                warn!(%namespace, error = %e, "{} got an error retrieving namespace", PLUGIN_NAME);
                return Err(AdmissionError::new_forbidden(attributes, e));
            }
        }

        // Validation of the defaulted values is left to a later LimitRanger run.
        if let Err(e) = self.limit_ranger.admit(attributes) {
            debug!(%namespace, error = %e, "{}: error from LimitRanger", PLUGIN_NAME);
        }

        if !holds_pod(attributes) {
            return Err(unexpected_object(attributes));
        }
        if let Some(pod) = attributes
            .get_object_mut()
            .and_then(|o| o.as_any_mut().downcast_mut::<Pod>())
        {
            resources::override_pod_resources(&mut pod.spec, ratios);
        }
        Ok(())
    }
}
