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

//! LimitRanger defaulting.
//!
//! Fills in container resource requests and limits that a pod left unset,
//! using the `default` and `defaultRequest` values of the namespace's
//! LimitRange objects. Only missing quantities are filled; explicit values,
//! including explicit zeros, are kept.

use crate::admission::{
    AdmissionError, AdmissionResult, Attributes, Handler, Interface, MutationInterface,
    Operation, Plugins,
};
use crate::api::core::{ApiObject, Container, Pod, ResourceList, ResourceRequirements};
use crate::cache::CacheError;
use std::collections::HashMap;
use std::io::Read;
use std::sync::{Arc, RwLock};
use tracing::trace;

/// Plugin name for the LimitRanger admission controller.
pub const PLUGIN_NAME: &str = "LimitRanger";

/// Annotation recording which defaults were applied to a pod.
pub const LIMIT_RANGER_ANNOTATION: &str = "kubernetes.io/limit-ranger";

/// Register the LimitRanger plugin, reading limit ranges from `lister` when given.
pub fn register(plugins: &Plugins, lister: Option<Arc<dyn LimitRangeLister>>) {
    plugins.register(PLUGIN_NAME, move |_config: Option<&mut dyn Read>| {
        let limit_ranger = match &lister {
            Some(l) => LimitRanger::with_lister(l.clone()),
            None => LimitRanger::new(),
        };
        Ok(Arc::new(limit_ranger) as Arc<dyn MutationInterface>)
    });
}

/// LimitType represents the type of limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitType {
    Pod,
    Container,
    PersistentVolumeClaim,
}

/// LimitRangeItem holds the defaults for one kind of object.
#[derive(Debug, Clone, Default)]
pub struct LimitRangeItem {
    pub limit_type: Option<LimitType>,
    /// Limits applied when a container sets none.
    pub default: ResourceList,
    /// Requests applied when a container sets none.
    pub default_request: ResourceList,
}

/// LimitRangeSpec lists the limit items of a LimitRange.
#[derive(Debug, Clone, Default)]
pub struct LimitRangeSpec {
    pub limits: Vec<LimitRangeItem>,
}

/// LimitRange represents a LimitRange resource.
#[derive(Debug, Clone)]
pub struct LimitRange {
    pub name: String,
    pub namespace: String,
    pub spec: LimitRangeSpec,
}

impl LimitRange {
    pub fn new(name: &str, namespace: &str) -> Self {
        Self {
            name: name.to_string(),
            namespace: namespace.to_string(),
            spec: LimitRangeSpec::default(),
        }
    }
}

impl ApiObject for LimitRange {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }

    fn kind(&self) -> &str {
        "LimitRange"
    }
}

/// Trait for limit range lister.
pub trait LimitRangeLister: Send + Sync {
    fn list(&self, namespace: &str) -> Result<Vec<LimitRange>, CacheError>;
}

/// In-memory limit range store.
#[derive(Debug, Default)]
pub struct InMemoryLimitRangeStore {
    ranges: RwLock<HashMap<String, Vec<LimitRange>>>,
}

impl InMemoryLimitRangeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, range: LimitRange) {
        let mut ranges = self.ranges.write().expect("limit range store lock poisoned");
        ranges
            .entry(range.namespace.clone())
            .or_default()
            .push(range);
    }
}

impl LimitRangeLister for InMemoryLimitRangeStore {
    fn list(&self, namespace: &str) -> Result<Vec<LimitRange>, CacheError> {
        Ok(self
            .ranges
            .read()
            .expect("limit range store lock poisoned")
            .get(namespace)
            .cloned()
            .unwrap_or_default())
    }
}

/// LimitRanger applies namespace LimitRange defaults to new pods.
pub struct LimitRanger {
    handler: Handler,
    lister: Option<Arc<dyn LimitRangeLister>>,
}

impl LimitRanger {
    /// Create a LimitRanger with no limit ranges to apply.
    pub fn new() -> Self {
        Self {
            handler: Handler::new_create_update(),
            lister: None,
        }
    }

    /// Create with a limit range lister.
    pub fn with_lister(lister: Arc<dyn LimitRangeLister>) -> Self {
        Self {
            handler: Handler::new_create_update(),
            lister: Some(lister),
        }
    }

    fn get_limit_ranges(&self, attributes: &dyn Attributes) -> AdmissionResult<Vec<LimitRange>> {
        match &self.lister {
            Some(lister) => lister
                .list(attributes.get_namespace())
                .map_err(|e| AdmissionError::new_forbidden(attributes, e)),
            None => Ok(vec![]),
        }
    }

    /// Only pod creation on the main resource gets defaults; containers are
    /// immutable after that.
    fn supports_attributes(&self, attributes: &dyn Attributes) -> bool {
        attributes.get_subresource().is_empty()
            && attributes.get_operation() == Operation::Create
            && attributes.get_kind().kind == "Pod"
    }
}

impl Default for LimitRanger {
    fn default() -> Self {
        Self::new()
    }
}

impl Interface for LimitRanger {
    fn handles(&self, operation: Operation) -> bool {
        self.handler.handles(operation)
    }
}

impl MutationInterface for LimitRanger {
    fn admit(&self, attributes: &mut dyn Attributes) -> AdmissionResult<()> {
        if !self.supports_attributes(attributes) {
            return Ok(());
        }

        let limit_ranges = self.get_limit_ranges(attributes)?;
        if limit_ranges.is_empty() {
            return Ok(());
        }

        let pod = match attributes
            .get_object_mut()
            .and_then(|o| o.as_any_mut().downcast_mut::<Pod>())
        {
            Some(p) => p,
            None => return Ok(()),
        };

        for limit_range in &limit_ranges {
            trace!(limit_range = %limit_range.name, pod = %pod.name, "applying limit range defaults");
            let defaults = default_container_resource_requirements(limit_range);
            merge_pod_resource_requirements(pod, &defaults);
        }

        Ok(())
    }
}

/// Get default container resource requirements from limit range.
pub fn default_container_resource_requirements(limit_range: &LimitRange) -> ResourceRequirements {
    let mut requirements = ResourceRequirements::default();

    for limit in &limit_range.spec.limits {
        if limit.limit_type == Some(LimitType::Container) {
            for (k, v) in &limit.default_request {
                requirements.requests.insert(k.clone(), *v);
            }
            for (k, v) in &limit.default {
                requirements.limits.insert(k.clone(), *v);
            }
        }
    }

    requirements
}

/// Fill a container's unset requests and limits; returns the annotation fragments.
fn merge_container_resources(
    container: &mut Container,
    defaults: &ResourceRequirements,
    annotation_prefix: &str,
    annotations: &mut Vec<String>,
) {
    let mut set_requests = Vec::new();
    let mut set_limits = Vec::new();

    for (k, v) in &defaults.limits {
        if !container.resources.limits.contains_key(k) {
            container.resources.limits.insert(k.clone(), *v);
            set_limits.push(k.as_str());
        }
    }

    for (k, v) in &defaults.requests {
        if !container.resources.requests.contains_key(k) {
            container.resources.requests.insert(k.clone(), *v);
            set_requests.push(k.as_str());
        }
    }

    // ResourceList is ordered, so the fragments are already sorted.
    if !set_requests.is_empty() {
        annotations.push(format!(
            "{} request for {} {}",
            set_requests.join(", "),
            annotation_prefix,
            container.name
        ));
    }

    if !set_limits.is_empty() {
        annotations.push(format!(
            "{} limit for {} {}",
            set_limits.join(", "),
            annotation_prefix,
            container.name
        ));
    }
}

/// Merge pod resource requirements with defaults.
pub fn merge_pod_resource_requirements(pod: &mut Pod, defaults: &ResourceRequirements) {
    let mut annotations = Vec::new();

    for container in &mut pod.spec.containers {
        merge_container_resources(container, defaults, "container", &mut annotations);
    }

    for container in &mut pod.spec.init_containers {
        merge_container_resources(container, defaults, "init container", &mut annotations);
    }

    if !annotations.is_empty() {
        let val = format!("LimitRanger plugin set: {}", annotations.join("; "));
        pod.annotations
            .insert(LIMIT_RANGER_ANNOTATION.to_string(), val);
    }
}
