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

//! Core API types consumed by admission (Pod, Container, Namespace, Service).

use crate::api::resource::{Format, Quantity};
use std::any::Any;
use std::collections::{BTreeMap, HashMap};

/// Resource name for CPU, measured in cores.
pub const RESOURCE_CPU: &str = "cpu";

/// Resource name for memory, measured in bytes.
pub const RESOURCE_MEMORY: &str = "memory";

/// ResourceList maps resource names to quantities.
pub type ResourceList = BTreeMap<String, Quantity>;

/// ApiObject is a trait for API objects that can be carried by an admission request.
pub trait ApiObject: Send + Sync {
    /// Returns the object as Any for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Returns the object as mutable Any for downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Returns the kind of this object.
    fn kind(&self) -> &str;
}

// ============================================================================
// Resource Types
// ============================================================================

/// ResourceRequirements describes the compute resource requirements of a container.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResourceRequirements {
    /// Requests describes the minimum amount of compute resources required.
    pub requests: ResourceList,
    /// Limits describes the maximum amount of compute resources allowed.
    pub limits: ResourceList,
}

impl ResourceRequirements {
    /// The CPU limit, or a zero quantity if unset.
    pub fn limits_cpu(&self) -> Quantity {
        lookup(&self.limits, RESOURCE_CPU, Format::DecimalSI)
    }

    /// The memory limit, or a zero quantity if unset.
    pub fn limits_memory(&self) -> Quantity {
        lookup(&self.limits, RESOURCE_MEMORY, Format::BinarySI)
    }

    /// The CPU request, or a zero quantity if unset.
    pub fn requests_cpu(&self) -> Quantity {
        lookup(&self.requests, RESOURCE_CPU, Format::DecimalSI)
    }

    /// The memory request, or a zero quantity if unset.
    pub fn requests_memory(&self) -> Quantity {
        lookup(&self.requests, RESOURCE_MEMORY, Format::BinarySI)
    }
}

fn lookup(list: &ResourceList, name: &str, format: Format) -> Quantity {
    list.get(name).copied().unwrap_or_else(|| Quantity::zero(format))
}

// ============================================================================
// Container
// ============================================================================

/// Container represents a single container in a pod.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Container {
    /// Name of the container.
    pub name: String,
    /// Container image name.
    pub image: String,
    /// Compute Resources required by this container.
    pub resources: ResourceRequirements,
}

impl Container {
    /// Create a new container with the given name and image.
    pub fn new(name: &str, image: &str) -> Self {
        Self {
            name: name.to_string(),
            image: image.to_string(),
            resources: ResourceRequirements::default(),
        }
    }

    /// Create a new container with the given resource requirements.
    pub fn with_resources(name: &str, image: &str, resources: ResourceRequirements) -> Self {
        Self {
            name: name.to_string(),
            image: image.to_string(),
            resources,
        }
    }
}

// ============================================================================
// Pod
// ============================================================================

/// PodSpec describes the specification of a pod.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PodSpec {
    /// List of initialization containers.
    pub init_containers: Vec<Container>,
    /// List of containers.
    pub containers: Vec<Container>,
}

impl PodSpec {
    /// Visit init containers then regular containers mutably, with their field paths.
    pub fn visit_containers_with_path_mut<F>(&mut self, base_path: &str, mut visitor: F)
    where
        F: FnMut(&mut Container, String),
    {
        for (i, c) in self.init_containers.iter_mut().enumerate() {
            visitor(c, format!("{}.initContainers[{}]", base_path, i));
        }
        for (i, c) in self.containers.iter_mut().enumerate() {
            visitor(c, format!("{}.containers[{}]", base_path, i));
        }
    }
}

/// Pod represents a Pod.
#[derive(Debug, Clone, PartialEq)]
pub struct Pod {
    /// Name of the pod.
    pub name: String,
    /// Namespace of the pod.
    pub namespace: String,
    /// Pod specification.
    pub spec: PodSpec,
    /// Annotations is an unstructured key value map.
    pub annotations: HashMap<String, String>,
}

impl Pod {
    /// Create a new pod with the given name and namespace.
    pub fn new(name: &str, namespace: &str) -> Self {
        Self {
            name: name.to_string(),
            namespace: namespace.to_string(),
            spec: PodSpec::default(),
            annotations: HashMap::new(),
        }
    }
}

impl ApiObject for Pod {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn kind(&self) -> &str {
        "Pod"
    }
}

// ============================================================================
// Namespace
// ============================================================================

/// Namespace represents a Namespace together with its annotations.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Namespace {
    pub name: String,
    pub annotations: HashMap<String, String>,
}

impl Namespace {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            annotations: HashMap::new(),
        }
    }

    /// Builder-style helper that adds an annotation.
    pub fn with_annotation(mut self, key: &str, value: &str) -> Self {
        self.annotations.insert(key.to_string(), value.to_string());
        self
    }
}

impl ApiObject for Namespace {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn kind(&self) -> &str {
        "Namespace"
    }
}

// ============================================================================
// Service
// ============================================================================

/// Service represents a Service. Admission of services never touches pod resources.
#[derive(Debug, Clone, PartialEq)]
pub struct Service {
    pub name: String,
    pub namespace: String,
}

impl Service {
    pub fn new(name: &str, namespace: &str) -> Self {
        Self {
            name: name.to_string(),
            namespace: namespace.to_string(),
        }
    }
}

impl ApiObject for Service {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn kind(&self) -> &str {
        "Service"
    }
}

// ============================================================================
// Tests
// ============================================================================
