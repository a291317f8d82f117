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

//! ClusterResourceOverride admission plugin.
//!
//! Rewrites the CPU and memory requests and limits of newly created pods from
//! cluster-wide ratios, unless the pod's namespace opts out. The crate carries
//! the admission plumbing the plugin runs in (operation filtering, a plugin
//! registry, an ordered chain, per-plugin configuration), an exact resource
//! quantity type, a namespace cache abstraction and the LimitRanger defaulting
//! stage that runs ahead of the overrides.

pub mod admission;
pub mod api;
pub mod cache;
pub mod plugins;

// Re-export commonly used types
pub use admission::{
    AdmissionConfig, AdmissionError, AdmissionResult, Attributes, AttributesRecord, Chain,
    Handler, Interface, MutationInterface, Operation, Plugins,
};
pub use api::core::{Container, Namespace, Pod, PodSpec, ResourceRequirements};
pub use api::resource::Quantity;
pub use cache::{CacheError, InMemoryNamespaceCache, NamespaceCache};
pub use plugins::{register_all_admission_plugins, PluginDependencies};
