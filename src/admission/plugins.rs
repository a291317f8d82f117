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

//! Plugin registry for admission controllers.
//!
//! A `Plugins` value is owned by the composition root. Factories capture the
//! collaborators their plugin needs when they are registered, so no plugin
//! has to be probed for dependencies after construction.

use super::chain::Chain;
use super::config::AdmissionConfig;
use super::errors::{AdmissionError, AdmissionResult};
use super::interfaces::MutationInterface;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Factory creates an admission plugin instance from its raw configuration.
pub type Factory = Arc<
    dyn Fn(Option<&mut dyn Read>) -> AdmissionResult<Arc<dyn MutationInterface>> + Send + Sync,
>;

/// Plugins is a registry of admission plugins.
#[derive(Default)]
pub struct Plugins {
    registry: RwLock<HashMap<String, Factory>>,
}

impl Plugins {
    /// Create a new empty plugin registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new admission plugin with the given name and factory.
    pub fn register<F>(&self, name: &str, factory: F)
    where
        F: Fn(Option<&mut dyn Read>) -> AdmissionResult<Arc<dyn MutationInterface>>
            + Send
            + Sync
            + 'static,
    {
        let mut registry = self.registry.write().expect("plugin registry lock poisoned");
        if registry.insert(name.to_string(), Arc::new(factory)).is_some() {
            debug!(plugin = name, "replaced previously registered admission plugin");
        }
    }

    /// Get a factory for the given plugin name.
    pub fn get_factory(&self, name: &str) -> Option<Factory> {
        let registry = self.registry.read().expect("plugin registry lock poisoned");
        registry.get(name).cloned()
    }

    /// Get all registered plugin names, sorted.
    pub fn registered_names(&self) -> Vec<String> {
        let registry = self.registry.read().expect("plugin registry lock poisoned");
        let mut names: Vec<String> = registry.keys().cloned().collect();
        names.sort();
        names
    }

    /// Check if a plugin is registered.
    pub fn is_registered(&self, name: &str) -> bool {
        let registry = self.registry.read().expect("plugin registry lock poisoned");
        registry.contains_key(name)
    }

    /// Create a new instance of the named plugin and check its initialization.
    pub fn new_from_plugins(
        &self,
        name: &str,
        config: Option<&mut dyn Read>,
    ) -> AdmissionResult<Arc<dyn MutationInterface>> {
        let factory = self
            .get_factory(name)
            .ok_or_else(|| AdmissionError::not_found("admission plugin", name))?;
        let plugin = factory(config)?;
        plugin.validate_initialization()?;
        debug!(plugin = name, "admission plugin initialized");
        Ok(plugin)
    }

    /// Build the ordered admission chain for `names`, reading each plugin's
    /// configuration from `config` (falling back to `default_file`).
    ///
    /// The first plugin that fails to build or to validate aborts the chain.
    pub fn new_chain(
        &self,
        names: &[&str],
        config: &AdmissionConfig,
        default_file: Option<&Path>,
    ) -> AdmissionResult<Chain> {
        let mut plugins = Vec::with_capacity(names.len());
        for &name in names {
            let raw = config
                .plugin_config(name, default_file)
                .map_err(|e| AdmissionError::invalid_config(name, e))?;
            let plugin = match raw {
                Some(bytes) => self.new_from_plugins(name, Some(&mut bytes.as_slice())),
                None => self.new_from_plugins(name, None),
            }?;
            plugins.push((name.to_string(), plugin));
        }
        Ok(Chain::new(plugins))
    }
}
