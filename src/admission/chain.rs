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

//! Ordered chain of mutating admission plugins.

use super::attributes::Attributes;
use super::errors::AdmissionResult;
use super::interfaces::{Interface, MutationInterface, Operation};
use std::sync::Arc;
use tracing::trace;

/// Chain runs its plugins in order, stopping at the first rejection.
pub struct Chain {
    plugins: Vec<(String, Arc<dyn MutationInterface>)>,
}

impl Chain {
    pub fn new(plugins: Vec<(String, Arc<dyn MutationInterface>)>) -> Self {
        Self { plugins }
    }

    /// Names of the plugins in execution order.
    pub fn plugin_names(&self) -> Vec<&str> {
        self.plugins.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

impl Interface for Chain {
    fn handles(&self, operation: Operation) -> bool {
        self.plugins.iter().any(|(_, p)| p.handles(operation))
    }

    fn validate_initialization(&self) -> AdmissionResult<()> {
        self.plugins
            .iter()
            .try_for_each(|(_, p)| p.validate_initialization())
    }
}

impl MutationInterface for Chain {
    fn admit(&self, attributes: &mut dyn Attributes) -> AdmissionResult<()> {
        let operation = attributes.get_operation();
        for (name, plugin) in &self.plugins {
            if !plugin.handles(operation) {
                continue;
            }
            trace!(plugin = %name, %operation, "running admission plugin");
            plugin.admit(attributes)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admission::{AdmissionError, AttributesRecord, Handler};
    use crate::api::core::Pod;

    /// Appends its tag to the pod's "trail" annotation.
    struct Tagger {
        handler: Handler,
        tag: &'static str,
        reject: bool,
    }

    impl Interface for Tagger {
        fn handles(&self, operation: Operation) -> bool {
            self.handler.handles(operation)
        }
    }

    impl MutationInterface for Tagger {
        fn admit(&self, attributes: &mut dyn Attributes) -> AdmissionResult<()> {
            if self.reject {
                return Err(AdmissionError::new_forbidden(attributes, self.tag));
            }
            if let Some(pod) = attributes
                .get_object_mut()
                .and_then(|o| o.as_any_mut().downcast_mut::<Pod>())
            {
                pod.annotations
                    .entry("trail".to_string())
                    .or_default()
                    .push_str(self.tag);
            }
            Ok(())
        }
    }

    fn tagger(tag: &'static str, operations: &[Operation], reject: bool) -> (String, Arc<dyn MutationInterface>) {
        (
            tag.to_string(),
            Arc::new(Tagger {
                handler: Handler::new(operations),
                tag,
                reject,
            }),
        )
    }

    fn trail(attrs: &AttributesRecord) -> String {
        attrs
            .get_pod()
            .and_then(|p| p.annotations.get("trail").cloned())
            .unwrap_or_default()
    }

    #[test]
    fn test_chain_runs_plugins_in_order() {
        let chain = Chain::new(vec![
            tagger("a", &[Operation::Create], false),
            tagger("b", &[Operation::Update], false),
            tagger("c", &[Operation::Create, Operation::Update], false),
        ]);
        let mut attrs =
            AttributesRecord::new_pod("p", "ns", Operation::Create, Pod::new("p", "ns"));

        chain.admit(&mut attrs).unwrap();

        assert_eq!(trail(&attrs), "ac");
        assert_eq!(chain.plugin_names(), vec!["a", "b", "c"]);
        assert_eq!(chain.len(), 3);
    }

    #[test]
    fn test_chain_stops_at_first_rejection() {
        let chain = Chain::new(vec![
            tagger("a", &[Operation::Create], false),
            tagger("deny", &[Operation::Create], true),
            tagger("c", &[Operation::Create], false),
        ]);
        let mut attrs =
            AttributesRecord::new_pod("p", "ns", Operation::Create, Pod::new("p", "ns"));

        let err = chain.admit(&mut attrs).unwrap_err();

        assert!(err.is_forbidden());
        assert_eq!(trail(&attrs), "a");
    }

    #[test]
    fn test_chain_handles_union_of_operations() {
        let chain = Chain::new(vec![
            tagger("a", &[Operation::Create], false),
            tagger("b", &[Operation::Delete], false),
        ]);
        assert!(chain.handles(Operation::Create));
        assert!(chain.handles(Operation::Delete));
        assert!(!chain.handles(Operation::Connect));
        assert!(Chain::new(vec![]).is_empty());
    }
}
