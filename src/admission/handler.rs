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

//! Operation gate shared by the admission plugins.
//!
//! ClusterResourceOverride only rewrites pods as they are created, while the
//! LimitRanger defaults are also applied to updates.

use super::interfaces::{Interface, Operation};

/// Handler holds the operations a plugin acts on, in the order given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handler {
    operations: Vec<Operation>,
}

impl Handler {
    /// Gate on `operations`; duplicates are dropped.
    pub fn new(operations: &[Operation]) -> Self {
        let mut kept = Vec::with_capacity(operations.len());
        for op in operations {
            if !kept.contains(op) {
                kept.push(*op);
            }
        }
        Self { operations: kept }
    }

    /// Pod creation only, the ClusterResourceOverride gate.
    pub fn new_create() -> Self {
        Self::new(&[Operation::Create])
    }

    /// Create and Update, the LimitRanger gate.
    pub fn new_create_update() -> Self {
        Self::new(&[Operation::Create, Operation::Update])
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }
}

impl Interface for Handler {
    fn handles(&self, operation: Operation) -> bool {
        self.operations.contains(&operation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_gate_rejects_other_operations() {
        let handler = Handler::new_create();
        assert_eq!(handler.operations(), &[Operation::Create]);
        for op in [Operation::Update, Operation::Delete, Operation::Connect] {
            assert!(!handler.handles(op), "{}", op);
        }
        assert!(handler.handles(Operation::Create));
    }

    #[test]
    fn test_create_update_gate() {
        let handler = Handler::new_create_update();
        assert!(handler.handles(Operation::Create));
        assert!(handler.handles(Operation::Update));
        assert!(!handler.handles(Operation::Delete));
        assert!(!handler.handles(Operation::Connect));
    }

    #[test]
    fn test_duplicates_are_dropped() {
        let handler = Handler::new(&[Operation::Update, Operation::Create, Operation::Update]);
        assert_eq!(handler.operations(), &[Operation::Update, Operation::Create]);
        assert_eq!(Handler::new(&[Operation::Create, Operation::Create]), Handler::new_create());
    }

    #[test]
    fn test_empty_gate() {
        let handler = Handler::new(&[]);
        assert!(handler.operations().is_empty());
        assert!(!handler.handles(Operation::Create));
    }
}
