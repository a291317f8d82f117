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

//! Admission error types.

use super::attributes::Attributes;
use std::fmt;
use thiserror::Error;

/// Result type for admission operations.
pub type AdmissionResult<T> = Result<T, AdmissionError>;

/// AdmissionError represents errors that can occur while building or running admission plugins.
#[derive(Debug, Error)]
pub enum AdmissionError {
    /// Forbidden indicates the request is not allowed.
    #[error("{0}")]
    Forbidden(ForbiddenError),

    /// Internal represents an internal error.
    #[error("internal error: {0}")]
    Internal(String),

    /// NotFound indicates a resource was not found.
    #[error("{kind} \"{name}\" not found")]
    NotFound { kind: String, name: String },

    /// InvalidConfig is returned when a plugin's configuration cannot be used.
    #[error("{plugin}: {source}")]
    InvalidConfig {
        plugin: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// MissingDependency is returned when a plugin was never given a collaborator it needs.
    #[error("{plugin} did not get a {dependency}")]
    MissingDependency { plugin: String, dependency: String },
}

impl AdmissionError {
    /// Create a Forbidden error for the request described by `attributes`.
    pub fn new_forbidden(attributes: &dyn Attributes, cause: impl fmt::Display) -> Self {
        AdmissionError::Forbidden(ForbiddenError {
            name: attributes.get_name().to_string(),
            namespace: attributes.get_namespace().to_string(),
            resource: attributes.get_resource().resource.clone(),
            cause: cause.to_string(),
        })
    }

    /// Create a NotFound error.
    pub fn not_found(kind: impl Into<String>, name: impl Into<String>) -> Self {
        AdmissionError::NotFound {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Create an Internal error.
    pub fn internal_error(msg: impl Into<String>) -> Self {
        AdmissionError::Internal(msg.into())
    }

    /// Wrap a configuration error for the named plugin.
    pub fn invalid_config(
        plugin: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AdmissionError::InvalidConfig {
            plugin: plugin.into(),
            source: Box::new(source),
        }
    }

    /// Create a MissingDependency error.
    pub fn missing_dependency(plugin: impl Into<String>, dependency: impl Into<String>) -> Self {
        AdmissionError::MissingDependency {
            plugin: plugin.into(),
            dependency: dependency.into(),
        }
    }

    /// Returns true if this is a Forbidden error.
    pub fn is_forbidden(&self) -> bool {
        matches!(self, AdmissionError::Forbidden(_))
    }
}

/// ForbiddenError rejects the request described by its name, namespace and resource.
#[derive(Debug)]
pub struct ForbiddenError {
    pub name: String,
    pub namespace: String,
    pub resource: String,
    pub cause: String,
}

impl fmt::Display for ForbiddenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} \"{}\" is forbidden: {}",
            self.resource, self.name, self.cause
        )
    }
}
