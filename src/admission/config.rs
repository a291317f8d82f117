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

//! Admission configuration: where each plugin finds its own config.
//!
//! ```yaml
//! pluginConfig:
//!   ClusterResourceOverride:
//!     configuration:
//!       apiVersion: v1
//!       kind: ClusterResourceOverrideConfig
//!       memoryRequestToLimitPercent: 50
//!   LimitRanger:
//!     location: /etc/admission/limitranger.yaml
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while resolving admission configuration.
#[derive(Debug, Error)]
pub enum AdmissionConfigError {
    #[error("failed to read admission config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse admission config: {0}")]
    Parse(#[source] serde_yaml::Error),

    #[error("failed to serialize embedded configuration for {plugin}: {source}")]
    Serialize {
        plugin: String,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Per-plugin configuration source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionPluginConfig {
    /// Path to a file holding the plugin's configuration.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub location: String,

    /// Configuration embedded inline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<serde_yaml::Value>,
}

/// AdmissionConfig maps plugin names to their configuration sources.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionConfig {
    #[serde(default)]
    pub plugin_config: HashMap<String, AdmissionPluginConfig>,
}

impl AdmissionConfig {
    /// Parse admission configuration from YAML (or JSON).
    pub fn from_yaml(data: &str) -> Result<Self, AdmissionConfigError> {
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(data).map_err(AdmissionConfigError::Parse)
    }

    /// Load admission configuration from a file.
    pub fn load(path: &Path) -> Result<Self, AdmissionConfigError> {
        let data = read_file(path)?;
        Self::from_yaml(&String::from_utf8_lossy(&data))
    }

    /// Return the raw configuration bytes for `plugin_name`.
    ///
    /// A plugin entry with a `location` reads that file; otherwise its embedded
    /// `configuration` is re-serialized. Plugins without an entry fall back to
    /// `default_file`. `None` means the plugin has no configuration at all.
    pub fn plugin_config(
        &self,
        plugin_name: &str,
        default_file: Option<&Path>,
    ) -> Result<Option<Vec<u8>>, AdmissionConfigError> {
        match self.plugin_config.get(plugin_name) {
            Some(cfg) if !cfg.location.is_empty() => read_file(Path::new(&cfg.location)).map(Some),
            Some(cfg) => match &cfg.configuration {
                Some(value) => serde_yaml::to_string(value)
                    .map(|s| Some(s.into_bytes()))
                    .map_err(|source| AdmissionConfigError::Serialize {
                        plugin: plugin_name.to_string(),
                        source,
                    }),
                None => Ok(None),
            },
            None => match default_file {
                Some(path) => read_file(path).map(Some),
                None => Ok(None),
            },
        }
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>, AdmissionConfigError> {
    std::fs::read(path).map_err(|source| AdmissionConfigError::Read {
        path: path.to_path_buf(),
        source,
    })
}
