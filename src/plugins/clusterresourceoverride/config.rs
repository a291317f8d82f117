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

//! Configuration for the ClusterResourceOverride plugin.

use crate::api::resource::Dec;
use serde::{Deserialize, Serialize};
use std::io::{self, Read};
use thiserror::Error;

/// Kind accepted in the `kind` field of the plugin configuration.
pub const CONFIG_KIND: &str = "ClusterResourceOverrideConfig";

/// Fractional digits kept when a ratio is turned into a decimal.
const RATIO_SCALE: u32 = 9;

/// Errors produced while reading or validating the plugin configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Read(#[from] io::Error),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("unexpected configuration kind {0:?}, expected \"ClusterResourceOverrideConfig\"")]
    UnexpectedKind(String),

    #[error("ClusterResourceOverride plugin enabled but no ratios specified")]
    NoRatios,

    #[error("limitCPUToMemoryPercent must be positive")]
    NegativeLimitCpuToMemory,

    #[error("cpuRequestToLimitPercent must be between 0.0 and 100.0")]
    CpuRequestOutOfRange,

    #[error("memoryRequestToLimitPercent must be between 0.0 and 100.0")]
    MemoryRequestOutOfRange,

    #[error("{0} must be a finite number")]
    NotFinite(&'static str),

    #[error("{0} is too large")]
    TooLarge(&'static str),
}

/// ClusterResourceOverrideConfig is the on-disk configuration of the plugin.
///
/// A ratio of `0` leaves the corresponding quantity alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterResourceOverrideConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// CPU limit as a percentage of memory limit, with 1Gi worth 1 core at 100.
    #[serde(default, rename = "limitCPUToMemoryPercent")]
    pub limit_cpu_to_memory_percent: f64,

    /// CPU request as a percentage of the CPU limit.
    #[serde(default)]
    pub cpu_request_to_limit_percent: f64,

    /// Memory request as a percentage of the memory limit.
    #[serde(default)]
    pub memory_request_to_limit_percent: f64,
}

impl ClusterResourceOverrideConfig {
    pub fn new(limit_cpu_to_memory: f64, cpu_request_to_limit: f64, memory_request_to_limit: f64) -> Self {
        Self {
            api_version: Some("v1".to_string()),
            kind: Some(CONFIG_KIND.to_string()),
            limit_cpu_to_memory_percent: limit_cpu_to_memory,
            cpu_request_to_limit_percent: cpu_request_to_limit,
            memory_request_to_limit_percent: memory_request_to_limit,
        }
    }
}

/// Read the plugin configuration.
///
/// Absent or blank input yields `Ok(None)`: the plugin loads but stays inert.
/// JSON input is accepted since it parses as YAML.
pub fn read_config(
    config: Option<&mut dyn Read>,
) -> Result<Option<ClusterResourceOverrideConfig>, ConfigError> {
    let reader = match config {
        Some(r) => r,
        None => return Ok(None),
    };

    let mut data = String::new();
    reader.read_to_string(&mut data)?;
    if data.trim().is_empty() {
        return Ok(None);
    }

    let config: ClusterResourceOverrideConfig = serde_yaml::from_str(&data)?;
    if let Some(kind) = &config.kind {
        if kind != CONFIG_KIND {
            return Err(ConfigError::UnexpectedKind(kind.clone()));
        }
    }
    Ok(Some(config))
}

/// Validate the ratios of a configuration.
pub fn validate(config: &ClusterResourceOverrideConfig) -> Result<(), ConfigError> {
    let ratios = [
        ("limitCPUToMemoryPercent", config.limit_cpu_to_memory_percent),
        ("cpuRequestToLimitPercent", config.cpu_request_to_limit_percent),
        ("memoryRequestToLimitPercent", config.memory_request_to_limit_percent),
    ];
    if let Some((field, _)) = ratios.iter().find(|(_, v)| !v.is_finite()) {
        return Err(ConfigError::NotFinite(*field));
    }
    if ratios.iter().all(|(_, v)| *v == 0.0) {
        return Err(ConfigError::NoRatios);
    }
    if config.limit_cpu_to_memory_percent < 0.0 {
        return Err(ConfigError::NegativeLimitCpuToMemory);
    }
    if !(0.0..=100.0).contains(&config.cpu_request_to_limit_percent) {
        return Err(ConfigError::CpuRequestOutOfRange);
    }
    if !(0.0..=100.0).contains(&config.memory_request_to_limit_percent) {
        return Err(ConfigError::MemoryRequestOutOfRange);
    }
    Ok(())
}

/// OverrideRatios holds validated ratios as exact decimal percentages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverrideRatios {
    pub limit_cpu_to_memory_percent: Dec,
    pub cpu_request_to_limit_percent: Dec,
    pub memory_request_to_limit_percent: Dec,
}

impl OverrideRatios {
    /// Validate `config` and convert its ratios.
    pub fn from_config(config: &ClusterResourceOverrideConfig) -> Result<Self, ConfigError> {
        validate(config)?;
        let ratios = Self {
            limit_cpu_to_memory_percent: to_dec(
                "limitCPUToMemoryPercent",
                config.limit_cpu_to_memory_percent,
            )?,
            cpu_request_to_limit_percent: to_dec(
                "cpuRequestToLimitPercent",
                config.cpu_request_to_limit_percent,
            )?,
            memory_request_to_limit_percent: to_dec(
                "memoryRequestToLimitPercent",
                config.memory_request_to_limit_percent,
            )?,
        };
        // Ratios below the kept precision become zero.
        if ratios.limit_cpu_to_memory_percent.is_zero()
            && ratios.cpu_request_to_limit_percent.is_zero()
            && ratios.memory_request_to_limit_percent.is_zero()
        {
            return Err(ConfigError::NoRatios);
        }
        Ok(ratios)
    }
}

fn to_dec(field: &'static str, value: f64) -> Result<Dec, ConfigError> {
    Dec::from_f64(value, RATIO_SCALE).ok_or(ConfigError::TooLarge(field))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_str(data: &str) -> Result<Option<ClusterResourceOverrideConfig>, ConfigError> {
        let mut bytes = data.as_bytes();
        read_config(Some(&mut bytes))
    }

    #[test]
    fn test_read_config_absent_or_blank() {
        assert!(read_config(None).unwrap().is_none());
        assert!(read_str("").unwrap().is_none());
        assert!(read_str("  \n\t\n").unwrap().is_none());
    }

    #[test]
    fn test_read_config_yaml() {
        let config = read_str(
            "apiVersion: v1\n\
             kind: ClusterResourceOverrideConfig\n\
             limitCPUToMemoryPercent: 100\n\
             cpuRequestToLimitPercent: 50\n\
             memoryRequestToLimitPercent: 25.5\n",
        )
        .unwrap()
        .unwrap();

        assert_eq!(config.limit_cpu_to_memory_percent, 100.0);
        assert_eq!(config.cpu_request_to_limit_percent, 50.0);
        assert_eq!(config.memory_request_to_limit_percent, 25.5);
    }

    #[test]
    fn test_read_config_defaults_missing_ratios_and_kind() {
        let config = read_str("{\"cpuRequestToLimitPercent\": 10, \"unknownField\": true}")
            .unwrap()
            .unwrap();
        assert_eq!(config.kind, None);
        assert_eq!(config.limit_cpu_to_memory_percent, 0.0);
        assert_eq!(config.cpu_request_to_limit_percent, 10.0);
        assert_eq!(config.memory_request_to_limit_percent, 0.0);
    }

    #[test]
    fn test_read_config_errors() {
        assert!(matches!(read_str("asdfasdfasdF"), Err(ConfigError::Parse(_))));
        assert!(matches!(
            read_str("kind: LimitRange\ncpuRequestToLimitPercent: 10\n"),
            Err(ConfigError::UnexpectedKind(kind)) if kind == "LimitRange"
        ));
        assert!(matches!(
            read_str("cpuRequestToLimitPercent: lots\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_config_round_trip() {
        let cases = [
            ClusterResourceOverrideConfig::new(100.0, 50.0, 50.0),
            ClusterResourceOverrideConfig::new(0.0, 0.0, 33.3),
            ClusterResourceOverrideConfig::new(200.0, 100.0, 0.0),
            ClusterResourceOverrideConfig {
                limit_cpu_to_memory_percent: 12.5,
                ..Default::default()
            },
        ];
        for config in cases {
            let json = serde_json::to_string(&config).unwrap();
            let parsed = read_str(&json).unwrap().unwrap();
            assert_eq!(parsed, config, "round trip of {}", json);

            let yaml = serde_yaml::to_string(&config).unwrap();
            assert_eq!(read_str(&yaml).unwrap().unwrap(), config);
        }
    }

    #[test]
    fn test_validate() {
        struct Case {
            name: &'static str,
            config: ClusterResourceOverrideConfig,
            ok: bool,
        }

        let cases = vec![
            Case {
                name: "all ratios set",
                config: ClusterResourceOverrideConfig::new(100.0, 50.0, 50.0),
                ok: true,
            },
            Case {
                name: "upper bounds",
                config: ClusterResourceOverrideConfig::new(1000.0, 100.0, 100.0),
                ok: true,
            },
            Case {
                name: "no ratios",
                config: ClusterResourceOverrideConfig::new(0.0, 0.0, 0.0),
                ok: false,
            },
            Case {
                name: "negative limit ratio",
                config: ClusterResourceOverrideConfig::new(-1.0, 50.0, 50.0),
                ok: false,
            },
            Case {
                name: "cpu request above range",
                config: ClusterResourceOverrideConfig::new(0.0, 150.0, 0.0),
                ok: false,
            },
            Case {
                name: "cpu request below range",
                config: ClusterResourceOverrideConfig::new(0.0, -0.5, 10.0),
                ok: false,
            },
            Case {
                name: "memory request above range",
                config: ClusterResourceOverrideConfig::new(0.0, 0.0, 100.01),
                ok: false,
            },
            Case {
                name: "nan",
                config: ClusterResourceOverrideConfig::new(f64::NAN, 50.0, 0.0),
                ok: false,
            },
        ];

        for case in cases {
            assert_eq!(validate(&case.config).is_ok(), case.ok, "case {}", case.name);
        }
    }

    #[test]
    fn test_validate_error_kinds() {
        assert!(matches!(
            validate(&ClusterResourceOverrideConfig::new(0.0, 0.0, 0.0)),
            Err(ConfigError::NoRatios)
        ));
        assert!(matches!(
            validate(&ClusterResourceOverrideConfig::new(-1.0, 0.0, 0.0)),
            Err(ConfigError::NegativeLimitCpuToMemory)
        ));
        assert!(matches!(
            validate(&ClusterResourceOverrideConfig::new(0.0, 150.0, 0.0)),
            Err(ConfigError::CpuRequestOutOfRange)
        ));
        assert!(matches!(
            validate(&ClusterResourceOverrideConfig::new(0.0, 0.0, 101.0)),
            Err(ConfigError::MemoryRequestOutOfRange)
        ));
        assert!(matches!(
            validate(&ClusterResourceOverrideConfig::new(0.0, f64::INFINITY, 0.0)),
            Err(ConfigError::NotFinite("cpuRequestToLimitPercent"))
        ));
    }

    #[test]
    fn test_validate_is_repeatable() {
        let configs = [
            ClusterResourceOverrideConfig::new(100.0, 50.0, 50.0),
            ClusterResourceOverrideConfig::new(0.0, 150.0, 0.0),
            ClusterResourceOverrideConfig::new(0.0, 0.0, 0.0),
        ];
        for config in &configs {
            let first = validate(config).map_err(|e| e.to_string());
            for _ in 0..3 {
                assert_eq!(validate(config).map_err(|e| e.to_string()), first);
            }
        }
    }

    #[test]
    fn test_override_ratios_are_exact() {
        let ratios =
            OverrideRatios::from_config(&ClusterResourceOverrideConfig::new(33.3, 50.0, 0.1))
                .unwrap();
        assert_eq!(ratios.limit_cpu_to_memory_percent, Dec::new(333, 1));
        assert_eq!(ratios.cpu_request_to_limit_percent, Dec::from_int(50));
        assert_eq!(ratios.memory_request_to_limit_percent, Dec::new(1, 1));
        assert!(
            OverrideRatios::from_config(&ClusterResourceOverrideConfig::new(0.0, 0.0, 0.0))
                .is_err()
        );
    }

    #[test]
    fn test_ratios_rounding_to_zero_are_rejected() {
        let config = ClusterResourceOverrideConfig::new(0.0, 0.0, 1e-12);
        assert!(validate(&config).is_ok());
        assert!(matches!(
            OverrideRatios::from_config(&config),
            Err(ConfigError::NoRatios)
        ));

        let config = ClusterResourceOverrideConfig::new(1e-12, 0.0, 0.000000001);
        let ratios = OverrideRatios::from_config(&config).unwrap();
        assert!(ratios.limit_cpu_to_memory_percent.is_zero());
        assert_eq!(ratios.memory_request_to_limit_percent, Dec::new(1, 9));
    }

    #[test]
    fn test_override_ratios_reject_unrepresentable() {
        let config = ClusterResourceOverrideConfig::new(1e300, 0.0, 0.0);
        assert!(matches!(
            OverrideRatios::from_config(&config),
            Err(ConfigError::TooLarge("limitCPUToMemoryPercent"))
        ));
    }
}
