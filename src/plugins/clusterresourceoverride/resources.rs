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

//! Ratio-based rewriting of container resources.
//!
//! Memory is in bytes and CPU in cores with three decimal places, so every
//! derived value is computed as a single integer product divided once and
//! truncated toward zero. CPU values are stored at scale 3 and memory values
//! at scale 0. A new quantity keeps the format of the value it replaces.

use super::config::OverrideRatios;
use crate::api::core::{PodSpec, ResourceRequirements, RESOURCE_CPU, RESOURCE_MEMORY};
use crate::api::resource::{Dec, Quantity};
use tracing::{trace, warn};

/// Bytes in one GiB; 1Gi of memory maps to 1000 millicores at 100%.
const BYTES_PER_GIB: i128 = 1 << 30;

const MILLIS_PER_CORE: i128 = 1000;

/// Apply the overrides to every init and regular container of `spec`.
pub fn override_pod_resources(spec: &mut PodSpec, ratios: &OverrideRatios) {
    spec.visit_containers_with_path_mut("spec", |container, path| {
        trace!(container = %path, resources = ?container.resources, "resources before override");
        override_container_resources(&mut container.resources, ratios);
        trace!(container = %path, resources = ?container.resources, "resources after override");
    });
}

/// Apply the overrides to one container's resources.
///
/// Steps run in order, so the CPU request is derived from the CPU limit
/// this call may just have written. A step is skipped when its ratio is zero.
/// An unset source reads as zero, so its target is written as zero.
pub fn override_container_resources(resources: &mut ResourceRequirements, ratios: &OverrideRatios) {
    let pct = &ratios.limit_cpu_to_memory_percent;
    if !pct.is_zero() {
        let memory = resources.limits_memory().value();
        match percent_of(memory, MILLIS_PER_CORE, BYTES_PER_GIB, pct) {
            Some(millis) => {
                let format = resources.limits_cpu().format();
                resources
                    .limits
                    .insert(RESOURCE_CPU.to_string(), Quantity::from_milli(millis, format));
            }
            None => warn!(memory, "cpu limit override overflowed, keeping previous value"),
        }
    }

    let pct = &ratios.cpu_request_to_limit_percent;
    if !pct.is_zero() {
        let limit_millis = resources.limits_cpu().milli_value();
        match percent_of(limit_millis, 1, 1, pct) {
            Some(millis) => {
                let format = resources.requests_cpu().format();
                resources
                    .requests
                    .insert(RESOURCE_CPU.to_string(), Quantity::from_milli(millis, format));
            }
            None => warn!(limit_millis, "cpu request override overflowed, keeping previous value"),
        }
    }

    let pct = &ratios.memory_request_to_limit_percent;
    if !pct.is_zero() {
        let memory = resources.limits_memory().value();
        match percent_of(memory, 1, 1, pct) {
            Some(bytes) => {
                let format = resources.requests_memory().format();
                resources
                    .requests
                    .insert(RESOURCE_MEMORY.to_string(), Quantity::from_value(bytes, format));
            }
            None => warn!(memory, "memory request override overflowed, keeping previous value"),
        }
    }
}

/// `value * multiplier * percent / (divisor * 100)`, truncated toward zero.
///
/// `None` if an intermediate product does not fit.
fn percent_of(value: i128, multiplier: i128, divisor: i128, percent: &Dec) -> Option<i128> {
    let numerator = value
        .checked_mul(multiplier)?
        .checked_mul(percent.unscaled())?;
    let denominator = divisor
        .checked_mul(100)?
        .checked_mul(10i128.checked_pow(percent.scale())?)?;
    Some(numerator / denominator)
}
