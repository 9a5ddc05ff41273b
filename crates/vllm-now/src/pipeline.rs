//! Parameters and devices in, rendered artifacts out. No I/O besides device discovery.

use crate::config::DeploymentOptions;
use crate::discovery::{resolve_devices, DeviceDiscovery};
use crate::error::Result;
use crate::params::{normalize, LaunchParameters};
use crate::partition::partition;
use crate::render::{render, RenderContext, RenderedArtifacts};

/// Validates the parameters, resolves and partitions the devices.
///
/// Parameters are validated before devices are looked up, so a bad command
/// line fails without touching NVML.
pub fn build_context(
    params: LaunchParameters,
    device_override: Option<&str>,
    options: DeploymentOptions,
    discovery: &dyn DeviceDiscovery,
) -> Result<RenderContext> {
    let params = normalize(params)?;
    let devices = resolve_devices(device_override, discovery)?;
    let groups = partition(&devices, params.group_size)?;

    if groups.is_empty() {
        tracing::warn!(
            devices = devices.len(),
            group_size = params.group_size,
            "No complete device group available, generating a deployment without servers"
        );
    } else {
        tracing::info!(
            "Generating {} server(s) with {} device(s) each",
            groups.len(),
            params.group_size
        );
        for group in &groups {
            tracing::debug!("Device group {}", group);
        }
    }

    Ok(RenderContext::new(params, groups, options))
}

pub fn generate(
    params: LaunchParameters,
    device_override: Option<&str>,
    options: DeploymentOptions,
    discovery: &dyn DeviceDiscovery,
) -> Result<RenderedArtifacts> {
    let context = build_context(params, device_override, options, discovery)?;
    Ok(render(&context))
}
