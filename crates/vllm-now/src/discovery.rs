//! Finding out which accelerator devices the servers may use.

use nvml_wrapper::error::NvmlError;
use nvml_wrapper::Nvml;

use crate::error::{GeneratorError, Result};

/// Provider of the device indices currently visible to this host.
pub trait DeviceDiscovery {
    fn list_visible_devices(&self) -> Result<Vec<u32>>;
}

/// Discovers devices through NVML.
#[derive(Debug, Default)]
pub struct NvmlDiscovery;

impl DeviceDiscovery for NvmlDiscovery {
    fn list_visible_devices(&self) -> Result<Vec<u32>> {
        let discovery_error = |e: NvmlError| GeneratorError::DeviceDiscovery {
            message: e.to_string(),
        };

        let nvml = init_nvml().map_err(discovery_error)?;
        let device_count = nvml.device_count().map_err(discovery_error)?;

        let mut devices = Vec::with_capacity(device_count as usize);
        for i in 0..device_count {
            let device = nvml.device_by_index(i).map_err(discovery_error)?;
            let index = device.index().map_err(discovery_error)?;
            let name = device.name().unwrap_or_else(|_| "unknown".to_string());

            tracing::debug!("Found GPU {}: {}", index, name);
            devices.push(index);
        }

        tracing::info!("Discovered {} GPU device(s)", devices.len());
        Ok(devices)
    }
}

fn init_nvml() -> std::result::Result<Nvml, NvmlError> {
    match Nvml::init() {
        Ok(nvml) => Ok(nvml),
        Err(_) => {
            tracing::warn!("Standard NVML init failed, trying with explicit library path");
            Nvml::builder()
                .lib_path(std::ffi::OsStr::new("libnvidia-ml.so.1"))
                .init()
        }
    }
}

/// A fixed device list, used for an explicit device override.
#[derive(Debug, Clone, Default)]
pub struct StaticDevices(pub Vec<u32>);

impl DeviceDiscovery for StaticDevices {
    fn list_visible_devices(&self) -> Result<Vec<u32>> {
        Ok(self.0.clone())
    }
}

/// Parses a comma separated device list such as `CUDA_VISIBLE_DEVICES=0,2,3`.
///
/// The order is kept as written.
pub fn parse_device_override(input: &str) -> Result<Vec<u32>> {
    input
        .split(',')
        .map(str::trim)
        .map(|entry| {
            if entry.is_empty() {
                return Err(GeneratorError::DeviceOverrideParseError {
                    input: input.to_string(),
                    reason: "empty entry".to_string(),
                });
            }
            entry
                .parse::<u32>()
                .map_err(|_| GeneratorError::DeviceOverrideParseError {
                    input: input.to_string(),
                    reason: format!("`{entry}` is not a device index"),
                })
        })
        .collect()
}

/// Returns the ordered device list to partition.
///
/// A non-blank `device_override` is used verbatim; otherwise `discovery` is asked.
pub fn resolve_devices(
    device_override: Option<&str>,
    discovery: &dyn DeviceDiscovery,
) -> Result<Vec<u32>> {
    let device_override = device_override.filter(|list| !list.trim().is_empty());
    let pinned;
    let source: &dyn DeviceDiscovery = match device_override {
        Some(list) => {
            pinned = StaticDevices(parse_device_override(list)?);
            tracing::info!(devices = ?pinned.0, "Using device override");
            &pinned
        }
        None => discovery,
    };
    source.list_visible_devices()
}
