use std::fmt;

use crate::error::{GeneratorError, Result};

/// A fixed-size batch of device indices served by one vLLM instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceGroup {
    index: usize,
    devices: Vec<u32>,
}

impl DeviceGroup {
    /// Position of the group in the partition output.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn devices(&self) -> &[u32] {
        &self.devices
    }
}

impl fmt::Display for DeviceGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {:?}", self.index, self.devices)
    }
}

/// Splits `devices` into consecutive groups of exactly `group_size`.
///
/// Trailing devices that cannot fill a whole group are left out. An empty
/// device list produces no groups and is not an error.
pub fn partition(devices: &[u32], group_size: usize) -> Result<Vec<DeviceGroup>> {
    if group_size == 0 {
        return Err(GeneratorError::InvalidGroupSize { value: 0 });
    }

    let groups: Vec<DeviceGroup> = devices
        .chunks_exact(group_size)
        .enumerate()
        .map(|(index, chunk)| DeviceGroup {
            index,
            devices: chunk.to_vec(),
        })
        .collect();

    let unused = &devices[groups.len() * group_size..];
    if !unused.is_empty() {
        tracing::warn!(
            group_size,
            unused = ?unused,
            "Leaving devices unused, not enough to fill another group"
        );
    }

    Ok(groups)
}
