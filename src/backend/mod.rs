//! Compute backends that run the candidate kernel
//!
//! A backend receives one job per digit-width tier ([`Backend::prepare`]) and
//! then any number of blocking dispatches over contiguous nonce ranges. The
//! CPU worker pool is always available; OpenCL devices are added with the
//! `opencl` feature.

pub mod cpu;
#[cfg(feature = "opencl")]
mod cl_kernels;
#[cfg(feature = "opencl")]
pub mod opencl;

use std::fmt;

use tracing::debug;

use crate::algorithm::{BatchResults, KernelParams, KernelVariant};
use crate::config::{DeviceSelector, KernelSelector};
use crate::error::{BackendError, ConfigError, MineError};

pub use cpu::CpuBackend;

/// Broad class of a device, used for batch sizing and kernel choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceClass {
    Cpu,
    Gpu,
    Other,
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DeviceClass::Cpu => "CPU",
            DeviceClass::Gpu => "GPU",
            DeviceClass::Other => "Other",
        })
    }
}

/// Capacity hints reported by a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub class: DeviceClass,
    /// Parallel compute units (cores, or OpenCL compute units)
    pub compute_units: u32,
    /// Preferred or maximum work-group size, if the backend has one
    pub group_size: Option<usize>,
    /// Device memory in bytes, if known
    pub global_mem: Option<u64>,
}

/// Where a backend lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendSource {
    /// Host worker pool with this many threads
    CpuPool { threads: usize },
    /// OpenCL device by platform and device position
    OpenCl { platform: usize, device: usize },
}

/// Description of an enumerated backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendInfo {
    pub name: String,
    pub vendor: String,
    pub version: String,
    /// Platform name for OpenCL devices
    pub platform: Option<String>,
    pub caps: Capabilities,
    pub source: BackendSource,
}

impl BackendInfo {
    /// Whether this is a wide-parallelism device
    pub fn is_gpu(&self) -> bool {
        self.caps.class == DeviceClass::Gpu
    }
}

/// A device or worker pool that evaluates batches of lanes
pub trait Backend {
    fn info(&self) -> &BackendInfo;

    /// Bind the kernel inputs for subsequent dispatches.
    fn prepare(
        &mut self,
        variant: KernelVariant,
        params: KernelParams<'_>,
    ) -> Result<(), BackendError>;

    /// Evaluate lanes `0..lanes` for nonces starting at `base_nonce` and wait
    /// for completion. Hits come back in ascending lane order.
    fn dispatch(&mut self, base_nonce: u64, lanes: usize) -> Result<BatchResults, BackendError>;
}

/// All usable backends: the CPU pool first, then OpenCL devices.
pub fn enumerate(threads: usize) -> Vec<BackendInfo> {
    #[cfg_attr(not(feature = "opencl"), allow(unused_mut))]
    let mut all = vec![CpuBackend::describe(threads)];

    #[cfg(feature = "opencl")]
    match opencl::enumerate() {
        Ok(devices) => all.extend(devices),
        Err(e) => debug!("OpenCL enumeration failed: {}", e),
    }

    debug!(count = all.len(), "enumerated backends");
    all
}

/// Resolve a device selector against an enumerated list.
pub fn select(backends: &[BackendInfo], selector: DeviceSelector) -> Result<usize, MineError> {
    if backends.is_empty() {
        return Err(BackendError::NoBackend.into());
    }
    match selector {
        DeviceSelector::Index(index) if index < backends.len() => {
            debug!("Selected device [{}]: {}", index, backends[index].name);
            Ok(index)
        }
        DeviceSelector::Index(index) => Err(ConfigError::DeviceOutOfRange {
            index,
            count: backends.len(),
        }
        .into()),
        DeviceSelector::Auto => {
            let index = backends.iter().position(BackendInfo::is_gpu).unwrap_or(0);
            debug!("Auto-selected device [{}]: {}", index, backends[index].name);
            Ok(index)
        }
    }
}

/// Kernel variant suited to a backend.
///
/// The CPU pool and AMD devices take the midstate kernel; everything else
/// runs the generic one.
pub fn auto_kernel(info: &BackendInfo) -> KernelVariant {
    let vendor = info.vendor.to_ascii_lowercase();
    let amd = vendor.contains("amd") || vendor.contains("advanced micro devices");
    match info.source {
        BackendSource::CpuPool { .. } => KernelVariant::Midstate,
        BackendSource::OpenCl { .. } if amd => KernelVariant::Midstate,
        BackendSource::OpenCl { .. } => KernelVariant::Generic,
    }
}

/// Apply a kernel selector to a backend.
pub fn resolve_kernel(info: &BackendInfo, selector: KernelSelector) -> KernelVariant {
    match selector {
        KernelSelector::Auto => auto_kernel(info),
        KernelSelector::Variant(v) => v,
    }
}

/// Open the backend an enumerated entry describes.
pub fn open(info: &BackendInfo) -> Result<Box<dyn Backend>, BackendError> {
    match info.source {
        BackendSource::CpuPool { threads } => Ok(Box::new(CpuBackend::new(threads)?)),
        #[cfg(feature = "opencl")]
        BackendSource::OpenCl { .. } => Ok(Box::new(opencl::OpenClBackend::new(info.clone())?)),
        #[cfg(not(feature = "opencl"))]
        BackendSource::OpenCl { .. } => Err(BackendError::NoBackend),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gpu(vendor: &str) -> BackendInfo {
        BackendInfo {
            name: "Test GPU".into(),
            vendor: vendor.into(),
            version: "OpenCL 3.0".into(),
            platform: Some("Test Platform".into()),
            caps: Capabilities {
                class: DeviceClass::Gpu,
                compute_units: 40,
                group_size: Some(256),
                global_mem: Some(8 << 30),
            },
            source: BackendSource::OpenCl {
                platform: 0,
                device: 0,
            },
        }
    }

    #[test]
    fn test_auto_select_prefers_gpu() {
        let list = vec![CpuBackend::describe(4), gpu("NVIDIA Corporation")];
        assert_eq!(select(&list, DeviceSelector::Auto).unwrap(), 1);
        assert_eq!(select(&list[..1], DeviceSelector::Auto).unwrap(), 0);
    }

    #[test]
    fn test_select_by_index() {
        let list = vec![CpuBackend::describe(4)];
        assert_eq!(select(&list, DeviceSelector::Index(0)).unwrap(), 0);
        assert!(matches!(
            select(&list, DeviceSelector::Index(3)),
            Err(MineError::Config(ConfigError::DeviceOutOfRange { index: 3, count: 1 }))
        ));
        assert!(matches!(
            select(&[], DeviceSelector::Auto),
            Err(MineError::Backend(BackendError::NoBackend))
        ));
    }

    #[test]
    fn test_auto_kernel_by_vendor_and_class() {
        assert_eq!(auto_kernel(&CpuBackend::describe(2)), KernelVariant::Midstate);
        assert_eq!(auto_kernel(&gpu("Advanced Micro Devices, Inc.")), KernelVariant::Midstate);
        assert_eq!(auto_kernel(&gpu("AMD")), KernelVariant::Midstate);
        assert_eq!(auto_kernel(&gpu("NVIDIA Corporation")), KernelVariant::Generic);
        assert_eq!(auto_kernel(&gpu("Intel(R) Corporation")), KernelVariant::Generic);
    }

    #[test]
    fn test_explicit_kernel_wins() {
        let info = gpu("AMD");
        assert_eq!(
            resolve_kernel(&info, KernelSelector::Variant(KernelVariant::Generic)),
            KernelVariant::Generic
        );
    }
}
