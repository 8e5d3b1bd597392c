use std::str::FromStr;

use crate::error::CoreError;

/// Device requested by `runtime.device`.
///
/// # Example
/// ```
/// use ac_core::device::DeviceRequest;
/// let req: DeviceRequest = "auto".parse().unwrap();
/// assert_eq!(req, DeviceRequest::Auto);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceRequest {
    /// Accelerator if one is present, CPU otherwise.
    Auto,
    /// Force the CPU backend.
    Cpu,
    /// Force the GPU backend.
    Gpu,
}

/// Compute device a run executes on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComputeDevice {
    /// NdArray backend.
    Cpu,
    /// wgpu backend.
    Gpu,
}

impl FromStr for DeviceRequest {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "cpu" => Ok(Self::Cpu),
            // CUDA cards are driven through wgpu (Vulkan) here.
            "gpu" | "wgpu" | "cuda" => Ok(Self::Gpu),
            other => Err(CoreError::Config(format!(
                "runtime.device: unknown device '{other}' (expected auto, cpu, gpu, wgpu or cuda)"
            ))),
        }
    }
}

impl DeviceRequest {
    /// Resolve the request to a concrete device.
    ///
    /// `probe` is only called for [`DeviceRequest::Auto`] and reports whether
    /// an accelerator is usable.
    ///
    /// # Example
    /// ```
    /// use ac_core::device::{ComputeDevice, DeviceRequest};
    /// assert_eq!(DeviceRequest::Auto.resolve(|| false), ComputeDevice::Cpu);
    /// assert_eq!(DeviceRequest::Auto.resolve(|| true), ComputeDevice::Gpu);
    /// ```
    pub fn resolve(self, probe: impl FnOnce() -> bool) -> ComputeDevice {
        match self {
            Self::Cpu => ComputeDevice::Cpu,
            Self::Gpu => ComputeDevice::Gpu,
            Self::Auto => {
                if probe() {
                    ComputeDevice::Gpu
                } else {
                    ComputeDevice::Cpu
                }
            }
        }
    }
}

impl ComputeDevice {
    /// Lowercase identifier.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Gpu => "gpu",
        }
    }
}

impl std::fmt::Display for ComputeDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name().to_ascii_uppercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("CPU".parse::<DeviceRequest>().unwrap(), DeviceRequest::Cpu);
        assert_eq!(" Cuda ".parse::<DeviceRequest>().unwrap(), DeviceRequest::Gpu);
        assert!("tpu".parse::<DeviceRequest>().is_err());
    }

    #[test]
    fn explicit_request_skips_probe() {
        let device = DeviceRequest::Cpu.resolve(|| panic!("probe must not run"));
        assert_eq!(device, ComputeDevice::Cpu);
        let device = DeviceRequest::Gpu.resolve(|| panic!("probe must not run"));
        assert_eq!(device, ComputeDevice::Gpu);
    }

    #[test]
    fn auto_without_accelerator_falls_back_to_cpu() {
        assert_eq!(DeviceRequest::Auto.resolve(|| false), ComputeDevice::Cpu);
        assert_eq!(ComputeDevice::Cpu.to_string(), "CPU");
    }
}
