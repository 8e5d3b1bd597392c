//! Backend selection and accelerator probing.

use ac_core::ComputeDevice;
use burn::backend::ndarray::NdArrayDevice;
use burn::backend::wgpu::{Wgpu, WgpuDevice};
use burn::backend::{Autodiff, NdArray};
use wgpu::{Backends, PowerPreference};

/// Training backend on the CPU.
pub type CpuBackend = Autodiff<NdArray>;
/// Training backend on the GPU.
pub type GpuBackend = Autodiff<Wgpu>;

/// CPU device handle.
#[must_use]
pub fn cpu_device() -> NdArrayDevice {
    NdArrayDevice::Cpu
}

/// Default wgpu device handle.
#[must_use]
pub fn gpu_device() -> WgpuDevice {
    WgpuDevice::default()
}

fn preferred_backends() -> Backends {
    #[cfg(target_os = "macos")]
    {
        Backends::METAL
    }
    #[cfg(target_os = "windows")]
    {
        Backends::DX12 | Backends::VULKAN
    }
    #[cfg(target_os = "linux")]
    {
        Backends::VULKAN
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows", target_os = "linux")))]
    {
        Backends::all()
    }
}

/// Whether wgpu can hand out a high-performance hardware adapter.
#[must_use]
pub fn gpu_available() -> bool {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: preferred_backends(),
        ..Default::default()
    });

    let adapter = pollster::block_on(async {
        instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: PowerPreference::HighPerformance,
                force_fallback_adapter: false,
                compatible_surface: None,
            })
            .await
    });

    match adapter {
        Ok(adapter) => {
            let info = adapter.get_info();
            if info.device_type == wgpu::DeviceType::Cpu {
                log::debug!("Ignoring software adapter: {}", info.name);
                false
            } else {
                log::debug!("GPU adapter: {} ({:?})", info.name, info.backend);
                true
            }
        }
        Err(e) => {
            log::debug!("No GPU adapter: {e}");
            false
        }
    }
}

/// Resolve `runtime.device` against the probe.
///
/// # Errors
/// Returns `CoreError::Config` for an unknown device name.
pub fn select_device(name: &str) -> Result<ComputeDevice, ac_core::CoreError> {
    let request: ac_core::DeviceRequest = name.parse()?;
    let device = request.resolve(gpu_available);
    log::info!("Device request '{name}' resolved to {device}");
    Ok(device)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_cpu_never_probes() {
        assert_eq!(select_device("cpu").unwrap(), ComputeDevice::Cpu);
    }

    #[test]
    fn unknown_device_is_a_config_error() {
        let err = select_device("tpu").unwrap_err();
        assert!(err.to_string().contains("tpu"));
    }
}
