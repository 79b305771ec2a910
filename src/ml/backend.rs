// ============================================================
// Layer 5 — Backend Selection
// ============================================================
// Burn picks its backend at compile time through a type
// parameter, while the device and precision are only known
// once the flags are parsed. A BackendJob bridges the two:
// the job is written once, generic over the backend, and
// run_on_backend instantiates it for the right one.
//
//   gpu + float32        → Autodiff<Wgpu>
//   gpu + mixed_float16  → Autodiff<Wgpu<f16>>
//   cpu + float32        → Autodiff<NdArray>
//   cpu + mixed_float16  → error, NdArray has no f16 kernels

use anyhow::{bail, Result};
use burn::{
    backend::{ndarray::NdArrayDevice, wgpu::WgpuDevice, Autodiff, NdArray, Wgpu},
    tensor::backend::AutodiffBackend,
};
use half::f16;

use crate::domain::options::{DeviceKind, PrecisionPolicy};

pub type GpuBackend     = Autodiff<Wgpu>;
pub type GpuHalfBackend = Autodiff<Wgpu<f16>>;
pub type CpuBackend     = Autodiff<NdArray>;

/// Work that runs on whichever backend the run selects.
pub trait BackendJob {
    type Output;

    fn run<B: AutodiffBackend>(self, device: B::Device) -> Result<Self::Output>;
}

/// Name of the backend a device/precision pair maps to.
pub fn backend_name(device: DeviceKind, precision: PrecisionPolicy) -> Result<&'static str> {
    Ok(match (device, precision) {
        (DeviceKind::Gpu, PrecisionPolicy::Float32)      => "wgpu (f32)",
        (DeviceKind::Gpu, PrecisionPolicy::MixedFloat16) => "wgpu (f16)",
        (DeviceKind::Cpu, PrecisionPolicy::Float32)      => "ndarray (f32)",
        (DeviceKind::Cpu, PrecisionPolicy::MixedFloat16) => {
            bail!("mixed_float16 needs a GPU device, the CPU backend only computes in float32")
        }
    })
}

pub fn run_on_backend<J: BackendJob>(
    device:    DeviceKind,
    precision: PrecisionPolicy,
    job:       J,
) -> Result<J::Output> {
    tracing::info!("Using backend: {}", backend_name(device, precision)?);

    match (device, precision) {
        (DeviceKind::Gpu, PrecisionPolicy::Float32) => {
            job.run::<GpuBackend>(WgpuDevice::default())
        }
        (DeviceKind::Gpu, PrecisionPolicy::MixedFloat16) => {
            job.run::<GpuHalfBackend>(WgpuDevice::default())
        }
        (DeviceKind::Cpu, PrecisionPolicy::Float32) => {
            job.run::<CpuBackend>(NdArrayDevice::Cpu)
        }
        (DeviceKind::Cpu, PrecisionPolicy::MixedFloat16) => {
            bail!("mixed_float16 is not available on the CPU backend")
        }
    }
}
