//! Headless wgpu context for compute workloads.

use thiserror::Error;

use super::memory::AllocationTracker;

/// Errors surfaced by the GPU backend.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("no suitable GPU adapter found")]
    NoAdapter,
    #[error("failed to request device: {0}")]
    RequestDevice(String),
    #[error("device out of memory allocating {bytes} bytes")]
    OutOfMemory { bytes: u64 },
    #[error("kernel launch failed: {0}")]
    Kernel(String),
    #[error("buffer readback failed: {0}")]
    Readback(String),
}

/// Holds a wgpu device/queue used for compute dispatch.
///
/// Intentionally small; per-operation pipeline setup lives in
/// `diamond_square.rs` and `morphology.rs`, buffer management in `memory.rs`.
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub adapter_info: wgpu::AdapterInfo,
    tracker: AllocationTracker,
}

impl GpuContext {
    /// Create a headless wgpu device/queue suitable for compute.
    pub async fn new() -> Result<Self, DeviceError> {
        let instance = wgpu::Instance::default();
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(DeviceError::NoAdapter)?;
        let adapter_info = adapter.get_info();

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("terramorph-device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await
            .map_err(|e| DeviceError::RequestDevice(e.to_string()))?;

        Ok(Self {
            device,
            queue,
            adapter_info,
            tracker: AllocationTracker::default(),
        })
    }

    /// Tracker counting live device allocations made through this context.
    pub fn tracker(&self) -> AllocationTracker {
        self.tracker.clone()
    }

    /// Starts capturing validation errors for subsequent pipeline setup and
    /// kernel launches. Pair with [`GpuContext::synchronize`].
    pub fn watch_kernels(&self) {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
    }

    /// Blocks the calling thread until all previously submitted kernels on
    /// the queue complete, surfacing the first error captured since
    /// [`GpuContext::watch_kernels`].
    pub fn synchronize(&self) -> Result<(), DeviceError> {
        self.device.poll(wgpu::Maintain::Wait);
        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(DeviceError::Kernel(err.to_string()));
        }
        Ok(())
    }
}
