//! wgpu compute backend: context, buffer management, and kernel runners.

pub mod context;
pub mod diamond_square;
pub mod memory;
pub mod morphology;

pub use context::{DeviceError, GpuContext};
pub use diamond_square::DiamondSquareGpu;
pub use memory::{AllocationTracker, DeviceBuffer};
pub use morphology::MorphologyGpu;
