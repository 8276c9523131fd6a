//! Crate-level error types.

use thiserror::Error;

use crate::gpu::DeviceError;

/// Errors surfaced by the terrain and morphology APIs.
#[derive(Debug, Error)]
pub enum Error {
    /// Heightmap side length must be 2^n + 1 so the grid subdivides evenly.
    #[error("heightmap size {0} is not of the form 2^n + 1")]
    InvalidSize(usize),
    /// The structuring element is degenerate (zero-sized, empty, or bad anchor).
    #[error("invalid structuring element: {0}")]
    InvalidElement(String),
    /// GPU allocation, launch, or readback failure.
    #[error(transparent)]
    Device(#[from] DeviceError),
}
