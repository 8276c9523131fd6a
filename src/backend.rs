//! Compute backend selection.

use serde::{Deserialize, Serialize};

/// Which backend executes a generation or morphology request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Backend {
    /// Prefer GPU; if GPU init fails, fall back to CPU.
    Auto,
    /// Require GPU (fail the call if unavailable).
    GpuOnly,
    /// Force the CPU implementation.
    CpuOnly,
}

impl Default for Backend {
    fn default() -> Self {
        Self::Auto
    }
}
