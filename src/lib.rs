//! GPU-accelerated terrain synthesis and image morphology.
//!
//! Two compute engines form the core: a diamond-square midpoint-displacement
//! heightmap generator and a mathematical-morphology engine (erosion,
//! dilation, opening, closing) over 2D buffers. Both execute as wgpu compute
//! kernels with a deterministic rayon CPU fallback; callers pass plain host
//! parameters and receive ordinary host-owned buffers, with GPU residency an
//! internal detail.

pub mod backend;
pub mod error;
pub mod gpu;
pub mod grid;
pub mod morphology;
pub mod rng;
pub mod terrain;

pub use backend::Backend;
pub use error::Error;
pub use grid::{Heightmap, Image};
pub use morphology::{
    close, dilate, erode, open, EdgeMode, MorphConfig, MorphOp, StructuringElement,
};
pub use rng::RandomField;
pub use terrain::{generate_heightmap, CornerInit, HeightmapConfig};
