//! Diamond-square heightmap engine: configuration and backend dispatch.

pub mod diamond_square;

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::backend::Backend;
use crate::error::Error;
use crate::gpu::{DeviceError, DiamondSquareGpu, GpuContext};
use crate::grid::Heightmap;
use crate::rng::RandomField;

/// How the four corner cells are initialized before subdivision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CornerInit {
    /// All four corners start at the same height.
    Constant(f32),
    /// Explicit corner heights: [top-left, top-right, bottom-left, bottom-right].
    Values([f32; 4]),
    /// Corners drawn from a ChaCha8 stream seeded by the generation seed.
    Random,
}

impl Default for CornerInit {
    fn default() -> Self {
        Self::Constant(0.0)
    }
}

impl CornerInit {
    pub(crate) fn resolve(&self, seed: u64) -> [f32; 4] {
        match *self {
            CornerInit::Constant(v) => [v; 4],
            CornerInit::Values(vs) => vs,
            CornerInit::Random => {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                std::array::from_fn(|_| rng.random::<f32>() * 2.0 - 1.0)
            }
        }
    }
}

/// Configuration for fractal heightmap generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeightmapConfig {
    /// Side length of the square grid; must be 2^n + 1.
    pub size: usize,
    /// Displacement magnitude at the coarsest level; halves each level so
    /// coarse features dominate and fine detail stays bounded.
    pub roughness: f32,
    /// Random seed for reproducible generation.
    pub seed: u64,
    /// Corner initialization.
    pub corners: CornerInit,
    /// Which backend executes the subdivision kernels.
    pub backend: Backend,
}

impl Default for HeightmapConfig {
    fn default() -> Self {
        Self {
            size: 257,
            roughness: 1.0,
            seed: 42,
            corners: CornerInit::default(),
            backend: Backend::default(),
        }
    }
}

impl HeightmapConfig {
    /// Creates a configuration with the given seed and defaults elsewhere.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Default::default()
        }
    }

    /// Checks the 2^n + 1 size constraint.
    pub fn validate(&self) -> Result<(), Error> {
        if !Heightmap::is_valid_size(self.size) {
            return Err(Error::InvalidSize(self.size));
        }
        Ok(())
    }
}

/// Generates a fractal heightmap by midpoint displacement.
///
/// Output is bit-reproducible for a fixed seed: every perturbation is a pure
/// function of (seed, level, cell), so neither the backend's degree of
/// parallelism nor repeated invocation changes the result.
pub fn generate_heightmap(config: &HeightmapConfig) -> Result<Heightmap, Error> {
    config.validate()?;
    let field = RandomField::new(config.seed);
    let corners = config.corners.resolve(config.seed);

    let run_gpu = || -> Result<Vec<f32>, DeviceError> {
        let ctx = pollster::block_on(GpuContext::new())?;
        let gpu = DiamondSquareGpu::new(ctx)?;
        gpu.generate(config.size, config.roughness, corners, &field)
    };
    let run_cpu = || diamond_square::generate_cpu(config.size, config.roughness, corners, &field);

    let data = match config.backend {
        Backend::CpuOnly => run_cpu(),
        Backend::GpuOnly => run_gpu()?,
        Backend::Auto => match run_gpu() {
            Ok(data) => data,
            Err(_gpu_err) => run_cpu(),
        },
    };

    Heightmap::from_data(config.size, data)
}
