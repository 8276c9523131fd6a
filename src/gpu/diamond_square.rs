//! Compute pipelines for diamond-square generation.

use std::borrow::Cow;

use bytemuck::{Pod, Zeroable};

use super::context::{DeviceError, GpuContext};
use crate::rng::RandomField;

const WORKGROUP: u32 = 8;

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct LevelParams {
    size: u32,
    step: u32,
    level: u32,
    seed_lo: u32,
    seed_hi: u32,
    amplitude: f32,
    _pad0: u32,
    _pad1: u32,
}

/// GPU runner for the diamond-square engine.
///
/// One dispatch per pass per level over a single storage-buffer heightmap;
/// levels are ordered by their position in the command encoder. The WGSL
/// kernels mirror `terrain::diamond_square` expression for expression, so
/// both backends produce identical bits.
pub struct DiamondSquareGpu {
    ctx: GpuContext,
    bgl: wgpu::BindGroupLayout,
    diamond: wgpu::ComputePipeline,
    square: wgpu::ComputePipeline,
}

impl DiamondSquareGpu {
    pub fn new(ctx: GpuContext) -> Result<Self, DeviceError> {
        ctx.watch_kernels();
        let module = ctx
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("terramorph-diamond-square-wgsl"),
                source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(include_str!(
                    "shaders/diamond_square.wgsl"
                ))),
            });

        let bgl = ctx
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("terramorph-ds-bgl"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: Some(
                                std::num::NonZeroU64::new(
                                    std::mem::size_of::<LevelParams>() as u64
                                )
                                .unwrap(),
                            ),
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Storage { read_only: false },
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                ],
            });

        let pipeline_layout = ctx
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("terramorph-ds-pipeline-layout"),
                bind_group_layouts: &[&bgl],
                push_constant_ranges: &[],
            });

        let diamond = ctx
            .device
            .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some("diamond_step"),
                layout: Some(&pipeline_layout),
                module: &module,
                entry_point: Some("diamond_step"),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                cache: None,
            });
        let square = ctx
            .device
            .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some("square_step"),
                layout: Some(&pipeline_layout),
                module: &module,
                entry_point: Some("square_step"),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                cache: None,
            });
        ctx.synchronize()?;

        Ok(Self {
            ctx,
            bgl,
            diamond,
            square,
        })
    }

    fn dispatch(
        encoder: &mut wgpu::CommandEncoder,
        pipeline: &wgpu::ComputePipeline,
        bind_group: &wgpu::BindGroup,
        cells_x: u32,
        cells_y: u32,
    ) {
        let gx = (cells_x + WORKGROUP - 1) / WORKGROUP;
        let gy = (cells_y + WORKGROUP - 1) / WORKGROUP;
        let mut cpass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("terramorph-ds-pass"),
            timestamp_writes: None,
        });
        cpass.set_pipeline(pipeline);
        cpass.set_bind_group(0, bind_group, &[]);
        cpass.dispatch_workgroups(gx, gy, 1);
    }

    /// Runs the full subdivision on the device and reads the result back.
    pub fn generate(
        &self,
        size: usize,
        roughness: f32,
        corners: [f32; 4],
        field: &RandomField,
    ) -> Result<Vec<f32>, DeviceError> {
        let last = (size - 1) as u32;
        let seed = field.seed();

        // Corner initialization happens host-side; one upload seeds the grid.
        let mut init = vec![0.0f32; size * size];
        init[0] = corners[0];
        init[size - 1] = corners[1];
        init[(size - 1) * size] = corners[2];
        init[size * size - 1] = corners[3];

        let heights = self.ctx.create_buffer_init(
            "heightmap",
            bytemuck::cast_slice(&init),
            wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
        )?;

        // One params buffer per level, allocated up front so the validation
        // scope below only covers encoding and execution.
        let mut levels = Vec::new();
        let mut step = last;
        let mut level = 0u32;
        let mut amplitude = roughness;
        while step > 1 {
            levels.push(LevelParams {
                size: size as u32,
                step,
                level,
                seed_lo: seed as u32,
                seed_hi: (seed >> 32) as u32,
                amplitude,
                _pad0: 0,
                _pad1: 0,
            });
            step /= 2;
            amplitude *= 0.5;
            level += 1;
        }
        let level_buffers = levels
            .iter()
            .map(|params| {
                self.ctx.create_buffer_init(
                    "ds-level-params",
                    bytemuck::bytes_of(params),
                    wgpu::BufferUsages::UNIFORM,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        // A single encoder orders all per-level passes on the queue.
        self.ctx.watch_kernels();
        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("terramorph-ds-encoder"),
            });

        for (params, params_buf) in levels.iter().zip(&level_buffers) {
            let bind_group = self.ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("terramorph-ds-bind-group"),
                layout: &self.bgl,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: params_buf.raw().as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: heights.raw().as_entire_binding(),
                    },
                ],
            });

            let half = params.step / 2;
            let diamond_cells = last / params.step;
            Self::dispatch(&mut encoder, &self.diamond, &bind_group, diamond_cells, diamond_cells);

            let square_cols = last / params.step + 1;
            let square_rows = last / half + 1;
            Self::dispatch(&mut encoder, &self.square, &bind_group, square_cols, square_rows);
        }

        self.ctx.queue.submit(Some(encoder.finish()));
        self.ctx.synchronize()?;

        let bytes = self.ctx.read_back(&heights)?;
        Ok(bytemuck::pod_collect_to_vec(&bytes))
    }
}
