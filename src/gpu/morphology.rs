//! Compute pipelines for morphology operators.

use std::borrow::Cow;

use bytemuck::{Pod, Zeroable};

use super::context::{DeviceError, GpuContext};
use crate::grid::Image;
use crate::morphology::{EdgeMode, MorphOp, StructuringElement};

const WORKGROUP: u32 = 8;

fn flatten(offsets: &[(i32, i32)]) -> Vec<[i32; 2]> {
    offsets.iter().map(|&(x, y)| [x, y]).collect()
}

const EDGE_CLAMP: u32 = 0;
const EDGE_CONSTANT: u32 = 1;
const EDGE_IDENTITY: u32 = 2;

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct MorphParams {
    width: u32,
    height: u32,
    offset_count: u32,
    edge_mode: u32,
    border_value: f32,
    _pad0: u32,
    _pad1: u32,
    _pad2: u32,
}

/// GPU runner for the morphology engine.
///
/// A single operator application is one fully data-parallel dispatch; open
/// and close chain two dispatches through a ping-pong buffer pair before the
/// single readback. Offset lists are uploaded per call (erosion's as-is,
/// dilation's reflected) and walked in the same order as the CPU kernels.
pub struct MorphologyGpu {
    ctx: GpuContext,
    bgl: wgpu::BindGroupLayout,
    erode: wgpu::ComputePipeline,
    dilate: wgpu::ComputePipeline,
}

impl MorphologyGpu {
    pub fn new(ctx: GpuContext) -> Result<Self, DeviceError> {
        ctx.watch_kernels();
        let module = ctx
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("terramorph-morphology-wgsl"),
                source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(include_str!(
                    "shaders/morphology.wgsl"
                ))),
            });

        let storage_entry = |binding: u32, read_only: bool| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        let bgl = ctx
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("terramorph-morph-bgl"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: Some(
                                std::num::NonZeroU64::new(
                                    std::mem::size_of::<MorphParams>() as u64
                                )
                                .unwrap(),
                            ),
                        },
                        count: None,
                    },
                    storage_entry(1, true),
                    storage_entry(2, true),
                    storage_entry(3, false),
                ],
            });

        let pipeline_layout = ctx
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("terramorph-morph-pipeline-layout"),
                bind_group_layouts: &[&bgl],
                push_constant_ranges: &[],
            });

        let make_pipeline = |entry: &str| {
            ctx.device
                .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                    label: Some(entry),
                    layout: Some(&pipeline_layout),
                    module: &module,
                    entry_point: Some(entry),
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                    cache: None,
                })
        };
        let erode = make_pipeline("erode");
        let dilate = make_pipeline("dilate");
        ctx.synchronize()?;

        Ok(Self {
            ctx,
            bgl,
            erode,
            dilate,
        })
    }

    /// Applies the operator on the device and reads the result back.
    pub fn run(
        &self,
        image: &Image,
        element: &StructuringElement,
        op: MorphOp,
        edge: EdgeMode,
    ) -> Result<Vec<f32>, DeviceError> {
        let width = image.width() as u32;
        let height = image.height() as u32;
        let (edge_mode, border_value) = match edge {
            EdgeMode::Clamp => (EDGE_CLAMP, 0.0),
            EdgeMode::Constant(v) => (EDGE_CONSTANT, v),
            EdgeMode::Identity => (EDGE_IDENTITY, 0.0),
        };

        let passes = op.passes();

        let params = MorphParams {
            width,
            height,
            offset_count: element.offsets().len() as u32,
            edge_mode,
            border_value,
            _pad0: 0,
            _pad1: 0,
            _pad2: 0,
        };
        let params_buf = self.ctx.create_buffer_init(
            "morph-params",
            bytemuck::bytes_of(&params),
            wgpu::BufferUsages::UNIFORM,
        )?;

        let erode_offsets = if passes.contains(&MorphOp::Erode) {
            Some(self.ctx.create_buffer_init(
                "erode-offsets",
                bytemuck::cast_slice(&flatten(element.offsets())),
                wgpu::BufferUsages::STORAGE,
            )?)
        } else {
            None
        };
        let dilate_offsets = if passes.contains(&MorphOp::Dilate) {
            Some(self.ctx.create_buffer_init(
                "dilate-offsets",
                bytemuck::cast_slice(&flatten(&element.reflected_offsets())),
                wgpu::BufferUsages::STORAGE,
            )?)
        } else {
            None
        };

        // Ping-pong pair: pass i reads a/b and writes the other.
        let buf_a = self.ctx.create_buffer_init(
            "morph-image-a",
            bytemuck::cast_slice(image.as_slice()),
            wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
        )?;
        let buf_b = self.ctx.create_buffer(
            "morph-image-b",
            buf_a.size(),
            wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
        )?;

        self.ctx.watch_kernels();
        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("terramorph-morph-encoder"),
            });

        for (i, pass) in passes.iter().enumerate() {
            let (src, dst) = if i % 2 == 0 {
                (&buf_a, &buf_b)
            } else {
                (&buf_b, &buf_a)
            };
            let (pipeline, offsets_buf) = match pass {
                MorphOp::Erode => (&self.erode, erode_offsets.as_ref().unwrap()),
                MorphOp::Dilate => (&self.dilate, dilate_offsets.as_ref().unwrap()),
                _ => unreachable!("passes() only yields primitives"),
            };

            let bind_group = self.ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("terramorph-morph-bind-group"),
                layout: &self.bgl,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: params_buf.raw().as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: src.raw().as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: offsets_buf.raw().as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: dst.raw().as_entire_binding(),
                    },
                ],
            });

            let gx = (width + WORKGROUP - 1) / WORKGROUP;
            let gy = (height + WORKGROUP - 1) / WORKGROUP;
            let mut cpass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("terramorph-morph-pass"),
                timestamp_writes: None,
            });
            cpass.set_pipeline(pipeline);
            cpass.set_bind_group(0, &bind_group, &[]);
            cpass.dispatch_workgroups(gx, gy, 1);
        }

        self.ctx.queue.submit(Some(encoder.finish()));
        self.ctx.synchronize()?;

        let final_buf = if passes.len() % 2 == 1 { &buf_b } else { &buf_a };
        let bytes = self.ctx.read_back(final_buf)?;
        Ok(bytemuck::pod_collect_to_vec(&bytes))
    }
}
