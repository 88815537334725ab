//! GPU-backed neighbor aggregation.
//!
//! [`GpuAggregator`] implements the [`NeighborAggregator`] contract by
//! dispatching the kernel in [`AGGREGATE_WGSL`](crate::AGGREGATE_WGSL),
//! one compute lane per boid. Each lane reads the immutable snapshot and writes only its own
//! output slot, so the pass needs no synchronization beyond the final
//! readback.
//!
//! The call is synchronous from the flock's perspective: upload, dispatch,
//! block on the staging-buffer map, consume. There are no partial results
//! and no timeout. Setup failure is fatal; a host that wants a CPU
//! fallback must construct a
//! [`PairwiseAggregator`](crate::PairwiseAggregator) itself.

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::aggregator::{AgentView, NeighborAggregator, NeighborSums, AGGREGATE_WGSL};
use crate::error::AcceleratorError;
use glam::Vec2;

const WORKGROUP_SIZE: u32 = 64;

/// GPU mirror of the kernel's `Sums` output row (32 bytes, vec2 alignment).
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct SumsRow {
    heading: [f32; 2],
    center: [f32; 2],
    avoidance: [f32; 2],
    count: u32,
    _pad: u32,
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct Params {
    num_agents: u32,
    scale_factor: f32,
    _pad0: u32,
    _pad1: u32,
}

/// A neighbor aggregator that runs the pairwise pass on the GPU.
pub struct GpuAggregator {
    device: wgpu::Device,
    queue: wgpu::Queue,
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
}

impl GpuAggregator {
    /// Acquire a device and compile the aggregation pipeline.
    ///
    /// Fails with [`AcceleratorError::NoAdapter`] or
    /// [`AcceleratorError::DeviceCreation`] when no usable GPU is
    /// available; the caller decides whether that aborts startup or selects
    /// the CPU strategy instead.
    pub fn new() -> Result<Self, AcceleratorError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .ok_or(AcceleratorError::NoAdapter)?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("Aggregation Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))
        .map_err(|e| AcceleratorError::DeviceCreation(e.to_string()))?;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Aggregation Shader"),
            source: wgpu::ShaderSource::Wgsl(AGGREGATE_WGSL.into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Aggregation Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
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
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Aggregation Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Aggregation Pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("aggregate"),
            compilation_options: Default::default(),
            cache: None,
        });

        Ok(Self {
            device,
            queue,
            pipeline,
            bind_group_layout,
        })
    }
}

impl NeighborAggregator for GpuAggregator {
    fn aggregate(
        &mut self,
        agents: &[AgentView],
        scale_factor: f32,
    ) -> Result<Vec<NeighborSums>, AcceleratorError> {
        if agents.is_empty() {
            return Ok(Vec::new());
        }

        let num_agents = agents.len() as u32;

        let agent_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Agent Snapshot"),
                contents: bytemuck::cast_slice(agents),
                usage: wgpu::BufferUsages::STORAGE,
            });

        let sums_size = (agents.len() * std::mem::size_of::<SumsRow>()) as u64;
        let sums_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Neighbor Sums"),
            size: sums_size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        let staging_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Neighbor Sums Staging"),
            size: sums_size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let params = Params {
            num_agents,
            scale_factor,
            _pad0: 0,
            _pad1: 0,
        };
        let params_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Aggregation Params"),
                contents: bytemuck::bytes_of(&params),
                usage: wgpu::BufferUsages::UNIFORM,
            });

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Aggregation Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: agent_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: sums_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: params_buffer.as_entire_binding(),
                },
            ],
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Aggregation Encoder"),
            });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Aggregation Pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(num_agents.div_ceil(WORKGROUP_SIZE), 1, 1);
        }
        encoder.copy_buffer_to_buffer(&sums_buffer, 0, &staging_buffer, 0, sums_size);
        self.queue.submit(Some(encoder.finish()));

        let buffer_slice = staging_buffer.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);

        receiver
            .recv()
            .map_err(|_| AcceleratorError::BufferMapping("map callback never ran".to_string()))?
            .map_err(|e| AcceleratorError::BufferMapping(e.to_string()))?;

        let sums = {
            let data = buffer_slice.get_mapped_range();
            bytemuck::cast_slice::<u8, SumsRow>(&data)
                .iter()
                .map(|row| NeighborSums {
                    heading: Vec2::from_array(row.heading),
                    center: Vec2::from_array(row.center),
                    avoidance: Vec2::from_array(row.avoidance),
                    count: row.count,
                })
                .collect()
        };
        staging_buffer.unmap();

        Ok(sums)
    }
}
