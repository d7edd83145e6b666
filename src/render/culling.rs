//! GPU instance culling compute pipeline.
//!
//! One `CullPipeline` may be shared by any number of independent grass
//! populations. Bindings are per-population: every renderer creates bind
//! groups against its own buffer set and sets them inside its own compute
//! pass immediately before dispatching, so back-to-back populations never
//! see each other's buffers.

use crate::render::buffers::GrassBuffers;
use crate::render::frame_uniforms::FrameUniformsBuffer;

/// Threads per workgroup; must match `@workgroup_size` in grass_cull.wgsl.
pub const WORKGROUP_SIZE: u32 = 64;

/// Compute pipeline performing frustum/distance culling and compaction.
pub struct CullPipeline {
    pipeline: wgpu::ComputePipeline,
    uniforms_bind_group_layout: wgpu::BindGroupLayout,
    storage_bind_group_layout: wgpu::BindGroupLayout,
}

impl CullPipeline {
    pub fn new(device: &wgpu::Device) -> Self {
        // The cull kernel shares the displacement/fade definitions with the
        // draw shader via concatenation of the common module.
        let source = format!(
            "{}\n{}",
            include_str!("../../shaders/grass_common.wgsl"),
            include_str!("../../shaders/grass_cull.wgsl"),
        );
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("grass_cull_shader"),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        // Bind group 0: frame uniforms
        let uniforms_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("grass_cull_uniforms_layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        // Bind group 1: source (read) + visible (write) + draw args (atomic)
        let storage_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("grass_cull_storage_layout"),
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
                            ty: wgpu::BufferBindingType::Storage { read_only: false },
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                ],
            });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("grass_cull_pipeline_layout"),
            bind_group_layouts: &[&uniforms_bind_group_layout, &storage_bind_group_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("grass_cull_pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        });

        Self {
            pipeline,
            uniforms_bind_group_layout,
            storage_bind_group_layout,
        }
    }

    /// Bind group for a renderer's frame uniforms
    pub fn create_uniforms_bind_group(
        &self,
        device: &wgpu::Device,
        uniforms: &FrameUniformsBuffer,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("grass_cull_uniforms_bind_group"),
            layout: &self.uniforms_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniforms.buffer().as_entire_binding(),
            }],
        })
    }

    /// Bind group for a renderer's buffer set. Must be recreated whenever
    /// the buffers are reallocated (tracked via the buffer epoch).
    pub fn create_storage_bind_group(
        &self,
        device: &wgpu::Device,
        buffers: &GrassBuffers,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("grass_cull_storage_bind_group"),
            layout: &self.storage_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffers.source().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: buffers.visible().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: buffers.indirect().as_entire_binding(),
                },
            ],
        })
    }

    /// Dispatch the culling kernel over `instance_count` instances.
    ///
    /// The caller must have enqueued the counter reset and uniform upload
    /// on the queue before submitting the encoder that records this pass.
    pub fn dispatch(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        uniforms_bind_group: &wgpu::BindGroup,
        storage_bind_group: &wgpu::BindGroup,
        instance_count: u32,
    ) {
        if instance_count == 0 {
            return;
        }

        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("grass_cull_pass"),
            timestamp_writes: None,
        });

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, uniforms_bind_group, &[]);
        pass.set_bind_group(1, storage_bind_group, &[]);
        pass.dispatch_workgroups(instance_count.div_ceil(WORKGROUP_SIZE), 1, 1);
    }
}
