//! Indirect draw pipeline for grass blades.
//!
//! The vertex stage pulls the visible-instance record for the current
//! instance index and applies the shared displacement function; the
//! instance count comes entirely from the GPU-patched argument buffer, so
//! no CPU round-trip is involved.

use crate::grass::mesh::{BladeVertex, GpuBladeMesh};
use crate::render::buffers::GrassBuffers;
use crate::render::frame_uniforms::FrameUniformsBuffer;

/// Render pipeline issuing one indirect instanced draw per population.
pub struct GrassDrawPipeline {
    pipeline: wgpu::RenderPipeline,
    uniforms_bind_group_layout: wgpu::BindGroupLayout,
    visible_bind_group_layout: wgpu::BindGroupLayout,
}

impl GrassDrawPipeline {
    pub fn new(device: &wgpu::Device, target_format: wgpu::TextureFormat) -> Self {
        let source = format!(
            "{}\n{}",
            include_str!("../../shaders/grass_common.wgsl"),
            include_str!("../../shaders/grass_draw.wgsl"),
        );
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("grass_draw_shader"),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        // Bind group 0: frame uniforms
        let uniforms_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("grass_draw_uniforms_layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        // Bind group 1: visible instances (read-only)
        let visible_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("grass_draw_visible_layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("grass_draw_pipeline_layout"),
            bind_group_layouts: &[&uniforms_bind_group_layout, &visible_bind_group_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("grass_draw_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[BladeVertex::LAYOUT],
                compilation_options: Default::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                // Blades are visible from both sides
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: target_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            multiview_mask: None,
            cache: None,
        });

        Self {
            pipeline,
            uniforms_bind_group_layout,
            visible_bind_group_layout,
        }
    }

    /// Bind group for a renderer's frame uniforms
    pub fn create_uniforms_bind_group(
        &self,
        device: &wgpu::Device,
        uniforms: &FrameUniformsBuffer,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("grass_draw_uniforms_bind_group"),
            layout: &self.uniforms_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniforms.buffer().as_entire_binding(),
            }],
        })
    }

    /// Bind group for a renderer's visible buffer. Recreate on reallocation.
    pub fn create_visible_bind_group(
        &self,
        device: &wgpu::Device,
        buffers: &GrassBuffers,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("grass_draw_visible_bind_group"),
            layout: &self.visible_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffers.visible().as_entire_binding(),
            }],
        })
    }

    /// Issue the single indirect draw into an existing render pass.
    ///
    /// Non-blocking: this only enqueues GPU work. The dispatch that wrote
    /// the argument buffer must have been recorded earlier in the same
    /// submission, which is all the ordering the queue requires.
    pub fn draw(
        &self,
        pass: &mut wgpu::RenderPass<'_>,
        uniforms_bind_group: &wgpu::BindGroup,
        visible_bind_group: &wgpu::BindGroup,
        mesh: &GpuBladeMesh,
        buffers: &GrassBuffers,
    ) {
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, uniforms_bind_group, &[]);
        pass.set_bind_group(1, visible_bind_group, &[]);
        pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed_indirect(buffers.indirect(), 0);
    }
}
