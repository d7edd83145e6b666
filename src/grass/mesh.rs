//! Blade meshes: the local-space geometry instanced by the renderer.
//!
//! A blade is a tapered vertical strip in local space with the base at the
//! origin, X across the blade and Y in [0, 1]. The `v` attribute is the
//! normalized height consumed by the displacement function. Actual width
//! and height come from the per-instance data at draw time.

use bytemuck::{Pod, Zeroable};

use crate::grass::config::MeshSelection;

/// One blade mesh vertex (16 bytes). Must match the vertex layout in
/// grass_draw.wgsl.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct BladeVertex {
    /// Local position, unit height and unit width.
    pub position: [f32; 3],
    /// Normalized height along the blade (0 = base, 1 = tip).
    pub v: f32,
}

impl BladeVertex {
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<BladeVertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32],
    };
}

/// CPU-side blade mesh.
#[derive(Clone, Debug)]
pub struct BladeMesh {
    pub name: &'static str,
    pub vertices: Vec<BladeVertex>,
    pub indices: Vec<u32>,
}

/// Authored blade variants available to `MeshSelection::Authored`.
/// (name, segments, taper exponent, tip pinch)
const AUTHORED_VARIANTS: &[(&str, u32, f32, f32)] = &[
    ("blade_slim", 4, 1.4, 1.0),
    ("blade_broad", 3, 0.8, 0.9),
    ("blade_curved", 5, 1.1, 1.0),
];

impl BladeMesh {
    /// Build the mesh for a configuration's selection.
    ///
    /// `Authored` picks a variant deterministically from the seed, so the
    /// same seed always yields the same mesh.
    pub fn from_selection(selection: &MeshSelection) -> Self {
        match *selection {
            MeshSelection::Procedural { segments } => {
                Self::tapered_strip("blade_procedural", segments.max(1), 1.0, 1.0)
            }
            MeshSelection::Authored { seed } => {
                let (name, segments, taper, pinch) =
                    AUTHORED_VARIANTS[(seed % AUTHORED_VARIANTS.len() as u64) as usize];
                Self::tapered_strip(name, segments, taper, pinch)
            }
        }
    }

    /// Tapered vertical strip: `segments` quads narrowing toward a pointed
    /// tip. `taper` shapes the width falloff, `pinch` how fully the tip
    /// closes (1 = point).
    fn tapered_strip(name: &'static str, segments: u32, taper: f32, pinch: f32) -> Self {
        let mut vertices = Vec::with_capacity((segments as usize + 1) * 2);
        for i in 0..=segments {
            let v = i as f32 / segments as f32;
            let half = 0.5 * (1.0 - v.powf(taper) * pinch);
            vertices.push(BladeVertex { position: [-half, v, 0.0], v });
            vertices.push(BladeVertex { position: [half, v, 0.0], v });
        }

        let mut indices = Vec::with_capacity(segments as usize * 6);
        for i in 0..segments {
            let b = i * 2;
            indices.extend_from_slice(&[b, b + 1, b + 2, b + 2, b + 1, b + 3]);
        }

        Self { name, vertices, indices }
    }

    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    /// Upload to GPU buffers.
    pub fn upload(&self, device: &wgpu::Device, queue: &wgpu::Queue) -> GpuBladeMesh {
        let vertex_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("blade_vertices"),
            size: (self.vertices.len() * std::mem::size_of::<BladeVertex>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let index_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("blade_indices"),
            size: (self.indices.len() * std::mem::size_of::<u32>()) as u64,
            usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        queue.write_buffer(&vertex_buffer, 0, bytemuck::cast_slice(&self.vertices));
        queue.write_buffer(&index_buffer, 0, bytemuck::cast_slice(&self.indices));

        GpuBladeMesh {
            vertex_buffer,
            index_buffer,
            index_count: self.index_count(),
        }
    }
}

/// GPU-resident blade mesh.
pub struct GpuBladeMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}
