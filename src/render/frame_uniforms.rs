//! Per-frame uniform block shared by the culling kernel and the draw shader.

use bytemuck::{Pod, Zeroable};

use crate::core::camera::Camera;
use crate::grass::config::GrassConfig;
use crate::grass::interactor::{GpuInteractor, MAX_INTERACTORS};
use crate::grass::wind::WindParams;
use crate::math::frustum::FrustumState;

/// Frame uniform data for GPU (must match `FrameUniforms` in
/// grass_common.wgsl exactly).
/// WGSL vec3 has 16-byte alignment, so fields are packed into vec4 rows.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct FrameUniforms {
    /// View-projection matrix (64 bytes, offset 0)
    pub view_proj: [[f32; 4]; 4],
    /// Frustum planes, normal.xyz + d (96 bytes, offset 64)
    pub planes: [[f32; 4]; 6],
    /// Camera world position (offset 160) + elapsed time (offset 172)
    pub camera_position: [f32; 3],
    pub time: f32,
    /// Wind parameters + instance count (offset 176)
    pub wind_speed: f32,
    pub wind_strength: f32,
    pub wind_frequency: f32,
    pub instance_count: u32,
    /// Fade window + bend/tilt shape (offset 192)
    pub min_fade_distance: f32,
    pub max_draw_distance: f32,
    pub max_bend_angle: f32,
    pub tilt_angle: f32,
    /// Tilt scale + live interactor count (offset 208)
    pub tilt_variation: f32,
    pub interactor_count: u32,
    pub _pad: [f32; 2],
    /// Interactor snapshot, position.xyz + radius (256 bytes, offset 224)
    pub interactors: [[f32; 4]; MAX_INTERACTORS],
    // Total: 480 bytes
}

impl FrameUniforms {
    #[allow(clippy::too_many_arguments)]
    pub fn build(
        camera: &Camera,
        frustum: &FrustumState,
        config: &GrassConfig,
        wind: &WindParams,
        time: f32,
        instance_count: u32,
        interactors: &[GpuInteractor; MAX_INTERACTORS],
        interactor_count: u32,
    ) -> Self {
        let mut packed = [[0.0f32; 4]; MAX_INTERACTORS];
        for (slot, it) in packed.iter_mut().zip(interactors.iter()) {
            *slot = [it.position[0], it.position[1], it.position[2], it.radius];
        }

        Self {
            view_proj: camera.view_projection().to_cols_array_2d(),
            planes: frustum.gpu_planes(),
            camera_position: frustum.camera_position.to_array(),
            time,
            wind_speed: wind.speed,
            wind_strength: wind.strength,
            wind_frequency: wind.frequency,
            instance_count,
            min_fade_distance: config.min_fade_distance,
            max_draw_distance: config.max_draw_distance,
            max_bend_angle: config.max_bend_angle,
            tilt_angle: config.tilt_angle,
            tilt_variation: config.tilt_variation,
            interactor_count,
            _pad: [0.0; 2],
            interactors: packed,
        }
    }
}

/// GPU uniform buffer for the per-frame block.
pub struct FrameUniformsBuffer {
    buffer: wgpu::Buffer,
}

impl FrameUniformsBuffer {
    pub fn new(device: &wgpu::Device) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("grass_frame_uniforms"),
            size: std::mem::size_of::<FrameUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Self { buffer }
    }

    /// Upload this frame's data
    pub fn update(&self, queue: &wgpu::Queue, uniforms: &FrameUniforms) {
        queue.write_buffer(&self.buffer, 0, bytemuck::bytes_of(uniforms));
    }

    /// Get the raw buffer
    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_uniform_size() {
        // Must match the WGSL struct layout
        assert_eq!(std::mem::size_of::<FrameUniforms>(), 480);
        assert_eq!(std::mem::size_of::<FrameUniforms>() % 16, 0);
    }

    #[test]
    fn test_build_packs_interactors() {
        let camera = Camera::default();
        let frustum = FrustumState::from_camera(&camera);
        let config = GrassConfig::default();
        let wind = WindParams::from_config(&config);

        let mut interactors = [GpuInteractor::default(); MAX_INTERACTORS];
        interactors[0] = GpuInteractor { position: [1.0, 2.0, 3.0], radius: 0.75 };

        let u = FrameUniforms::build(
            &camera, &frustum, &config, &wind, 1.5, 100, &interactors, 1,
        );
        assert_eq!(u.interactors[0], [1.0, 2.0, 3.0, 0.75]);
        assert_eq!(u.interactors[1], [0.0; 4]);
        assert_eq!(u.interactor_count, 1);
        assert_eq!(u.instance_count, 100);
        assert_eq!(u.time, 1.5);
        assert_eq!(Vec3::from(u.camera_position), camera.position);
    }
}
