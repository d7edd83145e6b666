//! Per-instance grass data and the CPU-side instance store.
//!
//! `GrassInstance` is the authored record owned by [`InstanceStore`].
//! `GpuGrassInstance` is its packed GPU layout; `GpuVisibleInstance` is the
//! culling output with the distance scale baked in and lives for exactly one
//! dispatch.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// One authored vegetation instance (CPU-resident, immutable during a frame).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GrassInstance {
    /// World position of the blade base.
    pub position: Vec3,
    /// Surface normal at the placement point.
    pub normal: Vec3,
    /// Blade width in meters.
    pub width: f32,
    /// Blade height in meters.
    pub height: f32,
    /// Base color.
    pub color: Vec3,
    /// 0-1 blend hint consumed by shading; opaque to the pipeline.
    pub pattern_mask: f32,
}

impl GrassInstance {
    pub fn to_gpu(&self) -> GpuGrassInstance {
        GpuGrassInstance {
            position: self.position.to_array(),
            width: self.width,
            normal: self.normal.to_array(),
            height: self.height,
            color: self.color.to_array(),
            pattern_mask: self.pattern_mask,
        }
    }
}

/// GPU layout of an authored instance (48 bytes, 16-byte aligned).
/// Must match `SourceInstance` in grass_cull.wgsl.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct GpuGrassInstance {
    pub position: [f32; 3],
    pub width: f32,
    // -- 16 bytes --
    pub normal: [f32; 3],
    pub height: f32,
    // -- 16 bytes --
    pub color: [f32; 3],
    pub pattern_mask: f32,
    // -- 16 bytes --
    // Total: 48 bytes
}

/// GPU layout of a culling survivor (64 bytes, 16-byte aligned).
/// Superset of `GpuGrassInstance` plus the LOD/tilt-fade factor computed
/// during culling. Must match `VisibleInstance` in grass_common.wgsl.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct GpuVisibleInstance {
    pub position: [f32; 3],
    pub width: f32,
    // -- 16 bytes --
    pub normal: [f32; 3],
    pub height: f32,
    // -- 16 bytes --
    pub color: [f32; 3],
    pub pattern_mask: f32,
    // -- 16 bytes --
    pub distance_scale: f32,
    pub _pad: [f32; 3],
    // -- 16 bytes --
    // Total: 64 bytes
}

/// Owns the authoritative instance array.
///
/// Mutation only marks the store dirty; GPU reallocation happens on the
/// renderer's next update. There is no incremental upload path: edits are
/// authoring-time rare compared to per-frame rendering, so a full rebuild
/// is the simpler invariant.
#[derive(Default)]
pub struct InstanceStore {
    instances: Vec<GrassInstance>,
    dirty: bool,
}

impl InstanceStore {
    pub fn new(instances: Vec<GrassInstance>) -> Self {
        Self { instances, dirty: true }
    }

    /// Read access to the full array.
    pub fn instances(&self) -> &[GrassInstance] {
        &self.instances
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Replace the entire array and mark the pipeline for a rebuild.
    pub fn replace_all(&mut self, instances: Vec<GrassInstance>) {
        self.instances = instances;
        self.dirty = true;
    }

    /// Mark dirty without changing contents (external in-place edits).
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Consume the dirty flag after a successful rebuild.
    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    /// Pack the array for upload.
    pub fn gpu_data(&self) -> Vec<GpuGrassInstance> {
        self.instances.iter().map(GrassInstance::to_gpu).collect()
    }

    /// Tallest blade in the population, for coarse bounds.
    pub fn max_height(&self) -> f32 {
        self.instances.iter().map(|i| i.height).fold(0.0, f32::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blade(x: f32) -> GrassInstance {
        GrassInstance {
            position: Vec3::new(x, 0.0, 0.0),
            normal: Vec3::Y,
            width: 0.05,
            height: 0.4,
            color: Vec3::new(0.2, 0.5, 0.1),
            pattern_mask: 0.0,
        }
    }

    #[test]
    fn test_gpu_instance_size() {
        assert_eq!(std::mem::size_of::<GpuGrassInstance>(), 48);
        assert_eq!(std::mem::size_of::<GpuGrassInstance>() % 16, 0);
    }

    #[test]
    fn test_visible_instance_size() {
        assert_eq!(std::mem::size_of::<GpuVisibleInstance>(), 64);
        assert_eq!(std::mem::size_of::<GpuVisibleInstance>() % 16, 0);
    }

    #[test]
    fn test_new_store_is_dirty() {
        let store = InstanceStore::new(vec![blade(0.0)]);
        assert!(store.is_dirty());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_replace_all_marks_dirty() {
        let mut store = InstanceStore::new(vec![blade(0.0)]);
        store.clear_dirty();
        assert!(!store.is_dirty());

        store.replace_all(vec![blade(1.0), blade(2.0)]);
        assert!(store.is_dirty());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_gpu_data_preserves_order() {
        let store = InstanceStore::new(vec![blade(0.0), blade(1.0), blade(2.0)]);
        let gpu = store.gpu_data();
        assert_eq!(gpu.len(), 3);
        for (i, g) in gpu.iter().enumerate() {
            assert_eq!(g.position[0], i as f32);
        }
    }

    #[test]
    fn test_gpu_data_round_trips_records() {
        // A readback of the uploaded bytes must compare equal to the
        // packed store, record for record, in order.
        let store = InstanceStore::new(vec![blade(0.0), blade(1.0), blade(2.0)]);
        let uploaded = store.gpu_data();
        let read_back: Vec<GpuGrassInstance> =
            bytemuck::cast_slice(bytemuck::cast_slice::<_, u8>(&uploaded)).to_vec();
        assert_eq!(read_back, uploaded);
        assert_eq!(read_back, store.gpu_data());
    }

    #[test]
    fn test_max_height() {
        let mut tall = blade(0.0);
        tall.height = 1.2;
        let store = InstanceStore::new(vec![blade(1.0), tall]);
        assert_eq!(store.max_height(), 1.2);
        assert_eq!(InstanceStore::default().max_height(), 0.0);
    }
}
