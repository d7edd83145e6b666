//! GPU buffer set for one instance population.
//!
//! Three buffers sized to the instance count: the immutable source array,
//! the per-dispatch visible compaction, and the indirect draw arguments.
//! Each allocation carries an epoch tag so stale async results can be
//! detected after a rebuild.

use bytemuck::{Pod, Zeroable};

use crate::grass::instance::{GpuGrassInstance, GpuVisibleInstance};

/// wgpu `draw_indexed_indirect` argument layout (matches GPU layout).
///
/// `index_count` is baked at allocation time from the active mesh;
/// `instance_count` is reset to 0 by the CPU before each dispatch and only
/// ever incremented atomically by the culling kernel afterwards.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct DrawIndexedIndirectArgs {
    pub index_count: u32,
    pub instance_count: u32,
    pub first_index: u32,
    pub base_vertex: i32,
    pub first_instance: u32,
}

/// Byte offset of `instance_count` within the argument buffer.
pub const INSTANCE_COUNT_OFFSET: u64 = 4;

/// The buffer set backing one grass population.
pub struct GrassBuffers {
    source: wgpu::Buffer,
    visible: wgpu::Buffer,
    indirect: wgpu::Buffer,
    capacity: u32,
    baked_index_count: u32,
    epoch: u64,
}

impl GrassBuffers {
    /// Allocate and upload a full buffer set. `instances` must be non-empty;
    /// the zero-instance case never allocates.
    pub fn allocate(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        instances: &[GpuGrassInstance],
        index_count: u32,
        epoch: u64,
    ) -> Self {
        debug_assert!(!instances.is_empty());

        let source = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("grass_source_instances"),
            size: std::mem::size_of_val(instances) as u64,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_DST
                | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        queue.write_buffer(&source, 0, bytemuck::cast_slice(instances));

        let visible = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("grass_visible_instances"),
            size: (instances.len() * std::mem::size_of::<GpuVisibleInstance>()) as u64,
            usage: wgpu::BufferUsages::STORAGE,
            mapped_at_creation: false,
        });

        let indirect = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("grass_draw_args"),
            size: std::mem::size_of::<DrawIndexedIndirectArgs>() as u64,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::INDIRECT
                | wgpu::BufferUsages::COPY_DST
                | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let args = DrawIndexedIndirectArgs {
            index_count,
            instance_count: 0,
            first_index: 0,
            base_vertex: 0,
            first_instance: 0,
        };
        queue.write_buffer(&indirect, 0, bytemuck::bytes_of(&args));

        Self {
            source,
            visible,
            indirect,
            capacity: instances.len() as u32,
            baked_index_count: index_count,
            epoch,
        }
    }

    /// Reset `instance_count` to 0. Must be enqueued before the cull
    /// dispatch that repopulates it; `write_buffer` and the later dispatch
    /// execute in submission order, which is the only ordering needed.
    pub fn reset_instance_count(&self, queue: &wgpu::Queue) {
        queue.write_buffer(&self.indirect, INSTANCE_COUNT_OFFSET, &0u32.to_le_bytes());
    }

    /// Consistency check against the current store and mesh. A mismatch
    /// means the buffers are stale and the pipeline must rebuild.
    pub fn matches(&self, instance_len: usize, index_count: u32) -> bool {
        self.capacity as usize == instance_len && self.baked_index_count == index_count
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn source(&self) -> &wgpu::Buffer {
        &self.source
    }

    pub fn visible(&self) -> &wgpu::Buffer {
        &self.visible
    }

    pub fn indirect(&self) -> &wgpu::Buffer {
        &self.indirect
    }

    /// Blocking read of the source buffer, for diagnostics and the demo's
    /// round-trip check. Never called on the per-frame render path.
    pub fn read_source_blocking(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) -> Vec<GpuGrassInstance> {
        let size = self.source.size();
        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("grass_source_staging"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder =
            device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
        encoder.copy_buffer_to_buffer(&self.source, 0, &staging, 0, size);
        queue.submit(Some(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        device
            .poll(wgpu::PollType::Wait { submission_index: None, timeout: None })
            .ok();

        match rx.recv() {
            Ok(Ok(())) => {
                let data = slice.get_mapped_range();
                let out = bytemuck::cast_slice(&data).to_vec();
                drop(data);
                staging.unmap();
                out
            }
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draw_args_size() {
        assert_eq!(std::mem::size_of::<DrawIndexedIndirectArgs>(), 20);
    }

    #[test]
    fn test_instance_count_offset() {
        // instance_count must sit right after index_count
        assert_eq!(std::mem::offset_of!(DrawIndexedIndirectArgs, instance_count), 4);
        assert_eq!(INSTANCE_COUNT_OFFSET, 4);
    }

    #[test]
    fn test_draw_args_layout() {
        let args = DrawIndexedIndirectArgs {
            index_count: 18,
            instance_count: 0,
            first_index: 0,
            base_vertex: 0,
            first_instance: 0,
        };
        let bytes = bytemuck::bytes_of(&args);
        assert_eq!(&bytes[0..4], &18u32.to_le_bytes());
        assert_eq!(&bytes[4..8], &0u32.to_le_bytes());
    }
}
