//! Epoch-tagged async readback of the visible-instance count.
//!
//! The readback is diagnostic only and fully decoupled from the render
//! path: the copy is enqueued with the frame, the map starts after submit,
//! and the completion is polled on later frames. Results carry the buffer
//! epoch captured at request time; a result whose epoch no longer matches
//! the live buffers (rebuild, teardown) is discarded as a safe no-op.

use std::sync::mpsc::{Receiver, channel};

use crate::render::buffers::{GrassBuffers, INSTANCE_COUNT_OFFSET};

struct Pending {
    epoch: u64,
    receiver: Receiver<Result<(), wgpu::BufferAsyncError>>,
}

/// Best-effort visible-count reader. May lag a frame or more.
pub struct VisibleCountReadback {
    staging: wgpu::Buffer,
    copied_epoch: Option<u64>,
    pending: Option<Pending>,
    latest: Option<u32>,
}

impl VisibleCountReadback {
    pub fn new(device: &wgpu::Device) -> Self {
        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("grass_visible_count_staging"),
            size: std::mem::size_of::<u32>() as u64,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Self {
            staging,
            copied_epoch: None,
            pending: None,
            latest: None,
        }
    }

    /// Enqueue the count copy for this frame, if no readback is in flight.
    /// Record after the cull dispatch so the copied value is this frame's.
    pub fn request(&mut self, encoder: &mut wgpu::CommandEncoder, buffers: &GrassBuffers) {
        if self.pending.is_some() || self.copied_epoch.is_some() {
            return;
        }
        encoder.copy_buffer_to_buffer(
            buffers.indirect(),
            INSTANCE_COUNT_OFFSET,
            &self.staging,
            0,
            std::mem::size_of::<u32>() as u64,
        );
        self.copied_epoch = Some(buffers.epoch());
    }

    /// Start mapping the staging buffer. Call once, after the submit that
    /// carried the copy recorded by [`request`](Self::request).
    pub fn begin_map(&mut self) {
        let Some(epoch) = self.copied_epoch.take() else {
            return;
        };
        let (tx, rx) = channel();
        self.staging.slice(..).map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.pending = Some(Pending { epoch, receiver: rx });
    }

    /// Poll for a completed readback. Returns the fresh count when one
    /// arrived for the current epoch; stale-epoch results are dropped
    /// without touching the (possibly released) originating buffers.
    pub fn poll(&mut self, current_epoch: u64) -> Option<u32> {
        let pending = self.pending.as_ref()?;
        let result = pending.receiver.try_recv().ok()?;
        let epoch = pending.epoch;
        self.pending = None;

        if result.is_err() {
            // Mapping failed (device loss, teardown); nothing to consume.
            return None;
        }

        let count = {
            let data = self.staging.slice(..).get_mapped_range();
            u32::from_le_bytes(data[0..4].try_into().expect("staging read is 4 bytes"))
        };
        self.staging.unmap();

        if epoch != current_epoch {
            log::debug!("discarding stale visible-count readback (epoch {epoch} != {current_epoch})");
            return None;
        }

        self.latest = Some(count);
        Some(count)
    }

    /// Most recent successfully read count, if any.
    pub fn latest(&self) -> Option<u32> {
        self.latest
    }

    /// Forget any in-flight readback (teardown).
    pub fn cancel(&mut self) {
        if self.pending.take().is_some() {
            self.staging.unmap();
        }
        self.copied_epoch = None;
    }
}
