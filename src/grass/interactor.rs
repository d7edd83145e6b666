//! Interactor registry: actors that bend nearby grass.
//!
//! The registry holds weak references only; an interactor disappears from
//! snapshots as soon as its owning handle is dropped, with no explicit
//! unregister required. Snapshots are fixed-size arrays padded with zeroed
//! entries so the GPU upload has a stable layout.

use std::sync::{Arc, Mutex, Weak};

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// Hard cap on interactors per snapshot. Callers needing more must raise
/// this and the matching constant in grass_common.wgsl.
pub const MAX_INTERACTORS: usize = 16;

/// One bending source: a position and an influence radius.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Interactor {
    pub position: Vec3,
    pub radius: f32,
}

/// GPU layout of a snapshot entry (16 bytes). Zeroed radius = empty slot.
/// Must match the `interactors` array element in grass_common.wgsl.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct GpuInteractor {
    pub position: [f32; 3],
    pub radius: f32,
}

/// Owning handle returned by [`InteractorRegistry::register`]. Dropping it
/// removes the interactor from future snapshots.
#[derive(Clone)]
pub struct InteractorHandle {
    inner: Arc<Mutex<Interactor>>,
}

impl InteractorHandle {
    /// Move the interactor (called by the owning actor each frame).
    pub fn set_position(&self, position: Vec3) {
        self.inner.lock().expect("interactor lock poisoned").position = position;
    }

    pub fn set_radius(&self, radius: f32) {
        self.inner.lock().expect("interactor lock poisoned").radius = radius;
    }

    pub fn get(&self) -> Interactor {
        *self.inner.lock().expect("interactor lock poisoned")
    }
}

/// Collection of active interactors, queried once per frame.
///
/// Ordering among interactors is insertion order; when more are live than
/// the snapshot cap, the excess are silently dropped.
#[derive(Default)]
pub struct InteractorRegistry {
    entries: Vec<Weak<Mutex<Interactor>>>,
}

impl InteractorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new interactor; the returned handle owns it.
    pub fn register(&mut self, interactor: Interactor) -> InteractorHandle {
        let inner = Arc::new(Mutex::new(interactor));
        self.entries.push(Arc::downgrade(&inner));
        InteractorHandle { inner }
    }

    /// Explicitly remove a handle's interactor ahead of handle drop.
    pub fn unregister(&mut self, handle: &InteractorHandle) {
        self.entries
            .retain(|w| w.upgrade().is_none_or(|a| !Arc::ptr_eq(&a, &handle.inner)));
    }

    /// Number of currently live interactors (prunes dead entries).
    pub fn live_count(&mut self) -> usize {
        self.entries.retain(|w| w.strong_count() > 0);
        self.entries.len()
    }

    /// Fixed-size snapshot for GPU upload, padded with zeroed entries.
    ///
    /// `max_n` is clamped to [`MAX_INTERACTORS`]. Returns the padded array
    /// and the live count actually written.
    pub fn snapshot(&mut self, max_n: usize) -> ([GpuInteractor; MAX_INTERACTORS], u32) {
        let max_n = max_n.min(MAX_INTERACTORS);
        let mut out = [GpuInteractor::default(); MAX_INTERACTORS];
        let mut count = 0usize;

        self.entries.retain(|w| w.strong_count() > 0);
        for weak in &self.entries {
            if count >= max_n {
                break;
            }
            if let Some(arc) = weak.upgrade() {
                let it = *arc.lock().expect("interactor lock poisoned");
                out[count] = GpuInteractor {
                    position: it.position.to_array(),
                    radius: it.radius,
                };
                count += 1;
            }
        }

        (out, count as u32)
    }
}
