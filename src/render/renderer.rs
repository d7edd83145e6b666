//! Per-population grass renderer.
//!
//! Owns the instance store, configuration, buffer set, and lifecycle state
//! for one homogeneous grass population. Several renderers may share the
//! same [`CullPipeline`] and [`GrassDrawPipeline`]; each re-sets its own
//! bind groups inside its own passes, so populations never dispatch with
//! another population's buffers bound.

use std::time::Instant;

use crate::core::camera::Camera;
use crate::core::error::Error;
use crate::core::types::Result;
use crate::grass::config::GrassConfig;
use crate::grass::instance::{GrassInstance, InstanceStore};
use crate::grass::interactor::InteractorRegistry;
use crate::grass::mesh::{BladeMesh, GpuBladeMesh};
use crate::grass::wind::WindParams;
use crate::math::aabb::Aabb;
use crate::math::frustum::FrustumState;
use crate::render::buffers::GrassBuffers;
use crate::render::culling::CullPipeline;
use crate::render::draw::GrassDrawPipeline;
use crate::render::frame_uniforms::{FrameUniforms, FrameUniformsBuffer};
use crate::render::readback::VisibleCountReadback;
use crate::render::recovery::{PipelineState, RecoverySchedule};

/// Bind groups tied to one buffer epoch.
struct EpochBindGroups {
    epoch: u64,
    cull_uniforms: wgpu::BindGroup,
    cull_storage: wgpu::BindGroup,
    draw_uniforms: wgpu::BindGroup,
    draw_visible: wgpu::BindGroup,
}

/// GPU-driven renderer for one grass population.
pub struct GrassRenderer {
    config: GrassConfig,
    store: InstanceStore,
    blade: BladeMesh,
    mesh: Option<GpuBladeMesh>,
    buffers: Option<GrassBuffers>,
    bind_groups: Option<EpochBindGroups>,
    uniforms: FrameUniformsBuffer,
    readback: VisibleCountReadback,
    state: PipelineState,
    recovery: RecoverySchedule,
    next_epoch: u64,
    bounds: Aabb,
}

impl GrassRenderer {
    /// Create a renderer for the given configuration.
    ///
    /// Configuration errors are the only failures surfaced here; the
    /// renderer is not constructed on error, which is the `Uninitialized`
    /// outcome the caller observes.
    pub fn new(device: &wgpu::Device, config: GrassConfig) -> Result<Self> {
        config.validate().inspect_err(|e| log::error!("grass renderer rejected: {e}"))?;
        let blade = BladeMesh::from_selection(&config.mesh);
        log::debug!("grass renderer using mesh '{}' ({} indices)", blade.name, blade.index_count());

        Ok(Self {
            config,
            store: InstanceStore::default(),
            blade,
            mesh: None,
            buffers: None,
            bind_groups: None,
            uniforms: FrameUniformsBuffer::new(device),
            readback: VisibleCountReadback::new(device),
            state: PipelineState::Uninitialized,
            recovery: RecoverySchedule::new(),
            next_epoch: 0,
            bounds: Aabb::default(),
        })
    }

    /// Replace the instance population. GPU buffers rebuild on next update.
    pub fn replace_instances(&mut self, instances: Vec<GrassInstance>) {
        self.store.replace_all(instances);
    }

    /// Mutable access to the store for external editing tools.
    pub fn store_mut(&mut self) -> &mut InstanceStore {
        &mut self.store
    }

    pub fn store(&self) -> &InstanceStore {
        &self.store
    }

    pub fn config(&self) -> &GrassConfig {
        &self.config
    }

    /// Swap in a new configuration. Rejects invalid configs, keeping the
    /// old one; a changed mesh selection forces a rebuild.
    pub fn set_config(&mut self, config: GrassConfig) -> Result<()> {
        config.validate()?;
        if config.mesh != self.config.mesh {
            self.blade = BladeMesh::from_selection(&config.mesh);
            self.mesh = None;
            self.store.mark_dirty();
        }
        self.config = config;
        Ok(())
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Best-effort visible count from the async readback; may lag a frame.
    pub fn visible_count(&self) -> Option<u32> {
        self.readback.latest()
    }

    /// Coarse world bounds of the population expanded by the max blade
    /// height, for backend-level culling of the whole draw.
    pub fn coarse_bounds(&self) -> Aabb {
        self.bounds
    }

    /// Externally force a rebuild (GPU context reset, resource teardown).
    pub fn invalidate(&mut self) {
        log::warn!("grass renderer invalidated, scheduling rebuild");
        self.release_buffers();
        self.state = PipelineState::Invalidated;
    }

    /// Release all GPU resources (disable/destroy path).
    pub fn release(&mut self) {
        self.release_buffers();
        self.mesh = None;
        self.state = PipelineState::Uninitialized;
        self.recovery.reset();
    }

    fn release_buffers(&mut self) {
        self.buffers = None;
        self.bind_groups = None;
        self.readback.cancel();
    }

    /// Drive the per-frame pipeline: consistency checks, throttled
    /// rebuilds, cull dispatch, and the indirect draw into `target`.
    ///
    /// Everything is enqueued in one submission-ordered stream; there is no
    /// CPU-side wait. Call [`after_submit`](Self::after_submit) once the
    /// encoder has been submitted.
    #[allow(clippy::too_many_arguments)]
    pub fn update(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        cull: &CullPipeline,
        draw: &GrassDrawPipeline,
        camera: &Camera,
        registry: &mut InteractorRegistry,
        time: f32,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
    ) {
        // Empty population: nothing to allocate, dispatch, or draw. Any
        // accumulated backoff belongs to the old data; clear it so a
        // repopulated store rebuilds immediately.
        if self.store.is_empty() {
            self.release_buffers();
            self.store.clear_dirty();
            self.state = PipelineState::Ready;
            self.recovery.reset();
            return;
        }

        self.check_consistency();

        if self.state != PipelineState::Ready {
            let now = Instant::now();
            if !self.recovery.should_attempt(now) {
                return;
            }
            self.recovery.record_attempt(now);
            self.state = PipelineState::Initializing;
            match self.try_initialize(device, queue) {
                Ok(()) => {
                    self.state = PipelineState::Ready;
                    self.recovery.reset();
                    log::debug!(
                        "grass buffers ready: {} instances, epoch {}",
                        self.store.len(),
                        self.buffers.as_ref().map(GrassBuffers::epoch).unwrap_or(0)
                    );
                }
                Err(e) => {
                    self.state = PipelineState::Invalidated;
                    self.recovery.record_failure();
                    if self.recovery.failures() == 1 {
                        log::warn!("grass buffer init failed, will retry: {e}");
                    } else {
                        log::debug!("grass buffer init retry {} failed: {e}", self.recovery.failures());
                    }
                    return;
                }
            }
        }

        self.encode_frame(device, queue, cull, draw, camera, registry, time, encoder, target);
    }

    /// Start the async readback map. Call once per frame, after submitting
    /// the encoder passed to [`update`](Self::update).
    pub fn after_submit(&mut self) {
        self.readback.begin_map();
    }

    /// Validate that live GPU state still matches the store and mesh.
    fn check_consistency(&mut self) {
        if self.state != PipelineState::Ready {
            return;
        }
        let ok = !self.store.is_dirty()
            && self
                .buffers
                .as_ref()
                .is_some_and(|b| b.matches(self.store.len(), self.blade.index_count()));
        if !ok {
            log::debug!("grass buffers stale (dirty={})", self.store.is_dirty());
            self.release_buffers();
            self.state = PipelineState::Invalidated;
        }
    }

    /// (Re)allocate the mesh and buffer set for the current store.
    fn try_initialize(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) -> Result<()> {
        if self.mesh.is_none() {
            self.mesh = Some(self.blade.upload(device, queue));
        }
        let mesh = self.mesh.as_ref().expect("mesh uploaded above");

        let gpu_instances = self.store.gpu_data();
        if gpu_instances.is_empty() {
            return Err(Error::Gpu("instance data not yet available".into()));
        }

        let epoch = self.next_epoch;
        self.next_epoch += 1;
        self.buffers = Some(GrassBuffers::allocate(
            device,
            queue,
            &gpu_instances,
            mesh.index_count,
            epoch,
        ));
        self.bind_groups = None;

        self.bounds = Aabb::from_points(self.store.instances().iter().map(|i| i.position))
            .map(|b| b.inflated(self.store.max_height()))
            .unwrap_or_default();

        self.store.clear_dirty();
        Ok(())
    }

    /// Encode one frame in strict submission order: counter reset, uniform
    /// upload, cull dispatch, indirect draw.
    #[allow(clippy::too_many_arguments)]
    fn encode_frame(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        cull: &CullPipeline,
        draw: &GrassDrawPipeline,
        camera: &Camera,
        registry: &mut InteractorRegistry,
        time: f32,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
    ) {
        let Some(buffers) = self.buffers.as_ref() else {
            return;
        };

        // 1. Reset the visible counter (completes before the dispatch below
        //    because the queue preserves submission order).
        buffers.reset_instance_count(queue);

        // 2. Fresh frustum state and this frame's uniforms.
        let frustum = FrustumState::from_camera(camera);
        let wind = WindParams::from_config(&self.config);
        let (interactors, interactor_count) =
            registry.snapshot(self.config.max_interactors as usize);
        let uniforms = FrameUniforms::build(
            camera,
            &frustum,
            &self.config,
            &wind,
            time,
            buffers.capacity(),
            &interactors,
            interactor_count,
        );
        self.uniforms.update(queue, &uniforms);

        // 3. Re-create bind groups if the buffer epoch changed. The pass
        //    below re-sets them every dispatch regardless, since the cull
        //    pipeline may be shared across populations.
        let epoch = buffers.epoch();
        if self.bind_groups.as_ref().map(|b| b.epoch) != Some(epoch) {
            self.bind_groups = Some(EpochBindGroups {
                epoch,
                cull_uniforms: cull.create_uniforms_bind_group(device, &self.uniforms),
                cull_storage: cull.create_storage_bind_group(device, buffers),
                draw_uniforms: draw.create_uniforms_bind_group(device, &self.uniforms),
                draw_visible: draw.create_visible_bind_group(device, buffers),
            });
        }
        let groups = self.bind_groups.as_ref().expect("bind groups built above");

        // 4. Cull dispatch.
        cull.dispatch(encoder, &groups.cull_uniforms, &groups.cull_storage, buffers.capacity());

        // Diagnostic copy of this frame's count (no-op if one is in flight).
        self.readback.request(encoder, buffers);
        if let Some(count) = self.readback.poll(epoch) {
            log::trace!("grass visible count: {count}");
        }

        // 5. Indirect draw consuming the freshly patched arguments.
        let mesh = self.mesh.as_ref().expect("mesh exists while Ready");
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("grass_draw_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        draw.draw(&mut pass, &groups.draw_uniforms, &groups.draw_visible, mesh, buffers);
    }

    /// Diagnostic source-buffer readback (blocking; not for the frame path).
    pub fn read_source_blocking(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) -> Vec<crate::grass::instance::GpuGrassInstance> {
        self.buffers
            .as_ref()
            .map(|b| b.read_source_blocking(device, queue))
            .unwrap_or_default()
    }
}
