//! Headless demo: two grass populations sharing one cull/draw pipeline pair,
//! a wandering interactor, and a forced invalidation to exercise recovery.

use glam::{Vec2, Vec3};

use veld::core::camera::Camera;
use veld::core::types::Result;
use veld::grass::config::{GrassConfig, MeshSelection};
use veld::grass::displacement::hash21;
use veld::grass::instance::GrassInstance;
use veld::grass::interactor::{Interactor, InteractorRegistry};
use veld::render::context::GpuContext;
use veld::render::culling::CullPipeline;
use veld::render::draw::GrassDrawPipeline;
use veld::render::recovery::PipelineState;
use veld::render::renderer::GrassRenderer;

const FRAMES: u32 = 240;
const DT: f32 = 1.0 / 60.0;

/// Deterministic blade field around `center`, hashed from the index so runs
/// are reproducible without an RNG dependency.
fn scatter(count: u32, center: Vec2, extent: f32, color: Vec3) -> Vec<GrassInstance> {
    (0..count)
        .map(|i| {
            let fi = i as f32;
            let x = center.x + (hash21(Vec2::new(fi, 0.13)) - 0.5) * extent;
            let z = center.y + (hash21(Vec2::new(0.57, fi)) - 0.5) * extent;
            let height = 0.3 + hash21(Vec2::new(fi * 0.31, fi)) * 0.3;
            GrassInstance {
                position: Vec3::new(x, 0.0, z),
                normal: Vec3::Y,
                width: 0.04,
                height,
                color,
                pattern_mask: hash21(Vec2::new(fi * 0.7, 3.1)),
            }
        })
        .collect()
}

fn main() -> Result<()> {
    veld::core::logging::init();

    let ctx = pollster::block_on(GpuContext::new())?;
    let target = ctx.create_offscreen_target(1280, 720);
    let target_view = target.create_view(&wgpu::TextureViewDescriptor::default());

    // One pipeline pair serves every population.
    let cull = CullPipeline::new(&ctx.device);
    let draw = GrassDrawPipeline::new(&ctx.device, target.format());

    let mut meadow = GrassRenderer::new(&ctx.device, GrassConfig::default())?;
    meadow.replace_instances(scatter(
        20_000,
        Vec2::ZERO,
        60.0,
        Vec3::new(0.20, 0.48, 0.12),
    ));

    let hillside_config = GrassConfig {
        mesh: MeshSelection::Authored { seed: 2 },
        wind_strength: 0.5,
        ..Default::default()
    };
    let mut hillside = GrassRenderer::new(&ctx.device, hillside_config)?;
    hillside.replace_instances(scatter(
        8_000,
        Vec2::new(45.0, 0.0),
        30.0,
        Vec3::new(0.32, 0.42, 0.10),
    ));

    let mut registry = InteractorRegistry::new();
    let walker = registry.register(Interactor {
        position: Vec3::ZERO,
        radius: 1.5,
    });

    let camera = Camera::look_at(Vec3::new(0.0, 8.0, 25.0), Vec3::ZERO, Vec3::Y);

    log::info!(
        "demo start: {} + {} instances, bounds {:?}",
        meadow.store().len(),
        hillside.store().len(),
        meadow.coarse_bounds()
    );

    for frame in 0..FRAMES {
        let time = frame as f32 * DT;

        // Interactor loops through the meadow.
        let angle = time * 0.8;
        walker.set_position(Vec3::new(angle.cos() * 6.0, 0.0, angle.sin() * 6.0));

        // Simulated device reset halfway through; the renderer must come
        // back on its own.
        if frame == FRAMES / 2 {
            meadow.invalidate();
        }

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("frame") });

        meadow.update(
            &ctx.device,
            &ctx.queue,
            &cull,
            &draw,
            &camera,
            &mut registry,
            time,
            &mut encoder,
            &target_view,
        );
        hillside.update(
            &ctx.device,
            &ctx.queue,
            &cull,
            &draw,
            &camera,
            &mut registry,
            time,
            &mut encoder,
            &target_view,
        );

        ctx.queue.submit(Some(encoder.finish()));
        meadow.after_submit();
        hillside.after_submit();
        let _ = ctx.device.poll(wgpu::PollType::Poll);

        // The culling kernel can never report more survivors than exist.
        if let Some(count) = meadow.visible_count() {
            assert!(count as usize <= meadow.store().len());
        }
        if let Some(count) = hillside.visible_count() {
            assert!(count as usize <= hillside.store().len());
        }

        if frame % 60 == 0 {
            log::info!(
                "frame {frame}: meadow {:?} visible={:?}, hillside {:?} visible={:?}",
                meadow.state(),
                meadow.visible_count(),
                hillside.state(),
                hillside.visible_count(),
            );
        }
    }

    // The forced invalidation must have fully recovered by now.
    assert_eq!(meadow.state(), PipelineState::Ready);
    assert_eq!(hillside.state(), PipelineState::Ready);

    // Round-trip check: the source buffer still holds what we uploaded,
    // record for record, in order.
    let source = meadow.read_source_blocking(&ctx.device, &ctx.queue);
    log::info!(
        "source readback: {} instances (expected {})",
        source.len(),
        meadow.store().len()
    );
    assert_eq!(source, meadow.store().gpu_data());

    log::info!(
        "demo done: meadow visible={:?}, hillside visible={:?}",
        meadow.visible_count(),
        hillside.visible_count()
    );
    Ok(())
}
