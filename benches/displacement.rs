use criterion::{Criterion, black_box, criterion_group, criterion_main};
use glam::{Vec2, Vec3};

use veld::grass::displacement::{DisplaceParams, displace_vertex};
use veld::grass::interactor::GpuInteractor;
use veld::grass::wind::{WindParams, wind_offset};

fn bench_displacement(c: &mut Criterion) {
    let params = DisplaceParams {
        tilt_angle: 0.25,
        tilt_variation: 0.6,
        max_bend_angle: 1.0,
    };
    let wind = WindParams {
        speed: 1.2,
        strength: 0.35,
        frequency: 0.4,
    };
    let interactors = [
        GpuInteractor { position: [2.0, 0.0, 1.0], radius: 1.5 },
        GpuInteractor { position: [-4.0, 0.0, 3.0], radius: 2.0 },
    ];

    // 10k blade tips scattered over a 60m field, matching the demo density
    let positions: Vec<Vec3> = (0..10_000)
        .map(|i| {
            let fi = i as f32;
            Vec3::new((fi * 0.37).sin() * 30.0, 0.0, (fi * 0.61).cos() * 30.0)
        })
        .collect();

    c.bench_function("displace_10k_tips", |b| {
        b.iter(|| {
            let mut acc = Vec3::ZERO;
            for &pos in &positions {
                let w = wind_offset(Vec2::new(pos.x, pos.z), black_box(1.25), &wind);
                acc += displace_vertex(
                    Vec3::new(0.0, 1.0, 0.0),
                    1.0,
                    pos,
                    0.04,
                    0.4,
                    1.0,
                    w,
                    &interactors,
                    &params,
                );
            }
            black_box(acc)
        })
    });

    c.bench_function("wind_field_10k", |b| {
        b.iter(|| {
            let mut acc = Vec2::ZERO;
            for &pos in &positions {
                acc += wind_offset(Vec2::new(pos.x, pos.z), black_box(2.5), &wind);
            }
            black_box(acc)
        })
    });
}

criterion_group!(benches, bench_displacement);
criterion_main!(benches);
