//! Deterministic per-vertex displacement.
//!
//! This is the CPU mirror of the WGSL functions in grass_common.wgsl: scale,
//! position-hashed tilt and yaw, wind bend, interaction bend. The culling
//! kernel, the draw shader, and any CPU-side bounding estimate all use the
//! same definitions — change one side only in lockstep with the other.

use glam::{Quat, Vec2, Vec3};

use crate::grass::interactor::GpuInteractor;

/// Wind bend is clamped to this rotation so gusts never fold blades flat.
/// Shared with grass_common.wgsl.
pub const MAX_WIND_BEND: f32 = 0.6;

/// GLSL/WGSL-style fract: always in [0, 1).
#[inline]
fn fract_gl(x: f32) -> f32 {
    x - x.floor()
}

/// 1D position hash in [0, 1).
#[inline]
pub fn hash11(p: f32) -> f32 {
    fract_gl((p * 127.1).sin() * 43758.5453)
}

/// 2D position hash in [0, 1).
#[inline]
pub fn hash21(p: Vec2) -> f32 {
    fract_gl(p.dot(Vec2::new(127.1, 311.7)).sin() * 43758.5453)
}

/// Distance fade: 1 at or below `min_fade`, linearly down to 0 at
/// `max_draw`, 0 beyond. Mirror of WGSL `distance_fade`.
pub fn distance_fade(dist: f32, min_fade: f32, max_draw: f32) -> f32 {
    ((max_draw - dist) / (max_draw - min_fade)).clamp(0.0, 1.0)
}

/// Static shape parameters of the displacement.
#[derive(Clone, Copy, Debug)]
pub struct DisplaceParams {
    /// Maximum random lean in radians.
    pub tilt_angle: f32,
    /// 0-1 scale on the random lean.
    pub tilt_variation: f32,
    /// Maximum interaction bend in radians.
    pub max_bend_angle: f32,
}

/// Map a local blade vertex to its world position.
///
/// `v` is the normalized height along the blade (0 = base, 1 = tip). The
/// base is the rotation pivot, so all bends are anchored there: wind
/// influence grows as `v²`, interaction influence linearly in `v`.
#[allow(clippy::too_many_arguments)]
pub fn displace_vertex(
    local: Vec3,
    v: f32,
    position: Vec3,
    width: f32,
    height: f32,
    distance_scale: f32,
    wind: Vec2,
    interactors: &[GpuInteractor],
    params: &DisplaceParams,
) -> Vec3 {
    let mut p = local * Vec3::new(width, height, width) * distance_scale;

    let seed = hash21(Vec2::new(position.x, position.z));

    // Natural per-blade lean without stored randomness
    let tilt = params.tilt_variation * params.tilt_angle;
    let tilt_x = (hash11(seed * 113.0) * 2.0 - 1.0) * tilt;
    let tilt_z = (hash11(seed * 57.0) * 2.0 - 1.0) * tilt;
    p = Quat::from_rotation_x(tilt_x) * (Quat::from_rotation_z(tilt_z) * p);

    // Hashed yaw so blades are not axis-aligned
    let yaw = hash21(Vec2::new(position.x, position.z) * 1.93) * std::f32::consts::TAU;
    p = Quat::from_rotation_y(yaw) * p;

    // Wind bend: bounded rotation toward the wind direction
    let wind_mag = wind.length();
    if wind_mag > 1e-5 {
        let angle = wind_mag.min(MAX_WIND_BEND) * v * v;
        let dir = Vec3::new(wind.x, 0.0, wind.y) / wind_mag;
        p = Quat::from_axis_angle(Vec3::Y.cross(dir), angle) * p;
    }

    // Interaction bend: away from the nearest sufficiently-close interactor
    if let Some((away, strength)) = nearest_push(position, interactors, seed) {
        let angle = params.max_bend_angle * strength * v;
        p = Quat::from_axis_angle(Vec3::Y.cross(away), angle) * p;
    }

    position + p
}

/// Direction away from the nearest interactor whose radius covers the blade,
/// and the 0-1 bend strength. A blade sitting exactly at an interactor
/// center is pushed in a hashed horizontal direction.
fn nearest_push(position: Vec3, interactors: &[GpuInteractor], seed: f32) -> Option<(Vec3, f32)> {
    let mut best: Option<(f32, &GpuInteractor)> = None;
    for it in interactors {
        if it.radius <= 0.0 {
            continue;
        }
        let d = (position - Vec3::from(it.position)).length();
        if d < it.radius && best.is_none_or(|(bd, _)| d < bd) {
            best = Some((d, it));
        }
    }
    let (d, it) = best?;
    let strength = 1.0 - d / it.radius;

    let mut away = position - Vec3::from(it.position);
    away.y = 0.0;
    let len = away.length();
    let away = if len > 1e-4 {
        away / len
    } else {
        let a = seed * std::f32::consts::TAU;
        Vec3::new(a.cos(), 0.0, a.sin())
    };
    Some((away, strength))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> DisplaceParams {
        DisplaceParams {
            tilt_angle: 0.25,
            tilt_variation: 0.6,
            max_bend_angle: 1.0,
        }
    }

    fn displace(local: Vec3, v: f32, wind: Vec2, interactors: &[GpuInteractor]) -> Vec3 {
        displace_vertex(
            local,
            v,
            Vec3::new(3.0, 0.0, -2.0),
            0.05,
            0.4,
            1.0,
            wind,
            interactors,
            &params(),
        )
    }

    #[test]
    fn test_deterministic() {
        let it = [GpuInteractor { position: [3.2, 0.0, -2.0], radius: 1.0 }];
        let a = displace(Vec3::new(0.5, 1.0, 0.0), 1.0, Vec2::new(0.3, 0.1), &it);
        let b = displace(Vec3::new(0.5, 1.0, 0.0), 1.0, Vec2::new(0.3, 0.1), &it);
        assert_eq!(a, b);
    }

    #[test]
    fn test_base_is_anchored() {
        // The base vertex never moves, whatever the wind or interactors do
        let it = [GpuInteractor { position: [3.0, 0.0, -2.0], radius: 2.0 }];
        let p = displace(Vec3::ZERO, 0.0, Vec2::new(5.0, 5.0), &it);
        assert_eq!(p, Vec3::new(3.0, 0.0, -2.0));
    }

    #[test]
    fn test_interactor_bends_tip_not_base() {
        // Interactor sitting exactly on the blade: hashed push direction
        let it = [GpuInteractor { position: [3.0, 0.0, -2.0], radius: 0.5 }];
        let tip_bent = displace(Vec3::new(0.0, 1.0, 0.0), 1.0, Vec2::ZERO, &it);
        let tip_calm = displace(Vec3::new(0.0, 1.0, 0.0), 1.0, Vec2::ZERO, &[]);
        assert!((tip_bent - tip_calm).length() > 1e-3, "tip should bend");

        let base_bent = displace(Vec3::ZERO, 0.0, Vec2::ZERO, &it);
        let base_calm = displace(Vec3::ZERO, 0.0, Vec2::ZERO, &[]);
        assert!((base_bent - base_calm).length() < 1e-6, "base must stay anchored");
    }

    #[test]
    fn test_out_of_radius_interactor_ignored() {
        let it = [GpuInteractor { position: [100.0, 0.0, 0.0], radius: 1.0 }];
        let bent = displace(Vec3::new(0.0, 1.0, 0.0), 1.0, Vec2::ZERO, &it);
        let calm = displace(Vec3::new(0.0, 1.0, 0.0), 1.0, Vec2::ZERO, &[]);
        assert_eq!(bent, calm);
    }

    #[test]
    fn test_nearest_interactor_wins() {
        let near = GpuInteractor { position: [3.3, 0.0, -2.0], radius: 1.0 };
        let far = GpuInteractor { position: [3.8, 0.0, -2.0], radius: 1.0 };
        let a = displace(Vec3::new(0.0, 1.0, 0.0), 1.0, Vec2::ZERO, &[near, far]);
        let b = displace(Vec3::new(0.0, 1.0, 0.0), 1.0, Vec2::ZERO, &[near]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_wind_bend_grows_toward_tip() {
        let wind = Vec2::new(0.4, 0.0);
        let calm_mid = displace(Vec3::new(0.0, 0.5, 0.0), 0.5, Vec2::ZERO, &[]);
        let calm_tip = displace(Vec3::new(0.0, 1.0, 0.0), 1.0, Vec2::ZERO, &[]);
        let windy_mid = displace(Vec3::new(0.0, 0.5, 0.0), 0.5, wind, &[]);
        let windy_tip = displace(Vec3::new(0.0, 1.0, 0.0), 1.0, wind, &[]);

        let mid_delta = (windy_mid - calm_mid).length();
        let tip_delta = (windy_tip - calm_tip).length();
        assert!(tip_delta > mid_delta, "tip ({tip_delta}) should move more than mid ({mid_delta})");
    }

    #[test]
    fn test_wind_bend_is_clamped() {
        // Hurricane wind still only rotates by MAX_WIND_BEND
        let a = displace(Vec3::new(0.0, 1.0, 0.0), 1.0, Vec2::new(100.0, 0.0), &[]);
        let b = displace(Vec3::new(0.0, 1.0, 0.0), 1.0, Vec2::new(1000.0, 0.0), &[]);
        assert!((a - b).length() < 1e-4);
    }

    #[test]
    fn test_distance_scale_shrinks_blade() {
        let full = displace(Vec3::new(0.0, 1.0, 0.0), 1.0, Vec2::ZERO, &[]);
        let half = displace_vertex(
            Vec3::new(0.0, 1.0, 0.0),
            1.0,
            Vec3::new(3.0, 0.0, -2.0),
            0.05,
            0.4,
            0.5,
            Vec2::ZERO,
            &[],
            &params(),
        );
        let base = Vec3::new(3.0, 0.0, -2.0);
        assert!(((half - base).length() - (full - base).length() * 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_distance_fade_window() {
        assert_eq!(distance_fade(0.0, 40.0, 80.0), 1.0);
        assert_eq!(distance_fade(40.0, 40.0, 80.0), 1.0);
        assert_eq!(distance_fade(80.0, 40.0, 80.0), 0.0);
        assert_eq!(distance_fade(120.0, 40.0, 80.0), 0.0);

        // Monotonic non-increasing across the window
        let mut prev = f32::INFINITY;
        for i in 0..=100 {
            let d = 30.0 + i as f32;
            let s = distance_fade(d, 40.0, 80.0);
            assert!(s <= prev);
            prev = s;
        }
    }

    #[test]
    fn test_hashes_in_unit_range() {
        for i in 0..256 {
            let h1 = hash11(i as f32 * 0.73 - 90.0);
            let h2 = hash21(Vec2::new(i as f32 * 1.31, -(i as f32) * 0.17));
            assert!((0.0..1.0).contains(&h1));
            assert!((0.0..1.0).contains(&h2));
        }
    }
}
