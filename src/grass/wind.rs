//! Closed-form wind field.
//!
//! Wind is a pure function of world XZ position and time: two summed sine
//! waves at different frequency/amplitude with a position-hashed phase and
//! amplitude jitter, so neighboring blades do not oscillate in lockstep.
//! This is the CPU mirror of `wind_offset` in grass_common.wgsl; the two
//! must stay formula-for-formula identical.

use glam::Vec2;

use crate::grass::config::GrassConfig;
use crate::grass::displacement::hash21;

/// Prevailing wind direction (normalized). Shared with grass_common.wgsl.
pub const WIND_DIR: Vec2 = Vec2::new(0.8, 0.6);

/// Secondary wave frequency multiple, deliberately non-integer so the two
/// waves never phase-lock.
const SECOND_WAVE_RATE: f32 = 2.33;
const SECOND_WAVE_SCALE: f32 = 2.7;
const SECOND_WAVE_AMP: f32 = 0.4;

/// Wind parameters fed to the shaders each frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WindParams {
    /// Time scale of the oscillation.
    pub speed: f32,
    /// Output magnitude scale.
    pub strength: f32,
    /// Spatial frequency of the field.
    pub frequency: f32,
}

impl WindParams {
    pub fn from_config(config: &GrassConfig) -> Self {
        Self {
            speed: config.wind_speed,
            strength: config.wind_strength,
            frequency: config.wind_frequency,
        }
    }
}

/// Wind offset at a world XZ position. Mirror of WGSL `wind_offset`.
pub fn wind_offset(pos_xz: Vec2, time: f32, params: &WindParams) -> Vec2 {
    let along = pos_xz.dot(WIND_DIR) * params.frequency;
    let phase = hash21(pos_xz * params.frequency) * std::f32::consts::TAU;
    let amp = 0.75 + 0.5 * hash21(pos_xz * params.frequency + Vec2::new(17.0, 9.0));

    let t = time * params.speed;
    let wave = (t + along + phase).sin()
        + SECOND_WAVE_AMP * (t * SECOND_WAVE_RATE + along * SECOND_WAVE_SCALE + phase * 1.7).sin();

    WIND_DIR * wave * params.strength * amp
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> WindParams {
        WindParams { speed: 1.0, strength: 0.5, frequency: 0.4 }
    }

    #[test]
    fn test_deterministic() {
        let p = Vec2::new(3.2, -7.1);
        let a = wind_offset(p, 1.25, &params());
        let b = wind_offset(p, 1.25, &params());
        assert_eq!(a, b);
    }

    #[test]
    fn test_bounded_by_strength() {
        let params = params();
        // Two summed waves with amp jitter <= 1.25: |wave| <= 1.4 * 1.25
        let bound = params.strength * 1.4 * 1.25 + 1e-4;
        for i in 0..64 {
            let p = Vec2::new(i as f32 * 1.7, (i * i) as f32 * 0.3);
            for t in 0..16 {
                let w = wind_offset(p, t as f32 * 0.37, &params);
                assert!(w.length() <= bound, "wind {w:?} exceeds bound {bound}");
            }
        }
    }

    #[test]
    fn test_neighbors_not_in_lockstep() {
        let params = params();
        let a = wind_offset(Vec2::new(0.0, 0.0), 2.0, &params);
        let b = wind_offset(Vec2::new(0.5, 0.0), 2.0, &params);
        assert!((a - b).length() > 1e-4, "adjacent blades should be phase-shifted");
    }

    #[test]
    fn test_varies_over_time() {
        let params = params();
        let p = Vec2::new(1.0, 2.0);
        let a = wind_offset(p, 0.0, &params);
        let b = wind_offset(p, 0.8, &params);
        assert!((a - b).length() > 1e-4);
    }

    #[test]
    fn test_zero_strength_is_calm() {
        let mut params = params();
        params.strength = 0.0;
        assert_eq!(wind_offset(Vec2::new(4.0, 4.0), 3.0, &params), Vec2::ZERO);
    }
}
