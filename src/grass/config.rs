//! Grass renderer configuration (user-facing settings).

use serde::{Deserialize, Serialize};

use crate::core::error::Error;
use crate::core::types::Result;
use crate::grass::interactor::MAX_INTERACTORS;

/// Which blade mesh the renderer uses for its lifetime.
///
/// Selected once at initialization; `Authored` picks one variant out of the
/// built-in blade library deterministically from the seed, so a given
/// renderer always draws the same mesh unless reseeded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum MeshSelection {
    /// Segmented quad strip generated at init time.
    Procedural { segments: u32 },
    /// One of the built-in authored blade variants, chosen by seed.
    Authored { seed: u64 },
}

/// User-facing grass configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GrassConfig {
    /// Wind oscillation speed (time scale).
    pub wind_speed: f32,
    /// Wind bend magnitude scale.
    pub wind_strength: f32,
    /// Spatial frequency of the wind field.
    pub wind_frequency: f32,
    /// Distance below which blades render at full size.
    pub min_fade_distance: f32,
    /// Distance beyond which blades are culled entirely.
    pub max_draw_distance: f32,
    /// Interactor snapshot size (at most [`MAX_INTERACTORS`]).
    pub max_interactors: u32,
    /// Maximum interaction bend in radians.
    pub max_bend_angle: f32,
    /// Maximum random lean in radians.
    pub tilt_angle: f32,
    /// 0-1 scale on the per-blade random lean.
    pub tilt_variation: f32,
    /// Whether blades cast shadows (consumed by the backend).
    pub cast_shadows: bool,
    /// Whether blades receive shadows (consumed by the backend).
    pub receive_shadows: bool,
    /// Active blade mesh.
    pub mesh: MeshSelection,
}

impl Default for GrassConfig {
    fn default() -> Self {
        Self {
            wind_speed: 1.2,
            wind_strength: 0.35,
            wind_frequency: 0.4,
            min_fade_distance: 40.0,
            max_draw_distance: 80.0,
            max_interactors: MAX_INTERACTORS as u32,
            max_bend_angle: 1.0,
            tilt_angle: 0.25,
            tilt_variation: 0.6,
            cast_shadows: false,
            receive_shadows: true,
            mesh: MeshSelection::Procedural { segments: 3 },
        }
    }
}

impl GrassConfig {
    /// Validate before initialization. Returns a `Config` error naming the
    /// offending field; the pipeline stays `Uninitialized` on failure.
    pub fn validate(&self) -> Result<()> {
        if !(self.min_fade_distance > 0.0) {
            return Err(Error::Config(format!(
                "min_fade_distance must be positive, got {}",
                self.min_fade_distance
            )));
        }
        if !(self.max_draw_distance > self.min_fade_distance) {
            return Err(Error::Config(format!(
                "max_draw_distance ({}) must exceed min_fade_distance ({})",
                self.max_draw_distance, self.min_fade_distance
            )));
        }
        if self.max_interactors == 0 || self.max_interactors as usize > MAX_INTERACTORS {
            return Err(Error::Config(format!(
                "max_interactors must be in 1..={}, got {}",
                MAX_INTERACTORS, self.max_interactors
            )));
        }
        if !(self.max_bend_angle > 0.0 && self.max_bend_angle <= std::f32::consts::FRAC_PI_2) {
            return Err(Error::Config(format!(
                "max_bend_angle must be in (0, pi/2], got {}",
                self.max_bend_angle
            )));
        }
        if !(self.tilt_angle >= 0.0 && self.tilt_angle <= std::f32::consts::FRAC_PI_2) {
            return Err(Error::Config(format!(
                "tilt_angle must be in [0, pi/2], got {}",
                self.tilt_angle
            )));
        }
        if !(0.0..=1.0).contains(&self.tilt_variation) {
            return Err(Error::Config(format!(
                "tilt_variation must be in [0, 1], got {}",
                self.tilt_variation
            )));
        }
        if let MeshSelection::Procedural { segments } = self.mesh {
            if segments == 0 {
                return Err(Error::Config("procedural mesh needs at least 1 segment".into()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(GrassConfig::default().validate().is_ok());
    }

    #[test]
    fn test_inverted_fade_window() {
        let cfg = GrassConfig {
            min_fade_distance: 80.0,
            max_draw_distance: 40.0,
            ..Default::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("max_draw_distance"));
    }

    #[test]
    fn test_interactor_cap() {
        let cfg = GrassConfig { max_interactors: 0, ..Default::default() };
        assert!(cfg.validate().is_err());

        let cfg = GrassConfig {
            max_interactors: MAX_INTERACTORS as u32 + 1,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_bend_angle_bounds() {
        let cfg = GrassConfig { max_bend_angle: 0.0, ..Default::default() };
        assert!(cfg.validate().is_err());

        let cfg = GrassConfig { max_bend_angle: 2.0, ..Default::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_zero_segment_mesh() {
        let cfg = GrassConfig {
            mesh: MeshSelection::Procedural { segments: 0 },
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_serde_round_trip() {
        let cfg = GrassConfig {
            mesh: MeshSelection::Authored { seed: 7 },
            ..Default::default()
        };
        let json = serde_json::to_string(&cfg).unwrap();
        let back: GrassConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.mesh, MeshSelection::Authored { seed: 7 });
        assert_eq!(back.max_draw_distance, cfg.max_draw_distance);
    }
}
