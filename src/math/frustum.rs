//! View frustum for culling

use crate::core::camera::Camera;
use crate::core::types::{Vec3, Vec4, Mat4};

/// A frustum plane in Hessian normal form (normal.xyz, distance)
#[derive(Clone, Copy, Debug)]
pub struct Plane {
    pub normal: Vec3,
    pub d: f32,
}

impl Plane {
    /// Signed distance from point to plane (positive = in front)
    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.d
    }
}

/// 6-plane frustum extracted from a view-projection matrix
#[derive(Clone, Copy, Debug)]
pub struct Frustum {
    pub planes: [Plane; 6], // left, right, bottom, top, near, far
}

impl Frustum {
    /// Extract frustum planes from a view-projection matrix.
    /// Uses the Gribb/Hartmann method.
    pub fn from_view_projection(vp: &Mat4) -> Self {
        // Extract rows from the VP matrix (column-major storage)
        let rows = [
            Vec4::new(vp.col(0).x, vp.col(1).x, vp.col(2).x, vp.col(3).x),
            Vec4::new(vp.col(0).y, vp.col(1).y, vp.col(2).y, vp.col(3).y),
            Vec4::new(vp.col(0).z, vp.col(1).z, vp.col(2).z, vp.col(3).z),
            Vec4::new(vp.col(0).w, vp.col(1).w, vp.col(2).w, vp.col(3).w),
        ];

        let mut planes = [Plane { normal: Vec3::ZERO, d: 0.0 }; 6];

        // Left:   row3 + row0
        // Right:  row3 - row0
        // Bottom: row3 + row1
        // Top:    row3 - row1
        // Near:   row3 + row2
        // Far:    row3 - row2
        let raw = [
            rows[3] + rows[0], // left
            rows[3] - rows[0], // right
            rows[3] + rows[1], // bottom
            rows[3] - rows[1], // top
            rows[3] + rows[2], // near
            rows[3] - rows[2], // far
        ];

        for (i, r) in raw.iter().enumerate() {
            let len = Vec3::new(r.x, r.y, r.z).length();
            if len > 0.0 {
                planes[i] = Plane {
                    normal: Vec3::new(r.x, r.y, r.z) / len,
                    d: r.w / len,
                };
            }
        }

        Self { planes }
    }

    /// Check if a point is inside the frustum
    pub fn contains_point(&self, point: Vec3) -> bool {
        self.intersects_sphere(point, 0.0)
    }

    /// Check if a sphere is at least partially inside the frustum
    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        for plane in &self.planes {
            if plane.distance_to_point(center) < -radius {
                return false;
            }
        }
        true
    }
}

/// Per-frame frustum state: the 6 planes plus the camera world position.
///
/// Derived fresh every frame from the active camera and uploaded to the
/// culling kernel. Never cached across frames.
#[derive(Clone, Copy, Debug)]
pub struct FrustumState {
    pub frustum: Frustum,
    pub camera_position: Vec3,
}

impl FrustumState {
    pub fn from_camera(camera: &Camera) -> Self {
        Self {
            frustum: Frustum::from_view_projection(&camera.view_projection()),
            camera_position: camera.position,
        }
    }

    /// Planes packed as vec4s (normal.xyz, d) for GPU upload
    pub fn gpu_planes(&self) -> [[f32; 4]; 6] {
        let mut out = [[0.0; 4]; 6];
        for (i, p) in self.frustum.planes.iter().enumerate() {
            out[i] = [p.normal.x, p.normal.y, p.normal.z, p.d];
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_frustum() -> Frustum {
        let proj = Mat4::perspective_rh(std::f32::consts::FRAC_PI_3, 1.0, 0.1, 100.0);
        let view = Mat4::IDENTITY;
        Frustum::from_view_projection(&(proj * view))
    }

    #[test]
    fn test_frustum_extraction_normalized() {
        let frustum = test_frustum();
        for plane in &frustum.planes {
            assert!(plane.normal.length() > 0.9, "Plane normal should be normalized");
        }
    }

    #[test]
    fn test_point_inside_frustum() {
        let frustum = test_frustum();
        assert!(frustum.contains_point(Vec3::new(0.0, 0.0, -10.0)));
    }

    #[test]
    fn test_point_behind_camera() {
        let frustum = test_frustum();
        assert!(!frustum.contains_point(Vec3::new(0.0, 0.0, 10.0)));
    }

    #[test]
    fn test_point_far_outside() {
        let frustum = test_frustum();
        assert!(!frustum.contains_point(Vec3::new(-1000.0, 0.0, -10.0)));
        assert!(!frustum.contains_point(Vec3::new(0.0, 0.0, -200.0)));
    }

    #[test]
    fn test_sphere_straddling_edge() {
        let frustum = test_frustum();
        // A point just outside the left plane but whose sphere pokes in
        let p = Vec3::new(-6.2, 0.0, -10.0);
        assert!(!frustum.contains_point(p));
        assert!(frustum.intersects_sphere(p, 1.0));
    }

    #[test]
    fn test_frustum_state_from_camera() {
        let camera = Camera::default();
        let state = FrustumState::from_camera(&camera);
        assert_eq!(state.camera_position, camera.position);

        let planes = state.gpu_planes();
        for p in &planes {
            let n = Vec3::new(p[0], p[1], p[2]);
            assert!(n.length() > 0.9);
        }
    }
}
