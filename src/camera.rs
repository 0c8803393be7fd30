//! Orbit camera with auto-rotation and screen-space picking.

use glam::{Mat4, Vec2, Vec3, Vec4Swizzles};
use std::f32::consts::{FRAC_PI_2, TAU};

/// A ray in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit direction.
    pub direction: Vec3,
}

impl Ray {
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Where the ray meets the horizontal plane `y = height`.
    ///
    /// `None` when the ray runs parallel to the plane or the hit lies
    /// behind the origin.
    pub fn intersect_horizontal_plane(&self, height: f32) -> Option<Vec3> {
        if self.direction.y.abs() < 1e-6 {
            return None;
        }
        let t = (height - self.origin.y) / self.direction.y;
        (t >= 0.0).then(|| self.at(t))
    }
}

/// Device-pixel position to normalized device coordinates.
pub fn pixel_to_ndc(pixel: Vec2, viewport: Vec2) -> Vec2 {
    Vec2::new(
        (pixel.x / viewport.x) * 2.0 - 1.0,
        1.0 - (pixel.y / viewport.y) * 2.0,
    )
}

/// Orbit camera looking at a fixed target.
///
/// Pan and zoom are not exposed; the user can only drag to orbit, and the
/// camera drifts around the target on its own while auto-rotate is on.
#[derive(Debug, Clone)]
pub struct OrbitCamera {
    /// Horizontal rotation angle in radians.
    pub yaw: f32,
    /// Vertical rotation angle in radians.
    pub pitch: f32,
    /// Distance from the target point.
    pub distance: f32,
    /// Point the camera orbits around.
    pub target: Vec3,
    /// Vertical field of view in degrees.
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub aspect: f32,
    pub auto_rotate: bool,
    /// Auto-rotate speed; 1.0 is one revolution per minute.
    pub auto_rotate_speed: f32,
    /// Radians of orbit per pixel dragged.
    pub drag_sensitivity: f32,
}

impl OrbitCamera {
    /// Camera placed at `position` looking at the origin.
    pub fn looking_at_origin(position: Vec3) -> Self {
        let distance = position.length();
        Self {
            yaw: position.x.atan2(position.z),
            pitch: (position.y / distance).asin(),
            distance,
            target: Vec3::ZERO,
            fov_degrees: 38.0,
            near: 0.6,
            far: 200.0,
            aspect: 16.0 / 9.0,
            auto_rotate: true,
            auto_rotate_speed: 0.8,
            drag_sensitivity: 0.005,
        }
    }

    /// Calculate the camera's world position.
    pub fn position(&self) -> Vec3 {
        let x = self.distance * self.pitch.cos() * self.yaw.sin();
        let y = self.distance * self.pitch.sin();
        let z = self.distance * self.pitch.cos() * self.yaw.cos();
        self.target + Vec3::new(x, y, z)
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), self.target, Vec3::Y)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_degrees.to_radians(), self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    pub fn set_viewport(&mut self, width: f32, height: f32) {
        if width > 0.0 && height > 0.0 {
            self.aspect = width / height;
        }
    }

    /// Angular speed of auto-rotation in rad/s.
    pub fn auto_rotate_rate(&self) -> f32 {
        TAU / 60.0 * self.auto_rotate_speed
    }

    /// Advance auto-rotation.
    pub fn update(&mut self, dt: f32) {
        if self.auto_rotate {
            self.yaw = (self.yaw + self.auto_rotate_rate() * dt) % TAU;
        }
    }

    /// Orbit by a pointer drag of `delta` pixels.
    pub fn orbit(&mut self, delta: Vec2) {
        self.yaw -= delta.x * self.drag_sensitivity;
        let limit = FRAC_PI_2 - 0.01;
        self.pitch = (self.pitch + delta.y * self.drag_sensitivity).clamp(-limit, limit);
    }

    /// Ray through the pixel at `pixel` of a `viewport`-sized surface.
    pub fn ray_from_screen(&self, pixel: Vec2, viewport: Vec2) -> Option<Ray> {
        if viewport.x <= 0.0 || viewport.y <= 0.0 {
            return None;
        }
        let ndc = pixel_to_ndc(pixel, viewport);
        let inverse = self.view_projection().inverse();
        let near = inverse * ndc.extend(0.0).extend(1.0);
        let far = inverse * ndc.extend(1.0).extend(1.0);
        let near = near.xyz() / near.w;
        let far = far.xyz() / far.w;
        let direction = (far - near).try_normalize()?;
        Some(Ray {
            origin: near,
            direction,
        })
    }
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::looking_at_origin(Vec3::new(0.0, 6.0, 35.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_position() {
        let cam = OrbitCamera::default();
        let p = cam.position();
        assert!((p - Vec3::new(0.0, 6.0, 35.0)).length() < 1e-3, "{p:?}");
    }

    #[test]
    fn test_center_ray_hits_ground_in_front() {
        let cam = OrbitCamera::default();
        let ray = cam.ray_from_screen(Vec2::new(400.0, 300.0), Vec2::new(800.0, 600.0)).unwrap();
        let hit = ray.intersect_horizontal_plane(0.0).unwrap();
        // Looking down at the origin from +z.
        assert!(hit.y.abs() < 1e-3);
        assert!(hit.length() < 0.1, "{hit:?}");
    }

    #[test]
    fn test_ray_above_horizon_misses() {
        let cam = OrbitCamera::default();
        let ray = cam.ray_from_screen(Vec2::new(400.0, 0.0), Vec2::new(800.0, 600.0)).unwrap();
        assert!(ray.intersect_horizontal_plane(0.0).is_none());
    }

    #[test]
    fn test_parallel_ray_misses() {
        let ray = Ray {
            origin: Vec3::new(0.0, 1.0, 0.0),
            direction: Vec3::X,
        };
        assert!(ray.intersect_horizontal_plane(0.0).is_none());
    }

    #[test]
    fn test_pixel_to_ndc() {
        let v = Vec2::new(200.0, 100.0);
        assert_eq!(pixel_to_ndc(Vec2::ZERO, v), Vec2::new(-1.0, 1.0));
        assert_eq!(pixel_to_ndc(v, v), Vec2::new(1.0, -1.0));
    }

    #[test]
    fn test_auto_rotate_rate() {
        let mut cam = OrbitCamera::default();
        let yaw = cam.yaw;
        cam.update(1.0);
        assert!((cam.yaw - yaw - TAU / 60.0 * 0.8).abs() < 1e-5);

        cam.auto_rotate = false;
        let yaw = cam.yaw;
        cam.update(1.0);
        assert_eq!(cam.yaw, yaw);
    }

    #[test]
    fn test_orbit_clamps_pitch() {
        let mut cam = OrbitCamera::default();
        cam.orbit(Vec2::new(0.0, 1.0e6));
        assert!(cam.pitch < FRAC_PI_2);
    }
}
