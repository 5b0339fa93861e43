use glam::{Mat3, Mat4, Vec3};

/// View-projection parameters, recomputed by the caller every frame.
///
/// `fov` is the vertical field of view in degrees. A `fov` of zero selects an
/// orthographic projection whose vertical half-extent is `size`.
/// Depth maps to `0..1` (wgpu clip space).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub size: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            eye: Vec3::new(0.0, 0.0, 1.0),
            target: Vec3::ZERO,
            up: Vec3::Z,
            fov: 60.0,
            aspect: 1.0,
            near: 0.1,
            far: 1000.0,
            size: 1.0,
        }
    }
}

impl Camera {
    pub fn new(eye: impl Into<Vec3>, target: impl Into<Vec3>) -> Self {
        Self {
            eye: eye.into(),
            target: target.into(),
            ..Self::default()
        }
    }

    pub fn up(mut self, up: impl Into<Vec3>) -> Self {
        self.up = up.into();
        self
    }

    pub fn fov(mut self, degrees: f32) -> Self {
        self.fov = degrees;
        self
    }

    pub fn aspect(mut self, aspect: f32) -> Self {
        self.aspect = aspect;
        self
    }

    pub fn clip(mut self, near: f32, far: f32) -> Self {
        self.near = near;
        self.far = far;
        self
    }

    /// Switches to an orthographic projection with vertical half-extent `size`.
    pub fn orthographic(mut self, size: f32) -> Self {
        self.fov = 0.0;
        self.size = size;
        self
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    pub fn projection(&self) -> Mat4 {
        if self.fov > 0.0 {
            Mat4::perspective_rh(self.fov.to_radians(), self.aspect, self.near, self.far)
        } else {
            let w = self.size * self.aspect;
            Mat4::orthographic_rh(-w, w, -self.size, self.size, self.near, self.far)
        }
    }

    pub fn matrix(&self) -> Mat4 {
        self.projection() * self.view()
    }

    /// Maps `(ndc.x, ndc.y, 1)` to the world-space direction of the view ray
    /// through that point. Perspective cameras only.
    pub fn ray_basis(&self) -> Mat3 {
        let half = (self.fov.to_radians() * 0.5).tan();
        let to_world = Mat3::from_mat4(self.view()).transpose();
        to_world * Mat3::from_diagonal(Vec3::new(half * self.aspect, half, -1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    fn ndc(m: Mat4, p: Vec3) -> Vec3 {
        let clip = m * Vec4::new(p.x, p.y, p.z, 1.0);
        clip.truncate() / clip.w
    }

    #[test]
    fn target_projects_to_screen_center() {
        let cam = Camera::new([4.0, 3.0, 2.0], [0.0, 0.0, 0.5]).aspect(16.0 / 9.0);
        let p = ndc(cam.matrix(), cam.target);
        assert!(p.x.abs() < 1e-5 && p.y.abs() < 1e-5);
        assert!(p.z > 0.0 && p.z < 1.0);
    }

    #[test]
    fn up_vector_points_up_on_screen() {
        let cam = Camera::new([5.0, 0.0, 0.0], [0.0, 0.0, 0.0]);
        let p = ndc(cam.matrix(), Vec3::new(0.0, 0.0, 1.0));
        assert!(p.y > 0.0);
        assert!(p.x.abs() < 1e-5);
    }

    #[test]
    fn near_and_far_planes_map_to_depth_range() {
        let cam = Camera::new([0.0, -10.0, 0.0], [0.0, 0.0, 0.0]).clip(1.0, 100.0);
        let near = ndc(cam.matrix(), Vec3::new(0.0, -9.0, 0.0));
        let far = ndc(cam.matrix(), Vec3::new(0.0, 90.0, 0.0));
        assert!(near.z.abs() < 1e-4);
        assert!((far.z - 1.0).abs() < 1e-4);
    }

    #[test]
    fn ray_basis_inverts_the_projection() {
        let cam = Camera::new([3.0, -4.0, 2.0], [0.5, 0.0, 0.0])
            .fov(45.0)
            .aspect(1.5);
        let basis = cam.ray_basis();

        let center = basis * Vec3::Z;
        let forward = (cam.target - cam.eye).normalize();
        assert!(center.normalize().dot(forward) > 0.99999);

        let corner = cam.eye + basis * Vec3::new(0.5, -0.25, 1.0) * 3.0;
        let p = ndc(cam.matrix(), corner);
        assert!((p.x - 0.5).abs() < 1e-4 && (p.y + 0.25).abs() < 1e-4);
    }

    #[test]
    fn orthographic_size_is_the_half_height() {
        let cam = Camera::new([0.0, 0.0, 10.0], [0.0, 0.0, 0.0])
            .up([0.0, 1.0, 0.0])
            .aspect(2.0)
            .orthographic(4.0);
        let top = ndc(cam.matrix(), Vec3::new(0.0, 4.0, 0.0));
        let right = ndc(cam.matrix(), Vec3::new(8.0, 0.0, 0.0));
        assert!((top.y - 1.0).abs() < 1e-5);
        assert!((right.x - 1.0).abs() < 1e-5);
    }
}
