//! Perspective 3D camera

use super::{aspect_ratio, Camera, ProjectionCache, RenderTarget};
use crate::foundation::math::{utils, Mat4, Mat4Ext, UVec2, Vec3};

/// Perspective camera looking from a position at a target point
///
/// The aspect ratio always comes from the render target, so resizing the
/// window is picked up by the next projection query.
#[derive(Debug, Clone)]
pub struct Camera3D {
    position: Vec3,
    target: Vec3,
    up: Vec3,
    fov: f32,
    near: f32,
    far: f32,
    cache: ProjectionCache,
}

impl Camera3D {
    /// Create a perspective camera
    ///
    /// # Arguments
    /// * `position` - Eye position in world space
    /// * `target` - Point to look at
    /// * `fov_degrees` - Vertical field of view
    /// * `near` - Near clip distance (must be > 0)
    /// * `far` - Far clip distance (must be > near)
    pub fn new(position: Vec3, target: Vec3, fov_degrees: f32, near: f32, far: f32) -> Self {
        debug_assert!(near > 0.0 && far > near, "invalid clip planes {near}..{far}");
        Self {
            position,
            target,
            up: Vec3::y(),
            fov: fov_degrees,
            near,
            far,
            cache: ProjectionCache::default(),
        }
    }

    /// Eye position
    pub const fn position(&self) -> Vec3 {
        self.position
    }

    /// Move the eye, keeping the target
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    /// Look-at point
    pub const fn target(&self) -> Vec3 {
        self.target
    }

    /// Change the look-at point
    pub fn set_target(&mut self, target: Vec3) {
        self.target = target;
    }

    /// Up vector
    pub const fn up(&self) -> Vec3 {
        self.up
    }

    /// Look at `target` with a custom up vector
    pub fn look_at(&mut self, target: Vec3, up: Vec3) {
        self.target = target;
        self.up = up;
    }

    /// Vertical field of view in degrees
    pub const fn fov(&self) -> f32 {
        self.fov
    }

    /// Change the vertical field of view
    pub fn set_fov(&mut self, fov_degrees: f32) {
        if (self.fov - fov_degrees).abs() > f32::EPSILON {
            log::trace!("Camera field of view changed: {:.1} -> {fov_degrees:.1}", self.fov);
            self.fov = fov_degrees;
            self.cache.invalidate();
        }
    }

    /// Near and far clip distances
    pub const fn clip_planes(&self) -> (f32, f32) {
        (self.near, self.far)
    }

    /// Change the clip distances
    pub fn set_clip_planes(&mut self, near: f32, far: f32) {
        debug_assert!(near > 0.0 && far > near, "invalid clip planes {near}..{far}");
        self.near = near;
        self.far = far;
        self.cache.invalidate();
    }

    /// Whether the next projection query for `target` recomputes
    pub fn is_projection_stale(&self, target: &dyn RenderTarget) -> bool {
        self.cache.is_stale_for(target.framebuffer_size())
    }

    fn compute_projection(fov: f32, near: f32, far: f32, size: UVec2) -> Mat4 {
        Mat4::perspective(utils::deg_to_rad(fov), aspect_ratio(size), near, far)
    }
}

impl Camera for Camera3D {
    fn view_matrix(&self) -> Mat4 {
        Mat4::look_at(self.position, self.target, self.up)
    }

    fn projection_matrix(&mut self, target: &dyn RenderTarget) -> Mat4 {
        let (fov, near, far) = (self.fov, self.near, self.far);
        self.cache
            .projection(target.framebuffer_size(), |size| Self::compute_projection(fov, near, far, size))
    }

    fn inverse_projection_matrix(&mut self, target: &dyn RenderTarget) -> Mat4 {
        let (fov, near, far) = (self.fov, self.near, self.far);
        self.cache
            .inverse(target.framebuffer_size(), |size| Self::compute_projection(fov, near, far, size))
    }

    fn projection_recompute_count(&self) -> usize {
        self.cache.recomputes()
    }

    fn inverse_recompute_count(&self) -> usize {
        self.cache.inverse_recomputes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::camera::OffscreenTarget;
    use approx::assert_relative_eq;

    fn camera() -> Camera3D {
        Camera3D::new(Vec3::new(0.0, 0.0, 5.0), Vec3::zeros(), 60.0, 0.1, 100.0)
    }

    #[test]
    fn test_projection_goes_stale_on_framebuffer_resize() {
        let mut camera = camera();
        let mut target = OffscreenTarget::new(800, 600);

        let first = camera.projection_matrix(&target);
        assert_relative_eq!(first[(0, 0)] * (800.0 / 600.0), first[(1, 1)], epsilon = 1e-5);
        for _ in 0..5 {
            assert_eq!(camera.projection_matrix(&target), first);
        }
        assert_eq!(camera.projection_recompute_count(), 1);
        assert!(!camera.is_projection_stale(&target));

        target.size = UVec2::new(1024, 768);
        assert!(camera.is_projection_stale(&target));
        camera.projection_matrix(&target);
        assert_eq!(camera.projection_recompute_count(), 2);

        camera.projection_matrix(&target);
        assert_eq!(camera.projection_recompute_count(), 2);
    }

    #[test]
    fn test_parameter_changes_invalidate() {
        let mut camera = camera();
        let target = OffscreenTarget::new(800, 600);
        camera.projection_matrix(&target);

        camera.set_fov(90.0);
        camera.projection_matrix(&target);
        camera.set_clip_planes(1.0, 50.0);
        camera.projection_matrix(&target);
        assert_eq!(camera.projection_recompute_count(), 3);

        // Moving the eye is a view change
        camera.set_position(Vec3::new(1.0, 2.0, 3.0));
        camera.projection_matrix(&target);
        assert_eq!(camera.projection_recompute_count(), 3);
    }

    #[test]
    fn test_inverse_computed_only_when_asked() {
        let mut camera = camera();
        let target = OffscreenTarget::new(800, 600);
        camera.projection_matrix(&target);
        camera.projection_matrix(&target);
        assert_eq!(camera.inverse_recompute_count(), 0);

        let inverse = camera.inverse_projection_matrix(&target);
        camera.inverse_projection_matrix(&target);
        assert_eq!(camera.inverse_recompute_count(), 1);

        let identity = camera.projection_matrix(&target) * inverse;
        assert_relative_eq!(identity, Mat4::identity(), epsilon = 1e-4);
    }

    #[test]
    fn test_view_looks_down_negative_z() {
        let camera = camera();
        let view = camera.view_matrix();
        let origin = view * crate::foundation::math::Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert_relative_eq!(origin.z, -5.0, epsilon = 1e-5);
    }
}
