//! Orthographic 2D camera

use super::{Camera, ProjectionCache, RenderTarget};
use crate::foundation::math::{transform_point_2d, utils, Mat4, Mat4Ext, UVec2, Vec2, Vec3};

/// Orthographic camera for screen-space and 2D world rendering
///
/// One world unit covers `zoom` framebuffer pixels and the y axis points
/// down. With the center at the middle of the framebuffer and a zoom of 1,
/// world coordinates equal pixel coordinates with the origin at the top-left.
#[derive(Debug, Clone)]
pub struct Camera2D {
    center: Vec2,
    rotation: f32,
    zoom: f32,
    near: f32,
    far: f32,
    cache: ProjectionCache,
}

impl Camera2D {
    /// Camera looking at `center` with zoom 1
    pub fn new(center: Vec2) -> Self {
        Self {
            center,
            rotation: 0.0,
            zoom: 1.0,
            near: -1.0,
            far: 1.0,
            cache: ProjectionCache::default(),
        }
    }

    /// Camera mapping world units to pixels of a `size` framebuffer, origin top-left
    pub fn for_framebuffer(size: UVec2) -> Self {
        Self::new(Vec2::new(size.x as f32 * 0.5, size.y as f32 * 0.5))
    }

    /// World point shown at the middle of the framebuffer
    pub const fn center(&self) -> Vec2 {
        self.center
    }

    /// Look at another world point
    pub fn set_center(&mut self, center: Vec2) {
        self.center = center;
    }

    /// Pan by a world-space offset
    pub fn move_by(&mut self, offset: Vec2) {
        self.center += offset;
    }

    /// View rotation in degrees
    pub const fn rotation(&self) -> f32 {
        self.rotation
    }

    /// Rotate the view; the world appears rotated the other way
    pub fn set_rotation(&mut self, degrees: f32) {
        self.rotation = degrees.rem_euclid(360.0);
    }

    /// Pixels per world unit
    pub const fn zoom(&self) -> f32 {
        self.zoom
    }

    /// Set pixels per world unit; non-positive values are ignored
    pub fn set_zoom(&mut self, zoom: f32) {
        if zoom <= 0.0 {
            log::warn!("Ignoring non-positive camera zoom {zoom}");
            return;
        }
        if (self.zoom - zoom).abs() > f32::EPSILON {
            self.zoom = zoom;
            self.cache.invalidate();
        }
    }

    /// Near and far depth range
    pub const fn clip_planes(&self) -> (f32, f32) {
        (self.near, self.far)
    }

    /// Change the depth range
    pub fn set_clip_planes(&mut self, near: f32, far: f32) {
        debug_assert!(far > near, "far plane must lie beyond the near plane");
        self.near = near;
        self.far = far;
        self.cache.invalidate();
    }

    /// Whether the next projection query for `target` recomputes
    pub fn is_projection_stale(&self, target: &dyn RenderTarget) -> bool {
        self.cache.is_stale_for(target.framebuffer_size())
    }

    /// World point under a framebuffer pixel
    pub fn screen_to_world(&mut self, screen: Vec2, target: &dyn RenderTarget) -> Vec2 {
        let size = target.framebuffer_size();
        if size.x == 0 || size.y == 0 {
            return self.center;
        }
        let ndc = Vec2::new(
            2.0 * screen.x / size.x as f32 - 1.0,
            1.0 - 2.0 * screen.y / size.y as f32,
        );
        let inverse_view = self.view_matrix().try_inverse().unwrap_or_else(Mat4::identity);
        let inverse = inverse_view * self.inverse_projection_matrix(target);
        transform_point_2d(&inverse, ndc)
    }

    /// Framebuffer pixel showing a world point
    pub fn world_to_screen(&mut self, world: Vec2, target: &dyn RenderTarget) -> Vec2 {
        let size = target.framebuffer_size();
        let ndc = transform_point_2d(&self.view_projection_matrix(target), world);
        Vec2::new(
            (ndc.x + 1.0) * 0.5 * size.x as f32,
            (1.0 - ndc.y) * 0.5 * size.y as f32,
        )
    }

    fn compute_projection(zoom: f32, near: f32, far: f32, size: UVec2) -> Mat4 {
        let half_width = size.x as f32 * 0.5 / zoom;
        let half_height = size.y as f32 * 0.5 / zoom;
        // bottom > top flips y so it grows downwards
        Mat4::orthographic(-half_width, half_width, half_height, -half_height, near, far)
    }
}

impl Default for Camera2D {
    fn default() -> Self {
        Self::new(Vec2::zeros())
    }
}

impl Camera for Camera2D {
    fn view_matrix(&self) -> Mat4 {
        Mat4::rotation_z(-utils::deg_to_rad(self.rotation))
            * Mat4::new_translation(&Vec3::new(-self.center.x, -self.center.y, 0.0))
    }

    fn projection_matrix(&mut self, target: &dyn RenderTarget) -> Mat4 {
        let (zoom, near, far) = (self.zoom, self.near, self.far);
        self.cache
            .projection(target.framebuffer_size(), |size| Self::compute_projection(zoom, near, far, size))
    }

    fn inverse_projection_matrix(&mut self, target: &dyn RenderTarget) -> Mat4 {
        let (zoom, near, far) = (self.zoom, self.near, self.far);
        self.cache
            .inverse(target.framebuffer_size(), |size| Self::compute_projection(zoom, near, far, size))
    }

    fn projection_recompute_count(&self) -> usize {
        self.cache.recomputes()
    }

    fn inverse_recompute_count(&self) -> usize {
        self.cache.inverse_recomputes()
    }
}
