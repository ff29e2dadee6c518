//! # Camera System
//!
//! Cameras own view and projection parameters and cache the projection
//! matrix and its inverse. The render target is passed to every query, and
//! the camera compares its framebuffer size with the size it saw last time.
//!
//! ## Cache states
//!
//! - The projection is recomputed when a clip plane, the field of view or
//!   zoom, or the target's framebuffer size changed since the last query
//! - Recomputing the projection only marks the inverse stale; the inverse is
//!   rebuilt by the first inverse query that follows
//!
//! Repeated queries with nothing changed return the cached matrices.
//!
//! ## Variants
//!
//! - [`Camera2D`]: orthographic, y axis down, driven by zoom and framebuffer size
//! - [`Camera3D`]: perspective look-at camera driven by field of view
//! - [`CameraFps`]: [`Camera3D`] steered by yaw and pitch

mod camera2d;
mod camera3d;
mod camera_fps;

pub use camera2d::Camera2D;
pub use camera3d::Camera3D;
pub use camera_fps::CameraFps;

use crate::foundation::math::{Mat4, UVec2};

/// Anything with a framebuffer the engine can draw into
pub trait RenderTarget {
    /// Current framebuffer size in pixels
    fn framebuffer_size(&self) -> UVec2;
}

/// Render target of a fixed size, for off-screen rendering and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffscreenTarget {
    /// Framebuffer size in pixels
    pub size: UVec2,
}

impl OffscreenTarget {
    /// Target of the given size
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: UVec2::new(width, height),
        }
    }
}

impl RenderTarget for OffscreenTarget {
    fn framebuffer_size(&self) -> UVec2 {
        self.size
    }
}

/// View and projection provider
///
/// Queries take `&mut self` because they may refresh the caches.
pub trait Camera {
    /// World-to-view matrix
    fn view_matrix(&self) -> Mat4;

    /// View-to-clip matrix for `target`
    fn projection_matrix(&mut self, target: &dyn RenderTarget) -> Mat4;

    /// Inverse of [`Camera::projection_matrix`]
    fn inverse_projection_matrix(&mut self, target: &dyn RenderTarget) -> Mat4;

    /// Number of projection recomputations so far
    fn projection_recompute_count(&self) -> usize;

    /// Number of inverse recomputations so far
    fn inverse_recompute_count(&self) -> usize;

    /// Combined world-to-clip matrix
    fn view_projection_matrix(&mut self, target: &dyn RenderTarget) -> Mat4 {
        self.projection_matrix(target) * self.view_matrix()
    }
}

/// Lazily recomputed projection and inverse projection
#[derive(Debug, Clone)]
pub(crate) struct ProjectionCache {
    projection: Mat4,
    inverse: Mat4,
    framebuffer: UVec2,
    projection_dirty: bool,
    inverse_dirty: bool,
    recomputes: usize,
    inverse_recomputes: usize,
}

impl Default for ProjectionCache {
    fn default() -> Self {
        Self {
            projection: Mat4::identity(),
            inverse: Mat4::identity(),
            framebuffer: UVec2::zeros(),
            projection_dirty: true,
            inverse_dirty: true,
            recomputes: 0,
            inverse_recomputes: 0,
        }
    }
}

impl ProjectionCache {
    /// A projection parameter changed
    pub(crate) fn invalidate(&mut self) {
        self.projection_dirty = true;
    }

    /// Whether the next query for `size` recomputes
    pub(crate) fn is_stale_for(&self, size: UVec2) -> bool {
        self.projection_dirty || size != self.framebuffer
    }

    pub(crate) fn projection(&mut self, size: UVec2, compute: impl FnOnce(UVec2) -> Mat4) -> Mat4 {
        if size != self.framebuffer {
            self.framebuffer = size;
            self.projection_dirty = true;
        }
        if self.projection_dirty {
            self.projection = compute(size);
            self.projection_dirty = false;
            self.inverse_dirty = true;
            self.recomputes += 1;
        }
        self.projection
    }

    pub(crate) fn inverse(&mut self, size: UVec2, compute: impl FnOnce(UVec2) -> Mat4) -> Mat4 {
        let projection = self.projection(size, compute);
        if self.inverse_dirty {
            self.inverse = projection.try_inverse().unwrap_or_else(|| {
                log::warn!("Projection matrix is singular, using identity as its inverse");
                Mat4::identity()
            });
            self.inverse_dirty = false;
            self.inverse_recomputes += 1;
        }
        self.inverse
    }

    pub(crate) const fn recomputes(&self) -> usize {
        self.recomputes
    }

    pub(crate) const fn inverse_recomputes(&self) -> usize {
        self.inverse_recomputes
    }
}

/// Width over height, 1 for a degenerate framebuffer
pub(crate) fn aspect_ratio(size: UVec2) -> f32 {
    if size.y == 0 {
        1.0
    } else {
        (size.x as f32 * 0.5) / (size.y as f32 * 0.5)
    }
}
