//! Position, rotation, scale and origin of a 2D drawable
//!
//! The combined matrix and its inverse are cached separately and rebuilt on
//! the first query after a change.

use std::cell::Cell;

use crate::foundation::math::{utils, Mat4, Mat4Ext, Vec2, Vec3};

/// Decomposed 2D transform with lazily cached matrices
#[derive(Debug, Clone)]
pub struct Transformable {
    position: Vec2,
    rotation: f32,
    scale: Vec2,
    origin: Vec2,
    transform: Cell<Option<Mat4>>,
    inverse: Cell<Option<Mat4>>,
}

impl Default for Transformable {
    fn default() -> Self {
        Self {
            position: Vec2::zeros(),
            rotation: 0.0,
            scale: Vec2::new(1.0, 1.0),
            origin: Vec2::zeros(),
            transform: Cell::new(None),
            inverse: Cell::new(None),
        }
    }
}

impl Transformable {
    /// Identity transform
    pub fn new() -> Self {
        Self::default()
    }

    /// Position of the origin in parent space
    pub const fn position(&self) -> Vec2 {
        self.position
    }

    /// Move the origin to `position`
    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
        self.invalidate();
    }

    /// Offset the position
    pub fn move_by(&mut self, offset: Vec2) {
        self.set_position(self.position + offset);
    }

    /// Rotation in degrees, in `[0, 360)`
    pub const fn rotation(&self) -> f32 {
        self.rotation
    }

    /// Set the rotation in degrees; clockwise on a y-down screen
    pub fn set_rotation(&mut self, degrees: f32) {
        self.rotation = degrees.rem_euclid(360.0);
        self.invalidate();
    }

    /// Add to the rotation
    pub fn rotate(&mut self, degrees: f32) {
        self.set_rotation(self.rotation + degrees);
    }

    /// Scale factors
    pub const fn scale(&self) -> Vec2 {
        self.scale
    }

    /// Set the scale factors
    pub fn set_scale(&mut self, scale: Vec2) {
        self.scale = scale;
        self.invalidate();
    }

    /// Multiply the scale factors
    pub fn scale_by(&mut self, factors: Vec2) {
        self.set_scale(self.scale.component_mul(&factors));
    }

    /// Local point that position, rotation and scale are relative to
    pub const fn origin(&self) -> Vec2 {
        self.origin
    }

    /// Set the local origin
    pub fn set_origin(&mut self, origin: Vec2) {
        self.origin = origin;
        self.invalidate();
    }

    /// Local-to-parent matrix
    pub fn transform(&self) -> Mat4 {
        if let Some(matrix) = self.transform.get() {
            return matrix;
        }
        let matrix = Mat4::new_translation(&Vec3::new(self.position.x, self.position.y, 0.0))
            * Mat4::rotation_z(utils::deg_to_rad(self.rotation))
            * Mat4::new_nonuniform_scaling(&Vec3::new(self.scale.x, self.scale.y, 1.0))
            * Mat4::new_translation(&Vec3::new(-self.origin.x, -self.origin.y, 0.0));
        self.transform.set(Some(matrix));
        matrix
    }

    /// Parent-to-local matrix; identity when the scale is zero
    pub fn inverse_transform(&self) -> Mat4 {
        if let Some(matrix) = self.inverse.get() {
            return matrix;
        }
        let matrix = self.transform().try_inverse().unwrap_or_else(Mat4::identity);
        self.inverse.set(Some(matrix));
        matrix
    }

    fn invalidate(&mut self) {
        self.transform.set(None);
        self.inverse.set(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::transform_point_2d;
    use approx::assert_relative_eq;

    #[test]
    fn test_origin_then_scale_then_rotation_then_position() {
        let mut t = Transformable::new();
        t.set_origin(Vec2::new(5.0, 5.0));
        t.set_scale(Vec2::new(2.0, 2.0));
        t.set_rotation(90.0);
        t.set_position(Vec2::new(100.0, 50.0));

        let p = transform_point_2d(&t.transform(), Vec2::new(10.0, 5.0));
        assert_relative_eq!(p.x, 100.0, epsilon = 1e-4);
        assert_relative_eq!(p.y, 60.0, epsilon = 1e-4);
    }

    #[test]
    fn test_inverse_undoes_transform() {
        let mut t = Transformable::new();
        t.set_position(Vec2::new(3.0, -7.0));
        t.set_rotation(33.0);
        t.set_scale(Vec2::new(1.5, 0.5));

        let local = Vec2::new(4.0, 2.0);
        let world = transform_point_2d(&t.transform(), local);
        let back = transform_point_2d(&t.inverse_transform(), world);
        assert_relative_eq!(back.x, local.x, epsilon = 1e-4);
        assert_relative_eq!(back.y, local.y, epsilon = 1e-4);
    }

    #[test]
    fn test_rotation_wraps() {
        let mut t = Transformable::new();
        t.set_rotation(-90.0);
        assert_relative_eq!(t.rotation(), 270.0);
        t.rotate(100.0);
        assert_relative_eq!(t.rotation(), 10.0, epsilon = 1e-4);
    }

    #[test]
    fn test_cache_invalidated_by_setters() {
        let mut t = Transformable::new();
        assert_eq!(t.transform(), Mat4::identity());
        t.move_by(Vec2::new(1.0, 2.0));
        assert_relative_eq!(t.transform()[(0, 3)], 1.0);
        assert_relative_eq!(t.transform()[(1, 3)], 2.0);
    }
}
