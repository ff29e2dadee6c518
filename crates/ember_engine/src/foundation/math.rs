//! Math utilities and types
//!
//! Provides fundamental math types for 2D and 3D rendering. All matrices
//! follow the OpenGL conventions: column vectors, right-handed view space,
//! clip-space depth in [-1, 1].

use serde::{Deserialize, Serialize};

pub use nalgebra::{Matrix3, Matrix4, Vector2, Vector3, Vector4};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 2D unsigned vector type (pixel sizes)
pub type UVec2 = Vector2<u32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// 2 * Pi
    pub const TAU: f32 = 2.0 * PI;

    /// Pi / 2
    pub const HALF_PI: f32 = PI * 0.5;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = PI / 180.0;

    /// Radians to degrees conversion factor
    pub const RAD_TO_DEG: f32 = 180.0 / PI;
}

/// Math utility functions
pub mod utils {
    use super::constants;

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }

    /// Convert radians to degrees
    pub fn rad_to_deg(radians: f32) -> f32 {
        radians * constants::RAD_TO_DEG
    }

    /// Linear interpolation
    pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
        a + (b - a) * t
    }
}

/// Extension trait for Mat4 with the projection helpers the cameras need
pub trait Mat4Ext {
    /// Create a rotation matrix around the Z axis (radians)
    fn rotation_z(angle: f32) -> Mat4;

    /// Create an OpenGL perspective projection matrix
    ///
    /// `fov_y` is the vertical field of view in radians.
    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4;

    /// Create an OpenGL orthographic projection matrix
    fn orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4;

    /// Create a right-handed look-at view matrix
    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4;
}

impl Mat4Ext for Mat4 {
    fn rotation_z(angle: f32) -> Mat4 {
        Mat4::from_axis_angle(&Vec3::z_axis(), angle)
    }

    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        let tan_half_fovy = (fov_y * 0.5).tan();

        let mut result = Mat4::zeros();
        result[(0, 0)] = 1.0 / (aspect * tan_half_fovy);
        result[(1, 1)] = 1.0 / tan_half_fovy;
        result[(2, 2)] = -(far + near) / (far - near);
        result[(2, 3)] = -(2.0 * far * near) / (far - near);
        result[(3, 2)] = -1.0;
        result
    }

    fn orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4 {
        let mut result = Mat4::identity();
        result[(0, 0)] = 2.0 / (right - left);
        result[(1, 1)] = 2.0 / (top - bottom);
        result[(2, 2)] = -2.0 / (far - near);
        result[(0, 3)] = -(right + left) / (right - left);
        result[(1, 3)] = -(top + bottom) / (top - bottom);
        result[(2, 3)] = -(far + near) / (far - near);
        result
    }

    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
        Mat4::look_at_rh(&Point3::from(eye), &Point3::from(target), &up)
    }
}

/// RGBA color with 8 bits per channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    /// Red channel
    pub r: u8,
    /// Green channel
    pub g: u8,
    /// Blue channel
    pub b: u8,
    /// Alpha channel
    pub a: u8,
}

impl Color {
    /// Opaque white
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    /// Opaque black
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    /// Opaque red
    pub const RED: Self = Self::rgb(255, 0, 0);
    /// Opaque green
    pub const GREEN: Self = Self::rgb(0, 255, 0);
    /// Opaque blue
    pub const BLUE: Self = Self::rgb(0, 0, 255);
    /// Fully transparent black
    pub const TRANSPARENT: Self = Self::rgba(0, 0, 0, 0);

    /// Create an opaque color
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Create a color with explicit alpha
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Channels as an array, in vertex attribute order
    pub const fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Channels normalized to 0.0-1.0
    pub fn to_f32_array(self) -> [f32; 4] {
        [
            f32::from(self.r) / 255.0,
            f32::from(self.g) / 255.0,
            f32::from(self.b) / 255.0,
            f32::from(self.a) / 255.0,
        ]
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

/// Axis-aligned rectangle given by its top-left corner and size
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect<T> {
    /// Left coordinate
    pub left: T,
    /// Top coordinate
    pub top: T,
    /// Width
    pub width: T,
    /// Height
    pub height: T,
}

/// Rectangle in floating point units
pub type FloatRect = Rect<f32>;

/// Rectangle in integer (pixel) units
pub type IntRect = Rect<i32>;

impl<T> Rect<T> {
    /// Create a rectangle from position and size
    pub const fn new(left: T, top: T, width: T, height: T) -> Self {
        Self { left, top, width, height }
    }
}

impl FloatRect {
    /// Whether the point lies inside the rectangle (right/bottom edges exclusive)
    pub fn contains(&self, point: Vec2) -> bool {
        let (min_x, max_x) = if self.width >= 0.0 {
            (self.left, self.left + self.width)
        } else {
            (self.left + self.width, self.left)
        };
        let (min_y, max_y) = if self.height >= 0.0 {
            (self.top, self.top + self.height)
        } else {
            (self.top + self.height, self.top)
        };
        point.x >= min_x && point.x < max_x && point.y >= min_y && point.y < max_y
    }

    /// Smallest rectangle containing every point, or an empty rectangle at the origin
    pub fn from_points(points: impl IntoIterator<Item = Vec2>) -> Self {
        let mut iter = points.into_iter();
        let Some(first) = iter.next() else {
            return Self::default();
        };
        let (mut min, mut max) = (first, first);
        for p in iter {
            min = min.inf(&p);
            max = max.sup(&p);
        }
        Self::new(min.x, min.y, max.x - min.x, max.y - min.y)
    }

    /// Bounding rectangle of this rectangle after an affine transform
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        let corners = [
            Vec2::new(self.left, self.top),
            Vec2::new(self.left + self.width, self.top),
            Vec2::new(self.left, self.top + self.height),
            Vec2::new(self.left + self.width, self.top + self.height),
        ];
        Self::from_points(corners.iter().map(|c| transform_point_2d(matrix, *c)))
    }
}

impl From<IntRect> for FloatRect {
    fn from(rect: IntRect) -> Self {
        Self::new(rect.left as f32, rect.top as f32, rect.width as f32, rect.height as f32)
    }
}

/// Apply a 4x4 transform to a 2D point lying on the z = 0 plane
pub fn transform_point_2d(matrix: &Mat4, point: Vec2) -> Vec2 {
    let p = matrix * Vec4::new(point.x, point.y, 0.0, 1.0);
    Vec2::new(p.x, p.y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_perspective_maps_near_plane_to_minus_one() {
        let proj = Mat4::perspective(utils::deg_to_rad(60.0), 4.0 / 3.0, 0.1, 100.0);
        let clip = proj * Vec4::new(0.0, 0.0, -0.1, 1.0);
        assert_relative_eq!(clip.z / clip.w, -1.0, epsilon = 1e-5);

        let clip_far = proj * Vec4::new(0.0, 0.0, -100.0, 1.0);
        assert_relative_eq!(clip_far.z / clip_far.w, 1.0, epsilon = 1e-4);
    }

    #[test]
    fn test_orthographic_maps_corners() {
        let proj = Mat4::orthographic(0.0, 800.0, 600.0, 0.0, -1.0, 1.0);
        let top_left = proj * Vec4::new(0.0, 0.0, 0.0, 1.0);
        let bottom_right = proj * Vec4::new(800.0, 600.0, 0.0, 1.0);
        assert_relative_eq!(top_left.x, -1.0);
        assert_relative_eq!(top_left.y, 1.0);
        assert_relative_eq!(bottom_right.x, 1.0);
        assert_relative_eq!(bottom_right.y, -1.0);
    }

    #[test]
    fn test_rect_from_points_and_contains() {
        let rect = FloatRect::from_points([
            Vec2::new(2.0, 3.0),
            Vec2::new(-1.0, 5.0),
            Vec2::new(4.0, -2.0),
        ]);
        assert_eq!(rect, FloatRect::new(-1.0, -2.0, 5.0, 7.0));
        assert!(rect.contains(Vec2::new(0.0, 0.0)));
        assert!(!rect.contains(Vec2::new(4.0, 0.0)));
        assert_eq!(FloatRect::from_points(std::iter::empty()), FloatRect::default());
    }

    #[test]
    fn test_color_normalization() {
        let c = Color::rgba(255, 0, 51, 0);
        assert_eq!(c.to_array(), [255, 0, 51, 0]);
        let f = c.to_f32_array();
        assert_relative_eq!(f[0], 1.0);
        assert_relative_eq!(f[2], 0.2);
    }
}
