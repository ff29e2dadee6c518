//! # Shape Generators
//!
//! Shapes are described by a [`GeometryProvider`]: a point count and a
//! point-at-index function in local coordinates (y axis down). [`ShapeKind`]
//! is the tagged set of built-in generators; [`Shape`] turns any of them into
//! renderable geometry.
//!
//! ## Point order
//!
//! - Ellipse: clockwise on screen starting at the topmost point
//! - Rounded rectangle: four corner arcs, each sweeping a quarter turn,
//!   starting with the corner at (width, 0)
//! - Convex polygon: the caller's order

mod shape;

pub use shape::Shape;

use crate::foundation::math::{constants, Vec2};

/// Point source of a 2D outline
pub trait GeometryProvider {
    /// Number of outline points
    fn point_count(&self) -> usize;

    /// Outline point in local coordinates
    ///
    /// Out-of-range indices are a caller error and yield the origin.
    fn point(&self, index: usize) -> Vec2;

    /// All outline points in order
    fn points(&self) -> Vec<Vec2> {
        (0..self.point_count()).map(|i| self.point(i)).collect()
    }
}

/// Built-in outline generators
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeKind {
    /// Ellipse inscribed in the box `(0, 0)..(2 * radius)`
    Ellipse {
        /// Horizontal and vertical radius
        radius: Vec2,
        /// Number of outline points
        point_count: usize,
    },
    /// Axis-aligned rectangle from the origin
    Rectangle {
        /// Width and height
        size: Vec2,
    },
    /// Rectangle with circular corner arcs
    RoundedRect {
        /// Width and height
        size: Vec2,
        /// Arc radius, at most half the smaller side
        corner_radius: f32,
        /// Points per corner arc
        corner_point_count: usize,
    },
    /// Caller-supplied convex outline
    Convex {
        /// Outline points
        points: Vec<Vec2>,
    },
}

impl ShapeKind {
    /// Circle of `radius` approximated by `point_count` points
    pub fn circle(radius: f32, point_count: usize) -> Self {
        Self::Ellipse {
            radius: Vec2::new(radius, radius),
            point_count,
        }
    }
}

impl GeometryProvider for ShapeKind {
    fn point_count(&self) -> usize {
        match self {
            Self::Ellipse { point_count, .. } => *point_count,
            Self::Rectangle { .. } => 4,
            Self::RoundedRect { corner_point_count, .. } => corner_point_count * 4,
            Self::Convex { points } => points.len(),
        }
    }

    fn point(&self, index: usize) -> Vec2 {
        if index >= self.point_count() {
            log::warn!("Shape point index {index} out of range ({} points)", self.point_count());
            return Vec2::zeros();
        }
        match self {
            Self::Ellipse { radius, point_count } => ellipse_point(*radius, *point_count, index),
            Self::Rectangle { size } => rectangle_point(*size, index),
            Self::RoundedRect {
                size,
                corner_radius,
                corner_point_count,
            } => rounded_rect_point(*size, *corner_radius, *corner_point_count, index),
            Self::Convex { points } => points[index],
        }
    }
}

/// Point `index` of an ellipse with `point_count` points
///
/// `θ = index * 2π / point_count - π/2` around the center `radius`, so
/// index 0 is the topmost point.
pub fn ellipse_point(radius: Vec2, point_count: usize, index: usize) -> Vec2 {
    let angle = index as f32 * constants::TAU / point_count as f32 - constants::HALF_PI;
    Vec2::new(radius.x + angle.cos() * radius.x, radius.y + angle.sin() * radius.y)
}

/// Corner `index` of a rectangle, clockwise from the origin
pub fn rectangle_point(size: Vec2, index: usize) -> Vec2 {
    match index {
        0 => Vec2::zeros(),
        1 => Vec2::new(size.x, 0.0),
        2 => size,
        _ => Vec2::new(0.0, size.y),
    }
}

/// Point `index` of a rounded rectangle
///
/// Corner arcs are centered on the rectangle corners inset by the radius, in
/// the order (w - r, r), (r, r), (r, h - r), (w - r, h - r). Within a corner
/// the angle advances by 90 / (n - 1) degrees; a single point per corner
/// degenerates to the exact rectangle corner.
pub fn rounded_rect_point(size: Vec2, corner_radius: f32, corner_point_count: usize, index: usize) -> Vec2 {
    if corner_point_count == 0 {
        return Vec2::zeros();
    }
    let corner = index / corner_point_count;
    if corner_point_count == 1 {
        return match corner {
            0 => Vec2::new(size.x, 0.0),
            1 => Vec2::zeros(),
            2 => Vec2::new(0.0, size.y),
            _ => size,
        };
    }
    let radius = corner_radius.clamp(0.0, size.x.min(size.y) * 0.5);
    let center = match corner {
        0 => Vec2::new(size.x - radius, radius),
        1 => Vec2::new(radius, radius),
        2 => Vec2::new(radius, size.y - radius),
        _ => Vec2::new(size.x - radius, size.y - radius),
    };
    let delta = 90.0 / (corner_point_count - 1) as f32;
    // Corner k sweeps k * 90 to (k + 1) * 90 degrees
    let angle = (delta * (index - corner) as f32).to_radians();
    Vec2::new(center.x + radius * angle.cos(), center.y - radius * angle.sin())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_ellipse_point_count_and_topmost_start() {
        for n in 3..40 {
            let ellipse = ShapeKind::Ellipse {
                radius: Vec2::new(30.0, 20.0),
                point_count: n,
            };
            let points = ellipse.points();
            assert_eq!(points.len(), n);
            let min_y = points.iter().map(|p| p.y).fold(f32::INFINITY, f32::min);
            assert_relative_eq!(points[0].y, min_y, epsilon = 1e-4);
            assert_relative_eq!(points[0].x, 30.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_rounded_rect_point_count() {
        for n in 1..12 {
            let shape = ShapeKind::RoundedRect {
                size: Vec2::new(100.0, 60.0),
                corner_radius: 10.0,
                corner_point_count: n,
            };
            assert_eq!(shape.points().len(), 4 * n);
        }
    }

    #[test]
    fn test_rounded_rect_single_point_is_exact_corner() {
        let shape = ShapeKind::RoundedRect {
            size: Vec2::new(100.0, 60.0),
            corner_radius: 10.0,
            corner_point_count: 1,
        };
        assert_eq!(
            shape.points(),
            vec![
                Vec2::new(100.0, 0.0),
                Vec2::new(0.0, 0.0),
                Vec2::new(0.0, 60.0),
                Vec2::new(100.0, 60.0),
            ]
        );
    }

    #[test]
    fn test_rounded_rect_arcs_stay_inside_and_touch_edges() {
        let size = Vec2::new(100.0, 60.0);
        let shape = ShapeKind::RoundedRect {
            size,
            corner_radius: 10.0,
            corner_point_count: 5,
        };
        let points = shape.points();
        for p in &points {
            assert!(p.x >= -1e-4 && p.x <= size.x + 1e-4);
            assert!(p.y >= -1e-4 && p.y <= size.y + 1e-4);
        }
        // First arc starts on the right edge and ends on the top edge
        assert_relative_eq!(points[0], Vec2::new(100.0, 10.0), epsilon = 1e-4);
        assert_relative_eq!(points[4], Vec2::new(90.0, 0.0), epsilon = 1e-4);
        // Second arc continues from the top edge to the left edge
        assert_relative_eq!(points[5], Vec2::new(10.0, 0.0), epsilon = 1e-4);
        assert_relative_eq!(points[9], Vec2::new(0.0, 10.0), epsilon = 1e-4);
    }

    #[test]
    fn test_out_of_range_point_is_origin() {
        let shape = ShapeKind::Rectangle { size: Vec2::new(5.0, 5.0) };
        assert_eq!(shape.point(9), Vec2::zeros());
    }
}
