//! Filled 2D shape built from a [`ShapeKind`]

use super::{GeometryProvider, ShapeKind};
use crate::foundation::math::{Color, FloatRect, IntRect, Vec2};
use crate::render::geometry::{RenderMesh, Vertex2D};
use crate::render::renderer::{Drawable, Renderer};
use crate::render::states::RenderStates;
use crate::render::texture::Texture;
use crate::render::transformable::Transformable;

/// Filled, optionally textured outline
///
/// The outline is triangulated as a fan around its centroid, which is exact
/// for convex outlines. Every setter that changes the outline rebuilds the
/// vertices right away and leaves the geometry stale until the next draw.
#[derive(Debug)]
pub struct Shape<'t> {
    kind: ShapeKind,
    fill_color: Color,
    texture: Option<&'t Texture>,
    texture_rect: IntRect,
    transformable: Transformable,
    mesh: RenderMesh<Vertex2D>,
    bounds: FloatRect,
}

impl<'t> Shape<'t> {
    /// Shape from any built-in generator
    pub fn new(kind: ShapeKind) -> Self {
        let mut shape = Self {
            kind,
            fill_color: Color::WHITE,
            texture: None,
            texture_rect: IntRect::default(),
            transformable: Transformable::new(),
            mesh: RenderMesh::default(),
            bounds: FloatRect::default(),
        };
        shape.update();
        shape
    }

    /// Ellipse with radii `radius`
    pub fn ellipse(radius: Vec2, point_count: usize) -> Self {
        Self::new(ShapeKind::Ellipse { radius, point_count })
    }

    /// Circle of `radius`
    pub fn circle(radius: f32, point_count: usize) -> Self {
        Self::new(ShapeKind::circle(radius, point_count))
    }

    /// Rectangle of `size`
    pub fn rectangle(size: Vec2) -> Self {
        Self::new(ShapeKind::Rectangle { size })
    }

    /// Rectangle with rounded corners
    pub fn rounded_rect(size: Vec2, corner_radius: f32, corner_point_count: usize) -> Self {
        Self::new(ShapeKind::RoundedRect {
            size,
            corner_radius,
            corner_point_count,
        })
    }

    /// Convex polygon through `points`
    pub fn convex(points: Vec<Vec2>) -> Self {
        Self::new(ShapeKind::Convex { points })
    }

    /// Outline generator
    pub const fn kind(&self) -> &ShapeKind {
        &self.kind
    }

    /// Replace the outline generator
    pub fn set_kind(&mut self, kind: ShapeKind) {
        self.kind = kind;
        self.update();
    }

    /// Change the number of outline points
    ///
    /// Ellipses get `count` points, rounded rectangles `count` points per
    /// corner, convex polygons are truncated or padded with the origin.
    pub fn set_point_count(&mut self, count: usize) {
        match &mut self.kind {
            ShapeKind::Ellipse { point_count, .. } => *point_count = count,
            ShapeKind::RoundedRect { corner_point_count, .. } => *corner_point_count = count,
            ShapeKind::Convex { points } => points.resize(count, Vec2::zeros()),
            ShapeKind::Rectangle { .. } => {
                log::warn!("A rectangle always has 4 points");
                return;
            }
        }
        self.update();
    }

    /// Append a point to a convex polygon
    ///
    /// Other shapes are logged and left unchanged.
    pub fn add_point(&mut self, point: Vec2) {
        let ShapeKind::Convex { points } = &mut self.kind else {
            log::warn!("Only convex shapes accept added points");
            return;
        };
        points.push(point);
        self.update();
    }

    /// Move one point of a convex polygon
    ///
    /// Out-of-range indices and non-polygon shapes are logged and ignored.
    pub fn set_point(&mut self, index: usize, point: Vec2) {
        let ShapeKind::Convex { points } = &mut self.kind else {
            log::warn!("Only convex shapes have settable points");
            return;
        };
        let Some(slot) = points.get_mut(index) else {
            log::warn!("Convex point index {index} out of range ({} points)", points.len());
            return;
        };
        *slot = point;
        self.update();
    }

    /// Change the radii of an ellipse
    pub fn set_radius(&mut self, new_radius: Vec2) {
        if let ShapeKind::Ellipse { radius, .. } = &mut self.kind {
            *radius = new_radius;
            self.update();
        } else {
            log::warn!("Only ellipses have a radius");
        }
    }

    /// Change the size of a rectangle or rounded rectangle
    pub fn set_size(&mut self, new_size: Vec2) {
        match &mut self.kind {
            ShapeKind::Rectangle { size } | ShapeKind::RoundedRect { size, .. } => *size = new_size,
            _ => {
                log::warn!("Only rectangles have a size");
                return;
            }
        }
        self.update();
    }

    /// Change the corner radius of a rounded rectangle
    pub fn set_corner_radius(&mut self, radius: f32) {
        if let ShapeKind::RoundedRect { corner_radius, .. } = &mut self.kind {
            *corner_radius = radius;
            self.update();
        } else {
            log::warn!("Only rounded rectangles have a corner radius");
        }
    }

    /// Fill color, multiplied with the texture
    pub const fn fill_color(&self) -> Color {
        self.fill_color
    }

    /// Change the fill color
    pub fn set_fill_color(&mut self, color: Color) {
        self.fill_color = color;
        for vertex in self.mesh.geometry_mut().vertices_mut() {
            vertex.color = color.to_array();
        }
    }

    /// Borrowed texture, if any
    pub const fn texture(&self) -> Option<&'t Texture> {
        self.texture
    }

    /// Texture the shape; with `reset_rect` the whole texture is used
    pub fn set_texture(&mut self, texture: Option<&'t Texture>, reset_rect: bool) {
        if let Some(texture) = texture {
            if reset_rect || self.texture.is_none() {
                let size = texture.size();
                self.texture_rect = IntRect::new(
                    0,
                    0,
                    i32::try_from(size.x).unwrap_or(i32::MAX),
                    i32::try_from(size.y).unwrap_or(i32::MAX),
                );
            }
        }
        self.texture = texture;
        self.update_tex_coords();
    }

    /// Texel region mapped onto the bounding box
    pub const fn texture_rect(&self) -> IntRect {
        self.texture_rect
    }

    /// Change the texel region
    pub fn set_texture_rect(&mut self, rect: IntRect) {
        self.texture_rect = rect;
        self.update_tex_coords();
    }

    /// Position, rotation, scale and origin
    pub const fn transformable(&self) -> &Transformable {
        &self.transformable
    }

    /// Position, rotation, scale and origin, for mutation
    pub fn transformable_mut(&mut self) -> &mut Transformable {
        &mut self.transformable
    }

    /// Shortcut for [`Transformable::set_position`]
    pub fn set_position(&mut self, position: Vec2) {
        self.transformable.set_position(position);
    }

    /// Bounding box in local coordinates
    pub const fn local_bounds(&self) -> FloatRect {
        self.bounds
    }

    /// Bounding box after the shape's transform
    pub fn global_bounds(&self) -> FloatRect {
        self.bounds.transformed(&self.transformable.transform())
    }

    /// Renderable geometry
    pub const fn mesh(&self) -> &RenderMesh<Vertex2D> {
        &self.mesh
    }

    fn update(&mut self) {
        let points = self.kind.points();
        if points.len() < 3 {
            self.bounds = FloatRect::default();
            self.mesh.geometry_mut().clear();
            return;
        }

        self.bounds = FloatRect::from_points(points.iter().copied());
        let centroid = points.iter().fold(Vec2::zeros(), |sum, p| sum + p) / points.len() as f32;

        let mut vertices = Vec::with_capacity(points.len() + 1);
        vertices.push(Vertex2D::new(centroid, Vec2::zeros(), self.fill_color));
        vertices.extend(points.iter().map(|p| Vertex2D::new(*p, Vec2::zeros(), self.fill_color)));

        let count = u32::try_from(points.len()).unwrap_or(u32::MAX);
        let indices = (0..count)
            .flat_map(|i| [0, i + 1, (i + 1) % count + 1])
            .collect();

        self.mesh.geometry_mut().set(vertices, indices);
        self.update_tex_coords();
    }

    fn update_tex_coords(&mut self) {
        let bounds = self.bounds;
        let rect = FloatRect::from(self.texture_rect);
        for vertex in self.mesh.geometry_mut().vertices_mut() {
            let p = vertex.position();
            let x_ratio = if bounds.width > 0.0 { (p.x - bounds.left) / bounds.width } else { 0.0 };
            let y_ratio = if bounds.height > 0.0 { (p.y - bounds.top) / bounds.height } else { 0.0 };
            vertex.tex_coords = [rect.left + rect.width * x_ratio, rect.top + rect.height * y_ratio];
        }
    }
}

impl GeometryProvider for Shape<'_> {
    fn point_count(&self) -> usize {
        self.kind.point_count()
    }

    fn point(&self, index: usize) -> Vec2 {
        self.kind.point(index)
    }
}

impl Drawable for Shape<'_> {
    fn draw(&mut self, renderer: &mut Renderer, states: &RenderStates<'_>) {
        let mut states = states.combined(&self.transformable.transform());
        if let Some(texture) = self.texture {
            states.set_texture(Some(texture));
        }
        renderer.draw_mesh(&mut self.mesh, &mut states);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::rc::Rc;

    use crate::render::gpu::{GraphicsDevice, HeadlessDevice};

    #[test]
    fn test_fan_triangulation() {
        let shape = Shape::rectangle(Vec2::new(10.0, 20.0));
        let geometry = shape.mesh().geometry();
        assert_eq!(geometry.vertices().len(), 5);
        assert_eq!(geometry.indices(), &[0, 1, 2, 0, 2, 3, 0, 3, 4, 0, 4, 1]);
        assert_eq!(geometry.vertices()[0].position, [5.0, 10.0]);
    }

    #[test]
    fn test_convex_set_point_out_of_range_is_noop() {
        let mut shape = Shape::convex(vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 0.0),
            Vec2::new(5.0, 8.0),
        ]);
        let before = shape.kind().clone();
        shape.set_point(5, Vec2::new(99.0, 99.0));
        assert_eq!(shape.point_count(), 3);
        assert_eq!(shape.kind(), &before);
    }

    #[test]
    fn test_mutation_leaves_geometry_dirty_until_drawn() {
        let device = Rc::new(HeadlessDevice::new());
        let dyn_device: Rc<dyn GraphicsDevice> = device.clone();
        let mut renderer = Renderer::new(dyn_device);

        let mut shape = Shape::convex(vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 0.0),
            Vec2::new(5.0, 8.0),
        ]);
        renderer.draw(&mut shape);
        assert!(!shape.mesh().geometry().is_dirty());

        shape.set_point(1, Vec2::new(12.0, 0.0));
        assert!(shape.mesh().geometry().is_dirty());
        let _ = shape.point(1);
        let _ = shape.mesh().geometry().vertices();
        assert!(shape.mesh().geometry().is_dirty());

        renderer.draw(&mut shape);
        assert!(!shape.mesh().geometry().is_dirty());
        assert_eq!(renderer.stats().uploads, 2);
    }

    #[test]
    fn test_add_point_grows_convex_polygon() {
        let device: Rc<dyn GraphicsDevice> = Rc::new(HeadlessDevice::new());
        let mut renderer = Renderer::new(device);
        let mut shape = Shape::convex(vec![Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0), Vec2::new(10.0, 10.0)]);
        renderer.draw(&mut shape);
        assert!(!shape.mesh().geometry().is_dirty());

        shape.add_point(Vec2::new(0.0, 10.0));
        assert_eq!(shape.point_count(), 4);
        assert_eq!(shape.point(3), Vec2::new(0.0, 10.0));
        assert!(shape.mesh().geometry().is_dirty());
        assert_relative_eq!(shape.local_bounds().height, 10.0);

        let mut rect = Shape::rectangle(Vec2::new(4.0, 4.0));
        rect.add_point(Vec2::new(9.0, 9.0));
        assert_eq!(rect.point_count(), 4);
        assert_eq!(rect.kind(), &ShapeKind::Rectangle { size: Vec2::new(4.0, 4.0) });
    }

    #[test]
    fn test_moving_does_not_dirty_geometry() {
        let device: Rc<dyn GraphicsDevice> = Rc::new(HeadlessDevice::new());
        let mut renderer = Renderer::new(device);
        let mut shape = Shape::circle(10.0, 16);
        renderer.draw(&mut shape);
        shape.set_position(Vec2::new(50.0, 50.0));
        assert!(!shape.mesh().geometry().is_dirty());
    }

    #[test]
    fn test_bounds() {
        let mut shape = Shape::circle(10.0, 32);
        let local = shape.local_bounds();
        assert_relative_eq!(local.left, 0.0, epsilon = 1e-4);
        assert_relative_eq!(local.top, 0.0, epsilon = 1e-4);
        assert_relative_eq!(local.height, 20.0, epsilon = 1e-4);

        shape.transformable_mut().set_position(Vec2::new(100.0, 0.0));
        shape.transformable_mut().set_scale(Vec2::new(2.0, 2.0));
        let global = shape.global_bounds();
        assert_relative_eq!(global.left, 100.0, epsilon = 1e-3);
        assert_relative_eq!(global.width, 40.0, epsilon = 1e-3);
    }

    #[test]
    fn test_texture_rect_maps_to_bounds() {
        let device: Rc<dyn GraphicsDevice> = Rc::new(HeadlessDevice::new());
        let texture = Texture::new(&device, 64, 32).unwrap();
        let mut shape = Shape::rectangle(Vec2::new(10.0, 10.0));
        shape.set_texture(Some(&texture), true);
        assert_eq!(shape.texture_rect(), IntRect::new(0, 0, 64, 32));

        let far_corner = shape.mesh().geometry().vertices()[3];
        assert_eq!(far_corner.tex_coords, [64.0, 32.0]);
    }

    #[test]
    fn test_fill_color_reaches_vertices() {
        let mut shape = Shape::rounded_rect(Vec2::new(40.0, 20.0), 5.0, 4);
        shape.set_fill_color(Color::RED);
        assert!(shape
            .mesh()
            .geometry()
            .vertices()
            .iter()
            .all(|v| v.color == Color::RED.to_array()));
    }
}
