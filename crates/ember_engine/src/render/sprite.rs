//! Textured quad

use crate::foundation::math::{Color, FloatRect, IntRect, Vec2};
use crate::render::geometry::{Geometry, RenderMesh, Vertex2D};
use crate::render::renderer::{Drawable, Renderer};
use crate::render::states::RenderStates;
use crate::render::texture::Texture;
use crate::render::transformable::Transformable;

/// A rectangle of a borrowed texture drawn as one quad
#[derive(Debug)]
pub struct Sprite<'t> {
    texture: &'t Texture,
    texture_rect: IntRect,
    color: Color,
    transformable: Transformable,
    mesh: RenderMesh<Vertex2D>,
}

impl<'t> Sprite<'t> {
    /// Sprite showing the whole texture
    pub fn new(texture: &'t Texture) -> Self {
        let size = texture.size();
        let rect = IntRect::new(
            0,
            0,
            i32::try_from(size.x).unwrap_or(i32::MAX),
            i32::try_from(size.y).unwrap_or(i32::MAX),
        );
        Self::with_rect(texture, rect)
    }

    /// Sprite showing a region of the texture
    pub fn with_rect(texture: &'t Texture, texture_rect: IntRect) -> Self {
        let mut sprite = Self {
            texture,
            texture_rect,
            color: Color::WHITE,
            transformable: Transformable::new(),
            mesh: RenderMesh::new(Geometry::from_parts(
                vec![Vertex2D::default(); 4],
                vec![0, 1, 2, 0, 2, 3],
            )),
        };
        sprite.update_vertices();
        sprite
    }

    /// Displayed texture
    pub const fn texture(&self) -> &'t Texture {
        self.texture
    }

    /// Switch texture, optionally resetting the region to the whole texture
    pub fn set_texture(&mut self, texture: &'t Texture, reset_rect: bool) {
        self.texture = texture;
        if reset_rect {
            let size = texture.size();
            self.set_texture_rect(IntRect::new(
                0,
                0,
                i32::try_from(size.x).unwrap_or(i32::MAX),
                i32::try_from(size.y).unwrap_or(i32::MAX),
            ));
        }
    }

    /// Displayed texel region
    pub const fn texture_rect(&self) -> IntRect {
        self.texture_rect
    }

    /// Change the displayed region; the quad takes its size
    pub fn set_texture_rect(&mut self, rect: IntRect) {
        if rect != self.texture_rect {
            self.texture_rect = rect;
            self.update_vertices();
        }
    }

    /// Tint multiplied with the texture
    pub const fn color(&self) -> Color {
        self.color
    }

    /// Change the tint
    pub fn set_color(&mut self, color: Color) {
        self.color = color;
        for vertex in self.mesh.geometry_mut().vertices_mut() {
            vertex.color = color.to_array();
        }
    }

    /// Position, rotation, scale and origin
    pub const fn transformable(&self) -> &Transformable {
        &self.transformable
    }

    /// Position, rotation, scale and origin, for mutation
    pub fn transformable_mut(&mut self) -> &mut Transformable {
        &mut self.transformable
    }

    /// Bounding box in local coordinates
    pub fn local_bounds(&self) -> FloatRect {
        FloatRect::new(
            0.0,
            0.0,
            self.texture_rect.width.unsigned_abs() as f32,
            self.texture_rect.height.unsigned_abs() as f32,
        )
    }

    /// Bounding box after the sprite's transform
    pub fn global_bounds(&self) -> FloatRect {
        self.local_bounds().transformed(&self.transformable.transform())
    }

    /// Renderable geometry
    pub const fn mesh(&self) -> &RenderMesh<Vertex2D> {
        &self.mesh
    }

    fn update_vertices(&mut self) {
        let bounds = self.local_bounds();
        let rect = FloatRect::from(self.texture_rect);
        let (left, top) = (rect.left, rect.top);
        let (right, bottom) = (rect.left + rect.width, rect.top + rect.height);
        let corners = [
            (Vec2::new(0.0, 0.0), Vec2::new(left, top)),
            (Vec2::new(bounds.width, 0.0), Vec2::new(right, top)),
            (Vec2::new(bounds.width, bounds.height), Vec2::new(right, bottom)),
            (Vec2::new(0.0, bounds.height), Vec2::new(left, bottom)),
        ];
        let color = self.color;
        let vertices = self.mesh.geometry_mut().vertices_mut();
        vertices.clear();
        vertices.extend(corners.iter().map(|(position, uv)| Vertex2D::new(*position, *uv, color)));
    }
}

impl Drawable for Sprite<'_> {
    fn draw(&mut self, renderer: &mut Renderer, states: &RenderStates<'_>) {
        let mut states = states.combined(&self.transformable.transform());
        states.set_texture(Some(self.texture));
        renderer.draw_mesh(&mut self.mesh, &mut states);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    use crate::render::gpu::{GraphicsDevice, HeadlessDevice};

    #[test]
    fn test_quad_matches_texture_rect() {
        let device: Rc<dyn GraphicsDevice> = Rc::new(HeadlessDevice::new());
        let texture = Texture::new(&device, 64, 64).unwrap();
        let mut sprite = Sprite::new(&texture);
        sprite.set_texture_rect(IntRect::new(16, 0, 16, 32));

        let vertices = sprite.mesh().geometry().vertices();
        assert_eq!(vertices[2].position, [16.0, 32.0]);
        assert_eq!(vertices[0].tex_coords, [16.0, 0.0]);
        assert_eq!(vertices[2].tex_coords, [32.0, 32.0]);
        assert_eq!(sprite.local_bounds(), FloatRect::new(0.0, 0.0, 16.0, 32.0));
    }

    #[test]
    fn test_draw_binds_sprite_texture() {
        let device = Rc::new(HeadlessDevice::new());
        let dyn_device: Rc<dyn GraphicsDevice> = device.clone();
        let texture = Texture::new(&dyn_device, 8, 8).unwrap();
        let mut renderer = Renderer::new(dyn_device);
        let mut sprite = Sprite::new(&texture);

        renderer.draw(&mut sprite);
        assert_eq!(device.draw_calls()[0].texture, texture.id());
    }
}
