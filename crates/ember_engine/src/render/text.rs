//! # Text
//!
//! [`Text`] lays a string out into one textured quad per visible glyph. The
//! glyphs come from a [`GlyphSource`], normally a
//! [`FontAtlas`](crate::render::font::FontAtlas), whose texture is borrowed
//! for drawing and never owned by the text.
//!
//! ## Layout
//!
//! The pen starts at `(0, ascent)` so the first line's tallest glyphs touch
//! y = 0. Each glyph quad is placed at `pen + bearing` and the pen advances
//! by the glyph's advance. `'\n'` returns the pen to x = 0 and moves it down
//! by the line spacing; a tab advances four spaces.

use crate::foundation::math::{Color, FloatRect, IntRect, Vec2};
use crate::render::geometry::{Geometry, RenderMesh, Vertex2D};
use crate::render::renderer::{Drawable, Renderer};
use crate::render::states::RenderStates;
use crate::render::texture::Texture;
use crate::render::transformable::Transformable;

/// Spaces per tab stop
const TAB_WIDTH: f32 = 4.0;

/// Placement and atlas region of one character
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Glyph {
    /// Region of the source texture, in texels
    pub texture_rect: IntRect,
    /// Offset from the pen position to the quad's top-left corner, y down
    pub bearing: Vec2,
    /// Quad size in pixels
    pub size: Vec2,
    /// Horizontal pen advance in pixels
    pub advance: f32,
}

/// Supplier of glyph metrics and the texture holding their bitmaps
pub trait GlyphSource {
    /// Metrics for `ch`, if the source has it
    fn glyph(&self, ch: char) -> Option<Glyph>;

    /// Distance between consecutive baselines
    fn line_spacing(&self) -> f32;

    /// Distance from the top of a line to its baseline
    fn ascent(&self) -> f32;

    /// Texture the glyph rectangles refer to
    fn texture(&self) -> Option<&Texture>;
}

/// A string drawn with glyphs from a borrowed source
pub struct Text<'f> {
    string: String,
    font: &'f dyn GlyphSource,
    color: Color,
    transformable: Transformable,
    mesh: RenderMesh<Vertex2D>,
    bounds: FloatRect,
}

impl<'f> Text<'f> {
    /// Lay out `string` with `font`
    pub fn new(string: impl Into<String>, font: &'f dyn GlyphSource) -> Self {
        let mut text = Self {
            string: string.into(),
            font,
            color: Color::WHITE,
            transformable: Transformable::new(),
            mesh: RenderMesh::default(),
            bounds: FloatRect::default(),
        };
        text.update_geometry();
        text
    }

    /// Displayed string
    pub fn string(&self) -> &str {
        &self.string
    }

    /// Replace the string and lay it out again
    pub fn set_string(&mut self, string: impl Into<String>) {
        let string = string.into();
        if string != self.string {
            self.string = string;
            self.update_geometry();
        }
    }

    /// Switch glyph source
    pub fn set_font(&mut self, font: &'f dyn GlyphSource) {
        self.font = font;
        self.update_geometry();
    }

    /// Glyph color
    pub const fn color(&self) -> Color {
        self.color
    }

    /// Recolor every glyph without a new layout
    pub fn set_color(&mut self, color: Color) {
        if color == self.color {
            return;
        }
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

    /// Box around all glyph quads in local coordinates
    pub const fn local_bounds(&self) -> FloatRect {
        self.bounds
    }

    /// Box around all glyph quads after the text's transform
    pub fn global_bounds(&self) -> FloatRect {
        self.bounds.transformed(&self.transformable.transform())
    }

    /// Renderable geometry
    pub const fn mesh(&self) -> &RenderMesh<Vertex2D> {
        &self.mesh
    }

    /// Number of glyph quads in the layout
    pub fn quad_count(&self) -> usize {
        self.mesh.geometry().vertices().len() / 4
    }

    fn update_geometry(&mut self) {
        let line_spacing = self.font.line_spacing();
        let space = self.font.glyph(' ').map_or(line_spacing * 0.25, |g| g.advance);
        let color = self.color;

        let mut vertices = Vec::with_capacity(self.string.len() * 4);
        let mut indices = Vec::with_capacity(self.string.len() * 6);
        let mut corners = Vec::with_capacity(self.string.len() * 2);
        let mut pen = Vec2::new(0.0, self.font.ascent());

        for ch in self.string.chars() {
            match ch {
                '\r' => {}
                '\n' => {
                    pen.x = 0.0;
                    pen.y += line_spacing;
                }
                ' ' => pen.x += space,
                '\t' => pen.x += space * TAB_WIDTH,
                _ => {
                    let Some(glyph) = self.font.glyph(ch) else {
                        log::debug!("No glyph for {ch:?}, skipped");
                        continue;
                    };
                    if glyph.size.x > 0.0 && glyph.size.y > 0.0 {
                        let top_left = pen + glyph.bearing;
                        let bottom_right = top_left + glyph.size;
                        push_quad(&mut vertices, &mut indices, top_left, bottom_right, glyph.texture_rect, color);
                        corners.push(top_left);
                        corners.push(bottom_right);
                    }
                    pen.x += glyph.advance;
                }
            }
        }

        self.bounds = FloatRect::from_points(corners);
        self.mesh.geometry_mut().set(vertices, indices);
    }
}

fn push_quad(
    vertices: &mut Vec<Vertex2D>,
    indices: &mut Vec<u32>,
    top_left: Vec2,
    bottom_right: Vec2,
    texture_rect: IntRect,
    color: Color,
) {
    let uv = FloatRect::from(texture_rect);
    let (u0, v0) = (uv.left, uv.top);
    let (u1, v1) = (uv.left + uv.width, uv.top + uv.height);
    let base = u32::try_from(vertices.len()).unwrap_or(u32::MAX - 4);
    vertices.extend([
        Vertex2D::new(top_left, Vec2::new(u0, v0), color),
        Vertex2D::new(Vec2::new(bottom_right.x, top_left.y), Vec2::new(u1, v0), color),
        Vertex2D::new(bottom_right, Vec2::new(u1, v1), color),
        Vertex2D::new(Vec2::new(top_left.x, bottom_right.y), Vec2::new(u0, v1), color),
    ]);
    indices.extend([base, base + 1, base + 2, base, base + 2, base + 3]);
}

impl std::fmt::Debug for Text<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Text")
            .field("string", &self.string)
            .field("color", &self.color)
            .field("bounds", &self.bounds)
            .finish_non_exhaustive()
    }
}

impl Drawable for Text<'_> {
    fn draw(&mut self, renderer: &mut Renderer, states: &RenderStates<'_>) {
        if self.mesh.geometry().indices().is_empty() {
            return;
        }
        let mut states = states.combined(&self.transformable.transform());
        if let Some(texture) = self.font.texture() {
            states.set_texture(Some(texture));
        }
        renderer.draw_mesh(&mut self.mesh, &mut states);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Monospace source: every printable glyph is 8x10 with a 10px advance
    struct FixedGlyphs;

    impl GlyphSource for FixedGlyphs {
        fn glyph(&self, ch: char) -> Option<Glyph> {
            if !ch.is_ascii_graphic() && ch != ' ' {
                return None;
            }
            let index = i32::from(ch as u8) - 32;
            let size = if ch == ' ' { Vec2::zeros() } else { Vec2::new(8.0, 10.0) };
            Some(Glyph {
                texture_rect: IntRect::new(index * 8, 0, 8, 10),
                bearing: Vec2::new(1.0, -10.0),
                size,
                advance: 10.0,
            })
        }

        fn line_spacing(&self) -> f32 {
            16.0
        }

        fn ascent(&self) -> f32 {
            12.0
        }

        fn texture(&self) -> Option<&Texture> {
            None
        }
    }

    #[test]
    fn test_one_quad_per_visible_glyph() {
        let font = FixedGlyphs;
        let text = Text::new("ab c", &font);
        assert_eq!(text.quad_count(), 3);
        assert_eq!(text.mesh().geometry().indices().len(), 18);

        let vertices = text.mesh().geometry().vertices();
        // 'c' sits after two glyph advances and one space
        assert_relative_eq!(vertices[8].position[0], 31.0);
        assert_relative_eq!(vertices[8].position[1], 2.0);
        assert_eq!(vertices[0].tex_coords, [(65 * 8) as f32, 0.0]);
    }

    #[test]
    fn test_newline_resets_pen_and_moves_down() {
        let font = FixedGlyphs;
        let text = Text::new("ab\nc", &font);
        let vertices = text.mesh().geometry().vertices();
        assert_relative_eq!(vertices[8].position[0], 1.0);
        assert_relative_eq!(vertices[8].position[1], 18.0);

        let bounds = text.local_bounds();
        assert_relative_eq!(bounds.left, 1.0);
        assert_relative_eq!(bounds.top, 2.0);
        assert_relative_eq!(bounds.width, 18.0);
        assert_relative_eq!(bounds.height, 26.0);
    }

    #[test]
    fn test_unknown_characters_are_skipped() {
        let font = FixedGlyphs;
        let text = Text::new("a\u{e9}b", &font);
        assert_eq!(text.quad_count(), 2);
        let vertices = text.mesh().geometry().vertices();
        assert_relative_eq!(vertices[4].position[0], 11.0);
    }

    #[test]
    fn test_set_string_invalidates_geometry() {
        let font = FixedGlyphs;
        let mut text = Text::new("", &font);
        assert_eq!(text.quad_count(), 0);
        assert_eq!(text.local_bounds(), FloatRect::default());

        text.set_string("hi");
        assert!(text.mesh().geometry().is_dirty());
        assert_eq!(text.quad_count(), 2);

        text.set_color(Color::RED);
        assert!(text
            .mesh()
            .geometry()
            .vertices()
            .iter()
            .all(|v| v.color == Color::RED.to_array()));
    }
}
