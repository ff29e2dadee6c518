//! # Render States
//!
//! The pipeline configuration applied right before a draw call: blend mode,
//! transform, texture and shader. Textures and shaders are borrowed, so the
//! borrow checker guarantees they outlive every state bundle pointing at them.

use crate::foundation::math::Mat4;
use crate::render::shader::Shader;
use crate::render::texture::Texture;

/// Multiplier applied to a blend source or destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    /// (0, 0, 0, 0)
    Zero,
    /// (1, 1, 1, 1)
    One,
    /// (src.r, src.g, src.b, src.a)
    SrcColor,
    /// (1, 1, 1, 1) - (src.r, src.g, src.b, src.a)
    OneMinusSrcColor,
    /// (dst.r, dst.g, dst.b, dst.a)
    DstColor,
    /// (1, 1, 1, 1) - (dst.r, dst.g, dst.b, dst.a)
    OneMinusDstColor,
    /// (src.a, src.a, src.a, src.a)
    SrcAlpha,
    /// (1, 1, 1, 1) - (src.a, src.a, src.a, src.a)
    OneMinusSrcAlpha,
    /// (dst.a, dst.a, dst.a, dst.a)
    DstAlpha,
    /// (1, 1, 1, 1) - (dst.a, dst.a, dst.a, dst.a)
    OneMinusDstAlpha,
}

/// How the weighted source and destination are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendEquation {
    /// src + dst
    Add,
    /// src - dst
    Subtract,
    /// dst - src
    ReverseSubtract,
}

/// Blending of drawn pixels with the framebuffer
///
/// Color and alpha channels are configured separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendMode {
    /// Source factor for the color channels
    pub color_src_factor: BlendFactor,
    /// Destination factor for the color channels
    pub color_dst_factor: BlendFactor,
    /// Equation for the color channels
    pub color_equation: BlendEquation,
    /// Source factor for the alpha channel
    pub alpha_src_factor: BlendFactor,
    /// Destination factor for the alpha channel
    pub alpha_dst_factor: BlendFactor,
    /// Equation for the alpha channel
    pub alpha_equation: BlendEquation,
}

impl BlendMode {
    /// Classic alpha blending, the default
    pub const ALPHA: Self = Self::separate(
        BlendFactor::SrcAlpha,
        BlendFactor::OneMinusSrcAlpha,
        BlendEquation::Add,
        BlendFactor::One,
        BlendFactor::OneMinusSrcAlpha,
        BlendEquation::Add,
    );

    /// Additive blending
    pub const ADD: Self = Self::separate(
        BlendFactor::SrcAlpha,
        BlendFactor::One,
        BlendEquation::Add,
        BlendFactor::One,
        BlendFactor::One,
        BlendEquation::Add,
    );

    /// Multiplicative blending
    pub const MULTIPLY: Self = Self::new(BlendFactor::DstColor, BlendFactor::Zero, BlendEquation::Add);

    /// Overwrite the framebuffer; blending is disabled
    pub const NONE: Self = Self::new(BlendFactor::One, BlendFactor::Zero, BlendEquation::Add);

    /// Same factors and equation for color and alpha
    pub const fn new(src: BlendFactor, dst: BlendFactor, equation: BlendEquation) -> Self {
        Self::separate(src, dst, equation, src, dst, equation)
    }

    /// Separate color and alpha configuration
    pub const fn separate(
        color_src_factor: BlendFactor,
        color_dst_factor: BlendFactor,
        color_equation: BlendEquation,
        alpha_src_factor: BlendFactor,
        alpha_dst_factor: BlendFactor,
        alpha_equation: BlendEquation,
    ) -> Self {
        Self {
            color_src_factor,
            color_dst_factor,
            color_equation,
            alpha_src_factor,
            alpha_dst_factor,
            alpha_equation,
        }
    }
}

impl Default for BlendMode {
    fn default() -> Self {
        Self::ALPHA
    }
}

/// Pipeline configuration of one draw call
///
/// Every setter marks the bundle dirty; the renderer re-applies dirty states
/// to the device and then clears the flag. An absent texture or shader means
/// the renderer's built-in white texture or default shader.
#[derive(Debug, Clone)]
pub struct RenderStates<'a> {
    blend_mode: BlendMode,
    transform: Mat4,
    texture: Option<&'a Texture>,
    shader: Option<&'a Shader>,
    dirty: bool,
}

impl Default for RenderStates<'_> {
    fn default() -> Self {
        Self {
            blend_mode: BlendMode::ALPHA,
            transform: Mat4::identity(),
            texture: None,
            shader: None,
            dirty: true,
        }
    }
}

impl<'a> RenderStates<'a> {
    /// Default states: alpha blending, identity transform, no texture or shader
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`RenderStates::set_blend_mode`]
    #[must_use]
    pub fn with_blend_mode(mut self, mode: BlendMode) -> Self {
        self.set_blend_mode(mode);
        self
    }

    /// Builder form of [`RenderStates::set_transform`]
    #[must_use]
    pub fn with_transform(mut self, transform: Mat4) -> Self {
        self.set_transform(transform);
        self
    }

    /// Builder form of [`RenderStates::set_texture`]
    #[must_use]
    pub fn with_texture(mut self, texture: &'a Texture) -> Self {
        self.set_texture(Some(texture));
        self
    }

    /// Builder form of [`RenderStates::set_shader`]
    #[must_use]
    pub fn with_shader(mut self, shader: &'a Shader) -> Self {
        self.set_shader(Some(shader));
        self
    }

    /// Blend mode
    pub const fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    /// Model transform
    pub const fn transform(&self) -> &Mat4 {
        &self.transform
    }

    /// Borrowed texture, if any
    pub const fn texture(&self) -> Option<&'a Texture> {
        self.texture
    }

    /// Borrowed shader, if any
    pub const fn shader(&self) -> Option<&'a Shader> {
        self.shader
    }

    /// Change the blend mode
    pub fn set_blend_mode(&mut self, mode: BlendMode) {
        self.blend_mode = mode;
        self.dirty = true;
    }

    /// Replace the model transform
    pub fn set_transform(&mut self, transform: Mat4) {
        self.transform = transform;
        self.dirty = true;
    }

    /// Change the texture; `None` selects the white texture
    pub fn set_texture(&mut self, texture: Option<&'a Texture>) {
        self.texture = texture;
        self.dirty = true;
    }

    /// Change the shader; `None` selects the default shader
    pub fn set_shader(&mut self, shader: Option<&'a Shader>) {
        self.shader = shader;
        self.dirty = true;
    }

    /// Copy of these states with `transform` applied after the current one
    ///
    /// The copy keeps this bundle's dirty flag; a changed transform is caught
    /// by the renderer comparing against what the device last received.
    /// Used by drawables to append their own transform.
    #[must_use]
    pub fn combined(&self, transform: &Mat4) -> Self {
        Self {
            transform: self.transform * transform,
            ..self.clone()
        }
    }

    /// Whether the states changed since the renderer last applied them
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Force the next draw to re-apply these states
    pub fn invalidate(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn mark_applied(&mut self) {
        self.dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;

    #[test]
    fn test_defaults() {
        let states = RenderStates::new();
        assert_eq!(states.blend_mode(), BlendMode::ALPHA);
        assert_eq!(*states.transform(), Mat4::identity());
        assert!(states.texture().is_none());
        assert!(states.shader().is_none());
        assert!(states.is_dirty());
    }

    #[test]
    fn test_setters_mark_dirty() {
        let mut states = RenderStates::new();
        states.mark_applied();
        assert!(!states.is_dirty());

        states.set_blend_mode(BlendMode::ADD);
        assert!(states.is_dirty());

        states.mark_applied();
        states.set_transform(Mat4::new_translation(&Vec3::new(1.0, 2.0, 0.0)));
        assert!(states.is_dirty());
    }

    #[test]
    fn test_combined_appends_transform() {
        let translate = Mat4::new_translation(&Vec3::new(10.0, 0.0, 0.0));
        let scale = Mat4::new_scaling(2.0);
        let mut states = RenderStates::new().with_transform(translate);
        states.mark_applied();

        let combined = states.combined(&scale);
        assert_eq!(*combined.transform(), translate * scale);
        assert!(!combined.is_dirty());

        states.set_blend_mode(BlendMode::ADD);
        assert!(states.combined(&scale).is_dirty());
    }

    #[test]
    fn test_blend_presets() {
        assert_eq!(BlendMode::default(), BlendMode::ALPHA);
        assert_eq!(BlendMode::MULTIPLY.alpha_src_factor, BlendFactor::DstColor);
        assert_ne!(BlendMode::ADD, BlendMode::NONE);
    }
}
