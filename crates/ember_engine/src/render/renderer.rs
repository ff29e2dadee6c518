//! # Draw Dispatch
//!
//! The [`Renderer`] makes sure the device sees current geometry and the right
//! pipeline configuration before every draw call.
//!
//! ## Per-draw sequence
//!
//! 1. Upload vertices and indices if the geometry is stale, then mark it synced
//! 2. Bind the mesh's vertex array (vertex buffer, layout and index buffer)
//! 3. If the states are dirty or differ from what the device has, bind the
//!    texture (or the white texture) and shader (or the default shader), set
//!    the blend mode and upload the transform uniforms
//! 4. Issue an indexed draw sized by the index buffer's count
//!
//! Failed uploads and missing shaders are logged and the draw is skipped, so
//! a broken object disappears for a frame instead of taking the frame down.

use std::rc::Rc;

use crate::foundation::math::{Color, Mat4, Vec3};
use crate::gpu_check;
use crate::render::camera::{Camera, RenderTarget};
use crate::render::geometry::{RenderMesh, VertexFormat};
use crate::render::gpu::GraphicsDevice;
use crate::render::shader::{self, Shader};
use crate::render::states::{BlendMode, RenderStates};
use crate::render::texture::Texture;

/// Anything the renderer can draw
pub trait Drawable {
    /// Draw with `states` applied on top of the object's own states
    fn draw(&mut self, renderer: &mut Renderer, states: &RenderStates<'_>);
}

/// Counters for the current frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawStats {
    /// Indexed draw calls issued
    pub draw_calls: usize,
    /// Geometry uploads performed
    pub uploads: usize,
    /// Draws dropped because of a failure
    pub skipped: usize,
    /// Times the pipeline states were re-applied
    pub state_changes: usize,
}

/// Pipeline configuration last sent to the device
#[derive(Debug, Clone, Copy, PartialEq)]
struct AppliedStates {
    program: u32,
    texture: u32,
    blend_mode: BlendMode,
    transform: Mat4,
    camera_generation: u64,
}

/// Owner of the device and the built-in shader and texture
pub struct Renderer {
    device: Rc<dyn GraphicsDevice>,
    default_shader: Option<Shader>,
    white_texture: Option<Texture>,
    view_projection: Mat4,
    camera_generation: u64,
    applied: Option<AppliedStates>,
    stats: DrawStats,
}

impl Renderer {
    /// Create a renderer and its built-in resources
    ///
    /// Failing to build the default shader or white texture is logged;
    /// draws that need them are skipped.
    pub fn new(device: Rc<dyn GraphicsDevice>) -> Self {
        let default_shader = Shader::default_program(&device)
            .map_err(|e| log::error!("Default shader unavailable on {}: {e}", device.name()))
            .ok();
        let white_texture = Texture::white(&device)
            .map_err(|e| log::error!("White texture unavailable on {}: {e}", device.name()))
            .ok();
        log::info!("Renderer created on {} device", device.name());
        Self {
            device,
            default_shader,
            white_texture,
            view_projection: Mat4::identity(),
            camera_generation: 0,
            applied: None,
            stats: DrawStats::default(),
        }
    }

    /// Device all resources are created on
    pub fn device(&self) -> &Rc<dyn GraphicsDevice> {
        &self.device
    }

    /// Counters since the last [`Renderer::begin_frame`]
    pub const fn stats(&self) -> DrawStats {
        self.stats
    }

    /// Built-in program, if it could be created
    pub const fn default_shader(&self) -> Option<&Shader> {
        self.default_shader.as_ref()
    }

    /// Current world-to-clip matrix
    pub const fn view_projection(&self) -> &Mat4 {
        &self.view_projection
    }

    /// Start a frame: full-target viewport, clear, reset counters
    pub fn begin_frame(&mut self, clear_color: Color, target: &dyn RenderTarget) {
        let size = target.framebuffer_size();
        gpu_check!(self.device, self.device.set_viewport(0, 0, size.x, size.y));
        gpu_check!(self.device, self.device.clear(clear_color.to_f32_array()));
        self.stats = DrawStats::default();
        self.applied = None;
    }

    /// Use a camera's view-projection for the following draws
    pub fn set_camera(&mut self, camera: &mut dyn Camera, target: &dyn RenderTarget) {
        self.set_view_projection(camera.view_projection_matrix(target));
    }

    /// Use an explicit view-projection matrix for the following draws
    pub fn set_view_projection(&mut self, view_projection: Mat4) {
        if view_projection != self.view_projection {
            self.view_projection = view_projection;
            self.camera_generation += 1;
        }
    }

    /// Draw an object with default states
    ///
    /// The defaults count as applied; only a difference from what the device
    /// last received triggers a state change.
    pub fn draw(&mut self, drawable: &mut dyn Drawable) {
        let mut states = RenderStates::default();
        states.mark_applied();
        drawable.draw(self, &states);
    }

    /// Draw an object with explicit states
    pub fn draw_with(&mut self, drawable: &mut dyn Drawable, states: &RenderStates<'_>) {
        drawable.draw(self, states);
    }

    /// Draw one mesh; returns whether a draw call was issued
    pub fn draw_mesh<V: VertexFormat>(&mut self, mesh: &mut RenderMesh<V>, states: &mut RenderStates<'_>) -> bool {
        match mesh.prepare(&self.device) {
            Ok(true) => self.stats.uploads += 1,
            Ok(false) => {}
            Err(e) => {
                log::error!("Skipping draw, geometry upload failed: {e}");
                self.stats.skipped += 1;
                return false;
            }
        }
        let Some(gpu) = mesh.gpu() else {
            self.stats.skipped += 1;
            return false;
        };
        let count = gpu.index_buffer().count();
        if count == 0 {
            return false;
        }

        let Some(shader) = states.shader().or(self.default_shader.as_ref()) else {
            log::error!("Skipping draw, no shader available");
            self.stats.skipped += 1;
            return false;
        };
        let Some(texture) = states.texture().or(self.white_texture.as_ref()) else {
            log::error!("Skipping draw, no texture available");
            self.stats.skipped += 1;
            return false;
        };

        gpu.vertex_array().bind();

        let wanted = AppliedStates {
            program: shader.id(),
            texture: texture.id(),
            blend_mode: states.blend_mode(),
            transform: *states.transform(),
            camera_generation: self.camera_generation,
        };
        if states.is_dirty() || self.applied != Some(wanted) {
            self.apply_states(shader, texture, &wanted);
            self.applied = Some(wanted);
            self.stats.state_changes += 1;
            states.mark_applied();
        }

        gpu_check!(self.device, self.device.draw_indexed(mesh.geometry().primitive_type(), count));
        gpu.vertex_array().unbind();
        self.stats.draw_calls += 1;
        true
    }

    fn apply_states(&self, shader: &Shader, texture: &Texture, states: &AppliedStates) {
        let size = texture.size();
        let texture_matrix = Mat4::new_nonuniform_scaling(&Vec3::new(
            1.0 / size.x.max(1) as f32,
            1.0 / size.y.max(1) as f32,
            1.0,
        ));
        shader.bind();
        texture.bind(0);
        shader.set_int(shader::TEXTURE_UNIFORM, 0);
        shader.set_mat4(shader::TEXTURE_MATRIX_UNIFORM, &texture_matrix);
        shader.set_mat4(shader::MODEL_UNIFORM, &states.transform);
        shader.set_mat4(shader::VIEW_PROJECTION_UNIFORM, &self.view_projection);
        gpu_check!(self.device, self.device.set_blend_mode(&states.blend_mode));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{UVec2, Vec2};
    use crate::render::camera::{Camera2D, OffscreenTarget};
    use crate::render::geometry::{Geometry, Vertex2D};
    use crate::render::gpu::HeadlessDevice;
    use crate::render::shapes::Shape;

    fn headless_renderer() -> (Rc<HeadlessDevice>, Renderer) {
        let device = Rc::new(HeadlessDevice::new());
        let dyn_device: Rc<dyn GraphicsDevice> = device.clone();
        (device, Renderer::new(dyn_device))
    }

    fn quad() -> RenderMesh<Vertex2D> {
        let vertex = |x, y| Vertex2D::new(Vec2::new(x, y), Vec2::new(x, y), Color::WHITE);
        RenderMesh::new(Geometry::from_parts(
            vec![vertex(0.0, 0.0), vertex(1.0, 0.0), vertex(1.0, 1.0), vertex(0.0, 1.0)],
            vec![0, 1, 2, 0, 2, 3],
        ))
    }

    #[test]
    fn test_draw_uploads_once_and_gpu_matches_cpu() {
        let (device, mut renderer) = headless_renderer();
        let mut mesh = quad();
        let mut states = RenderStates::default();

        for _ in 0..3 {
            assert!(renderer.draw_mesh(&mut mesh, &mut states));
        }
        assert_eq!(renderer.stats().uploads, 1);
        assert_eq!(renderer.stats().draw_calls, 3);
        assert_eq!(renderer.stats().state_changes, 1);

        mesh.geometry_mut().vertices_mut()[2].position = [5.0, 5.0];
        assert!(renderer.draw_mesh(&mut mesh, &mut states));
        assert_eq!(renderer.stats().uploads, 2);

        let gpu = mesh.gpu().unwrap();
        let contents = device.buffer_contents(gpu.vertex_buffer().id()).unwrap();
        assert_eq!(contents.as_slice(), bytemuck::cast_slice::<Vertex2D, u8>(mesh.geometry().vertices()));

        let calls = device.draw_calls();
        assert_eq!(calls.len(), 4);
        assert_eq!(calls[0].count, 6);
        assert_eq!(calls[0].index_buffer, gpu.index_buffer().id());
    }

    #[test]
    fn test_defaults_bound_when_states_have_none() {
        let (device, mut renderer) = headless_renderer();
        let mut mesh = quad();
        renderer.draw_mesh(&mut mesh, &mut RenderStates::default());

        let call = device.draw_calls()[0].clone();
        assert_eq!(call.program, renderer.default_shader().unwrap().id());
        assert_ne!(call.texture, 0);
        assert_eq!(call.blend_mode, BlendMode::ALPHA);
    }

    #[test]
    fn test_dirty_states_are_reapplied() {
        let (device, mut renderer) = headless_renderer();
        let mut mesh = quad();
        let mut states = RenderStates::default();
        renderer.draw_mesh(&mut mesh, &mut states);
        assert!(!states.is_dirty());

        states.set_blend_mode(BlendMode::ADD);
        renderer.draw_mesh(&mut mesh, &mut states);
        assert_eq!(renderer.stats().state_changes, 2);
        assert_eq!(device.blend_mode(), BlendMode::ADD);

        // Another bundle changes device state; the first one must be re-applied
        renderer.draw_mesh(&mut mesh, &mut RenderStates::default());
        renderer.draw_mesh(&mut mesh, &mut states);
        assert_eq!(renderer.stats().state_changes, 4);
        assert_eq!(device.blend_mode(), BlendMode::ADD);
    }

    #[test]
    fn test_unchanged_shape_applies_states_once() {
        let (device, mut renderer) = headless_renderer();
        let mut circle = Shape::circle(10.0, 16);
        for _ in 0..5 {
            renderer.draw(&mut circle);
        }
        assert_eq!(renderer.stats().draw_calls, 5);
        assert_eq!(renderer.stats().uploads, 1);
        assert_eq!(renderer.stats().state_changes, 1);

        // A moved shape has a new model transform and must be re-applied
        circle.set_position(Vec2::new(5.0, 5.0));
        renderer.draw(&mut circle);
        renderer.draw(&mut circle);
        assert_eq!(renderer.stats().state_changes, 2);
        assert_eq!(device.draw_calls().len(), 7);
    }

    #[test]
    fn test_allocation_failure_skips_draw() {
        let (device, mut renderer) = headless_renderer();
        let mut mesh = quad();
        device.fail_next_allocation();

        assert!(!renderer.draw_mesh(&mut mesh, &mut RenderStates::default()));
        assert_eq!(renderer.stats().skipped, 1);
        assert!(device.draw_calls().is_empty());
        assert!(mesh.geometry().is_dirty());

        // Next frame recovers
        assert!(renderer.draw_mesh(&mut mesh, &mut RenderStates::default()));
    }

    #[test]
    fn test_missing_shader_skips_draw() {
        let device = Rc::new(HeadlessDevice::new());
        let dyn_device: Rc<dyn GraphicsDevice> = device.clone();
        // First allocation is the default program
        device.fail_next_allocation();
        let mut renderer = Renderer::new(dyn_device);
        assert!(renderer.default_shader().is_none());

        let mut mesh = quad();
        assert!(!renderer.draw_mesh(&mut mesh, &mut RenderStates::default()));
        assert_eq!(renderer.stats().skipped, 1);
    }

    #[test]
    fn test_begin_frame_and_camera_uniform() {
        let (device, mut renderer) = headless_renderer();
        let target = OffscreenTarget::new(800, 600);
        let mut camera = Camera2D::for_framebuffer(UVec2::new(800, 600));

        renderer.begin_frame(Color::BLACK, &target);
        renderer.set_camera(&mut camera, &target);
        renderer.draw_mesh(&mut quad(), &mut RenderStates::default());

        assert_eq!(device.viewport(), (0, 0, 800, 600));
        assert_eq!(device.clear_count(), 1);
        let program = renderer.default_shader().unwrap().id();
        let uploaded = device.uniform_mat4(program, shader::VIEW_PROJECTION_UNIFORM).unwrap();
        assert_eq!(uploaded.as_slice(), renderer.view_projection().as_slice());
    }
}
