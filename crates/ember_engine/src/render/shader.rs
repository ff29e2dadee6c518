//! # Shader Programs
//!
//! A linked vertex + fragment program with a per-program uniform location
//! cache. The built-in program draws textured, vertex-colored geometry and
//! is what the renderer uses when a draw carries no shader of its own.
//!
//! ## Uniform contract
//!
//! Programs used by the renderer receive:
//! - `u_model` (mat4): drawable transform
//! - `u_view_projection` (mat4): camera matrix
//! - `u_texture_matrix` (mat4): maps texel coordinates to 0-1
//! - `u_texture` (sampler2D): bound to unit 0

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::foundation::math::Mat4;
use crate::gpu_check;
use crate::render::gpu::{GpuResource, GpuResult, GraphicsDevice, ResourceKind};

/// Uniform holding the drawable transform
pub const MODEL_UNIFORM: &str = "u_model";
/// Uniform holding the camera view-projection matrix
pub const VIEW_PROJECTION_UNIFORM: &str = "u_view_projection";
/// Uniform normalizing texel coordinates
pub const TEXTURE_MATRIX_UNIFORM: &str = "u_texture_matrix";
/// Sampler uniform bound to texture unit 0
pub const TEXTURE_UNIFORM: &str = "u_texture";

/// Vertex stage of the built-in program
pub const DEFAULT_VERTEX_SOURCE: &str = r"#version 330 core
layout(location = 0) in vec3 a_position;
layout(location = 1) in vec2 a_tex_coords;
layout(location = 2) in vec4 a_color;

uniform mat4 u_model;
uniform mat4 u_view_projection;
uniform mat4 u_texture_matrix;

out vec2 v_tex_coords;
out vec4 v_color;

void main() {
    gl_Position = u_view_projection * u_model * vec4(a_position, 1.0);
    v_tex_coords = (u_texture_matrix * vec4(a_tex_coords, 0.0, 1.0)).xy;
    v_color = a_color;
}
";

/// Fragment stage of the built-in program
pub const DEFAULT_FRAGMENT_SOURCE: &str = r"#version 330 core
in vec2 v_tex_coords;
in vec4 v_color;

uniform sampler2D u_texture;

out vec4 frag_color;

void main() {
    frag_color = texture(u_texture, v_tex_coords) * v_color;
}
";

/// Linked shader program
pub struct Shader {
    resource: GpuResource,
    uniforms: RefCell<HashMap<String, Option<u32>>>,
}

impl Shader {
    /// Compile and link a program from GLSL sources
    pub fn new(device: &Rc<dyn GraphicsDevice>, vertex_source: &str, fragment_source: &str) -> GpuResult<Self> {
        let id = gpu_check!(device, device.create_program(vertex_source, fragment_source))?;
        log::debug!("Linked shader program {id}");
        Ok(Self {
            resource: GpuResource::from_raw(device, ResourceKind::Program, id),
            uniforms: RefCell::new(HashMap::new()),
        })
    }

    /// The built-in textured, vertex-colored program
    pub fn default_program(device: &Rc<dyn GraphicsDevice>) -> GpuResult<Self> {
        Self::new(device, DEFAULT_VERTEX_SOURCE, DEFAULT_FRAGMENT_SOURCE)
    }

    /// Raw driver id
    pub const fn id(&self) -> u32 {
        self.resource.id()
    }

    /// Make this program current
    pub fn bind(&self) {
        debug_assert!(self.resource.is_valid(), "binding an empty program");
        let device = self.resource.device();
        gpu_check!(device, device.use_program(self.resource.id()));
    }

    /// Cached location of a uniform, `None` if the program has no such uniform
    pub fn uniform_location(&self, name: &str) -> Option<u32> {
        if let Some(location) = self.uniforms.borrow().get(name) {
            return *location;
        }
        let device = self.resource.device();
        let location = gpu_check!(device, device.uniform_location(self.resource.id(), name));
        if location.is_none() {
            log::warn!("Uniform `{name}` not found in program {}", self.id());
        }
        self.uniforms.borrow_mut().insert(name.to_string(), location);
        location
    }

    /// Upload a matrix; the program must be bound
    pub fn set_mat4(&self, name: &str, value: &Mat4) {
        if let Some(location) = self.uniform_location(name) {
            let mut columns = [0.0; 16];
            columns.copy_from_slice(value.as_slice());
            let device = self.resource.device();
            gpu_check!(device, device.set_uniform_mat4(location, &columns));
        }
    }

    /// Upload an integer or sampler unit; the program must be bound
    pub fn set_int(&self, name: &str, value: i32) {
        if let Some(location) = self.uniform_location(name) {
            let device = self.resource.device();
            gpu_check!(device, device.set_uniform_i32(location, value));
        }
    }
}

impl fmt::Debug for Shader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shader")
            .field("id", &self.id())
            .field("cached_uniforms", &self.uniforms.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;
    use crate::render::gpu::{GpuError, HeadlessDevice, ShaderStage};

    #[test]
    fn test_uniforms_reach_bound_program() {
        let device = Rc::new(HeadlessDevice::new());
        let dyn_device: Rc<dyn GraphicsDevice> = device.clone();
        let shader = Shader::default_program(&dyn_device).unwrap();
        shader.bind();

        let model = Mat4::new_translation(&Vec3::new(3.0, 4.0, 0.0));
        shader.set_mat4(MODEL_UNIFORM, &model);
        shader.set_int(TEXTURE_UNIFORM, 0);

        let uploaded = device.uniform_mat4(shader.id(), MODEL_UNIFORM).unwrap();
        assert_eq!(uploaded[12], 3.0);
        assert_eq!(uploaded[13], 4.0);
        assert_eq!(device.uniform_i32(shader.id(), TEXTURE_UNIFORM), Some(0));
    }

    #[test]
    fn test_location_is_cached() {
        let dyn_device: Rc<dyn GraphicsDevice> = Rc::new(HeadlessDevice::new());
        let shader = Shader::default_program(&dyn_device).unwrap();
        let first = shader.uniform_location(MODEL_UNIFORM);
        assert_eq!(shader.uniform_location(MODEL_UNIFORM), first);
        assert_eq!(shader.uniforms.borrow().len(), 1);
    }

    #[test]
    fn test_compile_failure_is_reported() {
        let dyn_device: Rc<dyn GraphicsDevice> = Rc::new(HeadlessDevice::new());
        assert!(matches!(
            Shader::new(&dyn_device, DEFAULT_VERTEX_SOURCE, ""),
            Err(GpuError::ShaderCompile {
                stage: ShaderStage::Fragment,
                ..
            })
        ));
    }
}
