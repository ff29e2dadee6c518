//! First-person camera steered by yaw and pitch

use super::{Camera, Camera3D, RenderTarget};
use crate::foundation::math::{utils, Mat4, Vec3};

/// Pitch limit in degrees, keeps the view from flipping over the poles
const PITCH_LIMIT: f32 = 89.0;

/// First-person perspective camera
///
/// Yaw 0 looks down +X, the default yaw of -90 looks down -Z. Mouse motion
/// turns the camera; movement is relative to where it looks.
#[derive(Debug, Clone)]
pub struct CameraFps {
    camera: Camera3D,
    yaw: f32,
    pitch: f32,
    world_up: Vec3,
    front: Vec3,
    right: Vec3,
    sensitivity: f32,
    speed: f32,
}

impl CameraFps {
    /// Camera at `position` looking down -Z
    pub fn new(position: Vec3, fov_degrees: f32, near: f32, far: f32) -> Self {
        let mut camera = Self {
            camera: Camera3D::new(position, position - Vec3::z(), fov_degrees, near, far),
            yaw: -90.0,
            pitch: 0.0,
            world_up: Vec3::y(),
            front: -Vec3::z(),
            right: Vec3::x(),
            sensitivity: 0.1,
            speed: 2.5,
        };
        camera.update_vectors();
        camera
    }

    /// Eye position
    pub const fn position(&self) -> Vec3 {
        self.camera.position()
    }

    /// Teleport the eye
    pub fn set_position(&mut self, position: Vec3) {
        self.camera.set_position(position);
        self.update_vectors();
    }

    /// Yaw in degrees
    pub const fn yaw(&self) -> f32 {
        self.yaw
    }

    /// Pitch in degrees, within +-89
    pub const fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Set both angles; pitch is clamped
    pub fn set_rotation(&mut self, yaw: f32, pitch: f32) {
        self.yaw = yaw;
        self.pitch = pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.update_vectors();
    }

    /// Unit view direction
    pub const fn front(&self) -> Vec3 {
        self.front
    }

    /// Unit right vector
    pub const fn right(&self) -> Vec3 {
        self.right
    }

    /// Degrees of turn per pixel of mouse motion
    pub const fn sensitivity(&self) -> f32 {
        self.sensitivity
    }

    /// Change the mouse sensitivity
    pub fn set_sensitivity(&mut self, sensitivity: f32) {
        self.sensitivity = sensitivity;
    }

    /// World units moved per second
    pub const fn speed(&self) -> f32 {
        self.speed
    }

    /// Change the movement speed
    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed;
    }

    /// Vertical field of view in degrees
    pub const fn fov(&self) -> f32 {
        self.camera.fov()
    }

    /// Change the vertical field of view
    pub fn set_fov(&mut self, fov_degrees: f32) {
        self.camera.set_fov(fov_degrees);
    }

    /// Change the clip distances
    pub fn set_clip_planes(&mut self, near: f32, far: f32) {
        self.camera.set_clip_planes(near, far);
    }

    /// Whether the next projection query for `target` recomputes
    pub fn is_projection_stale(&self, target: &dyn RenderTarget) -> bool {
        self.camera.is_projection_stale(target)
    }

    /// Turn by a mouse delta in pixels; screen y grows downwards
    pub fn process_mouse_motion(&mut self, dx: f32, dy: f32) {
        self.set_rotation(
            self.yaw + dx * self.sensitivity,
            self.pitch - dy * self.sensitivity,
        );
    }

    /// Move along the view direction; negative `dt` moves backwards
    pub fn move_forward(&mut self, dt: f32) {
        let position = self.position() + self.front * self.speed * dt;
        self.set_position(position);
    }

    /// Strafe along the right vector
    pub fn move_right(&mut self, dt: f32) {
        let position = self.position() + self.right * self.speed * dt;
        self.set_position(position);
    }

    /// Rise along the world up axis
    pub fn move_up(&mut self, dt: f32) {
        let position = self.position() + self.world_up * self.speed * dt;
        self.set_position(position);
    }

    fn update_vectors(&mut self) {
        let (yaw, pitch) = (utils::deg_to_rad(self.yaw), utils::deg_to_rad(self.pitch));
        self.front = Vec3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos()).normalize();
        self.right = self.front.cross(&self.world_up).normalize();
        let up = self.right.cross(&self.front).normalize();
        let position = self.camera.position();
        self.camera.look_at(position + self.front, up);
    }
}

impl Camera for CameraFps {
    fn view_matrix(&self) -> Mat4 {
        self.camera.view_matrix()
    }

    fn projection_matrix(&mut self, target: &dyn RenderTarget) -> Mat4 {
        self.camera.projection_matrix(target)
    }

    fn inverse_projection_matrix(&mut self, target: &dyn RenderTarget) -> Mat4 {
        self.camera.inverse_projection_matrix(target)
    }

    fn projection_recompute_count(&self) -> usize {
        self.camera.projection_recompute_count()
    }

    fn inverse_recompute_count(&self) -> usize {
        self.camera.inverse_recompute_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::camera::OffscreenTarget;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_orientation_faces_negative_z() {
        let camera = CameraFps::new(Vec3::zeros(), 60.0, 0.1, 100.0);
        assert_relative_eq!(camera.front(), -Vec3::z(), epsilon = 1e-5);
        assert_relative_eq!(camera.right(), Vec3::x(), epsilon = 1e-5);
    }

    #[test]
    fn test_pitch_is_clamped() {
        let mut camera = CameraFps::new(Vec3::zeros(), 60.0, 0.1, 100.0);
        camera.process_mouse_motion(0.0, -10_000.0);
        assert_relative_eq!(camera.pitch(), 89.0);
        camera.process_mouse_motion(0.0, 10_000.0);
        assert_relative_eq!(camera.pitch(), -89.0);
    }

    #[test]
    fn test_movement_follows_view() {
        let mut camera = CameraFps::new(Vec3::zeros(), 60.0, 0.1, 100.0);
        camera.set_speed(1.0);
        camera.move_forward(2.0);
        assert_relative_eq!(camera.position(), Vec3::new(0.0, 0.0, -2.0), epsilon = 1e-5);

        camera.set_rotation(0.0, 0.0);
        camera.move_forward(1.0);
        camera.move_up(1.0);
        assert_relative_eq!(camera.position(), Vec3::new(1.0, 1.0, -2.0), epsilon = 1e-5);
    }

    #[test]
    fn test_turning_does_not_touch_projection() {
        let mut camera = CameraFps::new(Vec3::zeros(), 60.0, 0.1, 100.0);
        let target = OffscreenTarget::new(800, 600);
        camera.projection_matrix(&target);
        camera.process_mouse_motion(25.0, 5.0);
        camera.move_right(0.5);
        camera.projection_matrix(&target);
        assert_eq!(camera.projection_recompute_count(), 1);

        camera.set_fov(45.0);
        assert!(camera.is_projection_stale(&target));
    }
}
