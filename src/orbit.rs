use std::f32::consts::{PI, TAU};

use crate::math::{Mat4, Quat, Vec3};
use crate::scene_graph::Transform;

/// Spherical-coordinate camera rig. Input handlers only stage deltas; the
/// per-frame `update` applies and clamps them, then writes the camera pose.
pub struct OrbitControls {
    pub target: Vec3,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Kept strictly inside (0, PI) so the rig never collapses onto the
    /// vertical axis.
    pub min_polar_angle: f32,
    pub max_polar_angle: f32,
    pub enable_damping: bool,
    pub damping_factor: f32,

    radius: f32,
    polar: f32,
    azimuth: f32,

    delta_polar: f32,
    delta_azimuth: f32,
    delta_radius: f32,

    dragging: bool,
    last_pointer: (f32, f32),
    viewport_height: f32,
}

impl OrbitControls {
    pub fn new() -> Self {
        Self {
            target: Vec3::ZERO,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            min_distance: 0.2,
            max_distance: 200.0,
            min_polar_angle: 0.05,
            max_polar_angle: PI - 0.05,
            enable_damping: true,
            damping_factor: 0.08,
            radius: 5.0,
            polar: PI / 2.0,
            azimuth: 0.0,
            delta_polar: 0.0,
            delta_azimuth: 0.0,
            delta_radius: 0.0,
            dragging: false,
            last_pointer: (0.0, 0.0),
            viewport_height: 1.0,
        }
    }

    pub fn set_viewport_height(&mut self, height: f32) {
        self.viewport_height = height.max(1.0);
    }

    /// Derives the spherical state from an existing camera position.
    pub fn sync_from_position(&mut self, position: Vec3) {
        let offset = position - self.target;
        self.radius = offset.length().max(self.min_distance);
        self.polar = (offset.y / self.radius).clamp(-1.0, 1.0).acos();
        self.azimuth = offset.x.atan2(offset.z);
        self.delta_polar = 0.0;
        self.delta_azimuth = 0.0;
        self.delta_radius = 0.0;
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn pointer_down(&mut self, x: f32, y: f32) {
        self.dragging = true;
        self.last_pointer = (x, y);
    }

    pub fn pointer_up(&mut self) {
        self.dragging = false;
    }

    /// Pixel deltas map to angles relative to the viewport height, so a
    /// full-height drag is one revolution regardless of window size.
    pub fn pointer_move(&mut self, x: f32, y: f32) {
        if !self.dragging {
            return;
        }
        let (last_x, last_y) = self.last_pointer;
        let dx = x - last_x;
        let dy = y - last_y;
        self.last_pointer = (x, y);

        self.delta_azimuth -= TAU * dx / self.viewport_height * self.rotate_speed;
        self.delta_polar -= TAU * dy / self.viewport_height * self.rotate_speed;
    }

    /// Positive `delta_y` (scrolling toward the user) zooms out. The step is
    /// proportional to the current radius, so zooming feels uniform at any
    /// distance.
    pub fn wheel(&mut self, delta_y: f32) {
        self.delta_radius += self.radius * self.zoom_speed * 0.001 * delta_y;
    }

    /// Applies staged deltas and writes the resulting pose into the camera
    /// node's transform. Call once per rendered frame.
    pub fn update(&mut self, camera_transform: &mut Transform) {
        if self.enable_damping {
            self.azimuth += self.delta_azimuth * self.damping_factor;
            self.polar += self.delta_polar * self.damping_factor;
        } else {
            self.azimuth += self.delta_azimuth;
            self.polar += self.delta_polar;
        }
        self.polar = self.polar.clamp(self.min_polar_angle, self.max_polar_angle);

        self.radius =
            (self.radius + self.delta_radius).clamp(self.min_distance, self.max_distance);
        self.delta_radius = 0.0;

        if self.enable_damping {
            self.delta_azimuth *= 1.0 - self.damping_factor;
            self.delta_polar *= 1.0 - self.damping_factor;
        } else {
            self.delta_azimuth = 0.0;
            self.delta_polar = 0.0;
        }

        let position = self.target + self.position_offset();
        camera_transform.set_position(position);

        let orientation = Mat4::look_at(position, self.target, Vec3::Y);
        camera_transform.set_rotation(Quat::from_rotation_matrix(&orientation));
    }

    fn position_offset(&self) -> Vec3 {
        let sin_polar = self.polar.sin();
        Vec3::new(
            self.radius * sin_polar * self.azimuth.sin(),
            self.radius * self.polar.cos(),
            self.radius * sin_polar * self.azimuth.cos(),
        )
    }
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_keeps_camera_on_the_sphere() {
        let mut controls = OrbitControls::new();
        controls.enable_damping = false;
        controls.sync_from_position(Vec3::new(0.0, 0.0, 5.0));

        let mut transform = Transform::new();
        controls.update(&mut transform);
        let distance = (transform.position() - controls.target).length();
        assert!((distance - 5.0).abs() < 1e-5);
    }

    #[test]
    fn radius_clamps_to_bounds() {
        let mut controls = OrbitControls::new();
        controls.enable_damping = false;
        controls.sync_from_position(Vec3::new(0.0, 0.0, 5.0));

        let mut transform = Transform::new();
        controls.wheel(1e9);
        controls.update(&mut transform);
        assert_eq!(controls.radius(), controls.max_distance);

        controls.wheel(-1e9);
        controls.update(&mut transform);
        assert_eq!(controls.radius(), controls.min_distance);
    }

    #[test]
    fn polar_angle_stays_inside_bounds() {
        let mut controls = OrbitControls::new();
        controls.enable_damping = false;
        controls.set_viewport_height(100.0);
        controls.sync_from_position(Vec3::new(0.0, 0.0, 5.0));

        // Drag far past the pole.
        controls.pointer_down(0.0, 0.0);
        controls.pointer_move(0.0, 1000.0);
        let mut transform = Transform::new();
        controls.update(&mut transform);

        let offset = transform.position() - controls.target;
        let polar = (offset.y / offset.length()).clamp(-1.0, 1.0).acos();
        assert!(polar >= controls.min_polar_angle - 1e-5);
        assert!(polar <= controls.max_polar_angle + 1e-5);
    }

    #[test]
    fn undamped_deltas_are_consumed_in_one_update() {
        let mut controls = OrbitControls::new();
        controls.enable_damping = false;
        controls.set_viewport_height(100.0);
        controls.sync_from_position(Vec3::new(0.0, 0.0, 5.0));

        controls.pointer_down(0.0, 0.0);
        controls.pointer_move(10.0, 0.0);

        let mut transform = Transform::new();
        controls.update(&mut transform);
        let after_first = transform.position();
        controls.update(&mut transform);
        let after_second = transform.position();

        assert!((after_first - after_second).length() < 1e-6);
    }
}
