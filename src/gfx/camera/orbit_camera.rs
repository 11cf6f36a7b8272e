use std::f32::consts::{FRAC_PI_2, TAU};

use cgmath::*;

use super::camera_utils::Camera;
use crate::config::CameraConfig;

/// Remaps OpenGL clip depth (-1..1) to wgpu's 0..1; arguments are column-major
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: cgmath::Matrix4<f32> = cgmath::Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Y-up camera orbiting a target point
///
/// `yaw` is measured from +Z towards +X, `pitch` upwards from the XZ plane.
/// While `animating`, [`OrbitCamera::animate`] sweeps the yaw and raises the
/// eye over the front half of the orbit.
#[derive(Debug, Clone, Copy)]
pub struct OrbitCamera {
    pub distance: f32,
    pub pitch: f32,
    pub yaw: f32,
    pub eye: Vector3<f32>,
    pub target: Vector3<f32>,
    pub up: Vector3<f32>,
    pub bounds: OrbitCameraBounds,
    pub aspect: f32,
    pub fovy: Rad<f32>,
    pub znear: f32,
    pub zfar: f32,
    /// Radians per second
    pub orbit_speed: f32,
    pub animating: bool,
}

impl Camera for OrbitCamera {
    fn build_view_projection_matrix(&self) -> Matrix4<f32> {
        self.projection_matrix() * self.view_matrix()
    }
}

impl OrbitCamera {
    pub fn new(config: &CameraConfig, aspect: f32) -> Self {
        let mut camera = Self {
            distance: config.distance,
            pitch: 0.0,
            yaw: 0.0,
            eye: Vector3::zero(), // recalculated by `update()`
            target: Vector3::zero(),
            up: Vector3::unit_y(),
            bounds: OrbitCameraBounds {
                max_distance: Some(config.far * 0.8),
                ..Default::default()
            },
            aspect,
            fovy: Deg(config.fov_y_degrees).into(),
            znear: config.near,
            zfar: config.far,
            orbit_speed: config.orbit_speed,
            animating: config.animate,
        };
        camera.update();
        camera
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(
            Point3::from_vec(self.eye),
            Point3::from_vec(self.target),
            self.up,
        )
    }

    pub fn projection_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }

    /// View-projection with the translation removed, for drawing the sky
    /// around the eye
    pub fn sky_view_projection_matrix(&self) -> Matrix4<f32> {
        let mut view = self.view_matrix();
        view.w = Vector4::new(0.0, 0.0, 0.0, 1.0);
        self.projection_matrix() * view
    }

    pub fn toggle_animation(&mut self) {
        self.animating = !self.animating;
        log::info!(
            "Orbit animation {}",
            if self.animating { "started" } else { "stopped" }
        );
    }

    /// Advances the orbit animation by `dt` seconds
    ///
    /// The eye rises while `sin(yaw)` is positive and stays on the ground
    /// plane otherwise, so it never dips below the target.
    pub fn animate(&mut self, dt: f32) {
        if !self.animating {
            return;
        }
        self.yaw = (self.yaw + self.orbit_speed * dt).rem_euclid(TAU);
        self.pitch = self.yaw.sin().max(0.0).atan();
        self.update();
    }

    pub fn set_distance(&mut self, distance: f32) {
        self.distance = distance.clamp(
            self.bounds.min_distance.unwrap_or(f32::EPSILON),
            self.bounds.max_distance.unwrap_or(f32::MAX),
        );
        self.update();
    }

    /// Multiplicative zoom, so steps feel the same near and far
    pub fn add_distance(&mut self, delta: f32) {
        self.set_distance(self.distance * (1.0 + delta));
    }

    pub fn set_pitch(&mut self, pitch: f32) {
        self.pitch = pitch.clamp(self.bounds.min_pitch, self.bounds.max_pitch);
        self.update();
    }

    pub fn add_pitch(&mut self, delta: f32) {
        self.set_pitch(self.pitch + delta);
    }

    pub fn set_yaw(&mut self, yaw: f32) {
        self.yaw = yaw.rem_euclid(TAU);
        self.update();
    }

    pub fn add_yaw(&mut self, delta: f32) {
        self.set_yaw(self.yaw + delta);
    }

    /// Updates the camera after changing `distance`, `pitch` or `yaw`.
    fn update(&mut self) {
        self.eye =
            calculate_cartesian_eye_position(self.pitch, self.yaw, self.distance, self.target);
    }

    pub fn resize_projection(&mut self, width: u32, height: u32) {
        if height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OrbitCameraBounds {
    pub min_distance: Option<f32>,
    pub max_distance: Option<f32>,
    pub min_pitch: f32,
    pub max_pitch: f32,
}

impl Default for OrbitCameraBounds {
    fn default() -> Self {
        Self {
            min_distance: Some(1.0),
            max_distance: None,
            min_pitch: -FRAC_PI_2 + 0.01,
            max_pitch: FRAC_PI_2 - 0.01,
        }
    }
}

fn calculate_cartesian_eye_position(
    pitch: f32,
    yaw: f32,
    distance: f32,
    target: Vector3<f32>,
) -> Vector3<f32> {
    Vector3::new(
        distance * yaw.sin() * pitch.cos(),
        distance * pitch.sin(),
        distance * yaw.cos() * pitch.cos(),
    ) + target
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> OrbitCamera {
        OrbitCamera::new(&CameraConfig::default(), 4.0 / 3.0)
    }

    #[test]
    fn test_initial_eye_on_positive_z() {
        let camera = camera();
        assert!((camera.eye - Vector3::new(0.0, 0.0, 75.0)).magnitude() < 1e-4);
    }

    #[test]
    fn test_animation_keeps_eye_above_ground_and_on_sphere() {
        let mut camera = camera();
        camera.animating = true;

        let mut highest = 0.0f32;
        for _ in 0..2000 {
            camera.animate(1.0 / 60.0);
            let offset = camera.eye - camera.target;
            assert!(camera.eye.y >= 0.0, "eye below ground: {:?}", camera.eye);
            assert!((offset.magnitude() - camera.distance).abs() < 1e-3);
            assert!((0.0..TAU).contains(&camera.yaw));
            highest = highest.max(camera.eye.y);
        }
        // a full sweep passes sin(yaw) = 1, i.e. 45 degrees up
        let expected = camera.distance * std::f32::consts::FRAC_1_SQRT_2;
        assert!((highest - expected).abs() < 0.5, "peak height {highest}");
    }

    #[test]
    fn test_animation_paused_does_nothing() {
        let mut camera = camera();
        let before = camera.eye;
        camera.animate(10.0);
        assert_eq!(camera.eye, before);

        camera.toggle_animation();
        camera.animate(1.0);
        assert_ne!(camera.eye, before);
    }

    #[test]
    fn test_zoom_clamped_to_bounds() {
        let mut camera = camera();
        camera.add_distance(-10.0);
        assert_eq!(camera.distance, 1.0);
        camera.set_distance(1.0e6);
        assert_eq!(camera.distance, camera.zfar * 0.8);
    }

    #[test]
    fn test_sky_matrix_ignores_eye_position() {
        let mut a = camera();
        let mut b = camera();
        a.set_distance(10.0);
        b.set_distance(200.0);
        assert_eq!(a.sky_view_projection_matrix(), b.sky_view_projection_matrix());
        assert_ne!(a.build_view_projection_matrix(), b.build_view_projection_matrix());
    }

    #[test]
    fn test_target_projects_to_screen_center() {
        let camera = camera();
        let clip = camera.build_view_projection_matrix() * Vector4::new(0.0, 0.0, 0.0, 1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-5 && ndc.y.abs() < 1e-5);
        assert!((0.0..=1.0).contains(&ndc.z));
    }

    #[test]
    fn test_near_and_far_planes_map_to_unit_depth() {
        let camera = camera();
        let depth = |distance: f32| {
            let view = Vector4::new(0.0, 0.0, -distance, 1.0);
            let clip = camera.projection_matrix() * view;
            clip.z / clip.w
        };
        assert!(depth(camera.znear).abs() < 1e-5, "near {}", depth(camera.znear));
        assert!((depth(camera.zfar) - 1.0).abs() < 1e-4, "far {}", depth(camera.zfar));

        let halfway = depth((camera.znear + camera.zfar) * 0.5);
        assert!(halfway > 0.0 && halfway < 1.0);
    }

    #[test]
    fn test_depth_remap_keeps_w() {
        let clip = OPENGL_TO_WGPU_MATRIX * Vector4::new(0.3, -0.2, -1.0, 1.0);
        assert_eq!(clip, Vector4::new(0.3, -0.2, 0.0, 1.0));
        let clip = OPENGL_TO_WGPU_MATRIX * Vector4::new(0.0, 0.0, 1.0, 1.0);
        assert_eq!(clip, Vector4::new(0.0, 0.0, 1.0, 1.0));
    }
}
