use winit::{
    dpi::PhysicalPosition,
    event::{DeviceEvent, ElementState, KeyEvent, MouseScrollDelta},
    keyboard::{KeyCode, PhysicalKey},
};

use super::orbit_camera::OrbitCamera;

/// Mouse and keyboard input for the orbit camera
///
/// Left drag orbits, the wheel zooms and `A` toggles the orbit animation.
pub struct CameraController {
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    is_mouse_pressed: bool,
}

impl CameraController {
    pub fn new(rotate_speed: f32, zoom_speed: f32) -> Self {
        Self {
            rotate_speed,
            zoom_speed,
            is_mouse_pressed: false,
        }
    }

    /// Returns true when the camera moved
    pub fn process_events(&mut self, event: &DeviceEvent, camera: &mut OrbitCamera) -> bool {
        match event {
            DeviceEvent::Button {
                button: 0, // Left Mouse Button
                state,
            } => {
                self.is_mouse_pressed = *state == ElementState::Pressed;
                false
            }
            DeviceEvent::MouseWheel { delta } => {
                let scroll_amount = -match delta {
                    MouseScrollDelta::LineDelta(_, scroll) => *scroll,
                    MouseScrollDelta::PixelDelta(PhysicalPosition { y: scroll, .. }) => {
                        *scroll as f32 / 20.0
                    }
                };
                camera.add_distance(scroll_amount * self.zoom_speed);
                true
            }
            DeviceEvent::MouseMotion { delta } if self.is_mouse_pressed => {
                camera.add_yaw(-delta.0 as f32 * self.rotate_speed);
                camera.add_pitch(delta.1 as f32 * self.rotate_speed);
                true
            }
            _ => false,
        }
    }

    pub fn process_keyed_events(&mut self, event: &KeyEvent, camera: &mut OrbitCamera) {
        if let KeyEvent {
            physical_key: PhysicalKey::Code(KeyCode::KeyA),
            state: ElementState::Pressed,
            repeat: false,
            ..
        } = event
        {
            camera.toggle_animation();
        }
    }

    pub fn is_rotating(&self) -> bool {
        self.is_mouse_pressed
    }
}

impl Default for CameraController {
    fn default() -> Self {
        Self::new(0.005, 0.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CameraConfig;

    #[test]
    fn test_motion_ignored_until_button_pressed() {
        let mut controller = CameraController::default();
        let mut camera = OrbitCamera::new(&CameraConfig::default(), 1.0);
        let yaw = camera.yaw;

        let motion = DeviceEvent::MouseMotion { delta: (40.0, 0.0) };
        assert!(!controller.process_events(&motion, &mut camera));
        assert_eq!(camera.yaw, yaw);

        let press = DeviceEvent::Button {
            button: 0,
            state: ElementState::Pressed,
        };
        controller.process_events(&press, &mut camera);
        assert!(controller.is_rotating());
        assert!(controller.process_events(&motion, &mut camera));
        assert_ne!(camera.yaw, yaw);
    }

    #[test]
    fn test_wheel_zooms() {
        let mut controller = CameraController::default();
        let mut camera = OrbitCamera::new(&CameraConfig::default(), 1.0);
        let wheel = DeviceEvent::MouseWheel {
            delta: MouseScrollDelta::LineDelta(0.0, 1.0),
        };
        controller.process_events(&wheel, &mut camera);
        assert!(camera.distance < CameraConfig::default().distance);
    }
}
