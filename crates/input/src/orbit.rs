use glam::Vec3;
use globe_common::CameraState;
use serde::{Deserialize, Serialize};
use std::f32::consts::{PI, TAU};

use crate::action::Action;
use crate::controller::CameraController;

/// Keeps the polar angle off the poles so the view never flips.
const POLAR_EPSILON: f32 = 1e-4;
/// Per-step radius multiplier for positive zoom.
const ZOOM_STEP: f32 = 0.95;
/// Accumulated rotation below this is dropped instead of decayed forever.
const SETTLE_EPSILON: f32 = 1e-6;

/// Tuning for [`OrbitControls`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrbitSettings {
    /// Fraction of pending rotation applied per update. `0` disables damping.
    pub damping: f32,
    pub rotate_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub start_distance: f32,
}

impl Default for OrbitSettings {
    fn default() -> Self {
        Self {
            damping: 0.05,
            rotate_speed: 0.8,
            min_distance: 6.0,
            max_distance: 50.0,
            start_distance: 15.0,
        }
    }
}

/// Orbits the camera around the origin on a sphere. No panning: the target
/// is always the globe centre.
#[derive(Debug, Clone)]
pub struct OrbitControls {
    settings: OrbitSettings,
    radius: f32,
    /// Azimuth about +Y, measured from +Z.
    theta: f32,
    /// Polar angle from +Y.
    phi: f32,
    pending_theta: f32,
    pending_phi: f32,
    pending_scale: f32,
    interacting: bool,
    viewport_height: f32,
    camera: CameraState,
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self::new(OrbitSettings::default())
    }
}

impl OrbitControls {
    pub fn new(settings: OrbitSettings) -> Self {
        let radius = settings
            .start_distance
            .clamp(settings.min_distance, settings.max_distance);
        let mut controls = Self {
            settings,
            radius,
            theta: 0.0,
            phi: PI / 2.0,
            pending_theta: 0.0,
            pending_phi: 0.0,
            pending_scale: 1.0,
            interacting: false,
            viewport_height: 1.0,
            camera: CameraState::default(),
        };
        controls.camera.position = controls.spherical_position();
        controls
    }

    pub fn settings(&self) -> &OrbitSettings {
        &self.settings
    }

    pub fn distance(&self) -> f32 {
        self.radius
    }

    /// Rotate around +Y by `angle` radians, applied over the next updates.
    pub fn rotate_left(&mut self, angle: f32) {
        self.pending_theta -= angle;
    }

    pub fn rotate_up(&mut self, angle: f32) {
        self.pending_phi -= angle;
    }

    /// Scale the orbit radius by `factor` on the next update.
    pub fn dolly(&mut self, factor: f32) {
        if factor.is_finite() && factor > 0.0 {
            self.pending_scale *= factor;
        }
    }

    fn spherical_position(&self) -> Vec3 {
        let sin_phi = self.phi.sin();
        Vec3::new(
            self.radius * sin_phi * self.theta.sin(),
            self.radius * self.phi.cos(),
            self.radius * sin_phi * self.theta.cos(),
        )
    }
}

impl CameraController for OrbitControls {
    fn apply(&mut self, action: Action) {
        match action {
            Action::GestureStart => {
                self.interacting = true;
                tracing::trace!("orbit gesture started");
            }
            Action::GestureEnd => {
                self.interacting = false;
                tracing::trace!("orbit gesture ended");
            }
            Action::Orbit { dx, dy } => {
                let per_pixel = TAU * self.settings.rotate_speed / self.viewport_height;
                self.rotate_left(dx * per_pixel);
                self.rotate_up(dy * per_pixel);
            }
            Action::Zoom(steps) => self.dolly(ZOOM_STEP.powf(steps)),
            Action::Resize { width, height } => {
                self.viewport_height = height.max(1) as f32;
                self.set_aspect(width.max(1) as f32 / self.viewport_height);
            }
        }
    }

    fn update(&mut self) -> bool {
        let before = self.camera.position;
        let damping = self.settings.damping;
        let step = if damping > 0.0 { damping.min(1.0) } else { 1.0 };

        self.theta += self.pending_theta * step;
        self.phi = (self.phi + self.pending_phi * step).clamp(POLAR_EPSILON, PI - POLAR_EPSILON);
        self.radius = (self.radius * self.pending_scale)
            .clamp(self.settings.min_distance, self.settings.max_distance);
        self.pending_scale = 1.0;

        if step < 1.0 {
            self.pending_theta *= 1.0 - step;
            self.pending_phi *= 1.0 - step;
        } else {
            self.pending_theta = 0.0;
            self.pending_phi = 0.0;
        }
        if self.pending_theta.abs() < SETTLE_EPSILON {
            self.pending_theta = 0.0;
        }
        if self.pending_phi.abs() < SETTLE_EPSILON {
            self.pending_phi = 0.0;
        }

        self.camera.position = self.spherical_position();
        self.camera.is_user_interacting = self.interacting;
        before.distance_squared(self.camera.position) > 1e-12
    }

    fn camera(&self) -> CameraState {
        CameraState {
            is_user_interacting: self.interacting,
            ..self.camera
        }
    }

    fn is_interacting(&self) -> bool {
        self.interacting
    }

    fn set_aspect(&mut self, aspect: f32) {
        if aspect.is_finite() && aspect > 0.0 {
            self.camera.aspect = aspect;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settle(controls: &mut OrbitControls) {
        for _ in 0..1000 {
            controls.update();
        }
    }

    #[test]
    fn starts_on_positive_z() {
        let controls = OrbitControls::default();
        let cam = controls.camera();
        assert!((cam.position - Vec3::new(0.0, 0.0, 15.0)).length() < 1e-4);
        assert!(!controls.is_interacting());
    }

    #[test]
    fn zoom_is_clamped() {
        let mut controls = OrbitControls::default();
        controls.apply(Action::Zoom(-1000.0));
        controls.update();
        assert!((controls.camera().distance_from_origin() - 50.0).abs() < 1e-3);

        controls.apply(Action::Zoom(1000.0));
        controls.update();
        assert!((controls.camera().distance_from_origin() - 6.0).abs() < 1e-3);
    }

    #[test]
    fn damping_spreads_rotation_over_updates() {
        let mut controls = OrbitControls::default();
        controls.apply(Action::Resize {
            width: 1000,
            height: 1000,
        });
        controls.apply(Action::Orbit { dx: 100.0, dy: 0.0 });
        let full = TAU * 0.8 * 100.0 / 1000.0;

        assert!(controls.update());
        let first = controls.theta;
        assert!((first + full * 0.05).abs() < 1e-5);

        // keeps drifting with no further input
        assert!(controls.update());
        assert!(controls.theta.abs() > first.abs());

        settle(&mut controls);
        assert!((controls.theta + full).abs() < 1e-3);
        assert!(!controls.update());
    }

    #[test]
    fn orbit_preserves_distance() {
        let mut controls = OrbitControls::default();
        controls.apply(Action::Orbit { dx: 0.3, dy: -0.2 });
        settle(&mut controls);
        assert!((controls.camera().distance_from_origin() - 15.0).abs() < 1e-3);
    }

    #[test]
    fn polar_angle_never_flips_over_the_pole() {
        let mut controls = OrbitControls::default();
        controls.apply(Action::Orbit { dx: 0.0, dy: 50.0 });
        settle(&mut controls);
        let cam = controls.camera();
        assert!(controls.phi >= POLAR_EPSILON);
        assert!((cam.distance_from_origin() - 15.0).abs() < 1e-3);
        assert!(!cam.position.is_nan());
    }

    #[test]
    fn gestures_toggle_interaction() {
        let mut controls = OrbitControls::default();
        controls.apply(Action::GestureStart);
        assert!(controls.is_interacting());
        controls.update();
        assert!(controls.camera().is_user_interacting);
        controls.apply(Action::GestureEnd);
        assert!(!controls.is_interacting());
        assert!(!controls.camera().is_user_interacting);
    }

    #[test]
    fn resize_updates_aspect() {
        let mut controls = OrbitControls::default();
        controls.apply(Action::Resize {
            width: 800,
            height: 400,
        });
        assert_eq!(controls.camera().aspect, 2.0);
        controls.set_aspect(f32::NAN);
        assert_eq!(controls.camera().aspect, 2.0);
    }

    #[test]
    fn without_damping_rotation_applies_at_once() {
        let mut controls = OrbitControls::new(OrbitSettings {
            damping: 0.0,
            ..OrbitSettings::default()
        });
        controls.rotate_left(0.5);
        controls.update();
        assert!((controls.theta + 0.5).abs() < 1e-6);
        assert!(!controls.update());
    }
}
