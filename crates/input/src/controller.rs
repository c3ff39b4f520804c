use globe_common::CameraState;

use crate::action::Action;

/// Camera input collaborator of the frame driver.
pub trait CameraController {
    /// Feed one input action. Motion is accumulated and applied by `update`.
    fn apply(&mut self, action: Action);

    /// Advance damping and inertia by one tick. Returns whether the camera moved.
    fn update(&mut self) -> bool;

    fn camera(&self) -> CameraState;

    /// True between a gesture's start and end.
    fn is_interacting(&self) -> bool;

    fn set_aspect(&mut self, aspect: f32);
}
