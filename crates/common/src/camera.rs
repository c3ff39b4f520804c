use glam::{Mat4, Vec3};

/// Camera snapshot handed from the input collaborator to the frame driver
/// and renderers. Always looks at the origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraState {
    pub position: Vec3,
    pub is_user_interacting: bool,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 15.0),
            is_user_interacting: false,
            fov_y: 75.0_f32.to_radians(),
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl CameraState {
    /// Distance from the globe centre, the input to LOD selection.
    pub fn distance_from_origin(&self) -> f32 {
        self.position.length()
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, Vec3::ZERO, Vec3::Y)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_camera_sits_on_z_axis() {
        let cam = CameraState::default();
        assert_eq!(cam.distance_from_origin(), 15.0);
        assert!(!cam.is_user_interacting);
        let vp = cam.view_projection();
        assert!(!vp.col(0).x.is_nan());
    }

    #[test]
    fn distance_is_euclidean() {
        let cam = CameraState {
            position: Vec3::new(3.0, 4.0, 0.0),
            ..CameraState::default()
        };
        assert_eq!(cam.distance_from_origin(), 5.0);
    }
}
