use globe_common::CameraState;

use crate::scene::GlobeScene;

/// Rendering collaborator driven once per tick.
///
/// Backends read the scene and camera; all mutation happens in the kernel.
pub trait RenderBackend {
    /// Draw one frame.
    fn render(&mut self, scene: &GlobeScene, camera: &CameraState);

    /// Ask the host to schedule another tick.
    fn request_next_tick(&mut self);

    /// The output surface changed size, in physical pixels.
    fn resize(&mut self, width: u32, height: u32);
}
