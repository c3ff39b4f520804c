use serde::{Deserialize, Serialize};

/// A high-level camera action produced by whatever window or test harness
/// drives the globe. Controllers consume actions, never raw events.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Action {
    /// A drag or pinch began.
    GestureStart,
    /// The gesture ended; the camera may keep drifting under damping.
    GestureEnd,
    /// Pointer movement in pixels while orbiting.
    Orbit { dx: f32, dy: f32 },
    /// Wheel steps. Positive moves toward the globe.
    Zoom(f32),
    /// Viewport size in physical pixels.
    Resize { width: u32, height: u32 },
}
