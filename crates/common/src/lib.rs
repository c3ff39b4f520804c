//! Shared types: identities, transforms, camera state.

mod camera;
mod types;

pub use camera::CameraState;
pub use types::{Transform, VariantId, wrap_angle};
