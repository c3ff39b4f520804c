//! Input collaborator: raw window input is mapped to [`Action`]s, which a
//! [`CameraController`] turns into the camera the frame driver reads.
//!
//! # Invariants
//! - The frame driver consumes controllers only through [`CameraController`].
//! - Interaction state follows gesture boundaries, not camera motion, so
//!   damping after a release does not count as interaction.

pub mod action;
mod controller;
mod orbit;

pub use action::Action;
pub use controller::CameraController;
pub use orbit::{OrbitControls, OrbitSettings};
