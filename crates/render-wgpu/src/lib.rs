//! wgpu render backend for the globe.
//!
//! Draws the visible surface variant lit by the scene's ambient and
//! directional lights, an alpha-blended cloud shell and a point starfield.
//!
//! # Invariants
//! - Renderer never mutates the scene.
//! - Variant meshes are cached by variant id and re-uploaded only when the
//!   variant's geometry generation changes.

mod backend;
mod gpu;
mod shaders;

pub use backend::{GpuError, WgpuBackend};
pub use gpu::GlobeRenderer;
