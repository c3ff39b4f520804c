//! Surface Variant: one renderable representation of the globe at a fixed
//! polygon resolution.
//!
//! # Invariants
//! - Geometry is owned exclusively by its variant.
//! - Material state is copy-on-write; mutating one variant's material never
//!   leaks into another variant.
//! - Normals always describe the displacement currently bound to the
//!   material (see [`SurfaceVariant::verify_consistency`]).

mod displacement;
mod geometry;
mod material;
mod variant;

pub use displacement::{AssetId, DisplacementMap};
pub use geometry::{Geometry, Resolution};
pub use material::Material;
pub use variant::{NormalsState, StaleStateError, SurfaceError, SurfaceVariant};
