use globe_common::VariantId;
use std::sync::Arc;

use crate::displacement::AssetId;
use crate::geometry::{Geometry, Resolution};
use crate::material::Material;

/// Errors from building surface data.
#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    #[error("invalid resolution {lat}x{lon}: need lat >= 2 and lon >= 3")]
    InvalidResolution { lat: u32, lon: u32 },
    #[error("displacement map {width}x{height} cannot hold {len} samples")]
    InvalidDisplacement { width: u32, height: u32, len: usize },
}

/// A variant whose normals were computed from different displacement state
/// than its material now carries. Unreachable unless the atomic
/// swap-then-recompute sequence was broken.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error(
    "variant {variant:?} has stale normals: material displacement {material:?} (scale {material_scale}), normals from {normals:?} (scale {normals_scale})"
)]
pub struct StaleStateError {
    pub variant: VariantId,
    pub material: Option<AssetId>,
    pub material_scale: f32,
    pub normals: Option<AssetId>,
    pub normals_scale: f32,
}

/// Which displacement state the current normals were derived from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalsState {
    pub displacement: Option<AssetId>,
    pub scale: f32,
    pub bias: f32,
    /// Number of recomputes performed on this variant.
    pub recomputes: u64,
}

/// One renderable representation of the globe at a fixed polygon resolution.
#[derive(Debug, Clone)]
pub struct SurfaceVariant {
    id: VariantId,
    resolution: Resolution,
    geometry: Geometry,
    material: Arc<Material>,
    activation_distance: f32,
    visible: bool,
    normals: NormalsState,
}

impl SurfaceVariant {
    /// Build a variant whose normals already match `material`.
    pub fn new(
        resolution: Resolution,
        radius: f32,
        material: Arc<Material>,
    ) -> Result<Self, SurfaceError> {
        let geometry = Geometry::uv_sphere(radius, resolution)?;
        let mut variant = Self {
            id: VariantId::new(),
            resolution,
            geometry,
            material,
            activation_distance: 0.0,
            visible: false,
            normals: NormalsState {
                displacement: None,
                scale: 0.0,
                bias: 0.0,
                recomputes: 0,
            },
        };
        variant.recompute_normals();
        variant.normals.recomputes = 0;
        Ok(variant)
    }

    pub fn id(&self) -> VariantId {
        self.id
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn material(&self) -> &Material {
        &self.material
    }

    /// The shared handle, for checking whether two variants still share state.
    pub fn material_handle(&self) -> &Arc<Material> {
        &self.material
    }

    /// Variant-local mutable access; clones the material if it is shared.
    pub fn material_mut(&mut self) -> &mut Material {
        Arc::make_mut(&mut self.material)
    }

    pub fn set_material(&mut self, material: Arc<Material>) {
        self.material = material;
    }

    pub fn activation_distance(&self) -> f32 {
        self.activation_distance
    }

    pub fn set_activation_distance(&mut self, distance: f32) {
        self.activation_distance = distance;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn normals_state(&self) -> NormalsState {
        self.normals
    }

    pub fn normals_recomputed(&self) -> u64 {
        self.normals.recomputes
    }

    /// Re-apply the material's displacement to the geometry and rebuild
    /// normals so lighting follows the new relief.
    pub fn recompute_normals(&mut self) {
        self.geometry.displace(&self.material);
        self.geometry.recompute_normals();
        self.normals = NormalsState {
            displacement: self.material.displacement_id(),
            scale: self.material.displacement_scale,
            bias: self.material.displacement_bias,
            recomputes: self.normals.recomputes + 1,
        };
        tracing::trace!(
            variant = %self.id.short(),
            displacement = ?self.normals.displacement,
            scale = self.normals.scale,
            "normals recomputed"
        );
    }

    /// Check that the normals describe the displacement the material carries.
    pub fn verify_consistency(&self) -> Result<(), StaleStateError> {
        let material = &self.material;
        if material.displacement_id() == self.normals.displacement
            && material.displacement_scale == self.normals.scale
            && material.displacement_bias == self.normals.bias
        {
            return Ok(());
        }
        Err(StaleStateError {
            variant: self.id,
            material: material.displacement_id(),
            material_scale: material.displacement_scale,
            normals: self.normals.displacement,
            normals_scale: self.normals.scale,
        })
    }
}
