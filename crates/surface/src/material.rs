use glam::Vec2;

use crate::displacement::{AssetId, DisplacementMap};

/// Shading and displacement parameters of a globe surface.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub base_color: [f32; 4],
    pub specular: [f32; 3],
    pub shininess: f32,
    pub bump_scale: f32,
    /// Elevation input; `None` renders the bare sphere.
    pub displacement: Option<DisplacementMap>,
    pub displacement_scale: f32,
    pub displacement_bias: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            base_color: [1.0, 1.0, 1.0, 1.0],
            // 0x333333
            specular: [0.2, 0.2, 0.2],
            shininess: 25.0,
            bump_scale: 0.05,
            displacement: None,
            displacement_scale: 1.0,
            displacement_bias: 0.0,
        }
    }
}

impl Material {
    pub fn displacement_id(&self) -> Option<AssetId> {
        self.displacement.as_ref().map(DisplacementMap::id)
    }

    /// Radial offset at `uv`: `sample * scale + bias`, or zero without a map.
    pub fn height_at(&self, uv: Vec2) -> f32 {
        match &self.displacement {
            Some(map) => map.sample(uv) * self.displacement_scale + self.displacement_bias,
            None => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_map_means_no_offset() {
        let m = Material {
            displacement_bias: 3.0,
            ..Material::default()
        };
        assert_eq!(m.height_at(Vec2::new(0.5, 0.5)), 0.0);
        assert!(m.displacement_id().is_none());
    }

    #[test]
    fn height_applies_scale_and_bias() {
        let map = DisplacementMap::flat(2, 2, 0.5).unwrap();
        let id = map.id();
        let m = Material {
            displacement: Some(map),
            displacement_scale: 2.0,
            displacement_bias: -0.25,
            ..Material::default()
        };
        assert!((m.height_at(Vec2::new(0.1, 0.9)) - 0.75).abs() < 1e-6);
        assert_eq!(m.displacement_id(), Some(id));
    }
}
