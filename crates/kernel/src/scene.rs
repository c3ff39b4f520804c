use glam::Vec3;
use globe_common::{Transform, wrap_angle};
use globe_lod::LodSelector;
use globe_surface::{Material, Resolution, SurfaceVariant};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::{GlobeConfig, SetupError};

/// Uniform light added to every surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AmbientLight {
    pub color: [f32; 3],
    pub intensity: f32,
}

impl Default for AmbientLight {
    fn default() -> Self {
        Self {
            color: [1.0, 1.0, 1.0],
            intensity: 0.5,
        }
    }
}

/// Light shining from `position` towards the origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DirectionalLight {
    pub color: [f32; 3],
    pub intensity: f32,
    pub position: Vec3,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            color: [1.0, 1.0, 1.0],
            intensity: 1.0,
            position: Vec3::new(5.0, 3.0, 5.0),
        }
    }
}

impl DirectionalLight {
    /// Unit vector from the origin towards the light.
    pub fn direction(&self) -> Vec3 {
        self.position.try_normalize().unwrap_or(Vec3::Y)
    }
}

/// Translucent sphere just above the surface, rotating on its own.
#[derive(Debug, Clone, PartialEq)]
pub struct CloudShell {
    pub radius: f32,
    pub opacity: f32,
    pub segments: u32,
    yaw: f32,
}

impl CloudShell {
    pub fn new(radius: f32, opacity: f32, segments: u32) -> Self {
        Self {
            radius,
            opacity,
            segments,
            yaw: 0.0,
        }
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn rotate(&mut self, delta: f32) {
        self.yaw = wrap_angle(self.yaw + delta);
    }

    pub fn transform(&self) -> Transform {
        Transform::from_yaw(self.yaw)
    }
}

/// Static background points scattered in a cube around the origin.
#[derive(Debug, Clone)]
pub struct Starfield {
    positions: Vec<Vec3>,
    pub size: f32,
}

impl Starfield {
    /// Deterministic for a given seed.
    pub fn generate(count: u32, spread: f32, size: f32, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let positions = (0..count)
            .map(|_| {
                Vec3::new(
                    (rng.random::<f32>() - 0.5) * spread,
                    (rng.random::<f32>() - 0.5) * spread,
                    (rng.random::<f32>() - 0.5) * spread,
                )
            })
            .collect();
        Self { positions, size }
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// A node as seen by renderers walking the scene.
#[derive(Debug, Clone, Copy)]
pub enum SceneNode<'a> {
    /// A surface variant under the globe root. Hidden variants are yielded
    /// too; renderers check `is_visible`.
    Variant {
        variant: &'a SurfaceVariant,
        transform: Transform,
    },
    Clouds(&'a CloudShell),
    Stars(&'a Starfield),
    Ambient(&'a AmbientLight),
    Directional(&'a DirectionalLight),
}

/// The composed globe: LOD-managed surface under a rotating root, a cloud
/// shell, a starfield and two lights.
#[derive(Debug)]
pub struct GlobeScene {
    lod: LodSelector,
    root_yaw: f32,
    radius: f32,
    clouds: CloudShell,
    stars: Starfield,
    ambient: AmbientLight,
    directional: DirectionalLight,
}

impl GlobeScene {
    /// Build every tier from `config` and register it with a fresh selector.
    /// All tiers start out sharing one material.
    pub fn compose(config: &GlobeConfig) -> Result<Self, SetupError> {
        let _span = tracing::info_span!("compose_scene", tiers = config.tiers.len()).entered();
        config.validate()?;

        let material = Arc::new(Material::default());
        let mut lod = LodSelector::new();
        for tier in &config.tiers {
            let variant = SurfaceVariant::new(
                Resolution::new(tier.lat, tier.lon),
                config.radius,
                Arc::clone(&material),
            )?;
            lod.register(variant, tier.activation_distance)?;
        }

        let stars = Starfield::generate(
            config.star_count,
            config.star_spread,
            config.star_size,
            config.star_seed,
        );
        tracing::info!(
            tiers = lod.len(),
            stars = stars.len(),
            radius = config.radius,
            "globe scene composed"
        );

        Ok(Self {
            lod,
            root_yaw: 0.0,
            radius: config.radius,
            clouds: CloudShell::new(config.cloud_radius, config.cloud_opacity, config.cloud_segments),
            stars,
            ambient: config.ambient,
            directional: config.directional,
        })
    }

    pub fn lod(&self) -> &LodSelector {
        &self.lod
    }

    pub fn lod_mut(&mut self) -> &mut LodSelector {
        &mut self.lod
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn root_yaw(&self) -> f32 {
        self.root_yaw
    }

    pub fn rotate_root(&mut self, delta: f32) {
        self.root_yaw = wrap_angle(self.root_yaw + delta);
    }

    pub fn root_transform(&self) -> Transform {
        Transform::from_yaw(self.root_yaw)
    }

    pub fn clouds(&self) -> &CloudShell {
        &self.clouds
    }

    pub fn clouds_mut(&mut self) -> &mut CloudShell {
        &mut self.clouds
    }

    pub fn stars(&self) -> &Starfield {
        &self.stars
    }

    pub fn ambient(&self) -> &AmbientLight {
        &self.ambient
    }

    pub fn directional(&self) -> &DirectionalLight {
        &self.directional
    }

    /// Walk the scene: surface variants first, then clouds, stars and lights.
    pub fn nodes(&self) -> impl Iterator<Item = SceneNode<'_>> + '_ {
        let root = self.root_transform();
        self.lod
            .variants()
            .iter()
            .map(move |variant| SceneNode::Variant {
                variant,
                transform: root,
            })
            .chain([
                SceneNode::Clouds(&self.clouds),
                SceneNode::Stars(&self.stars),
                SceneNode::Ambient(&self.ambient),
                SceneNode::Directional(&self.directional),
            ])
    }
}
