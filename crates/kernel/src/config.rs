use globe_assets::{ElevationSettings, TransportError};
use globe_input::OrbitSettings;
use globe_lod::ConfigurationError;
use globe_surface::SurfaceError;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::scene::{AmbientLight, DirectionalLight};

/// Errors that abort globe setup. Nothing here is raised once ticking starts.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("LOD configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("surface error: {0}")]
    Surface(#[from] SurfaceError),
    #[error("placeholder elevation error: {0}")]
    Placeholder(#[from] TransportError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// One LOD tier: sphere resolution and the camera distance it starts at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierConfig {
    pub lat: u32,
    pub lon: u32,
    pub activation_distance: f32,
}

impl TierConfig {
    pub fn new(lat: u32, lon: u32, activation_distance: f32) -> Self {
        Self {
            lat,
            lon,
            activation_distance,
        }
    }
}

/// Everything needed to compose a globe, loadable from JSON. Missing fields
/// take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobeConfig {
    pub radius: f32,
    pub cloud_radius: f32,
    pub cloud_opacity: f32,
    /// Latitude and longitude segments of the cloud sphere.
    pub cloud_segments: u32,
    pub tiers: Vec<TierConfig>,
    pub elevation: ElevationSettings,
    /// Width and height of the procedural placeholder heightmap.
    pub placeholder_resolution: (u32, u32),
    pub placeholder_seed: u32,
    /// Source of the final elevation data, handed to the transport verbatim.
    pub final_source: String,
    /// Radians per tick.
    pub cloud_rotation_speed: f32,
    /// Radians per tick, applied only while the user is not interacting.
    pub idle_rotation_speed: f32,
    pub star_count: u32,
    /// Edge length of the cube the stars are scattered in.
    pub star_spread: f32,
    pub star_size: f32,
    pub star_seed: u64,
    pub ambient: AmbientLight,
    pub directional: DirectionalLight,
    pub controls: OrbitSettings,
}

impl Default for GlobeConfig {
    fn default() -> Self {
        Self {
            radius: 5.0,
            cloud_radius: 5.1,
            cloud_opacity: 0.4,
            cloud_segments: 64,
            tiers: vec![
                TierConfig::new(128, 128, 0.0),
                TierConfig::new(64, 64, 20.0),
                TierConfig::new(32, 32, 40.0),
            ],
            elevation: ElevationSettings::default(),
            placeholder_resolution: (128, 64),
            placeholder_seed: 1,
            final_source: "procedural:42".to_string(),
            cloud_rotation_speed: 0.0005,
            idle_rotation_speed: 0.0001,
            star_count: 10_000,
            star_spread: 2000.0,
            star_size: 0.1,
            star_seed: 0x5747_4152,
            ambient: AmbientLight::default(),
            directional: DirectionalLight::default(),
            controls: OrbitSettings::default(),
        }
    }
}

impl GlobeConfig {
    /// Read a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SetupError> {
        let path = path.as_ref();
        let config: Self = serde_json::from_reader(std::fs::File::open(path)?)?;
        tracing::info!(path = %path.display(), tiers = config.tiers.len(), "loaded globe config");
        Ok(config)
    }

    /// Write the config as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SetupError> {
        serde_json::to_writer_pretty(std::fs::File::create(path)?, self)?;
        Ok(())
    }

    /// Reject values no globe can be built from. Tier thresholds are checked
    /// separately when the variants are registered.
    pub fn validate(&self) -> Result<(), SetupError> {
        if !(self.radius.is_finite() && self.radius > 0.0) {
            return Err(SetupError::Invalid(format!("radius {} must be positive", self.radius)));
        }
        if !(self.cloud_radius.is_finite() && self.cloud_radius > 0.0) {
            return Err(SetupError::Invalid(format!(
                "cloud radius {} must be positive",
                self.cloud_radius
            )));
        }
        if self.tiers.is_empty() {
            return Err(SetupError::Invalid("at least one LOD tier is required".into()));
        }
        if !(0.0..=1.0).contains(&self.cloud_opacity) {
            return Err(SetupError::Invalid(format!(
                "cloud opacity {} outside [0, 1]",
                self.cloud_opacity
            )));
        }
        if !(0.0..=1.0).contains(&self.elevation.placeholder_factor) {
            return Err(SetupError::Invalid(format!(
                "placeholder factor {} outside [0, 1]",
                self.elevation.placeholder_factor
            )));
        }
        let (w, h) = self.placeholder_resolution;
        if w == 0 || h == 0 {
            return Err(SetupError::Invalid(format!("placeholder resolution {w}x{h} is empty")));
        }
        if self.final_source.is_empty() {
            return Err(SetupError::Invalid("final elevation source is empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_reference_scene() {
        let c = GlobeConfig::default();
        assert_eq!(c.radius, 5.0);
        assert_eq!(c.cloud_radius, 5.1);
        let thresholds: Vec<f32> = c.tiers.iter().map(|t| t.activation_distance).collect();
        assert_eq!(thresholds, vec![0.0, 20.0, 40.0]);
        assert_eq!(c.elevation.placeholder_factor, 0.3);
        assert_eq!(c.star_count, 10_000);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("globe.json");
        let config = GlobeConfig {
            final_source: "assets/earth_height.png".into(),
            idle_rotation_speed: 0.0,
            ..GlobeConfig::default()
        };
        config.save(&path).unwrap();
        let loaded = GlobeConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.json");
        std::fs::write(&path, r#"{ "radius": 2.5, "elevation": { "scale": 1.0 } }"#).unwrap();
        let loaded = GlobeConfig::load(&path).unwrap();
        assert_eq!(loaded.radius, 2.5);
        assert_eq!(loaded.elevation.scale, 1.0);
        assert_eq!(loaded.elevation.placeholder_factor, 0.3);
        assert_eq!(loaded.tiers.len(), 3);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = GlobeConfig::load("/no/such/globe.json").unwrap_err();
        assert!(matches!(err, SetupError::Io(_)));
    }

    #[test]
    fn validate_rejects_bad_values() {
        let no_tiers = GlobeConfig {
            tiers: Vec::new(),
            ..GlobeConfig::default()
        };
        assert!(matches!(no_tiers.validate(), Err(SetupError::Invalid(_))));

        let bad_radius = GlobeConfig {
            radius: 0.0,
            ..GlobeConfig::default()
        };
        assert!(bad_radius.validate().is_err());

        let bad_factor = GlobeConfig {
            elevation: ElevationSettings {
                placeholder_factor: 1.5,
                ..ElevationSettings::default()
            },
            ..GlobeConfig::default()
        };
        assert!(bad_factor.validate().is_err());
    }
}
