use glam::Vec2;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;

use crate::variant::SurfaceError;

/// Content-addressed identity of a displacement source, computed from its data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetId(pub u64);

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Grayscale elevation grid with samples in `[0, 1]`, row 0 at the north pole.
///
/// Samples live behind an `Arc`, so handing the same map to every variant
/// costs a refcount bump, not a copy.
#[derive(Debug, Clone)]
pub struct DisplacementMap {
    width: u32,
    height: u32,
    samples: Arc<[f32]>,
    id: AssetId,
}

impl PartialEq for DisplacementMap {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.width == other.width && self.height == other.height
    }
}

impl DisplacementMap {
    pub fn new(width: u32, height: u32, samples: Vec<f32>) -> Result<Self, SurfaceError> {
        if width == 0 || height == 0 || samples.len() != (width as usize) * (height as usize) {
            return Err(SurfaceError::InvalidDisplacement {
                width,
                height,
                len: samples.len(),
            });
        }
        let id = content_hash(width, height, &samples);
        Ok(Self {
            width,
            height,
            samples: samples.into(),
            id,
        })
    }

    /// Build from 8-bit luma pixels, mapping 0..=255 onto 0.0..=1.0.
    pub fn from_luma8(width: u32, height: u32, pixels: &[u8]) -> Result<Self, SurfaceError> {
        let samples = pixels.iter().map(|&p| p as f32 / 255.0).collect();
        Self::new(width, height, samples)
    }

    /// A map holding the same value everywhere.
    pub fn flat(width: u32, height: u32, value: f32) -> Result<Self, SurfaceError> {
        let len = (width as usize) * (height as usize);
        Self::new(width, height, vec![value; len])
    }

    pub fn id(&self) -> AssetId {
        self.id
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    fn texel(&self, x: i64, y: i64) -> f32 {
        let x = x.rem_euclid(self.width as i64) as usize;
        let y = y.clamp(0, self.height as i64 - 1) as usize;
        self.samples[y * self.width as usize + x]
    }

    /// Bilinear sample at texel centres. U wraps across the seam, V clamps at
    /// the poles.
    pub fn sample(&self, uv: Vec2) -> f32 {
        let fx = uv.x * self.width as f32 - 0.5;
        let fy = (uv.y * self.height as f32 - 0.5).clamp(0.0, (self.height - 1) as f32);
        let x0 = fx.floor();
        let y0 = fy.floor();
        let tx = fx - x0;
        let ty = fy - y0;
        let (x0, y0) = (x0 as i64, y0 as i64);

        let top = lerp(self.texel(x0, y0), self.texel(x0 + 1, y0), tx);
        let bottom = lerp(self.texel(x0, y0 + 1), self.texel(x0 + 1, y0 + 1), tx);
        lerp(top, bottom, ty)
    }
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

fn content_hash(width: u32, height: u32, samples: &[f32]) -> AssetId {
    let mut hasher = Sha256::new();
    hasher.update(width.to_le_bytes());
    hasher.update(height.to_le_bytes());
    for s in samples {
        hasher.update(s.to_le_bytes());
    }
    let result = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&result[..8]);
    AssetId(u64::from_le_bytes(bytes))
}
