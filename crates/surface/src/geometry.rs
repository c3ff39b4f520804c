use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use std::f32::consts::{PI, TAU};

use crate::material::Material;
use crate::variant::SurfaceError;

/// Latitude/longitude subdivision counts of a UV sphere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub lat: u32,
    pub lon: u32,
}

impl Resolution {
    pub fn new(lat: u32, lon: u32) -> Self {
        Self { lat, lon }
    }

    pub fn validate(&self) -> Result<(), SurfaceError> {
        if self.lat < 2 || self.lon < 3 {
            return Err(SurfaceError::InvalidResolution {
                lat: self.lat,
                lon: self.lon,
            });
        }
        Ok(())
    }

    fn stride(&self) -> usize {
        self.lon as usize + 1
    }
}

/// Mesh buffer for one globe variant.
///
/// Keeps the undisplaced unit directions so displacement can be re-applied
/// from scratch whenever the material changes.
#[derive(Debug, Clone)]
pub struct Geometry {
    resolution: Resolution,
    radius: f32,
    directions: Vec<Vec3>,
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    uvs: Vec<Vec2>,
    indices: Vec<u32>,
    /// Bumped on every buffer mutation so GPU caches know to re-upload.
    generation: u64,
}

impl Geometry {
    /// Build a UV sphere. Vertex rows run north to south, `v = 0` at the
    /// north pole; the seam column is duplicated so UVs stay continuous.
    pub fn uv_sphere(radius: f32, resolution: Resolution) -> Result<Self, SurfaceError> {
        resolution.validate()?;
        let Resolution { lat, lon } = resolution;
        let vertex_count = (lat as usize + 1) * resolution.stride();

        let mut directions = Vec::with_capacity(vertex_count);
        let mut uvs = Vec::with_capacity(vertex_count);
        for iy in 0..=lat {
            let v = iy as f32 / lat as f32;
            let theta = v * PI;
            for ix in 0..=lon {
                let u = ix as f32 / lon as f32;
                let phi = u * TAU;
                directions.push(Vec3::new(
                    -phi.cos() * theta.sin(),
                    theta.cos(),
                    phi.sin() * theta.sin(),
                ));
                uvs.push(Vec2::new(u, v));
            }
        }

        let stride = resolution.stride() as u32;
        let mut indices = Vec::with_capacity((lat * lon * 6) as usize);
        for iy in 0..lat {
            for ix in 0..lon {
                let a = iy * stride + ix + 1;
                let b = iy * stride + ix;
                let c = (iy + 1) * stride + ix;
                let d = (iy + 1) * stride + ix + 1;
                // pole rows collapse to a single triangle per quad
                if iy != 0 {
                    indices.extend_from_slice(&[a, b, d]);
                }
                if iy != lat - 1 {
                    indices.extend_from_slice(&[b, c, d]);
                }
            }
        }

        let positions = directions.iter().map(|d| *d * radius).collect();
        let normals = directions.clone();

        Ok(Self {
            resolution,
            radius,
            directions,
            positions,
            normals,
            uvs,
            indices,
            generation: 0,
        })
    }

    /// Re-derive vertex positions from the material's displacement input.
    pub fn displace(&mut self, material: &Material) {
        for ((pos, dir), uv) in self
            .positions
            .iter_mut()
            .zip(&self.directions)
            .zip(&self.uvs)
        {
            *pos = *dir * (self.radius + material.height_at(*uv));
        }
        self.generation += 1;
    }

    /// Area-weighted vertex normals from the current positions. Seam columns
    /// and pole rows are welded so the duplicated vertices light identically.
    pub fn recompute_normals(&mut self) {
        for n in &mut self.normals {
            *n = Vec3::ZERO;
        }
        for tri in self.indices.chunks_exact(3) {
            let (i0, i1, i2) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
            let p0 = self.positions[i0];
            let face = (self.positions[i1] - p0).cross(self.positions[i2] - p0);
            self.normals[i0] += face;
            self.normals[i1] += face;
            self.normals[i2] += face;
        }

        let stride = self.resolution.stride();
        let rows = self.resolution.lat as usize + 1;
        for row in 0..rows {
            let first = row * stride;
            let last = first + stride - 1;
            let sum = self.normals[first] + self.normals[last];
            self.normals[first] = sum;
            self.normals[last] = sum;
        }
        for row in [0, rows - 1] {
            let span = row * stride..(row + 1) * stride;
            let sum: Vec3 = self.normals[span.clone()].iter().copied().sum();
            for n in &mut self.normals[span] {
                *n = sum;
            }
        }

        for (n, dir) in self.normals.iter_mut().zip(&self.directions) {
            *n = n.try_normalize().unwrap_or(*dir);
        }
        self.generation += 1;
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    pub fn uvs(&self) -> &[Vec2] {
        &self.uvs
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}
