//! Procedural elevation: fBm simplex noise sampled on the unit sphere, so the
//! result tiles seamlessly across the longitude seam.

use globe_surface::DisplacementMap;
use noise::{NoiseFn, Simplex};
use std::f64::consts::{PI, TAU};

use crate::transport::{AssetSource, FetchSink, Transport, TransportError};

const OCTAVES: u32 = 6;
const BASE_FREQUENCY: f64 = 1.5;
const LACUNARITY: f64 = 2.0;
const PERSISTENCE: f64 = 0.5;

/// Generate a `width x height` equirectangular heightmap for `seed`.
///
/// `on_row` is called after each finished row with the count of rows done.
pub fn procedural_heightmap_with(
    seed: u32,
    width: u32,
    height: u32,
    mut on_row: impl FnMut(u32),
) -> Result<DisplacementMap, TransportError> {
    let noise = Simplex::new(seed);
    let max_amplitude: f64 = (0..OCTAVES).map(|o| PERSISTENCE.powi(o as i32)).sum();

    let mut samples = Vec::with_capacity(width as usize * height as usize);
    for y in 0..height {
        let theta = (y as f64 + 0.5) / height as f64 * PI;
        for x in 0..width {
            let phi = (x as f64 + 0.5) / width as f64 * TAU;
            let dir = [
                -phi.cos() * theta.sin(),
                theta.cos(),
                phi.sin() * theta.sin(),
            ];

            let mut total = 0.0;
            let mut frequency = BASE_FREQUENCY;
            let mut amplitude = 1.0;
            for _ in 0..OCTAVES {
                total += noise.get([dir[0] * frequency, dir[1] * frequency, dir[2] * frequency])
                    * amplitude;
                frequency *= LACUNARITY;
                amplitude *= PERSISTENCE;
            }
            samples.push((0.5 + 0.5 * total / max_amplitude).clamp(0.0, 1.0) as f32);
        }
        on_row(y + 1);
    }
    Ok(DisplacementMap::new(width, height, samples)?)
}

/// Generate a heightmap without progress reporting. Cheap at small sizes,
/// which makes it the usual placeholder source.
pub fn procedural_heightmap(
    seed: u32,
    width: u32,
    height: u32,
) -> Result<DisplacementMap, TransportError> {
    procedural_heightmap_with(seed, width, height, |_| {})
}

/// Serves `procedural:<seed>` sources by generating the map on a background
/// thread, reporting progress in rows.
#[derive(Debug, Clone)]
pub struct ProceduralTransport {
    pub width: u32,
    pub height: u32,
    /// Rows generated between progress reports.
    pub rows_per_report: u32,
}

impl Default for ProceduralTransport {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 512,
            rows_per_report: 32,
        }
    }
}

impl Transport for ProceduralTransport {
    fn fetch(&mut self, source: &AssetSource, sink: FetchSink) {
        let seed = match source.location().parse::<u32>() {
            Ok(seed) => seed,
            Err(_) => {
                sink.fail(TransportError::MalformedSource(source.to_string()).to_string());
                return;
            }
        };
        let (width, height) = (self.width, self.height);
        let every = self.rows_per_report.max(1);
        tracing::info!(seed, width, height, "generating procedural elevation");

        let spawned = std::thread::Builder::new()
            .name("elevation-procedural".into())
            .spawn(move || {
                let generated = procedural_heightmap_with(seed, width, height, |rows| {
                    if rows % every == 0 || rows == height {
                        sink.progress(rows as u64, Some(height as u64));
                    }
                });
                match generated {
                    Ok(map) => sink.complete(map),
                    Err(e) => sink.fail(e.to_string()),
                }
            });
        if let Err(e) = spawned {
            tracing::error!("failed to spawn procedural elevation thread: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TransportEvent;
    use std::time::Duration;

    #[test]
    fn same_seed_same_map() {
        let a = procedural_heightmap(7, 32, 16).unwrap();
        let b = procedural_heightmap(7, 32, 16).unwrap();
        let c = procedural_heightmap(8, 32, 16).unwrap();
        assert_eq!(a.id(), b.id());
        assert_ne!(a.id(), c.id());
    }

    #[test]
    fn samples_are_normalised() {
        let map = procedural_heightmap(1, 64, 32).unwrap();
        assert!(map.samples().iter().all(|s| (0.0..=1.0).contains(s)));
        let min = map.samples().iter().copied().fold(f32::MAX, f32::min);
        let max = map.samples().iter().copied().fold(f32::MIN, f32::max);
        assert!(max > min);
    }

    #[test]
    fn row_callback_counts_every_row() {
        let mut rows = Vec::new();
        procedural_heightmap_with(3, 8, 5, |r| rows.push(r)).unwrap();
        assert_eq!(rows, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn malformed_seed_fails() {
        let (tx, rx) = crossbeam_channel::unbounded();
        ProceduralTransport::default()
            .fetch(&AssetSource::new("procedural:moon"), FetchSink::new(tx));
        assert!(matches!(rx.try_recv(), Ok(TransportEvent::Failed(_))));
    }

    #[test]
    fn background_generation_completes() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut transport = ProceduralTransport {
            width: 32,
            height: 16,
            rows_per_report: 4,
        };
        transport.fetch(&AssetSource::new("procedural:11"), FetchSink::new(tx));

        let mut progress = Vec::new();
        loop {
            match rx.recv_timeout(Duration::from_secs(10)).unwrap() {
                TransportEvent::Progress { loaded, total } => {
                    assert_eq!(total, Some(16));
                    progress.push(loaded);
                }
                TransportEvent::Complete(map) => {
                    assert_eq!((map.width(), map.height()), (32, 16));
                    break;
                }
                TransportEvent::Failed(reason) => panic!("unexpected failure: {reason}"),
            }
        }
        assert_eq!(progress, vec![4, 8, 12, 16]);
    }
}
