use globe_surface::DisplacementMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::transport::{AssetSource, FetchSink, Transport, TransportError};

/// Reads a heightmap image from disk on a background thread, reporting
/// byte progress, and decodes it to luma samples.
#[derive(Debug, Clone)]
pub struct FileTransport {
    /// Bytes read between progress reports.
    pub chunk_size: usize,
}

impl Default for FileTransport {
    fn default() -> Self {
        Self {
            chunk_size: 64 * 1024,
        }
    }
}

impl Transport for FileTransport {
    fn fetch(&mut self, source: &AssetSource, sink: FetchSink) {
        let path = PathBuf::from(source.location());
        let chunk_size = self.chunk_size.max(1);
        tracing::info!(path = %path.display(), "fetching elevation file");

        let spawned = std::thread::Builder::new()
            .name("elevation-fetch".into())
            .spawn(move || {
                let loaded = load(&path, chunk_size, &sink);
                match loaded {
                    Ok(map) => sink.complete(map),
                    Err(e) => sink.fail(e.to_string()),
                }
            });
        // On spawn failure the sink is dropped with the closure, which the
        // pipeline observes as a disconnected transport.
        if let Err(e) = spawned {
            tracing::error!("failed to spawn elevation fetch thread: {e}");
        }
    }
}

fn load(path: &Path, chunk_size: usize, sink: &FetchSink) -> Result<DisplacementMap, TransportError> {
    let mut file = File::open(path)?;
    let total = file.metadata()?.len();
    let mut bytes = Vec::with_capacity(total as usize);
    let mut chunk = vec![0u8; chunk_size];
    loop {
        let n = file.read(&mut chunk)?;
        if n == 0 {
            break;
        }
        bytes.extend_from_slice(&chunk[..n]);
        sink.progress(bytes.len() as u64, Some(total));
    }
    decode_heightmap(&bytes)
}

/// Decode PNG or JPEG bytes into a displacement map, keeping 16-bit precision
/// when the image has it.
pub fn decode_heightmap(bytes: &[u8]) -> Result<DisplacementMap, TransportError> {
    let image = image::load_from_memory(bytes)?;
    let luma = image.to_luma16();
    let (width, height) = luma.dimensions();
    let samples = luma
        .as_raw()
        .iter()
        .map(|&v| v as f32 / u16::MAX as f32)
        .collect();
    Ok(DisplacementMap::new(width, height, samples)?)
}
