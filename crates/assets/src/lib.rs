//! Elevation Asset Pipeline: two-stage displacement loading.
//!
//! A cheap placeholder is bound to every surface variant immediately, then the
//! final elevation data is fetched through a [`Transport`] and swapped in once,
//! atomically, between frames.
//!
//! # Invariants
//! - Stage never regresses: `Unloaded -> Placeholder -> Final`.
//! - Completion is applied at most once; a failed fetch is terminal and
//!   leaves the globe at placeholder fidelity.
//! - Transports never touch variants. They only enqueue [`TransportEvent`]s,
//!   which the pipeline consumes on the main thread in [`ElevationPipeline::pump`].

mod file;
mod pipeline;
mod procedural;
mod transport;

pub use file::{FileTransport, decode_heightmap};
pub use globe_surface::{AssetId, DisplacementMap};
pub use pipeline::{
    AssetLoadFailure, ElevationAsset, ElevationPipeline, ElevationSettings, FetchState,
    PipelineEvent, Stage,
};
pub use procedural::{ProceduralTransport, procedural_heightmap, procedural_heightmap_with};
pub use transport::{
    AssetSource, FetchSink, ManualTransport, SchemeTransport, Transport, TransportError,
    TransportEvent,
};
