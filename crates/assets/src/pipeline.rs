use crossbeam_channel::{Receiver, TryRecvError};
use globe_surface::{AssetId, DisplacementMap, SurfaceVariant};
use serde::{Deserialize, Serialize};

use crate::transport::{AssetSource, FetchSink, Transport, TransportEvent};

/// Fidelity of the displacement currently bound to the variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Stage {
    Unloaded,
    Placeholder,
    Final,
}

/// Status of the final-asset fetch, tracked apart from [`Stage`] so a failed
/// fetch can be told from one still in flight.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchState {
    Idle,
    InFlight,
    Completed,
    Failed { reason: String },
}

/// Vertical exaggeration, fixed at configuration time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElevationSettings {
    pub scale: f32,
    pub bias: f32,
    /// Fraction of `scale` applied while only the placeholder is bound.
    pub placeholder_factor: f32,
}

impl Default for ElevationSettings {
    fn default() -> Self {
        Self {
            scale: 0.25,
            bias: 0.0,
            placeholder_factor: 0.3,
        }
    }
}

/// The final elevation fetch failed; the globe stays at placeholder fidelity.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("failed to load elevation asset {asset}: {reason}")]
pub struct AssetLoadFailure {
    pub asset: AssetSource,
    pub reason: String,
}

/// Notifications for progress/UI collaborators.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    Progress { stage: Stage, percent: f32 },
    /// Final data is bound and every variant's normals reflect it.
    Ready { id: AssetId },
    LoadFailed(AssetLoadFailure),
}

/// Load state of the elevation data for one globe.
#[derive(Debug, Clone)]
pub struct ElevationAsset {
    source: AssetSource,
    stage: Stage,
    fetch: FetchState,
    progress: Option<f32>,
    settings: ElevationSettings,
}

impl ElevationAsset {
    pub fn new(source: AssetSource, settings: ElevationSettings) -> Self {
        Self {
            source,
            stage: Stage::Unloaded,
            fetch: FetchState::Idle,
            progress: None,
            settings,
        }
    }

    pub fn source(&self) -> &AssetSource {
        &self.source
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn fetch_state(&self) -> &FetchState {
        &self.fetch
    }

    /// Fraction in `[0, 1]` while the final fetch is in flight. After a
    /// failure the last reported value is kept, so the indicator stalls.
    pub fn progress(&self) -> Option<f32> {
        self.progress
    }

    /// Full scale from the settings, reached once the final data is bound.
    pub fn configured_scale(&self) -> f32 {
        self.settings.scale
    }

    pub fn configured_bias(&self) -> f32 {
        self.settings.bias
    }

    pub fn settings(&self) -> ElevationSettings {
        self.settings
    }

    /// Scale currently bound to the variants for this stage.
    pub fn effective_scale(&self) -> f32 {
        match self.stage {
            Stage::Unloaded => 0.0,
            Stage::Placeholder => self.settings.scale * self.settings.placeholder_factor,
            Stage::Final => self.settings.scale,
        }
    }
}

/// Drives the placeholder-then-final upgrade of every registered variant.
#[derive(Debug)]
pub struct ElevationPipeline {
    asset: ElevationAsset,
    receiver: Receiver<TransportEvent>,
    events: Vec<PipelineEvent>,
}

impl ElevationPipeline {
    /// Bind `placeholder` to every variant at reduced scale and start the
    /// final fetch. Returns without waiting on the transport.
    pub fn initialize(
        placeholder: DisplacementMap,
        final_source: AssetSource,
        settings: ElevationSettings,
        transport: &mut dyn Transport,
        variants: &mut [SurfaceVariant],
    ) -> Self {
        let mut asset = ElevationAsset::new(final_source, settings);
        let scale = settings.scale * settings.placeholder_factor;
        for variant in variants.iter_mut() {
            let material = variant.material_mut();
            material.displacement = Some(placeholder.clone());
            material.displacement_scale = scale;
            material.displacement_bias = settings.bias;
            variant.recompute_normals();
        }
        asset.stage = Stage::Placeholder;
        asset.fetch = FetchState::InFlight;
        asset.progress = Some(0.0);
        tracing::info!(
            placeholder = %placeholder.id(),
            scale,
            variants = variants.len(),
            "placeholder elevation bound"
        );

        let (sender, receiver) = crossbeam_channel::unbounded();
        let pipeline = Self {
            asset,
            receiver,
            events: vec![PipelineEvent::Progress {
                stage: Stage::Placeholder,
                percent: 0.0,
            }],
        };
        transport.fetch(&pipeline.asset.source, FetchSink::new(sender));
        pipeline
    }

    pub fn asset(&self) -> &ElevationAsset {
        &self.asset
    }

    pub fn stage(&self) -> Stage {
        self.asset.stage
    }

    /// Byte progress from the transport. Ignored when the total is unknown
    /// (`None` or zero) or when no fetch is in flight.
    pub fn on_progress(&mut self, loaded: u64, total: Option<u64>) {
        if self.asset.fetch != FetchState::InFlight {
            tracing::trace!(loaded, "progress after fetch ended; ignored");
            return;
        }
        let Some(total) = total.filter(|&t| t > 0) else {
            return;
        };
        let fraction = (loaded as f64 / total as f64).clamp(0.0, 1.0) as f32;
        self.asset.progress = Some(fraction);
        self.events.push(PipelineEvent::Progress {
            stage: self.asset.stage,
            percent: fraction * 100.0,
        });
    }

    /// Swap `data` into every variant and rebuild their normals, all within
    /// this call. Returns `false` if the completion was ignored because the
    /// fetch had already finished or failed.
    pub fn on_complete(&mut self, data: DisplacementMap, variants: &mut [SurfaceVariant]) -> bool {
        let _span = tracing::info_span!("elevation_complete", asset = %self.asset.source).entered();
        if self.asset.fetch != FetchState::InFlight {
            tracing::warn!(fetch = ?self.asset.fetch, "duplicate or late completion ignored");
            return false;
        }

        self.asset.stage = Stage::Final;
        self.asset.fetch = FetchState::Completed;
        self.asset.progress = None;

        let scale = self.asset.settings.scale;
        let bias = self.asset.settings.bias;
        for variant in variants.iter_mut() {
            let material = variant.material_mut();
            material.displacement = Some(data.clone());
            material.displacement_scale = scale;
            material.displacement_bias = bias;
        }
        for variant in variants.iter_mut() {
            variant.recompute_normals();
        }

        self.events.push(PipelineEvent::Progress {
            stage: Stage::Final,
            percent: 100.0,
        });
        self.events.push(PipelineEvent::Ready { id: data.id() });
        tracing::info!(
            id = %data.id(),
            width = data.width(),
            height = data.height(),
            variants = variants.len(),
            "final elevation bound"
        );
        true
    }

    /// Terminal failure of the final fetch. Rendering continues at placeholder
    /// fidelity; nothing is retried.
    pub fn on_error(&mut self, reason: impl Into<String>) -> bool {
        if self.asset.fetch != FetchState::InFlight {
            return false;
        }
        let reason = reason.into();
        tracing::warn!(asset = %self.asset.source, %reason, "elevation load failed; keeping placeholder");
        self.asset.fetch = FetchState::Failed {
            reason: reason.clone(),
        };
        self.events.push(PipelineEvent::LoadFailed(AssetLoadFailure {
            asset: self.asset.source.clone(),
            reason,
        }));
        true
    }

    /// Apply every transport event queued since the last pump. Call between
    /// ticks only. Returns the number of events handled.
    pub fn pump(&mut self, variants: &mut [SurfaceVariant]) -> usize {
        let mut handled = 0;
        loop {
            match self.receiver.try_recv() {
                Ok(TransportEvent::Progress { loaded, total }) => self.on_progress(loaded, total),
                Ok(TransportEvent::Complete(data)) => {
                    self.on_complete(data, variants);
                }
                Ok(TransportEvent::Failed(reason)) => {
                    self.on_error(reason);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if self.asset.fetch == FetchState::InFlight {
                        self.on_error("transport closed without a result");
                        handled += 1;
                    }
                    break;
                }
            }
            handled += 1;
        }
        handled
    }

    /// Drain and return pending notifications.
    pub fn drain_events(&mut self) -> Vec<PipelineEvent> {
        std::mem::take(&mut self.events)
    }

    /// Read-only access to pending notifications.
    pub fn events(&self) -> &[PipelineEvent] {
        &self.events
    }
}
