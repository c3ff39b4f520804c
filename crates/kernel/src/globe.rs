use globe_assets::{
    AssetSource, DisplacementMap, ElevationPipeline, PipelineEvent, Transport,
    procedural_heightmap,
};
use globe_input::{Action, CameraController, OrbitControls};

use crate::config::{GlobeConfig, SetupError};
use crate::scene::GlobeScene;

/// Context object handed to the frame driver: the scene, the elevation
/// pipeline feeding it, and the camera controls.
pub struct Globe {
    scene: GlobeScene,
    pipeline: ElevationPipeline,
    controls: Box<dyn CameraController>,
}

impl Globe {
    /// Compose the scene, bind a procedural placeholder and start fetching
    /// `config.final_source` through `transport`.
    pub fn new(config: &GlobeConfig, transport: &mut dyn Transport) -> Result<Self, SetupError> {
        let (width, height) = config.placeholder_resolution;
        config.validate()?;
        let placeholder = procedural_heightmap(config.placeholder_seed, width, height)?;
        Self::with_placeholder(config, placeholder, transport)
    }

    /// Like [`Globe::new`] with a caller-supplied placeholder.
    pub fn with_placeholder(
        config: &GlobeConfig,
        placeholder: DisplacementMap,
        transport: &mut dyn Transport,
    ) -> Result<Self, SetupError> {
        let mut scene = GlobeScene::compose(config)?;
        let pipeline = ElevationPipeline::initialize(
            placeholder,
            AssetSource::new(config.final_source.clone()),
            config.elevation,
            transport,
            scene.lod_mut().variants_mut(),
        );
        Ok(Self {
            scene,
            pipeline,
            controls: Box::new(OrbitControls::new(config.controls)),
        })
    }

    /// Replace the camera controller.
    pub fn with_controls(mut self, controls: Box<dyn CameraController>) -> Self {
        self.controls = controls;
        self
    }

    pub fn scene(&self) -> &GlobeScene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut GlobeScene {
        &mut self.scene
    }

    pub fn pipeline(&self) -> &ElevationPipeline {
        &self.pipeline
    }

    pub fn controls(&self) -> &dyn CameraController {
        self.controls.as_ref()
    }

    pub fn controls_mut(&mut self) -> &mut dyn CameraController {
        self.controls.as_mut()
    }

    /// Forward an input action to the controls.
    pub fn apply(&mut self, action: Action) {
        self.controls.apply(action);
    }

    /// Apply queued transport events to the variants. Call between ticks.
    pub fn pump_assets(&mut self) -> usize {
        self.pipeline.pump(self.scene.lod_mut().variants_mut())
    }

    /// Deliver final elevation data directly, bypassing the transport.
    pub fn complete_elevation(&mut self, data: DisplacementMap) -> bool {
        self.pipeline
            .on_complete(data, self.scene.lod_mut().variants_mut())
    }

    pub fn fail_elevation(&mut self, reason: impl Into<String>) -> bool {
        self.pipeline.on_error(reason)
    }

    pub fn drain_events(&mut self) -> Vec<PipelineEvent> {
        self.pipeline.drain_events()
    }
}

impl std::fmt::Debug for Globe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Globe")
            .field("scene", &self.scene)
            .field("pipeline", &self.pipeline)
            .field("camera", &self.controls.camera())
            .finish()
    }
}
