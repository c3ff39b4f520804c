use globe_assets::{AssetId, AssetLoadFailure, FetchState, Stage};
use globe_common::VariantId;
use globe_kernel::{FrameDriver, Globe};

/// Globe inspector for developer tooling.
///
/// Provides read-only queries against the globe for debugging, the CLI and
/// the desktop overlay.
pub struct GlobeInspector;

impl GlobeInspector {
    /// Produce a summary of the globe and, if given, the driver running it.
    pub fn summary(globe: &Globe, driver: Option<&FrameDriver>) -> GlobeSummary {
        let lod = globe.scene().lod();
        let asset = globe.pipeline().asset();
        let active = lod.active();
        GlobeSummary {
            tick: driver.map_or(0, FrameDriver::ticks),
            variant_count: lod.len(),
            active_tier: lod.active_index(),
            active_resolution: active.map(|v| (v.resolution().lat, v.resolution().lon)),
            active_threshold: active.map(|v| v.activation_distance()),
            stage: asset.stage(),
            fetch: fetch_label(asset.fetch_state()),
            progress: asset.progress(),
            effective_scale: asset.effective_scale(),
            camera_distance: globe.controls().camera().distance_from_origin(),
            root_yaw: globe.scene().root_yaw(),
            cloud_yaw: globe.scene().clouds().yaw(),
            average_frame_ms: driver.map(|d| d.timer().average().as_secs_f64() * 1000.0),
        }
    }

    /// Details of one registered variant.
    pub fn inspect_variant(globe: &Globe, id: VariantId) -> Option<VariantInfo> {
        globe.scene().lod().get(id).map(|v| VariantInfo {
            id,
            resolution: (v.resolution().lat, v.resolution().lon),
            activation_distance: v.activation_distance(),
            visible: v.is_visible(),
            vertices: v.geometry().vertex_count(),
            triangles: v.geometry().triangle_count(),
            displacement: v.material().displacement_id(),
            normals_recomputed: v.normals_recomputed(),
        })
    }

    /// What the loading indicator should show for the final elevation fetch.
    pub fn loading_status(globe: &Globe) -> LoadingStatus {
        let asset = globe.pipeline().asset();
        match asset.fetch_state() {
            FetchState::Idle => LoadingStatus::Idle,
            FetchState::InFlight => LoadingStatus::Loading {
                progress: asset.progress(),
            },
            FetchState::Completed => LoadingStatus::Done,
            FetchState::Failed { reason } => LoadingStatus::Failed {
                progress: asset.progress(),
                message: AssetLoadFailure {
                    asset: asset.source().clone(),
                    reason: reason.clone(),
                }
                .to_string(),
            },
        }
    }

    /// Registered variant ids, nearest tier first.
    pub fn list_variants(globe: &Globe) -> Vec<VariantId> {
        globe.scene().lod().variants().iter().map(|v| v.id()).collect()
    }
}

fn fetch_label(state: &FetchState) -> String {
    match state {
        FetchState::Idle => "idle".into(),
        FetchState::InFlight => "in-flight".into(),
        FetchState::Completed => "completed".into(),
        FetchState::Failed { reason } => format!("failed ({reason})"),
    }
}

/// Loading indicator state. A failed fetch keeps the last progress so the
/// bar stalls instead of disappearing.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadingStatus {
    Idle,
    Loading { progress: Option<f32> },
    Failed { progress: Option<f32>, message: String },
    Done,
}

impl LoadingStatus {
    /// Whether an indicator should be on screen.
    pub fn is_shown(&self) -> bool {
        matches!(self, LoadingStatus::Loading { .. } | LoadingStatus::Failed { .. })
    }
}

/// Snapshot of globe state for the inspector.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobeSummary {
    pub tick: u64,
    pub variant_count: usize,
    pub active_tier: Option<usize>,
    pub active_resolution: Option<(u32, u32)>,
    pub active_threshold: Option<f32>,
    pub stage: Stage,
    pub fetch: String,
    pub progress: Option<f32>,
    pub effective_scale: f32,
    pub camera_distance: f32,
    pub root_yaw: f32,
    pub cloud_yaw: f32,
    pub average_frame_ms: Option<f64>,
}

impl std::fmt::Display for GlobeSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Globe: tick={} variants={}", self.tick, self.variant_count)?;
        match (self.active_tier, self.active_resolution) {
            (Some(tier), Some((lat, lon))) => write!(f, " tier={tier} ({lat}x{lon})")?,
            _ => write!(f, " tier=none")?,
        }
        write!(
            f,
            " distance={:.2} stage={:?} fetch={}",
            self.camera_distance, self.stage, self.fetch
        )?;
        if let Some(p) = self.progress {
            write!(f, " progress={:.0}%", p * 100.0)?;
        }
        write!(
            f,
            " scale={:.3} yaw={:.4} clouds={:.4}",
            self.effective_scale, self.root_yaw, self.cloud_yaw
        )?;
        if let Some(ms) = self.average_frame_ms {
            write!(f, " frame={ms:.2}ms")?;
        }
        Ok(())
    }
}

/// Detailed info about a single surface variant.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantInfo {
    pub id: VariantId,
    pub resolution: (u32, u32),
    pub activation_distance: f32,
    pub visible: bool,
    pub vertices: usize,
    pub triangles: usize,
    pub displacement: Option<AssetId>,
    pub normals_recomputed: u64,
}

impl std::fmt::Display for VariantInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Variant [{}] {}x{} from={:.1} visible={} verts={} tris={} displacement={} recomputes={}",
            self.id.short(),
            self.resolution.0,
            self.resolution.1,
            self.activation_distance,
            self.visible,
            self.vertices,
            self.triangles,
            self.displacement
                .map_or_else(|| "none".to_string(), |id| id.to_string()),
            self.normals_recomputed,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use globe_assets::{DisplacementMap, ManualTransport};
    use globe_input::Action;
    use globe_kernel::{GlobeConfig, RenderBackend, GlobeScene, TierConfig};
    use globe_common::CameraState;

    struct NullBackend;

    impl RenderBackend for NullBackend {
        fn render(&mut self, _scene: &GlobeScene, _camera: &CameraState) {}
        fn request_next_tick(&mut self) {}
        fn resize(&mut self, _width: u32, _height: u32) {}
    }

    fn globe(transport: &mut ManualTransport) -> Globe {
        let config = GlobeConfig {
            tiers: vec![TierConfig::new(8, 8, 0.0), TierConfig::new(4, 4, 20.0)],
            placeholder_resolution: (8, 4),
            star_count: 10,
            ..GlobeConfig::default()
        };
        Globe::new(&config, transport).unwrap()
    }

    #[test]
    fn summary_before_first_tick() {
        let globe = globe(&mut ManualTransport::new());
        let summary = GlobeInspector::summary(&globe, None);
        assert_eq!(summary.tick, 0);
        assert_eq!(summary.variant_count, 2);
        assert_eq!(summary.active_tier, None);
        assert_eq!(summary.stage, Stage::Placeholder);
        assert_eq!(summary.fetch, "in-flight");
        assert!(summary.average_frame_ms.is_none());
    }

    #[test]
    fn summary_tracks_driver_and_tier() {
        let mut globe = globe(&mut ManualTransport::new());
        let mut driver = FrameDriver::new(0.0005, 0.0001);
        driver.tick(&mut globe, &mut NullBackend);
        driver.tick(&mut globe, &mut NullBackend);

        let summary = GlobeInspector::summary(&globe, Some(&driver));
        assert_eq!(summary.tick, 2);
        assert_eq!(summary.active_tier, Some(0));
        assert_eq!(summary.active_resolution, Some((8, 8)));
        assert!(summary.average_frame_ms.is_some());

        globe.apply(Action::Zoom(-1000.0));
        driver.tick(&mut globe, &mut NullBackend);
        let summary = GlobeInspector::summary(&globe, Some(&driver));
        assert_eq!(summary.active_tier, Some(1));
        assert_eq!(summary.active_threshold, Some(20.0));
    }

    #[test]
    fn summary_reports_failure() {
        let mut globe = globe(&mut ManualTransport::new());
        globe.fail_elevation("404");
        let summary = GlobeInspector::summary(&globe, None);
        assert_eq!(summary.stage, Stage::Placeholder);
        assert_eq!(summary.fetch, "failed (404)");
        assert!(format!("{summary}").contains("fetch=failed (404)"));
    }

    #[test]
    fn inspect_variant_after_final_load() {
        let mut globe = globe(&mut ManualTransport::new());
        let data = DisplacementMap::flat(4, 2, 0.5).unwrap();
        let expected = data.id();
        assert!(globe.complete_elevation(data));

        let ids = GlobeInspector::list_variants(&globe);
        assert_eq!(ids.len(), 2);
        let info = GlobeInspector::inspect_variant(&globe, ids[1]).unwrap();
        assert_eq!(info.resolution, (4, 4));
        assert_eq!(info.displacement, Some(expected));
        assert!(info.normals_recomputed >= 1);
        assert!(format!("{info}").contains("4x4"));
    }

    #[test]
    fn loading_status_stalls_on_failure() {
        let mut transport = ManualTransport::new();
        let mut globe = globe(&mut transport);
        let (_, sink) = transport.take().unwrap();
        sink.progress(40, Some(100));
        globe.pump_assets();
        assert_eq!(
            GlobeInspector::loading_status(&globe),
            LoadingStatus::Loading {
                progress: Some(0.4)
            }
        );

        sink.fail("connection reset");
        globe.pump_assets();
        let status = GlobeInspector::loading_status(&globe);
        assert!(status.is_shown());
        match status {
            LoadingStatus::Failed { progress, message } => {
                assert_eq!(progress, Some(0.4));
                assert!(message.contains("connection reset"));
                assert!(message.contains("procedural:42"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn loading_status_hides_after_completion() {
        let mut globe = globe(&mut ManualTransport::new());
        assert!(GlobeInspector::loading_status(&globe).is_shown());
        assert!(globe.complete_elevation(DisplacementMap::flat(4, 2, 0.5).unwrap()));
        let status = GlobeInspector::loading_status(&globe);
        assert_eq!(status, LoadingStatus::Done);
        assert!(!status.is_shown());
    }

    #[test]
    fn inspect_unknown_variant() {
        let globe = globe(&mut ManualTransport::new());
        assert!(GlobeInspector::inspect_variant(&globe, VariantId::new()).is_none());
    }
}
