use globe_common::CameraState;
use globe_kernel::{GlobeScene, RenderBackend, SceneNode};
use std::fmt::Write;

/// Debug text renderer: a headless backend for the CLI and tests.
///
/// Each frame is rendered to a human-readable string describing the camera,
/// the visible surface tier and the rest of the scene.
#[derive(Debug)]
pub struct DebugTextRenderer {
    last_frame: String,
    frames: u64,
    tick_requested: bool,
    size: (u32, u32),
}

impl Default for DebugTextRenderer {
    fn default() -> Self {
        Self {
            last_frame: String::new(),
            frames: 0,
            tick_requested: false,
            size: (1280, 720),
        }
    }
}

impl DebugTextRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Output of the most recent `render` call.
    pub fn last_frame(&self) -> &str {
        &self.last_frame
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Returns whether a tick was requested since the last call, and clears it.
    pub fn take_tick_request(&mut self) -> bool {
        std::mem::take(&mut self.tick_requested)
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }
}

impl RenderBackend for DebugTextRenderer {
    fn render(&mut self, scene: &GlobeScene, camera: &CameraState) {
        self.frames += 1;
        let mut out = String::new();
        let p = camera.position;
        // Writing to a String cannot fail.
        let _ = writeln!(out, "=== Globe (frame={}) ===", self.frames);
        let _ = writeln!(
            out,
            "Camera: pos=({:.2}, {:.2}, {:.2}) distance={:.2} interacting={}",
            p.x,
            p.y,
            p.z,
            camera.distance_from_origin(),
            camera.is_user_interacting
        );
        let _ = writeln!(out, "Viewport: {}x{}", self.size.0, self.size.1);

        let mut hidden = 0;
        for node in scene.nodes() {
            match node {
                SceneNode::Variant { variant, .. } if !variant.is_visible() => hidden += 1,
                SceneNode::Variant { variant, .. } => {
                    let res = variant.resolution();
                    let material = variant.material();
                    let displacement = material
                        .displacement_id()
                        .map_or_else(|| "none".to_string(), |id| id.to_string());
                    let _ = writeln!(
                        out,
                        "  surface [{}] {}x{} from={:.1} displacement={} scale={:.3} yaw={:.4}",
                        variant.id().short(),
                        res.lat,
                        res.lon,
                        variant.activation_distance(),
                        displacement,
                        material.displacement_scale,
                        scene.root_yaw()
                    );
                }
                SceneNode::Clouds(clouds) => {
                    let _ = writeln!(
                        out,
                        "  clouds r={:.2} opacity={:.2} yaw={:.4}",
                        clouds.radius,
                        clouds.opacity,
                        clouds.yaw()
                    );
                }
                SceneNode::Stars(stars) => {
                    let _ = writeln!(out, "  stars n={} size={:.2}", stars.len(), stars.size);
                }
                SceneNode::Ambient(light) => {
                    let _ = writeln!(out, "  ambient intensity={:.2}", light.intensity);
                }
                SceneNode::Directional(light) => {
                    let d = light.position;
                    let _ = writeln!(
                        out,
                        "  directional intensity={:.2} from=({:.1}, {:.1}, {:.1})",
                        light.intensity, d.x, d.y, d.z
                    );
                }
            }
        }
        let _ = writeln!(out, "Hidden variants: {hidden}");
        self.last_frame = out;
    }

    fn request_next_tick(&mut self) {
        self.tick_requested = true;
    }

    fn resize(&mut self, width: u32, height: u32) {
        tracing::debug!(width, height, "text viewport resized");
        self.size = (width, height);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use globe_assets::ManualTransport;
    use globe_input::Action;
    use globe_kernel::{FrameDriver, Globe, GlobeConfig, TierConfig};

    fn globe() -> Globe {
        let config = GlobeConfig {
            tiers: vec![TierConfig::new(8, 8, 0.0), TierConfig::new(4, 4, 20.0)],
            placeholder_resolution: (8, 4),
            star_count: 25,
            ..GlobeConfig::default()
        };
        Globe::new(&config, &mut ManualTransport::new()).unwrap()
    }

    #[test]
    fn renders_visible_tier_only() {
        let mut globe = globe();
        let mut renderer = DebugTextRenderer::new();
        FrameDriver::new(0.0005, 0.0001).tick(&mut globe, &mut renderer);

        let out = renderer.last_frame();
        assert!(out.contains("frame=1"));
        assert!(out.contains("surface"));
        assert!(out.contains("8x8"));
        assert!(!out.contains("4x4"));
        assert!(out.contains("Hidden variants: 1"));
        assert!(out.contains("stars n=25"));
        assert!(out.contains("distance=15.00"));
    }

    #[test]
    fn zoomed_out_frame_shows_coarse_tier() {
        let mut globe = globe();
        let mut renderer = DebugTextRenderer::new();
        globe.apply(Action::Zoom(-1000.0));
        FrameDriver::new(0.0, 0.0).tick(&mut globe, &mut renderer);
        assert!(renderer.last_frame().contains("4x4"));
        assert!(!renderer.last_frame().contains("8x8"));
    }

    #[test]
    fn tick_request_is_consumed_once() {
        let mut globe = globe();
        let mut renderer = DebugTextRenderer::new();
        let mut driver = FrameDriver::new(0.0, 0.0);
        driver.tick(&mut globe, &mut renderer);
        assert!(renderer.take_tick_request());
        assert!(!renderer.take_tick_request());

        driver.stop();
        driver.tick(&mut globe, &mut renderer);
        assert!(!renderer.take_tick_request());
        assert_eq!(renderer.frames(), 2);
    }

    #[test]
    fn resize_is_reported() {
        let mut renderer = DebugTextRenderer::new();
        renderer.resize(640, 480);
        assert_eq!(renderer.size(), (640, 480));
    }
}
