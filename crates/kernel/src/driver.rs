use std::time::{Duration, Instant};

use crate::backend::RenderBackend;
use crate::config::GlobeConfig;
use crate::globe::Globe;

/// Whether the user is currently steering the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Idle,
    Interacting,
}

/// What one tick did, for tooling and tests.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    /// 1-based index of this tick.
    pub tick: u64,
    pub state: DriverState,
    pub camera_distance: f32,
    pub camera_moved: bool,
    pub active_tier: Option<usize>,
    pub tier_changed: bool,
    pub cloud_yaw: f32,
    pub root_yaw: f32,
    /// Whether another tick was requested from the backend.
    pub scheduled: bool,
    pub duration: Duration,
}

/// Runs the per-tick sequence: controls, LOD, rotations, render, reschedule.
#[derive(Debug)]
pub struct FrameDriver {
    cloud_rotation_speed: f32,
    idle_rotation_speed: f32,
    state: DriverState,
    ticks: u64,
    stopped: bool,
    timer: FrameTimer,
}

impl FrameDriver {
    pub fn new(cloud_rotation_speed: f32, idle_rotation_speed: f32) -> Self {
        Self {
            cloud_rotation_speed,
            idle_rotation_speed,
            state: DriverState::Idle,
            ticks: 0,
            stopped: false,
            timer: FrameTimer::new(120),
        }
    }

    pub fn from_config(config: &GlobeConfig) -> Self {
        Self::new(config.cloud_rotation_speed, config.idle_rotation_speed)
    }

    /// Advance the globe by one tick and render it.
    pub fn tick(&mut self, globe: &mut Globe, backend: &mut dyn RenderBackend) -> TickReport {
        let _span = tracing::info_span!("tick", n = self.ticks + 1).entered();
        let start = Instant::now();

        let camera_moved = globe.controls_mut().update();
        self.state = if globe.controls().is_interacting() {
            DriverState::Interacting
        } else {
            DriverState::Idle
        };
        let camera = globe.controls().camera();
        let camera_distance = camera.distance_from_origin();

        let scene = globe.scene_mut();
        let tier_changed = scene.lod_mut().evaluate(camera_distance);
        scene.clouds_mut().rotate(self.cloud_rotation_speed);
        if self.state == DriverState::Idle {
            scene.rotate_root(self.idle_rotation_speed);
        }

        #[cfg(debug_assertions)]
        if let Err(e) = globe.scene().lod().verify_consistency() {
            tracing::error!("{e}");
        }

        backend.render(globe.scene(), &camera);
        let scheduled = !self.stopped;
        if scheduled {
            backend.request_next_tick();
        }

        self.ticks += 1;
        let duration = start.elapsed();
        self.timer.record(duration);

        let scene = globe.scene();
        let report = TickReport {
            tick: self.ticks,
            state: self.state,
            camera_distance,
            camera_moved,
            active_tier: scene.lod().active_index(),
            tier_changed,
            cloud_yaw: scene.clouds().yaw(),
            root_yaw: scene.root_yaw(),
            scheduled,
            duration,
        };
        tracing::trace!(
            distance = report.camera_distance,
            tier = ?report.active_tier,
            state = ?report.state,
            "tick complete"
        );
        report
    }

    /// Apply pending asset events, then tick. Hosts call this once per frame
    /// so transport results land between ticks.
    pub fn run_frame(&mut self, globe: &mut Globe, backend: &mut dyn RenderBackend) -> TickReport {
        globe.pump_assets();
        self.tick(globe, backend)
    }

    /// Cancel future scheduling. The current tick, if any, still renders.
    pub fn stop(&mut self) {
        if !self.stopped {
            tracing::info!(ticks = self.ticks, "frame driver stopped");
        }
        self.stopped = true;
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn timer(&self) -> &FrameTimer {
        &self.timer
    }
}

/// Ring buffer of recent tick durations.
#[derive(Debug)]
pub struct FrameTimer {
    history: Vec<Duration>,
    capacity: usize,
    index: usize,
    filled: bool,
}

impl FrameTimer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            history: vec![Duration::ZERO; capacity],
            capacity,
            index: 0,
            filled: false,
        }
    }

    pub fn record(&mut self, dt: Duration) {
        self.history[self.index] = dt;
        self.index = (self.index + 1) % self.capacity;
        if self.index == 0 {
            self.filled = true;
        }
    }

    fn recorded(&self) -> &[Duration] {
        let count = if self.filled { self.capacity } else { self.index };
        &self.history[..count]
    }

    pub fn average(&self) -> Duration {
        let samples = self.recorded();
        if samples.is_empty() {
            return Duration::ZERO;
        }
        samples.iter().sum::<Duration>() / samples.len() as u32
    }

    pub fn max(&self) -> Duration {
        self.recorded().iter().copied().max().unwrap_or(Duration::ZERO)
    }

    pub fn min(&self) -> Duration {
        self.recorded().iter().copied().min().unwrap_or(Duration::ZERO)
    }

    pub fn count(&self) -> usize {
        self.recorded().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TierConfig;
    use crate::scene::{GlobeScene, SceneNode};
    use globe_assets::{DisplacementMap, FetchState, ManualTransport, PipelineEvent, Stage};
    use globe_common::CameraState;
    use globe_input::Action;

    /// Counts calls and remembers which tier was drawn.
    #[derive(Default)]
    struct RecordingBackend {
        frames: usize,
        requests: usize,
        visible: Vec<f32>,
    }

    impl RenderBackend for RecordingBackend {
        fn render(&mut self, scene: &GlobeScene, _camera: &CameraState) {
            self.frames += 1;
            for node in scene.nodes() {
                if let SceneNode::Variant { variant, .. } = node {
                    if variant.is_visible() {
                        self.visible.push(variant.activation_distance());
                    }
                }
            }
        }

        fn request_next_tick(&mut self) {
            self.requests += 1;
        }

        fn resize(&mut self, _width: u32, _height: u32) {}
    }

    fn config() -> GlobeConfig {
        GlobeConfig {
            tiers: vec![
                TierConfig::new(16, 16, 0.0),
                TierConfig::new(8, 8, 20.0),
                TierConfig::new(4, 4, 40.0),
            ],
            placeholder_resolution: (16, 8),
            star_count: 10,
            ..GlobeConfig::default()
        }
    }

    fn setup() -> (Globe, ManualTransport, FrameDriver, RecordingBackend) {
        let cfg = config();
        let mut transport = ManualTransport::new();
        let globe = Globe::new(&cfg, &mut transport).unwrap();
        (
            globe,
            transport,
            FrameDriver::from_config(&cfg),
            RecordingBackend::default(),
        )
    }

    #[test]
    fn idle_ticks_rotate_root_and_clouds() {
        let (mut globe, _t, mut driver, mut backend) = setup();
        let mut previous = (globe.scene().root_yaw(), globe.scene().clouds().yaw());
        for _ in 0..100 {
            let report = driver.run_frame(&mut globe, &mut backend);
            assert!((report.root_yaw - previous.0 - 0.0001).abs() < 1e-6);
            assert!((report.cloud_yaw - previous.1 - 0.0005).abs() < 1e-6);
            assert_eq!(report.root_yaw, globe.scene().root_yaw());
            previous = (report.root_yaw, report.cloud_yaw);
        }
        assert!((globe.scene().root_yaw() - 0.01).abs() < 1e-5);
        assert!((globe.scene().clouds().yaw() - 0.05).abs() < 1e-5);
        assert_eq!(driver.state(), DriverState::Idle);
        assert_eq!(backend.frames, 100);
        assert_eq!(backend.requests, 100);
        // default camera at 15 sits in the finest band
        assert!(backend.visible.iter().all(|&d| d == 0.0));
        assert_eq!(backend.visible.len(), 100);
    }

    #[test]
    fn interaction_freezes_root_but_not_clouds() {
        let (mut globe, _t, mut driver, mut backend) = setup();
        globe.apply(Action::GestureStart);
        for _ in 0..100 {
            let report = driver.run_frame(&mut globe, &mut backend);
            assert_eq!(report.state, DriverState::Interacting);
            assert_eq!(report.root_yaw, 0.0);
        }
        assert_eq!(globe.scene().root_yaw(), 0.0);
        assert!((globe.scene().clouds().yaw() - 0.05).abs() < 1e-5);

        globe.apply(Action::GestureEnd);
        driver.run_frame(&mut globe, &mut backend);
        assert_eq!(driver.state(), DriverState::Idle);
        assert!(globe.scene().root_yaw() > 0.0);
    }

    #[test]
    fn zooming_out_switches_to_coarse_tier() {
        let (mut globe, _t, mut driver, mut backend) = setup();
        let first = driver.run_frame(&mut globe, &mut backend);
        assert_eq!(first.active_tier, Some(0));
        assert!(first.tier_changed);

        globe.apply(Action::Zoom(-1000.0));
        let report = driver.run_frame(&mut globe, &mut backend);
        assert!((report.camera_distance - 50.0).abs() < 1e-3);
        assert_eq!(report.active_tier, Some(2));
        assert!(report.tier_changed);
        assert_eq!(globe.scene().lod().visible_count(), 1);

        let again = driver.run_frame(&mut globe, &mut backend);
        assert!(!again.tier_changed);
    }

    #[test]
    fn completion_lands_between_ticks() {
        let (mut globe, mut transport, mut driver, mut backend) = setup();
        driver.run_frame(&mut globe, &mut backend);

        let (_, sink) = transport.take().unwrap();
        sink.progress(50, Some(100));
        let data = DisplacementMap::flat(8, 4, 0.9).unwrap();
        sink.complete(data.clone());
        // not applied until the next frame
        assert_eq!(globe.pipeline().stage(), Stage::Placeholder);

        driver.run_frame(&mut globe, &mut backend);
        assert_eq!(globe.pipeline().stage(), Stage::Final);
        for v in globe.scene().lod().variants() {
            assert_eq!(v.material().displacement_id(), Some(data.id()));
            assert_eq!(v.normals_recomputed(), 2);
            assert!(v.verify_consistency().is_ok());
        }
        let events = globe.drain_events();
        assert!(events.contains(&PipelineEvent::Ready { id: data.id() }));
    }

    #[test]
    fn failed_load_keeps_rendering_placeholder() {
        let (mut globe, mut transport, mut driver, mut backend) = setup();
        let placeholder = globe.scene().lod().variants()[0]
            .material()
            .displacement_id();

        let (_, sink) = transport.take().unwrap();
        sink.fail("404 Not Found");
        for _ in 0..10 {
            driver.run_frame(&mut globe, &mut backend);
        }

        assert_eq!(backend.frames, 10);
        assert_eq!(globe.pipeline().stage(), Stage::Placeholder);
        assert!(matches!(
            globe.pipeline().asset().fetch_state(),
            FetchState::Failed { .. }
        ));
        let active = globe.scene().lod().active().unwrap();
        assert_eq!(active.material().displacement_id(), placeholder);
        let failures = globe
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, PipelineEvent::LoadFailed(_)))
            .count();
        assert_eq!(failures, 1);
    }

    #[test]
    fn stop_cancels_scheduling() {
        let (mut globe, _t, mut driver, mut backend) = setup();
        driver.run_frame(&mut globe, &mut backend);
        driver.stop();
        let report = driver.run_frame(&mut globe, &mut backend);
        assert!(!report.scheduled);
        assert_eq!(backend.frames, 2);
        assert_eq!(backend.requests, 1);
        assert!(driver.is_stopped());
    }

    #[test]
    fn rotations_stay_within_a_turn() {
        let cfg = config();
        let mut transport = ManualTransport::new();
        let mut globe = Globe::new(&cfg, &mut transport).unwrap();
        let mut driver = FrameDriver::new(1.0, 1.0);
        let mut backend = RecordingBackend::default();
        for _ in 0..20 {
            let report = driver.tick(&mut globe, &mut backend);
            assert!((0.0..std::f32::consts::TAU).contains(&report.cloud_yaw));
            assert!((0.0..std::f32::consts::TAU).contains(&report.root_yaw));
        }
    }

    #[test]
    fn timer_tracks_ticks() {
        let (mut globe, _t, mut driver, mut backend) = setup();
        for _ in 0..5 {
            driver.run_frame(&mut globe, &mut backend);
        }
        assert_eq!(driver.ticks(), 5);
        assert_eq!(driver.timer().count(), 5);
        assert!(driver.timer().max() >= driver.timer().min());
    }

    #[test]
    fn frame_timer_ring_buffer() {
        let mut timer = FrameTimer::new(3);
        assert_eq!(timer.average(), Duration::ZERO);
        for ms in [10, 20, 30, 40] {
            timer.record(Duration::from_millis(ms));
        }
        assert_eq!(timer.count(), 3);
        assert_eq!(timer.min(), Duration::from_millis(20));
        assert_eq!(timer.max(), Duration::from_millis(40));
        assert_eq!(timer.average(), Duration::from_millis(30));
    }
}
