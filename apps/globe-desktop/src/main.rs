use anyhow::Result;
use clap::Parser;
use egui::Context as EguiContext;
use globe_assets::{PipelineEvent, SchemeTransport, Stage};
use globe_input::Action;
use globe_kernel::{FrameDriver, Globe, GlobeConfig, RenderBackend};
use globe_render_wgpu::WgpuBackend;
use globe_tools::{GlobeInspector, LoadingStatus};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

/// Pixel-delta wheel events per zoom step.
const PIXELS_PER_ZOOM_STEP: f32 = 50.0;

#[derive(Parser)]
#[command(name = "globe-desktop", about = "LOD globe desktop viewer")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Globe configuration (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Final elevation source, overriding the configuration
    #[arg(short, long)]
    source: Option<String>,
}

/// Application state.
struct AppState {
    globe: Globe,
    driver: FrameDriver,
    show_inspector: bool,
    dragging: bool,
    last_cursor: Option<PhysicalPosition<f64>>,
}

impl AppState {
    fn new(globe: Globe, driver: FrameDriver) -> Self {
        Self {
            globe,
            driver,
            show_inspector: true,
            dragging: false,
            last_cursor: None,
        }
    }

    fn absorb_events(&mut self) {
        for event in self.globe.drain_events() {
            match event {
                PipelineEvent::Progress { stage, percent } => {
                    tracing::debug!(?stage, percent, "elevation progress");
                }
                PipelineEvent::Ready { id } => {
                    tracing::info!(%id, "final elevation displayed");
                }
                PipelineEvent::LoadFailed(failure) => {
                    tracing::warn!("{failure}");
                }
            }
        }
    }

    fn handle_mouse_button(&mut self, pressed: bool) {
        if pressed && !self.dragging {
            self.dragging = true;
            self.globe.apply(Action::GestureStart);
        } else if !pressed && self.dragging {
            self.dragging = false;
            self.globe.apply(Action::GestureEnd);
        }
    }

    fn handle_cursor(&mut self, position: PhysicalPosition<f64>) {
        if let (true, Some(last)) = (self.dragging, self.last_cursor) {
            self.globe.apply(Action::Orbit {
                dx: (position.x - last.x) as f32,
                dy: (position.y - last.y) as f32,
            });
        }
        self.last_cursor = Some(position);
    }

    fn handle_wheel(&mut self, delta: MouseScrollDelta) {
        let steps = match delta {
            MouseScrollDelta::LineDelta(_, y) => y,
            MouseScrollDelta::PixelDelta(p) => p.y as f32 / PIXELS_PER_ZOOM_STEP,
        };
        if steps != 0.0 {
            self.globe.apply(Action::Zoom(steps));
        }
    }

    fn draw_ui(&mut self, ctx: &EguiContext) {
        let status = GlobeInspector::loading_status(&self.globe);
        if status.is_shown() {
            egui::TopBottomPanel::bottom("elevation_progress").show(ctx, |ui| {
                ui.horizontal(|ui| match &status {
                    LoadingStatus::Loading { progress } => {
                        ui.label("Loading elevation");
                        ui.add(
                            egui::ProgressBar::new(progress.unwrap_or(0.0))
                                .show_percentage()
                                .animate(progress.is_none()),
                        );
                    }
                    LoadingStatus::Failed { progress, message } => {
                        ui.add(egui::ProgressBar::new(progress.unwrap_or(0.0)).show_percentage());
                        ui.colored_label(egui::Color32::LIGHT_RED, message);
                    }
                    LoadingStatus::Idle | LoadingStatus::Done => {}
                });
            });
        }

        if !self.show_inspector {
            return;
        }

        let summary = GlobeInspector::summary(&self.globe, Some(&self.driver));

        egui::SidePanel::left("inspector")
            .default_width(280.0)
            .show(ctx, |ui| {
                ui.heading("Globe");
                ui.separator();
                ui.label(format!("Tick: {}", summary.tick));
                ui.label(format!("Camera distance: {:.2}", summary.camera_distance));
                match (summary.active_tier, summary.active_resolution) {
                    (Some(tier), Some((lat, lon))) => {
                        ui.label(format!("Tier: {tier} ({lat}x{lon})"));
                    }
                    _ => {
                        ui.label("Tier: none");
                    }
                }
                ui.label(format!("Variants: {}", summary.variant_count));
                ui.label(format!("State: {:?}", self.driver.state()));
                ui.separator();

                ui.heading("Elevation");
                let stage = match summary.stage {
                    Stage::Unloaded => "unloaded",
                    Stage::Placeholder => "placeholder",
                    Stage::Final => "final",
                };
                ui.label(format!("Stage: {stage}"));
                ui.label(format!("Fetch: {}", summary.fetch));
                ui.label(format!("Scale: {:.3}", summary.effective_scale));
                ui.separator();

                ui.label(format!("Globe yaw: {:.4}", summary.root_yaw));
                ui.label(format!("Cloud yaw: {:.4}", summary.cloud_yaw));
                if let Some(ms) = summary.average_frame_ms {
                    ui.label(format!("Frame: {ms:.2} ms"));
                }

                ui.separator();
                ui.small("F1: Toggle Inspector | LMB: Orbit | Wheel: Zoom");
            });
    }
}

struct GpuApp {
    state: AppState,
    window: Option<Arc<Window>>,
    backend: Option<WgpuBackend>,
    egui_ctx: EguiContext,
    egui_winit: Option<egui_winit::State>,
    egui_renderer: Option<egui_wgpu::Renderer>,
}

impl GpuApp {
    fn new(state: AppState) -> Self {
        Self {
            state,
            window: None,
            backend: None,
            egui_ctx: EguiContext::default(),
            egui_winit: None,
            egui_renderer: None,
        }
    }

    fn init_gpu(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title("Globe")
            .with_inner_size(PhysicalSize::new(1280u32, 720));
        let window = Arc::new(event_loop.create_window(attrs)?);

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance.create_surface(window.clone())?;

        let size = window.inner_size();
        let backend = WgpuBackend::new(&instance, surface, size.width, size.height)?;
        let (width, height) = backend.size();
        self.state.globe.apply(Action::Resize { width, height });

        let egui_winit = egui_winit::State::new(
            self.egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let egui_renderer =
            egui_wgpu::Renderer::new(backend.device(), backend.surface_format(), None, 1, false);

        window.request_redraw();
        self.window = Some(window);
        self.backend = Some(backend);
        self.egui_winit = Some(egui_winit);
        self.egui_renderer = Some(egui_renderer);
        Ok(())
    }

    fn redraw(&mut self) {
        let (Some(window), Some(backend), Some(egui_winit), Some(egui_renderer)) = (
            &self.window,
            &mut self.backend,
            &mut self.egui_winit,
            &mut self.egui_renderer,
        ) else {
            return;
        };

        self.state
            .driver
            .run_frame(&mut self.state.globe, backend);
        self.state.absorb_events();

        let raw_input = egui_winit.take_egui_input(window);
        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            self.state.draw_ui(ctx);
        });
        egui_winit.handle_platform_output(window, full_output.platform_output);

        let paint_jobs = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);
        let (width, height) = backend.size();
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [width, height],
            pixels_per_point: full_output.pixels_per_point,
        };

        // Texture deltas apply even when no frame was acquired this tick.
        for (id, image_delta) in &full_output.textures_delta.set {
            egui_renderer.update_texture(backend.device(), backend.queue(), *id, image_delta);
        }

        backend.present(|device, queue, view| {
            let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("egui_encoder"),
            });
            egui_renderer.update_buffers(
                device,
                queue,
                &mut encoder,
                &paint_jobs,
                &screen_descriptor,
            );
            {
                let mut pass = encoder
                    .begin_render_pass(&wgpu::RenderPassDescriptor {
                        label: Some("egui_pass"),
                        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                            view,
                            resolve_target: None,
                            ops: wgpu::Operations {
                                load: wgpu::LoadOp::Load,
                                store: wgpu::StoreOp::Store,
                            },
                        })],
                        depth_stencil_attachment: None,
                        ..Default::default()
                    })
                    .forget_lifetime();
                egui_renderer.render(&mut pass, &paint_jobs, &screen_descriptor);
            }
            queue.submit(std::iter::once(encoder.finish()));
        });

        for id in &full_output.textures_delta.free {
            egui_renderer.free_texture(id);
        }

        if backend.take_redraw_request() {
            window.request_redraw();
        }
    }
}

impl ApplicationHandler for GpuApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(e) = self.init_gpu(event_loop) {
            tracing::error!("failed to initialize GPU: {e}");
            event_loop.exit();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if let (Some(egui_winit), Some(window)) = (&mut self.egui_winit, &self.window) {
            let response = egui_winit.on_window_event(window, &event);
            let release = matches!(
                event,
                WindowEvent::MouseInput {
                    state: ElementState::Released,
                    ..
                }
            );
            // Releases always reach the globe so a drag cannot stay stuck.
            if response.consumed && !release {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                self.state.driver.stop();
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                if let Some(backend) = &mut self.backend {
                    backend.resize(new_size.width, new_size.height);
                    let (width, height) = backend.size();
                    self.state.globe.apply(Action::Resize { width, height });
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => match key {
                KeyCode::F1 => self.state.show_inspector = !self.state.show_inspector,
                KeyCode::Escape => {
                    self.state.driver.stop();
                    event_loop.exit();
                }
                _ => {}
            },
            WindowEvent::MouseInput {
                button: MouseButton::Left,
                state: btn_state,
                ..
            } => {
                self.state
                    .handle_mouse_button(btn_state == ElementState::Pressed);
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.state.handle_cursor(position);
            }
            WindowEvent::CursorLeft { .. } => {
                self.state.last_cursor = None;
            }
            WindowEvent::MouseWheel { delta, .. } => {
                self.state.handle_wheel(delta);
            }
            WindowEvent::RedrawRequested => self.redraw(),
            _ => {}
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    tracing::info!("globe-desktop starting");

    let mut config = match &cli.config {
        Some(path) => GlobeConfig::load(path)?,
        None => GlobeConfig::default(),
    };
    if let Some(source) = cli.source {
        config.final_source = source;
    }

    let mut transport = SchemeTransport::default();
    let globe = Globe::new(&config, &mut transport)?;
    let driver = FrameDriver::from_config(&config);

    let event_loop = EventLoop::new()?;
    // Ticks are scheduled by the frame driver through redraw requests.
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = GpuApp::new(AppState::new(globe, driver));
    event_loop.run_app(&mut app)?;

    Ok(())
}
