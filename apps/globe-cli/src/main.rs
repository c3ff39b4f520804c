use clap::{Parser, Subcommand};
use globe_assets::{FetchState, ManualTransport, PipelineEvent, SchemeTransport};
use globe_input::Action;
use globe_kernel::{FrameDriver, Globe, GlobeConfig, GlobeScene};
use globe_render::DebugTextRenderer;
use globe_tools::GlobeInspector;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "globe-cli", about = "CLI tool for the LOD globe")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Globe configuration (JSON); defaults are used when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and crate info
    Info,
    /// Show which tier is selected at each camera distance
    Lod {
        /// Camera distances to evaluate
        #[arg(short, long, num_args = 1.., default_values_t = [6.0, 15.0, 20.0, 35.0, 50.0])]
        distance: Vec<f32>,
    },
    /// Run the globe headless with the debug text renderer
    Run {
        /// Number of ticks to run
        #[arg(short, long, default_value = "60")]
        ticks: u64,
        /// Final elevation source (path, file:<path> or procedural:<seed>)
        #[arg(short, long)]
        source: Option<String>,
        /// Keep ticking until the final elevation has loaded or failed
        #[arg(short, long)]
        wait: bool,
        /// Give up waiting after this many seconds
        #[arg(long, default_value = "30")]
        timeout: u64,
        /// Zoom steps applied before the first tick (negative zooms out)
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        zoom: f32,
        /// Print every frame instead of only the last
        #[arg(long)]
        frames: bool,
    },
    /// Write the default configuration to a file
    WriteConfig {
        /// Output path
        output: PathBuf,
    },
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<GlobeConfig> {
    let config = match path {
        Some(path) => GlobeConfig::load(path)?,
        None => GlobeConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn print_event(event: &PipelineEvent) {
    match event {
        PipelineEvent::Progress { stage, percent } => {
            println!("[assets] {stage:?} {percent:.0}%");
        }
        PipelineEvent::Ready { id } => println!("[assets] final elevation ready ({id})"),
        PipelineEvent::LoadFailed(failure) => println!("[assets] {failure}"),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            println!("globe-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("render: {}", globe_render::crate_info());
            println!("tools: {}", globe_tools::crate_info());
            let config = load_config(cli.config.as_ref())?;
            println!(
                "config: radius={} tiers={} final_source={}",
                config.radius,
                config.tiers.len(),
                config.final_source
            );
        }
        Commands::Lod { distance } => {
            let config = load_config(cli.config.as_ref())?;
            let mut scene = GlobeScene::compose(&config)?;
            for d in distance {
                let changed = scene.lod_mut().evaluate(d);
                match scene.lod().active() {
                    Some(v) => println!(
                        "distance={d:>7.2} -> tier {} ({}x{}, from {:.1}){}",
                        scene.lod().active_index().unwrap_or_default(),
                        v.resolution().lat,
                        v.resolution().lon,
                        v.activation_distance(),
                        if changed { " *" } else { "" }
                    ),
                    None => println!("distance={d:>7.2} -> no tier"),
                }
            }
        }
        Commands::Run {
            ticks,
            source,
            wait,
            timeout,
            zoom,
            frames,
        } => {
            let mut config = load_config(cli.config.as_ref())?;
            if let Some(source) = source {
                config.final_source = source;
            }

            let mut transport = SchemeTransport::default();
            let mut globe = Globe::new(&config, &mut transport)?;
            let mut driver = FrameDriver::from_config(&config);
            let mut renderer = DebugTextRenderer::new();
            if zoom != 0.0 {
                globe.apply(Action::Zoom(zoom));
            }

            let deadline = Instant::now() + Duration::from_secs(timeout);
            loop {
                let report = driver.run_frame(&mut globe, &mut renderer);
                for event in globe.drain_events() {
                    print_event(&event);
                }
                if frames {
                    print!("{}", renderer.last_frame());
                }

                let in_flight = matches!(
                    globe.pipeline().asset().fetch_state(),
                    FetchState::InFlight
                );
                let waiting = wait && in_flight && Instant::now() < deadline;
                if !renderer.take_tick_request() {
                    break;
                }
                if report.tick >= ticks && !waiting {
                    driver.stop();
                    break;
                }
                if waiting {
                    std::thread::sleep(Duration::from_millis(16));
                }
            }

            if !frames {
                print!("{}", renderer.last_frame());
            }
            println!("{}", GlobeInspector::summary(&globe, Some(&driver)));
            println!(
                "Frame time: avg={:.3}ms max={:.3}ms over {} ticks",
                driver.timer().average().as_secs_f64() * 1000.0,
                driver.timer().max().as_secs_f64() * 1000.0,
                driver.timer().count()
            );
        }
        Commands::WriteConfig { output } => {
            let config = load_config(cli.config.as_ref())?;
            config.save(&output)?;
            println!("wrote {}", output.display());
            // Round-trip through a parked transport so a bad file is caught here.
            let reloaded = GlobeConfig::load(&output)?;
            Globe::new(&reloaded, &mut ManualTransport::new())?;
        }
    }

    Ok(())
}
