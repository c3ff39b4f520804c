//! Globe Kernel: scene composition, per-tick frame driving and configuration.
//!
//! # Invariants
//! - Exactly one surface variant is visible after every tick.
//! - Asset events are applied only between ticks ([`FrameDriver::run_frame`]),
//!   so a tick never observes a half-upgraded set of variants.
//! - The cloud shell rotates every tick; the globe root only while idle.
//! - Renderers read the scene; they never mutate it.

mod backend;
mod config;
mod driver;
mod globe;
mod scene;

pub use backend::RenderBackend;
pub use config::{GlobeConfig, SetupError, TierConfig};
pub use driver::{DriverState, FrameDriver, FrameTimer, TickReport};
pub use globe::Globe;
pub use scene::{AmbientLight, CloudShell, DirectionalLight, GlobeScene, SceneNode, Starfield};
