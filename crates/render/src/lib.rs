//! Rendering Adapter: backends implement [`globe_kernel::RenderBackend`].
//!
//! # Invariants
//! - Renderers read the scene; they never mutate it.
//! - Only visible surface variants are drawn.
//!
//! The GPU backend lives in `globe-render-wgpu`. This crate carries the
//! headless [`DebugTextRenderer`] used by the CLI and tests.

mod renderer;

pub use renderer::DebugTextRenderer;

pub fn crate_info() -> &'static str {
    "globe-render v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("render"));
    }
}
