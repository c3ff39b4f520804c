//! Developer Tooling: read-only inspection of a running globe.
//!
//! # Invariants
//! - Inspection never mutates the globe or the driver.

mod inspector;

pub use inspector::{GlobeInspector, GlobeSummary, LoadingStatus, VariantInfo};

pub fn crate_info() -> &'static str {
    "globe-tools v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("tools"));
    }
}
