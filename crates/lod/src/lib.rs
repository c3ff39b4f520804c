//! LOD Selector: picks the one surface variant to render for a camera distance.
//!
//! # Invariants
//! - Activation distances are unique and kept strictly increasing.
//! - After any evaluation exactly one variant is visible.
//! - Evaluation never allocates and never touches geometry; it only toggles
//!   visibility flags.
//!
//! A camera at exactly a threshold resolves to that threshold's tier, the
//! coarser of the two neighbours.

mod selector;

pub use selector::{ConfigurationError, LodSelector};
