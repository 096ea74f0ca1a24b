//! # Viewer Extensions
//!
//! The host-facing surface of the crate: the [`ViewerExtension`] lifecycle
//! trait and [`ClusteringExtension`], which drives the whole pipeline from
//! the host's toggle and attribute selection.

pub mod clustering;
pub mod traits;

pub use clustering::{Availability, ClusteringExtension, RunOutcome};
pub use traits::ViewerExtension;
