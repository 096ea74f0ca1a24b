// src/lib.rs
//! Cluster Layout
//!
//! Groups the elements of a loaded 3D scene into clusters by a property
//! value, packs the clusters into a non-overlapping layout and animates the
//! scene between its original pose and the clustered one.

pub mod animation;
pub mod config;
pub mod error;
pub mod extension;
pub mod host;
pub mod pipeline;
pub mod prelude;
pub mod scene;

// Re-export main types for convenience
pub use config::ClusterConfig;
pub use error::{ClusterError, HostError, Result};
pub use extension::{ClusteringExtension, RunOutcome};
