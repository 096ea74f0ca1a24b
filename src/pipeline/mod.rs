//! # Clustering Pipeline
//!
//! The stages run left to right on every trigger:
//!
//! - [`LeafResolver`] - which elements of a source get classified
//! - [`ClusterBuilder`] - groups them by an attribute value
//! - [`RotationAligner`] - optional per-source footprint alignment
//! - [`BoundingBoxProvider`] - cached per-shape bounds
//! - [`LayoutEngine`] - packs clusters into target transforms
//!
//! Only the resolver and builder suspend (on property queries); the rest is
//! synchronous computation over host geometry.

pub mod bounding_box;
pub mod cluster_builder;
pub mod layout;
pub mod leaf_resolver;
pub mod rotation;

// Re-export main types
pub use bounding_box::BoundingBoxProvider;
pub use cluster_builder::{Cluster, ClusterBuilder};
pub use layout::{LayoutEngine, LayoutResult, ShapeBounds};
pub use leaf_resolver::LeafResolver;
pub use rotation::RotationAligner;
