//! # Host Integration
//!
//! The clustering pipeline runs inside a host viewer it does not control.
//! This module defines the narrow capability set it relies on and an
//! in-memory host for tests and demos.
//!
//! ## Key Components
//!
//! - [`SceneHost`] - hierarchy, property database, fragment visibility and geometry
//! - [`TransformSink`] - where animated transform deltas are written
//! - [`HostEvent`] - scene mutations that invalidate caches
//! - [`MemoryScene`] - map-backed host implementation

pub mod memory;
pub mod traits;

// Re-export main types
pub use memory::{MemoryScene, MemorySource};
pub use traits::{
    FragmentId, HostEvent, Property, PropertyRecord, PropertyValue, SceneHost, TransformSink,
};
