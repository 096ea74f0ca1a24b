//! # Cluster Layout Prelude
//!
//! Commonly used types and traits in one import, for hosts wiring the
//! extension in and for tests driving it against [`MemoryScene`].
//!
//! ## Usage
//!
//! ```no_run
//! use std::rc::Rc;
//! use cluster_layout::prelude::*;
//!
//! let scene = Rc::new(MemoryScene::new());
//! let extension = ClusteringExtension::new(scene, ClusterConfig::default());
//! extension.load();
//! ```

// Re-export the orchestrator and its configuration
pub use crate::config::ClusterConfig;
pub use crate::error::{ClusterError, HostError};
pub use crate::extension::{Availability, ClusteringExtension, RunOutcome, ViewerExtension};

// Re-export the host interface
pub use crate::host::{
    HostEvent, MemoryScene, MemorySource, PropertyRecord, PropertyValue, SceneHost, TransformSink,
};

// Re-export pipeline stages for hosts that drive them directly
pub use crate::pipeline::{
    BoundingBoxProvider, Cluster, ClusterBuilder, LayoutEngine, LayoutResult, LeafResolver,
    RotationAligner,
};

// Re-export animation and scene value types
pub use crate::animation::{AnimationController, AnimationState, Easing, TransitionEvent};
pub use crate::scene::{ElementId, ShapeIdentity, SourceId, Transform, AABB};

// Re-export common external dependencies
pub use cgmath::{Deg, Rad, Vector3};
