//! # Scene Value Types
//!
//! Plain value types shared by every stage of the clustering pipeline.
//!
//! - [`ShapeIdentity`] - `{ source, element }` lookup key
//! - [`Transform`] - rigid delta from an element's original pose
//! - [`AABB`] - axis-aligned bounds, possibly empty
//!
//! Coordinates are Z-up: "horizontal" means the XY plane and rotations used
//! for alignment are about the Z axis.

pub mod bounds;
pub mod identity;
pub mod transform;

// Re-export main types
pub use bounds::AABB;
pub use identity::{ElementId, ShapeIdentity, SourceId};
pub use transform::Transform;
