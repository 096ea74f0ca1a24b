//! # Animation
//!
//! Reversible, interruptible transitions between named transform states and
//! the original pose, driven once per frame by the host's render loop.

pub mod controller;
pub mod easing;
pub mod state;

// Re-export main types
pub use controller::{AnimationController, TransitionEvent};
pub use easing::Easing;
pub use state::AnimationState;
