//! # Animation Controller
//!
//! Owns the registry of named [`AnimationState`]s and interpolates every
//! known shape between its current pose and the active target.
//!
//! ## Lifecycle
//!
//! 1. **Idle** - shapes rest at their current transforms
//! 2. **Transitioning** - [`AnimationController::update`] moves shapes toward
//!    the target each frame
//! 3. **Idle** again once the target is reached
//!
//! A new [`AnimationController::animate_to`] during a transition restarts
//! from the current interpolated pose, so there is never a jump.

use indexmap::IndexMap;
use log::{debug, info};
use std::collections::HashMap;

use super::easing::Easing;
use super::state::AnimationState;
use crate::error::{ClusterError, Result};
use crate::host::TransformSink;
use crate::scene::{ShapeIdentity, Transform};

/// Notification for the host UI when a transition starts or finishes.
///
/// `target` is the state name, `None` for the original pose.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionEvent {
    Started { target: Option<String> },
    Ended { target: Option<String> },
}

enum Phase {
    Idle,
    Transitioning {
        from: IndexMap<ShapeIdentity, Transform>,
        to: IndexMap<ShapeIdentity, Transform>,
        elapsed: f32,
    },
}

/// Interpolates shapes between named states and the original pose
pub struct AnimationController {
    states: HashMap<String, AnimationState>,
    current: IndexMap<ShapeIdentity, Transform>,
    active: Option<String>,
    /// The active state was overwritten since it was targeted
    active_changed: bool,
    phase: Phase,
    duration: f32,
    easing: Easing,
    events: Vec<TransitionEvent>,
}

impl AnimationController {
    pub fn new(duration: f32, easing: Easing) -> Self {
        Self {
            states: HashMap::new(),
            current: IndexMap::new(),
            active: None,
            active_changed: false,
            phase: Phase::Idle,
            duration: duration.max(0.0),
            easing,
            events: Vec::new(),
        }
    }

    /// Store or overwrite a named target state
    pub fn register_state(&mut self, name: impl Into<String>, state: AnimationState) {
        let name = name.into();
        if self.active.as_deref() == Some(name.as_str()) {
            self.active_changed = true;
        }
        debug!("registered animation state `{}` ({} shapes)", name, state.len());
        self.states.insert(name, state);
    }

    pub fn remove_state(&mut self, name: &str) -> Option<AnimationState> {
        self.states.remove(name)
    }

    pub fn state(&self, name: &str) -> Option<&AnimationState> {
        self.states.get(name)
    }

    pub fn state_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.states.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Start a transition toward a named state, or toward the original
    /// pose with `None`.
    ///
    /// Returns `Ok(false)` without doing anything when `target` is already
    /// the active target and that state has not changed since.
    pub fn animate_to(&mut self, target: Option<&str>) -> Result<bool> {
        if self.active.as_deref() == target && !self.active_changed {
            return Ok(false);
        }

        let to: IndexMap<ShapeIdentity, Transform> = match target {
            Some(name) => self
                .states
                .get(name)
                .ok_or_else(|| ClusterError::UnknownState(name.to_string()))?
                .iter()
                .map(|(shape, transform)| (*shape, *transform))
                .collect(),
            None => self
                .current
                .keys()
                .map(|shape| (*shape, Transform::identity()))
                .collect(),
        };
        let from = to
            .keys()
            .map(|shape| (*shape, self.current_transform(shape)))
            .collect();

        if matches!(self.phase, Phase::Transitioning { .. }) {
            debug!("transition interrupted, restarting from current pose");
        }
        info!(
            "transition to {} ({} shapes)",
            target.unwrap_or("original pose"),
            to.len()
        );

        self.active = target.map(str::to_string);
        self.active_changed = false;
        self.phase = Phase::Transitioning {
            from,
            to,
            elapsed: 0.0,
        };
        self.events.push(TransitionEvent::Started {
            target: self.active.clone(),
        });
        Ok(true)
    }

    /// Advance the transition by `delta_time` seconds and push the new
    /// transforms to `sink`. Returns `true` while still transitioning.
    pub fn update(&mut self, delta_time: f32, sink: &impl TransformSink) -> bool {
        let Phase::Transitioning { from, to, elapsed } = &mut self.phase else {
            return false;
        };

        *elapsed += delta_time.max(0.0);
        let progress = if self.duration <= 0.0 {
            1.0
        } else {
            (*elapsed / self.duration).min(1.0)
        };
        let eased = self.easing.apply(progress);

        for (shape, target) in to.iter() {
            let start = from.get(shape).copied().unwrap_or_default();
            let pose = if progress >= 1.0 {
                *target
            } else {
                Transform::interpolate(&start, target, eased)
            };
            self.current.insert(*shape, pose);
            sink.apply_transform(shape, &pose);
        }

        if progress < 1.0 {
            return true;
        }

        self.phase = Phase::Idle;
        debug!(
            "transition to {} finished",
            self.active.as_deref().unwrap_or("original pose")
        );
        self.events.push(TransitionEvent::Ended {
            target: self.active.clone(),
        });
        false
    }

    /// Cancel any transition and snap every known shape to its original pose
    pub fn reset(&mut self, sink: &impl TransformSink) {
        let was_transitioning = matches!(self.phase, Phase::Transitioning { .. });
        let was_displaced = self.active.is_some() || self.current.values().any(|t| !t.is_identity());

        self.phase = Phase::Idle;
        self.active = None;
        self.active_changed = false;
        for (shape, pose) in self.current.iter_mut() {
            *pose = Transform::identity();
            sink.apply_transform(shape, pose);
        }

        if was_transitioning || was_displaced {
            info!("animation reset to original pose");
            self.events.push(TransitionEvent::Ended { target: None });
        }
    }

    /// Current pose of a shape, identity when it was never moved
    pub fn current_transform(&self, shape: &ShapeIdentity) -> Transform {
        self.current.get(shape).copied().unwrap_or_default()
    }

    pub fn is_transitioning(&self) -> bool {
        matches!(self.phase, Phase::Transitioning { .. })
    }

    /// Name of the state last targeted, `None` for the original pose
    pub fn active_target(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Linear progress of the running transition
    pub fn progress(&self) -> Option<f32> {
        match &self.phase {
            Phase::Idle => None,
            Phase::Transitioning { elapsed, .. } if self.duration > 0.0 => {
                Some((elapsed / self.duration).min(1.0))
            }
            Phase::Transitioning { .. } => Some(0.0),
        }
    }

    pub fn set_duration(&mut self, duration: f32) {
        self.duration = duration.max(0.0);
    }

    pub fn set_easing(&mut self, easing: Easing) {
        self.easing = easing;
    }

    /// Drain queued transition notifications
    pub fn take_events(&mut self) -> Vec<TransitionEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SourceId;
    use cgmath::{InnerSpace, Vector3};
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingSink {
        writes: RefCell<Vec<(ShapeIdentity, Transform)>>,
    }

    impl TransformSink for RecordingSink {
        fn apply_transform(&self, shape: &ShapeIdentity, transform: &Transform) {
            self.writes.borrow_mut().push((*shape, *transform));
        }
    }

    fn shape(id: u32) -> ShapeIdentity {
        ShapeIdentity::new(SourceId(1), id)
    }

    fn moved(x: f32) -> Transform {
        Transform::from_translation(Vector3::new(x, 0.0, 0.0))
    }

    fn controller_with_layout() -> AnimationController {
        let mut controller = AnimationController::new(1.0, Easing::Linear);
        controller.register_state(
            "layout",
            [(shape(1), moved(10.0)), (shape(2), moved(-4.0))]
                .into_iter()
                .collect(),
        );
        controller
    }

    #[test]
    fn test_transition_reaches_target_exactly() {
        let sink = RecordingSink::default();
        let mut controller = controller_with_layout();

        assert!(controller.animate_to(Some("layout")).unwrap());
        assert!(controller.update(0.5, &sink));
        assert_eq!(controller.current_transform(&shape(1)).translation.x, 5.0);
        assert!(!controller.update(0.6, &sink));

        assert_eq!(controller.current_transform(&shape(1)), moved(10.0));
        assert_eq!(controller.current_transform(&shape(2)), moved(-4.0));
        assert_eq!(
            controller.take_events(),
            vec![
                TransitionEvent::Started { target: Some("layout".to_string()) },
                TransitionEvent::Ended { target: Some("layout".to_string()) },
            ]
        );
        assert_eq!(sink.writes.borrow().len(), 4);
    }

    #[test]
    fn test_repeated_animate_to_is_noop() {
        let mut controller = controller_with_layout();
        // Already at the original pose
        assert!(!controller.animate_to(None).unwrap());

        assert!(controller.animate_to(Some("layout")).unwrap());
        assert!(!controller.animate_to(Some("layout")).unwrap());
        assert_eq!(controller.take_events().len(), 1);
    }

    #[test]
    fn test_overwritten_active_state_can_be_retargeted() {
        let sink = RecordingSink::default();
        let mut controller = controller_with_layout();
        controller.animate_to(Some("layout")).unwrap();
        controller.update(1.0, &sink);

        controller.register_state("layout", [(shape(1), moved(2.0))].into_iter().collect());
        assert!(controller.animate_to(Some("layout")).unwrap());
        controller.update(1.0, &sink);

        assert_eq!(controller.current_transform(&shape(1)), moved(2.0));
        // Not part of the new state: left where it was
        assert_eq!(controller.current_transform(&shape(2)), moved(-4.0));
    }

    #[test]
    fn test_interrupt_restarts_from_current_pose() {
        let sink = RecordingSink::default();
        let mut controller = controller_with_layout();
        controller.animate_to(Some("layout")).unwrap();
        controller.update(0.25, &sink);
        let midway = controller.current_transform(&shape(1));
        assert_eq!(midway.translation.x, 2.5);

        controller.animate_to(None).unwrap();
        controller.update(0.0, &sink);
        // No jump: the first frame of the new transition is where the old one stopped
        assert_eq!(controller.current_transform(&shape(1)), midway);

        controller.update(0.5, &sink);
        assert!((controller.current_transform(&shape(1)).translation.x - 1.25).abs() < 1e-6);
        controller.update(0.5, &sink);
        assert!(controller.current_transform(&shape(1)).is_identity());
        assert!(controller.current_transform(&shape(2)).is_identity());
    }

    #[test]
    fn test_reset_while_transitioning_snaps_and_reports_no_layout() {
        let sink = RecordingSink::default();
        let mut controller = controller_with_layout();
        controller.animate_to(Some("layout")).unwrap();
        controller.update(0.3, &sink);
        controller.take_events();

        controller.reset(&sink);

        assert!(!controller.is_transitioning());
        assert_eq!(controller.active_target(), None);
        assert!(controller.current_transform(&shape(1)).is_identity());
        assert!(controller.current_transform(&shape(2)).is_identity());
        assert_eq!(controller.take_events(), vec![TransitionEvent::Ended { target: None }]);
        assert!(!controller.update(1.0, &sink));
    }

    #[test]
    fn test_unknown_state() {
        let mut controller = AnimationController::new(1.0, Easing::Linear);
        assert!(matches!(
            controller.animate_to(Some("missing")),
            Err(ClusterError::UnknownState(name)) if name == "missing"
        ));
        assert!(controller.take_events().is_empty());
    }

    #[test]
    fn test_zero_duration_completes_on_next_update() {
        let sink = RecordingSink::default();
        let mut controller = controller_with_layout();
        controller.set_duration(0.0);
        controller.animate_to(Some("layout")).unwrap();

        assert!(!controller.update(0.0, &sink));
        assert_eq!(controller.current_transform(&shape(1)), moved(10.0));
        assert_eq!(controller.progress(), None);
    }

    #[test]
    fn test_rotation_interpolates_along_shortest_arc() {
        let sink = RecordingSink::default();
        let mut controller = AnimationController::new(2.0, Easing::SmoothStep);
        let target = Transform::from_translation_rotation_z(
            Vector3::new(0.0, 0.0, 0.0),
            cgmath::Deg(90.0).into(),
        );
        controller.register_state("turned", [(shape(1), target)].into_iter().collect());
        controller.animate_to(Some("turned")).unwrap();
        controller.update(1.0, &sink);

        let halfway = controller.current_transform(&shape(1)).rotation;
        assert!((halfway.magnitude() - 1.0).abs() < 1e-5);
        let expected = Transform::from_translation_rotation_z(
            Vector3::new(0.0, 0.0, 0.0),
            cgmath::Deg(45.0).into(),
        );
        assert!((halfway - expected.rotation).magnitude() < 1e-4);
    }
}
