//! # Element Bounds
//!
//! World-space bounds of an element's visible fragments, optionally measured
//! in a frame rotated about the vertical axis. Results are memoized per
//! shape until the owning source is invalidated or its rotation changes.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use cgmath::{Quaternion, Rad, Rotation3, Vector3};

use crate::host::SceneHost;
use crate::scene::{ShapeIdentity, SourceId, AABB};

/// Computes and caches per-shape bounding boxes
pub struct BoundingBoxProvider<H: SceneHost> {
    host: Rc<H>,
    rotations: RefCell<HashMap<SourceId, Rad<f32>>>,
    cache: RefCell<HashMap<ShapeIdentity, AABB>>,
    world_cache: RefCell<HashMap<ShapeIdentity, AABB>>,
}

impl<H: SceneHost> BoundingBoxProvider<H> {
    pub fn new(host: Rc<H>) -> Self {
        Self {
            host,
            rotations: RefCell::new(HashMap::new()),
            cache: RefCell::new(HashMap::new()),
            world_cache: RefCell::new(HashMap::new()),
        }
    }

    /// Bounds of the visible fragments under `shape`, in the post-rotation
    /// frame of its source. Empty when nothing under it is visible.
    pub fn get_box(&self, shape: &ShapeIdentity) -> AABB {
        if let Some(hit) = self.cache.borrow().get(shape) {
            return *hit;
        }

        let rotation = self
            .rotations
            .borrow()
            .get(&shape.source_id)
            .map(|angle| Quaternion::from_angle_z(*angle));
        let bounds = self.measure(shape, rotation);

        self.cache.borrow_mut().insert(*shape, bounds);
        bounds
    }

    /// Bounds of `shape` where it currently sits in the scene, ignoring any
    /// alignment rotation of its source
    pub fn get_world_box(&self, shape: &ShapeIdentity) -> AABB {
        if !self.rotations.borrow().contains_key(&shape.source_id) {
            return self.get_box(shape);
        }
        if let Some(hit) = self.world_cache.borrow().get(shape) {
            return *hit;
        }

        let bounds = self.measure(shape, None);
        self.world_cache.borrow_mut().insert(*shape, bounds);
        bounds
    }

    fn measure(&self, shape: &ShapeIdentity, rotation: Option<Quaternion<f32>>) -> AABB {
        let mut bounds = AABB::empty();
        for fragment in self.host.fragments(shape.source_id, shape.element_id) {
            if !self.host.fragment_visible(shape.source_id, fragment) {
                continue;
            }
            for point in self.host.fragment_points(shape.source_id, fragment) {
                let p: Vector3<f32> = match rotation {
                    Some(q) => q * point,
                    None => point,
                };
                bounds.extend_point(p);
            }
        }
        bounds
    }

    /// Rotation about the vertical axis applied to a source before measuring
    pub fn rotation(&self, source: SourceId) -> Rad<f32> {
        self.rotations
            .borrow()
            .get(&source)
            .copied()
            .unwrap_or(Rad(0.0))
    }

    /// Set or clear the rotation of a source; its cached boxes are dropped
    /// when the rotation actually changes.
    pub fn set_rotation(&self, source: SourceId, angle: Option<Rad<f32>>) {
        let previous = {
            let mut rotations = self.rotations.borrow_mut();
            match angle {
                Some(angle) if angle.0 != 0.0 => rotations.insert(source, angle),
                _ => rotations.remove(&source),
            }
        };
        if previous.map(|a| a.0).unwrap_or(0.0) != angle.map(|a| a.0).unwrap_or(0.0) {
            self.invalidate(source);
        }
    }

    /// Drop every cached box belonging to `source`
    pub fn invalidate(&self, source: SourceId) {
        self.cache
            .borrow_mut()
            .retain(|shape, _| shape.source_id != source);
        self.world_cache
            .borrow_mut()
            .retain(|shape, _| shape.source_id != source);
    }

    pub fn clear(&self) {
        self.cache.borrow_mut().clear();
        self.world_cache.borrow_mut().clear();
        self.rotations.borrow_mut().clear();
    }

    pub fn cached_len(&self) -> usize {
        self.cache.borrow().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{MemoryScene, MemorySource};
    use cgmath::{Deg, InnerSpace};

    fn close(a: Vector3<f32>, b: Vector3<f32>) -> bool {
        (a - b).magnitude() < 1e-4
    }

    fn scene() -> (Rc<MemoryScene>, u32) {
        let mut src = MemorySource::new(SourceId(1), 1);
        src.add_element(2, 1, "Beam").add_element(3, 2, "Part").add_element(4, 2, "Part");
        src.add_box_fragment(3, AABB::new(Vector3::new(0.0, 0.0, 0.0), Vector3::new(2.0, 1.0, 1.0)));
        src.add_box_fragment(4, AABB::new(Vector3::new(2.0, 0.0, 0.0), Vector3::new(4.0, 1.0, 3.0)));
        let hidden = src.add_box_fragment(
            4,
            AABB::new(Vector3::new(10.0, 10.0, 10.0), Vector3::new(11.0, 11.0, 11.0)),
        );
        src.set_fragment_hidden(hidden, true);
        let scene = Rc::new(MemoryScene::new());
        scene.add_source(src);
        (scene, hidden)
    }

    #[test]
    fn test_box_covers_visible_descendant_fragments() {
        let (scene, _) = scene();
        let provider = BoundingBoxProvider::new(scene);

        let b = provider.get_box(&ShapeIdentity::new(SourceId(1), 2));
        assert_eq!(b.min, Vector3::new(0.0, 0.0, 0.0));
        assert_eq!(b.max, Vector3::new(4.0, 1.0, 3.0));
    }

    #[test]
    fn test_memoized_until_invalidated() {
        let (scene, hidden) = scene();
        let provider = BoundingBoxProvider::new(scene.clone());
        let shape = ShapeIdentity::new(SourceId(1), 2);

        let before = provider.get_box(&shape);
        scene.edit_source(SourceId(1), |s| {
            s.set_fragment_hidden(hidden, false);
        });
        assert_eq!(provider.get_box(&shape), before);
        assert_eq!(provider.cached_len(), 1);

        provider.invalidate(SourceId(1));
        assert_eq!(provider.cached_len(), 0);
        assert_eq!(provider.get_box(&shape).max, Vector3::new(11.0, 11.0, 11.0));
    }

    #[test]
    fn test_rotation_is_applied_before_measuring() {
        let (scene, _) = scene();
        let provider = BoundingBoxProvider::new(scene);
        let shape = ShapeIdentity::new(SourceId(1), 3);

        provider.get_box(&shape);
        provider.set_rotation(SourceId(1), Some(Deg(90.0).into()));
        assert_eq!(provider.cached_len(), 0);

        let b = provider.get_box(&shape);
        assert!(close(b.min, Vector3::new(-1.0, 0.0, 0.0)));
        assert!(close(b.max, Vector3::new(0.0, 2.0, 1.0)));
    }

    #[test]
    fn test_world_box_ignores_alignment_rotation() {
        let (scene, _) = scene();
        let provider = BoundingBoxProvider::new(scene);
        let shape = ShapeIdentity::new(SourceId(1), 3);

        provider.set_rotation(SourceId(1), Some(Deg(90.0).into()));
        let world = provider.get_world_box(&shape);
        assert_eq!(world.min, Vector3::new(0.0, 0.0, 0.0));
        assert_eq!(world.max, Vector3::new(2.0, 1.0, 1.0));
        assert!(close(provider.get_box(&shape).min, Vector3::new(-1.0, 0.0, 0.0)));
    }

    #[test]
    fn test_nothing_visible_gives_empty_box() {
        let mut src = MemorySource::new(SourceId(1), 1);
        src.add_element(2, 1, "Ghost");
        let scene = Rc::new(MemoryScene::new());
        scene.add_source(src);
        let provider = BoundingBoxProvider::new(scene);

        assert!(provider.get_box(&ShapeIdentity::new(SourceId(1), 2)).is_empty());
    }
}
