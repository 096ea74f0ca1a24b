//! Named interpolation endpoints.

use indexmap::IndexMap;

use crate::pipeline::LayoutResult;
use crate::scene::{ShapeIdentity, Transform};

/// Snapshot of target transforms for a set of shapes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnimationState {
    transforms: IndexMap<ShapeIdentity, Transform>,
}

impl AnimationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, shape: ShapeIdentity, transform: Transform) {
        self.transforms.insert(shape, transform);
    }

    pub fn get(&self, shape: &ShapeIdentity) -> Option<&Transform> {
        self.transforms.get(shape)
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ShapeIdentity, &Transform)> {
        self.transforms.iter()
    }
}

impl From<LayoutResult> for AnimationState {
    fn from(layout: LayoutResult) -> Self {
        Self {
            transforms: layout.into_transforms(),
        }
    }
}

impl FromIterator<(ShapeIdentity, Transform)> for AnimationState {
    fn from_iter<I: IntoIterator<Item = (ShapeIdentity, Transform)>>(iter: I) -> Self {
        Self {
            transforms: iter.into_iter().collect(),
        }
    }
}
