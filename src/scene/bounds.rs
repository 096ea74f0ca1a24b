//! # Bounding Volumes
//!
//! Axis-aligned bounding boxes used for element bounds, layout packing and
//! overlap checks. Boxes may be empty (no geometry); an empty box has
//! `min > max` on every axis and absorbs nothing when merged.

use cgmath::{Matrix4, Vector3, Vector4};

/// Axis-aligned bounding box in world space (or in a rotated frame)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AABB {
    /// Minimum corner of the bounding box
    pub min: Vector3<f32>,
    /// Maximum corner of the bounding box
    pub max: Vector3<f32>,
}

impl AABB {
    /// Create a new AABB
    pub fn new(min: Vector3<f32>, max: Vector3<f32>) -> Self {
        Self { min, max }
    }

    /// A box containing nothing
    pub fn empty() -> Self {
        Self::new(
            Vector3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY),
            Vector3::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
        )
    }

    /// Create AABB from a set of points
    pub fn from_vertices(vertices: &[Vector3<f32>]) -> Self {
        let mut aabb = Self::empty();
        for vertex in vertices {
            aabb.extend_point(*vertex);
        }
        aabb
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Grow the box to include a point
    pub fn extend_point(&mut self, p: Vector3<f32>) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.min.z = self.min.z.min(p.z);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
        self.max.z = self.max.z.max(p.z);
    }

    /// Smallest box containing both boxes
    pub fn union(&self, other: &AABB) -> AABB {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let mut merged = *self;
        merged.extend_point(other.min);
        merged.extend_point(other.max);
        merged
    }

    pub fn center(&self) -> Vector3<f32> {
        (self.min + self.max) * 0.5
    }

    /// Extent along each axis, zero for an empty box
    pub fn size(&self) -> Vector3<f32> {
        if self.is_empty() {
            return Vector3::new(0.0, 0.0, 0.0);
        }
        self.max - self.min
    }

    /// Area of the projection onto the horizontal (XY) plane
    pub fn footprint(&self) -> f32 {
        let size = self.size();
        size.x * size.y
    }

    /// The eight corners of the box
    pub fn corners(&self) -> [Vector3<f32>; 8] {
        [
            Vector3::new(self.min.x, self.min.y, self.min.z),
            Vector3::new(self.max.x, self.min.y, self.min.z),
            Vector3::new(self.min.x, self.max.y, self.min.z),
            Vector3::new(self.min.x, self.min.y, self.max.z),
            Vector3::new(self.max.x, self.max.y, self.min.z),
            Vector3::new(self.max.x, self.min.y, self.max.z),
            Vector3::new(self.min.x, self.max.y, self.max.z),
            Vector3::new(self.max.x, self.max.y, self.max.z),
        ]
    }

    /// Apply a transformation matrix to the AABB
    pub fn transform(&self, matrix: &Matrix4<f32>) -> Self {
        if self.is_empty() {
            return *self;
        }

        // Transform all 8 corners of the AABB and compute new bounds
        let mut transformed = AABB::empty();
        for corner in &self.corners() {
            let homogeneous = Vector4::new(corner.x, corner.y, corner.z, 1.0);
            let t = matrix * homogeneous;
            transformed.extend_point(Vector3::new(t.x / t.w, t.y / t.w, t.z / t.w));
        }
        transformed
    }

    /// Shift the box by a translation
    pub fn translated(&self, offset: Vector3<f32>) -> Self {
        if self.is_empty() {
            return *self;
        }
        Self::new(self.min + offset, self.max + offset)
    }

    /// True when the interiors overlap on the horizontal plane by more than `eps`
    pub fn overlaps_xy(&self, other: &AABB, eps: f32) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        self.min.x + eps < other.max.x
            && other.min.x + eps < self.max.x
            && self.min.y + eps < other.max.y
            && other.min.y + eps < self.max.y
    }
}

impl Default for AABB {
    fn default() -> Self {
        Self::empty()
    }
}
