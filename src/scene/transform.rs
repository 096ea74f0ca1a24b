//! Rigid transform deltas applied on top of an element's original placement.

use cgmath::{InnerSpace, Matrix4, Quaternion, Rad, Rotation3, Vector3, VectorSpace};

/// Rigid delta `p' = rotation * p + translation`.
///
/// The identity transform is the element's original pose; layouts and
/// animation states are expressed as deltas from it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vector3<f32>,
    pub rotation: Quaternion<f32>,
}

impl Transform {
    pub fn identity() -> Self {
        Self {
            translation: Vector3::new(0.0, 0.0, 0.0),
            rotation: Quaternion::new(1.0, 0.0, 0.0, 0.0),
        }
    }

    pub fn from_translation(translation: Vector3<f32>) -> Self {
        Self {
            translation,
            ..Self::identity()
        }
    }

    /// Translation combined with a rotation about the vertical (Z) axis
    pub fn from_translation_rotation_z(translation: Vector3<f32>, angle: Rad<f32>) -> Self {
        Self {
            translation,
            rotation: Quaternion::from_angle_z(angle),
        }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }

    /// Matrix form, T * R
    pub fn to_matrix(&self) -> Matrix4<f32> {
        Matrix4::from_translation(self.translation) * Matrix4::from(self.rotation)
    }

    pub fn apply_point(&self, p: Vector3<f32>) -> Vector3<f32> {
        self.rotation * p + self.translation
    }

    /// Interpolate between two transforms, `t` in `[0, 1]`.
    ///
    /// The endpoints are returned exactly so a finished transition lands on
    /// the target bit for bit.
    pub fn interpolate(from: &Transform, to: &Transform, t: f32) -> Transform {
        if t <= 0.0 {
            return *from;
        }
        if t >= 1.0 {
            return *to;
        }
        Transform {
            translation: from.translation.lerp(to.translation, t),
            rotation: from.rotation.slerp(to.rotation, t).normalize(),
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}
