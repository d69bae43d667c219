//! `Transform`/`GlobalTransform`: ordinary registered components for spatial hierarchies, built
//! on `glam` rather than hand-rolled vector math.

use serde::{Deserialize, Serialize};

pub use glam::{Mat4, Quat, Vec3};

/// Local transform, relative to whatever `crate::hierarchy` parent the entity is attached to.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    pub fn identity() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }

    pub fn with_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::identity()
        }
    }

    pub fn with_rotation(rotation: Quat) -> Self {
        Self {
            rotation,
            ..Self::identity()
        }
    }

    pub fn with_scale(scale: Vec3) -> Self {
        Self {
            scale,
            ..Self::identity()
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

/// World-space transform, recomputed from an entity's `Transform` chain up through
/// `crate::hierarchy::ancestors`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GlobalTransform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl GlobalTransform {
    pub fn identity() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }

    /// Combines a parent's world transform with a child's local transform: scale, then rotate,
    /// then translate.
    pub fn from_local(parent: &GlobalTransform, child: &Transform) -> Self {
        let rotated_pos = parent.rotation * (child.position * parent.scale);
        GlobalTransform {
            position: parent.position + rotated_pos,
            rotation: parent.rotation * child.rotation,
            scale: parent.scale * child.scale,
        }
    }

    /// Inverse of [`from_local`](Self::from_local): recovers the local transform relative to
    /// `parent` that would reproduce `self`.
    pub fn to_local(&self, parent: &GlobalTransform) -> Transform {
        let rel_pos = self.position - parent.position;
        let inv_rot = parent.rotation.inverse();
        let inv_scale = Vec3::new(
            if parent.scale.x != 0.0 { 1.0 / parent.scale.x } else { 0.0 },
            if parent.scale.y != 0.0 { 1.0 / parent.scale.y } else { 0.0 },
            if parent.scale.z != 0.0 { 1.0 / parent.scale.z } else { 0.0 },
        );

        Transform {
            position: (inv_rot * rel_pos) * inv_scale,
            rotation: inv_rot * self.rotation,
            scale: self.scale * inv_scale,
        }
    }

    pub fn translation(&self) -> Vec3 {
        self.position
    }
}

impl Default for GlobalTransform {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_from_local_translates() {
        let parent = GlobalTransform {
            position: Vec3::new(10.0, 20.0, 0.0),
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        };
        let child = Transform {
            position: Vec3::new(5.0, 0.0, 0.0),
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        };

        let global = GlobalTransform::from_local(&parent, &child);
        assert!((global.position.x - 15.0).abs() < 0.001);
        assert!((global.position.y - 20.0).abs() < 0.001);
    }

    #[test]
    fn global_from_local_applies_parent_scale() {
        let parent = GlobalTransform {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::splat(2.0),
        };
        let child = Transform {
            position: Vec3::new(1.0, 0.0, 0.0),
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        };

        let global = GlobalTransform::from_local(&parent, &child);
        assert!((global.position.x - 2.0).abs() < 0.001);
    }

    #[test]
    fn to_local_inverts_from_local() {
        let parent = GlobalTransform {
            position: Vec3::new(3.0, 0.0, 0.0),
            rotation: Quat::IDENTITY,
            scale: Vec3::splat(2.0),
        };
        let child = Transform {
            position: Vec3::new(1.0, 1.0, 0.0),
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        };

        let global = GlobalTransform::from_local(&parent, &child);
        let recovered = global.to_local(&parent);
        assert!((recovered.position.x - child.position.x).abs() < 0.001);
        assert!((recovered.position.y - child.position.y).abs() < 0.001);
    }
}
