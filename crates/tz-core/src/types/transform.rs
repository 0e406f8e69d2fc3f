//! Transform type definition

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::Axis;

/// Placement of a part (translation + rotation about X, Y, Z in degrees)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transform {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub rx: f32,
    pub ry: f32,
    pub rz: f32,
}

impl Transform {
    pub fn new(x: f32, y: f32, z: f32, rx: f32, ry: f32, rz: f32) -> Self {
        Self { x, y, z, rx, ry, rz }
    }

    pub fn from_position(x: f32, y: f32, z: f32) -> Self {
        Self {
            x,
            y,
            z,
            ..Self::default()
        }
    }

    /// Get position as Vec3
    pub fn position(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }

    /// Overwrite the translation, keeping the rotation
    pub fn set_position(&mut self, position: Vec3) {
        self.x = position.x;
        self.y = position.y;
        self.z = position.z;
    }

    /// Read one translation component
    pub fn coordinate(&self, axis: Axis) -> f32 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    /// Write one translation component
    pub fn set_coordinate(&mut self, axis: Axis, value: f32) {
        match axis {
            Axis::X => self.x = value,
            Axis::Y => self.y = value,
            Axis::Z => self.z = value,
        }
    }

    /// Convert to quaternion representation
    pub fn rotation(&self) -> Quat {
        Quat::from_euler(
            glam::EulerRot::XYZ,
            self.rx.to_radians(),
            self.ry.to_radians(),
            self.rz.to_radians(),
        )
    }

    pub fn to_mat4(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation(), self.position())
    }
}
