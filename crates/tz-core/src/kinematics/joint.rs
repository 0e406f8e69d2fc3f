//! Joint types and bounded joint state

use std::f32::consts::PI;
use std::fmt;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::KinematicsError;
use crate::types::{JointId, LinkId};

/// Joint type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JointType {
    #[default]
    Revolute,
    Prismatic,
    Fixed,
    /// Two meshing gears; motion is driven by the gear mesh, not the joint
    GearPair,
}

impl JointType {
    /// Check if this joint type moves along or about its axis
    pub fn has_axis(&self) -> bool {
        matches!(self, JointType::Revolute | JointType::Prismatic)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JointType::Revolute => "revolute",
            JointType::Prismatic => "prismatic",
            JointType::Fixed => "fixed",
            JointType::GearPair => "gear_pair",
        }
    }

    pub fn all() -> &'static [JointType] {
        &[
            JointType::Revolute,
            JointType::Prismatic,
            JointType::Fixed,
            JointType::GearPair,
        ]
    }
}

impl fmt::Display for JointType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Joint position range (rad or length units)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointLimits {
    pub lower: f32,
    pub upper: f32,
}

impl Default for JointLimits {
    fn default() -> Self {
        Self {
            lower: -PI,
            upper: PI,
        }
    }
}

impl JointLimits {
    /// Create limits, rejecting an inverted or non-finite range
    pub fn new(lower: f32, upper: f32) -> Result<Self, KinematicsError> {
        if !lower.is_finite() || !upper.is_finite() || lower > upper {
            return Err(KinematicsError::InvalidLimits { lower, upper });
        }
        Ok(Self { lower, upper })
    }

    /// Clamp a value into the range
    ///
    /// Never panics, even for hand-built inverted limits; NaN maps to `lower`.
    pub fn clamp(&self, value: f32) -> f32 {
        value.max(self.lower).min(self.upper)
    }

    pub fn contains(&self, value: f32) -> bool {
        value >= self.lower && value <= self.upper
    }
}

/// Outcome of a joint position write
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointWrite {
    pub requested: f32,
    /// Value actually stored after clamping
    pub applied: f32,
}

impl JointWrite {
    pub fn was_clamped(&self) -> bool {
        self.requested != self.applied
    }

    /// Amount the stored value differs from the request
    pub fn delta(&self) -> f32 {
        self.applied - self.requested
    }
}

/// A joint connecting a parent link (or the world) to a child link
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Joint {
    pub id: JointId,
    pub joint_type: JointType,
    /// Parent link ID; `None` attaches the child to the world
    pub parent_link: Option<LinkId>,
    pub child_link: LinkId,
    /// Unit axis of rotation or translation
    pub axis: Vec3,
    pub limits: JointLimits,
    position: f32,
    pub velocity: f32,
}

impl Joint {
    pub fn new(
        id: JointId,
        joint_type: JointType,
        parent_link: Option<LinkId>,
        child_link: LinkId,
        axis: Vec3,
    ) -> Self {
        Self {
            id,
            joint_type,
            parent_link,
            child_link,
            axis: axis.try_normalize().unwrap_or(Vec3::Z),
            limits: JointLimits::default(),
            position: 0.0,
            velocity: 0.0,
        }
    }

    /// Current joint position, always within `limits`
    pub fn position(&self) -> f32 {
        self.position
    }

    /// Store a position clamped into the limits
    pub fn set_position(&mut self, value: f32) -> JointWrite {
        let applied = self.limits.clamp(value);
        self.position = applied;
        JointWrite {
            requested: value,
            applied,
        }
    }

    /// Replace the limits, pulling the current position back inside them
    pub fn set_limits(&mut self, limits: JointLimits) -> JointWrite {
        self.limits = limits;
        self.set_position(self.position)
    }
}
