//! Kinematic chain of links and joints
//!
//! Links and joints are addressed by [`LinkId`] / [`JointId`] handles starting
//! at `link_0` / `joint_0`. The chain is a tree by convention only: joints are
//! accepted as given and [`KinematicChain::validate`] reports dangling
//! references and cycles.

mod graph;
mod joint;
mod transforms;

pub use joint::*;
pub use transforms::compute_joint_transform;

use std::collections::BTreeMap;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::KinematicsError;
use crate::types::{IdAllocator, JointId, LinkId};

/// A rigid body in the chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub id: LinkId,
    pub name: String,
    pub mass: f32,
    pub inertia: [f32; 3],
}

impl Link {
    pub fn new(id: LinkId, name: impl Into<String>, mass: f32) -> Self {
        Self {
            id,
            name: name.into(),
            mass,
            inertia: [1.0; 3],
        }
    }
}

/// Links connected by joints, with the first link as root
#[derive(Debug, Clone, Serialize)]
pub struct KinematicChain {
    pub name: String,
    links: BTreeMap<LinkId, Link>,
    joints: BTreeMap<JointId, Joint>,
    root_link: Option<LinkId>,
    #[serde(skip)]
    link_ids: IdAllocator,
    #[serde(skip)]
    joint_ids: IdAllocator,
}

impl Default for KinematicChain {
    fn default() -> Self {
        Self::new("Kinematic Chain")
    }
}

impl KinematicChain {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            links: BTreeMap::new(),
            joints: BTreeMap::new(),
            root_link: None,
            link_ids: IdAllocator::starting_at(0),
            joint_ids: IdAllocator::starting_at(0),
        }
    }

    // ============== Links ==============

    /// Add a link; the first link added becomes the root
    pub fn add_link(
        &mut self,
        name: impl Into<String>,
        mass: f32,
    ) -> Result<LinkId, KinematicsError> {
        let id = self
            .link_ids
            .allocate()
            .map(LinkId::new)
            .ok_or(KinematicsError::IdsExhausted(LinkId::PREFIX))?;
        let link = Link::new(id, name, mass);
        tracing::debug!("Added {} '{}'", id, link.name);
        self.links.insert(id, link);
        if self.root_link.is_none() {
            self.root_link = Some(id);
        }
        Ok(id)
    }

    pub fn get_link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(&id)
    }

    pub fn get_link_mut(&mut self, id: LinkId) -> Option<&mut Link> {
        self.links.get_mut(&id)
    }

    /// All links in creation order
    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.values()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn root_link(&self) -> Option<LinkId> {
        self.root_link
    }

    // ============== Joints ==============

    /// Add a joint with default limits; a zero axis falls back to Z
    ///
    /// Link references are not checked here; see [`validate`](Self::validate).
    pub fn add_joint(
        &mut self,
        joint_type: JointType,
        parent_link: Option<LinkId>,
        child_link: LinkId,
        axis: Vec3,
    ) -> Result<JointId, KinematicsError> {
        let id = self
            .joint_ids
            .allocate()
            .map(JointId::new)
            .ok_or(KinematicsError::IdsExhausted(JointId::PREFIX))?;
        let joint = Joint::new(id, joint_type, parent_link, child_link, axis);
        match parent_link {
            Some(parent) => tracing::debug!("Added {} {} ({} -> {})", joint_type, id, parent, child_link),
            None => tracing::debug!("Added {} {} (world -> {})", joint_type, id, child_link),
        }
        self.joints.insert(id, joint);
        Ok(id)
    }

    pub fn get_joint(&self, id: JointId) -> Option<&Joint> {
        self.joints.get(&id)
    }

    /// All joints in creation order
    pub fn joints(&self) -> impl Iterator<Item = &Joint> {
        self.joints.values()
    }

    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    /// Set a joint position, clamped into the joint's limits
    ///
    /// Returns `None` if the joint does not exist.
    pub fn set_joint_position(&mut self, id: JointId, value: f32) -> Option<JointWrite> {
        let joint = self.joints.get_mut(&id)?;
        let write = joint.set_position(value);
        if write.was_clamped() {
            tracing::debug!(
                "Clamped {} from {} to {} (limits {}..{})",
                id,
                write.requested,
                write.applied,
                joint.limits.lower,
                joint.limits.upper
            );
        }
        Some(write)
    }

    /// Current position of every joint
    pub fn get_joint_positions(&self) -> BTreeMap<JointId, f32> {
        self.joints.iter().map(|(id, j)| (*id, j.position())).collect()
    }

    /// Replace a joint's limits, re-clamping its current position
    pub fn set_joint_limits(
        &mut self,
        id: JointId,
        lower: f32,
        upper: f32,
    ) -> Result<JointWrite, KinematicsError> {
        let limits = JointLimits::new(lower, upper)?;
        let joint = self
            .joints
            .get_mut(&id)
            .ok_or_else(|| KinematicsError::JointNotFound(id.to_string()))?;
        Ok(joint.set_limits(limits))
    }

    /// Record a joint velocity; false if the joint does not exist
    pub fn set_joint_velocity(&mut self, id: JointId, velocity: f32) -> bool {
        match self.joints.get_mut(&id) {
            Some(joint) => {
                joint.velocity = velocity;
                true
            }
            None => false,
        }
    }
}
