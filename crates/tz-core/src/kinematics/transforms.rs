//! World transform calculations for KinematicChain

use std::collections::{BTreeMap, BTreeSet};

use glam::{Mat4, Quat, Vec3};

use crate::types::LinkId;

use super::{JointType, KinematicChain};

/// Compute the transform for a joint at a given position
pub fn compute_joint_transform(joint_type: JointType, axis: Vec3, position: f32) -> Mat4 {
    match joint_type {
        JointType::Revolute => Mat4::from_quat(Quat::from_axis_angle(axis, position)),
        JointType::Prismatic => Mat4::from_translation(axis * position),
        JointType::Fixed | JointType::GearPair => Mat4::IDENTITY,
    }
}

impl KinematicChain {
    /// World transform of every link from the current joint positions
    ///
    /// Roots sit at the identity. A joint without a parent link is applied
    /// from the world origin. Links only reachable through a cycle are
    /// omitted.
    pub fn link_world_transforms(&self) -> BTreeMap<LinkId, Mat4> {
        let mut transforms = BTreeMap::new();
        let mut visited = BTreeSet::new();

        for joint in self.joints.values().filter(|j| j.parent_link.is_none()) {
            let transform = compute_joint_transform(joint.joint_type, joint.axis, joint.position());
            self.update_transform_recursive(joint.child_link, transform, &mut transforms, &mut visited);
        }
        for root in self.root_links() {
            if !visited.contains(&root) {
                self.update_transform_recursive(root, Mat4::IDENTITY, &mut transforms, &mut visited);
            }
        }

        transforms
    }

    /// World transform of one link, if it is reachable from a root
    pub fn link_world_transform(&self, link: LinkId) -> Option<Mat4> {
        self.link_world_transforms().remove(&link)
    }

    fn update_transform_recursive(
        &self,
        link: LinkId,
        transform: Mat4,
        transforms: &mut BTreeMap<LinkId, Mat4>,
        visited: &mut BTreeSet<LinkId>,
    ) {
        if !self.links.contains_key(&link) || !visited.insert(link) {
            return;
        }
        transforms.insert(link, transform);

        for (joint_id, child) in self.children_of(link) {
            if let Some(joint) = self.joints.get(&joint_id) {
                let local = compute_joint_transform(joint.joint_type, joint.axis, joint.position());
                self.update_transform_recursive(child, transform * local, transforms, visited);
            }
        }
    }
}
