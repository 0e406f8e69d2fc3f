//! Graph queries and structural validation for KinematicChain

use std::collections::BTreeSet;

use crate::error::KinematicsError;
use crate::types::{JointId, LinkId};

use super::KinematicChain;

impl KinematicChain {
    /// Joints whose parent is the given link, with their child links
    pub fn children_of(&self, link: LinkId) -> Vec<(JointId, LinkId)> {
        self.joints
            .values()
            .filter(|j| j.parent_link == Some(link))
            .map(|j| (j.id, j.child_link))
            .collect()
    }

    /// Joint attaching the given link to its parent (or the world)
    pub fn parent_joint(&self, link: LinkId) -> Option<JointId> {
        self.joints
            .values()
            .find(|j| j.child_link == link)
            .map(|j| j.id)
    }

    /// Links not attached below another link
    pub fn root_links(&self) -> Vec<LinkId> {
        self.links
            .keys()
            .copied()
            .filter(|id| {
                self.joints
                    .values()
                    .all(|j| j.child_link != *id || j.parent_link.is_none())
            })
            .collect()
    }

    /// Check whether `to` can be reached from `from` by following joints downward
    pub(crate) fn is_reachable(&self, from: LinkId, to: LinkId) -> bool {
        let mut visited = BTreeSet::new();
        let mut stack = vec![from];
        while let Some(link) = stack.pop() {
            if link == to {
                return true;
            }
            if visited.insert(link) {
                stack.extend(self.children_of(link).into_iter().map(|(_, child)| child));
            }
        }
        false
    }

    /// Check if a joint from `parent` to `child` would close a cycle
    pub fn would_create_cycle(&self, parent: LinkId, child: LinkId) -> bool {
        self.is_reachable(child, parent)
    }

    /// Report joints naming missing links and joints that close a cycle
    pub fn validate(&self) -> Result<(), Vec<KinematicsError>> {
        let mut errors = Vec::new();

        for joint in self.joints.values() {
            for link in joint.parent_link.into_iter().chain([joint.child_link]) {
                if !self.links.contains_key(&link) {
                    errors.push(KinematicsError::LinkNotFound(format!(
                        "{} (referenced by {})",
                        link, joint.id
                    )));
                }
            }
            if let Some(parent) = joint.parent_link
                && self.is_reachable(joint.child_link, parent)
            {
                errors.push(KinematicsError::Cycle(joint.id.to_string()));
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}
