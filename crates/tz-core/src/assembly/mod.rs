//! Assembly of parts positioned by constraints
//!
//! An [`Assembly`] owns its parts and the constraints between them. Parts are
//! addressed by [`PartId`] handles; removing a part cascades to every
//! constraint that names it, so no constraint can outlive its endpoints.

mod builder;
mod constraint;
mod document;
mod solver;

pub use builder::*;
pub use constraint::*;
pub use document::*;
pub use solver::*;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::SolverConfig;
use crate::error::AssemblyError;
use crate::part::{Parameters, Part, default_color_for};
use crate::types::{ConstraintId, IdAllocator, PartId, Transform};

/// Descriptive metadata stored with an assembly document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblyMetadata {
    /// Free-form; documents carry strings or numeric timestamps
    pub created_at: Option<serde_json::Value>,
    pub author: String,
    pub version: String,
}

impl Default for AssemblyMetadata {
    fn default() -> Self {
        Self {
            created_at: None,
            author: String::new(),
            version: "1.0".to_string(),
        }
    }
}

/// Named collection of parts and the constraints positioning them
#[derive(Debug, Clone)]
pub struct Assembly {
    pub name: String,
    pub metadata: AssemblyMetadata,
    parts: BTreeMap<PartId, Part>,
    /// Insertion order of `parts` (document order after a load)
    part_order: Vec<PartId>,
    /// Constraints in declaration order (solving order)
    constraints: Vec<Constraint>,
    part_ids: IdAllocator,
    constraint_ids: IdAllocator,
    solver: ConstraintSolver,
}

impl Default for Assembly {
    fn default() -> Self {
        Self::new("New Assembly")
    }
}

impl Assembly {
    /// Create a new empty assembly
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            metadata: AssemblyMetadata::default(),
            parts: BTreeMap::new(),
            part_order: Vec::new(),
            constraints: Vec::new(),
            part_ids: IdAllocator::starting_at(1),
            constraint_ids: IdAllocator::starting_at(1),
            solver: ConstraintSolver::default(),
        }
    }

    /// Use a solver configured from the given settings
    pub fn with_solver_config(mut self, config: &SolverConfig) -> Self {
        self.solver = ConstraintSolver::new(config);
        self
    }

    /// Replace the solver (e.g. with a custom [`ConstraintStep`])
    pub fn set_solver(&mut self, solver: ConstraintSolver) {
        self.solver = solver;
    }

    // ============== Part Management ==============

    /// Add a part and return its fresh id
    ///
    /// Without an explicit transform the part sits at the origin; without an
    /// explicit colour it gets the default colour of its type. Fails only when
    /// every part id has been used.
    pub fn add_part(
        &mut self,
        name: impl Into<String>,
        part_type: impl Into<String>,
        parameters: Parameters,
        transform: Option<Transform>,
        color: Option<&str>,
    ) -> Result<PartId, AssemblyError> {
        let id = self
            .part_ids
            .allocate()
            .map(PartId::new)
            .ok_or(AssemblyError::IdsExhausted(PartId::PREFIX))?;
        let mut part = Part::new(id, name, part_type, parameters);
        if let Some(transform) = transform {
            part.transform = transform;
        }
        if let Some(color) = color {
            part.color = color.to_string();
        }

        tracing::debug!("Added {} '{}' ({})", id, part.name, part.part_type);
        self.parts.insert(id, part);
        self.part_order.push(id);
        Ok(id)
    }

    /// Remove a part and every constraint referencing it
    ///
    /// Returns false if the part does not exist.
    pub fn remove_part(&mut self, id: PartId) -> bool {
        if self.parts.remove(&id).is_none() {
            return false;
        }
        self.part_order.retain(|p| *p != id);

        let before = self.constraints.len();
        self.constraints.retain(|c| !c.references_part(id));
        tracing::debug!(
            "Removed {} and {} dependent constraint(s)",
            id,
            before - self.constraints.len()
        );
        true
    }

    /// Get a part by ID
    pub fn get_part(&self, id: PartId) -> Option<&Part> {
        self.parts.get(&id)
    }

    /// Get a mutable part by ID
    pub fn get_part_mut(&mut self, id: PartId) -> Option<&mut Part> {
        self.parts.get_mut(&id)
    }

    /// All parts in insertion order
    pub fn get_all_parts(&self) -> Vec<&Part> {
        self.parts_iter().collect()
    }

    /// Iterate over parts in insertion order
    pub fn parts_iter(&self) -> impl Iterator<Item = &Part> {
        self.part_order.iter().filter_map(|id| self.parts.get(id))
    }

    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    /// Overwrite a part's placement; false if the part does not exist
    pub fn set_part_transform(&mut self, id: PartId, transform: Transform) -> bool {
        match self.parts.get_mut(&id) {
            Some(part) => {
                part.transform = transform;
                true
            }
            None => false,
        }
    }

    // ============== Constraint Management ==============

    /// Add a constraint between two existing parts
    pub fn add_constraint(
        &mut self,
        kind: impl Into<ConstraintKind>,
        part1: PartId,
        part2: PartId,
    ) -> Result<ConstraintId, AssemblyError> {
        for part_id in [part1, part2] {
            if !self.parts.contains_key(&part_id) {
                return Err(AssemblyError::PartNotFound(part_id));
            }
        }

        let id = self
            .constraint_ids
            .allocate()
            .map(ConstraintId::new)
            .ok_or(AssemblyError::IdsExhausted(ConstraintId::PREFIX))?;
        let constraint = Constraint::new(id, kind.into(), part1, part2);
        tracing::debug!(
            "Added {} {} between {} and {}",
            constraint.constraint_type(),
            id,
            part1,
            part2
        );
        self.constraints.push(constraint);
        Ok(id)
    }

    /// Remove a constraint; false if it does not exist
    pub fn remove_constraint(&mut self, id: ConstraintId) -> bool {
        let before = self.constraints.len();
        self.constraints.retain(|c| c.id != id);
        self.constraints.len() != before
    }

    /// Get a constraint by ID
    pub fn get_constraint(&self, id: ConstraintId) -> Option<&Constraint> {
        self.constraints.iter().find(|c| c.id == id)
    }

    /// All constraints in declaration order
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    // ============== Solving ==============

    /// Resolve all constraints into part placements
    ///
    /// Returns true when every constraint is satisfied within the solver's
    /// iteration budget.
    pub fn solve_constraints(&mut self) -> bool {
        self.solve_report().converged
    }

    /// Resolve all constraints and report the outcome
    pub fn solve_report(&mut self) -> SolveReport {
        self.solver.solve_report(&mut self.parts, &mut self.constraints)
    }

    // ============== Validation ==============

    /// Check that every constraint endpoint resolves to a part
    pub fn validate(&self) -> Result<(), Vec<AssemblyError>> {
        let errors: Vec<AssemblyError> = self
            .constraints
            .iter()
            .flat_map(|c| {
                [c.part1, c.part2]
                    .into_iter()
                    .filter(|p| !self.parts.contains_key(p))
                    .map(|part| AssemblyError::DanglingReference {
                        constraint: c.id,
                        part,
                    })
                    .collect::<Vec<_>>()
            })
            .collect();

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    /// Highest part suffix handed out or restored so far
    pub fn part_counter(&self) -> u32 {
        self.part_ids.last().unwrap_or(0)
    }

    /// Highest constraint suffix handed out or restored so far
    pub fn constraint_counter(&self) -> u32 {
        self.constraint_ids.last().unwrap_or(0)
    }

    /// Default display colour used for a part type
    pub fn default_color(part_type: &str) -> &'static str {
        default_color_for(part_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::part::params;
    use crate::types::Axis;

    fn two_gears() -> (Assembly, PartId, PartId) {
        let mut assembly = Assembly::new("Test Assembly");
        let g1 = assembly.add_part(
            "Gear 1",
            "helical_gear",
            params([("teeth", 20.0), ("pitch_diameter", 40.0)]),
            None,
            None,
        ).unwrap();
        let g2 = assembly.add_part(
            "Gear 2",
            "helical_gear",
            params([("teeth", 30.0), ("pitch_diameter", 60.0)]),
            None,
            None,
        ).unwrap();
        (assembly, g1, g2)
    }

    #[test]
    fn test_sequential_ids_and_colors() {
        let (mut assembly, g1, g2) = two_gears();
        assert_eq!(g1.to_string(), "part_1");
        assert_eq!(g2.to_string(), "part_2");
        assert_eq!(assembly.get_part(g1).unwrap().color, "#FFD700");

        let housing = assembly
            .add_part("Box", "housing", Parameters::new(), None, Some("#112233"))
            .unwrap();
        assert_eq!(assembly.get_part(housing).unwrap().color, "#112233");
        let names: Vec<_> = assembly.get_all_parts().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Gear 1", "Gear 2", "Box"]);
    }

    #[test]
    fn test_gear_mesh_places_partner() {
        let (mut assembly, g1, g2) = two_gears();
        assembly.add_constraint(ConstraintKind::GearMesh, g1, g2).unwrap();
        assert!(assembly.solve_constraints());
        assert_eq!(assembly.get_part(g2).unwrap().transform.x, 50.0);
        assert!(assembly.constraints()[0].satisfied);
    }

    #[test]
    fn test_coincident_copies_position() {
        let (mut assembly, g1, g2) = two_gears();
        assembly.set_part_transform(g1, Transform::new(3.5, -2.0, 7.25, 10.0, 0.0, 0.0));
        assembly.add_constraint(ConstraintType::Coincident, g1, g2).unwrap();
        assert!(assembly.solve_constraints());

        let a = assembly.get_part(g1).unwrap().transform;
        let b = assembly.get_part(g2).unwrap().transform;
        assert_eq!((a.x, a.y, a.z), (b.x, b.y, b.z));
        // Rotation is not copied
        assert_eq!(b.rx, 0.0);
    }

    #[test]
    fn test_remove_part_cascades() {
        let (mut assembly, g1, g2) = two_gears();
        let g3 = assembly.add_part("Gear 3", "gear", Parameters::new(), None, None).unwrap();
        assembly.add_constraint(ConstraintKind::GearMesh, g1, g2).unwrap();
        let kept = assembly
            .add_constraint(ConstraintKind::distance(5.0, Axis::Z), g1, g3)
            .unwrap();
        assembly.add_constraint(ConstraintKind::Coincident, g2, g3).unwrap();

        assert!(assembly.remove_part(g2));
        assert!(!assembly.remove_part(g2));
        assert!(assembly.get_part(g2).is_none());
        assert_eq!(assembly.constraints().len(), 1);
        assert_eq!(assembly.constraints()[0].id, kept);
        assert!(assembly.constraints().iter().all(|c| !c.references_part(g2)));
        assert!(assembly.validate().is_ok());
        assert!(assembly.solve_constraints());
        assert_eq!(assembly.get_part(g3).unwrap().transform.z, 5.0);
    }

    #[test]
    fn test_add_constraint_requires_parts() {
        let (mut assembly, g1, _) = two_gears();
        let missing = PartId::new(42);
        assert_eq!(
            assembly.add_constraint(ConstraintKind::Fixed, g1, missing),
            Err(AssemblyError::PartNotFound(missing))
        );
        assert!(assembly.constraints().is_empty());
    }

    #[test]
    fn test_remove_constraint() {
        let (mut assembly, g1, g2) = two_gears();
        let id = assembly.add_constraint(ConstraintKind::Parallel, g1, g2).unwrap();
        assert!(!assembly.solve_constraints());
        assert!(assembly.remove_constraint(id));
        assert!(!assembly.remove_constraint(id));
        assert!(assembly.get_constraint(id).is_none());
        assert!(assembly.solve_constraints());
    }

    #[test]
    fn test_solver_budget_from_config() {
        let (assembly, g1, g2) = two_gears();
        let mut assembly = assembly.with_solver_config(&SolverConfig {
            max_iterations: 3,
            ..SolverConfig::default()
        });
        assembly.add_constraint(ConstraintKind::Angle { angle: 30.0 }, g1, g2).unwrap();
        let report = assembly.solve_report();
        assert!(!report.converged);
        assert_eq!(report.iterations, 3);
    }
}
