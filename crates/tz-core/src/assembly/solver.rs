//! Constraint solver
//!
//! The solver repeats full passes over the constraint list (in declaration
//! order) until one pass reports every constraint satisfied, or the iteration
//! budget runs out. What a single constraint does to the parts is delegated
//! to a [`ConstraintStep`], so relation types that need numerical relaxation
//! can be plugged in without changing the driver.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::config::SolverConfig;
use crate::part::Part;
use crate::types::{ConstraintId, PartId};

use super::{Constraint, ConstraintKind};

/// One application of a constraint to its two parts
pub trait ConstraintStep: fmt::Debug + Send + Sync {
    /// Update `target` from `father` according to `kind`.
    ///
    /// Returns whether the constraint holds after the update.
    fn apply(&self, kind: &ConstraintKind, father: &Part, target: &mut Part) -> bool;
}

/// Closed-form assignments for the implemented relation types
///
/// Parallel, perpendicular, tangent and angle relations are accepted but have
/// no effect and always report unsatisfied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosedFormStep {
    /// Pitch diameter assumed for gears that do not declare one
    pub default_pitch_diameter: f32,
}

impl Default for ClosedFormStep {
    fn default() -> Self {
        Self {
            default_pitch_diameter: 40.0,
        }
    }
}

impl ConstraintStep for ClosedFormStep {
    fn apply(&self, kind: &ConstraintKind, father: &Part, target: &mut Part) -> bool {
        let from = father.transform;

        match kind {
            ConstraintKind::Fixed => true,
            ConstraintKind::Coincident => {
                target.transform.set_position(from.position());
                true
            }
            ConstraintKind::Concentric => {
                // Shared axis is Z
                target.transform.x = from.x;
                target.transform.y = from.y;
                true
            }
            ConstraintKind::Distance { distance, axis } => {
                target
                    .transform
                    .set_coordinate(*axis, from.coordinate(*axis) + distance);
                true
            }
            ConstraintKind::GearMesh => {
                // Meshing axis is X
                let r1 = father.param_or("pitch_diameter", self.default_pitch_diameter) / 2.0;
                let r2 = target.param_or("pitch_diameter", self.default_pitch_diameter) / 2.0;
                target.transform.x = from.x + (r1 + r2);
                true
            }
            ConstraintKind::Parallel
            | ConstraintKind::Perpendicular
            | ConstraintKind::Tangent
            | ConstraintKind::Angle { .. } => false,
        }
    }
}

/// Outcome of a solve, for diagnostics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolveReport {
    /// Whether a pass completed with every constraint satisfied
    pub converged: bool,
    /// Number of passes run
    pub iterations: usize,
    /// Constraints left unsatisfied after the last pass
    pub unsatisfied: Vec<ConstraintId>,
}

/// Iterate-until-stable driver over a [`ConstraintStep`]
#[derive(Debug, Clone)]
pub struct ConstraintSolver {
    max_iterations: usize,
    step: Arc<dyn ConstraintStep>,
}

impl Default for ConstraintSolver {
    fn default() -> Self {
        Self::new(&SolverConfig::default())
    }
}

impl ConstraintSolver {
    pub fn new(config: &SolverConfig) -> Self {
        Self {
            max_iterations: config.max_iterations,
            step: Arc::new(ClosedFormStep {
                default_pitch_diameter: config.default_pitch_diameter,
            }),
        }
    }

    /// Replace the per-constraint step
    pub fn with_step(mut self, step: impl ConstraintStep + 'static) -> Self {
        self.step = Arc::new(step);
        self
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Solve and report only whether every constraint holds
    pub fn solve(&self, parts: &mut BTreeMap<PartId, Part>, constraints: &mut [Constraint]) -> bool {
        self.solve_report(parts, constraints).converged
    }

    /// Solve and report iteration count and leftovers
    pub fn solve_report(
        &self,
        parts: &mut BTreeMap<PartId, Part>,
        constraints: &mut [Constraint],
    ) -> SolveReport {
        for iteration in 1..=self.max_iterations {
            let mut all_satisfied = true;
            for constraint in constraints.iter_mut() {
                if !self.apply_constraint(parts, constraint) {
                    all_satisfied = false;
                }
            }
            tracing::trace!(iteration, all_satisfied, "constraint pass");

            if all_satisfied {
                tracing::debug!(
                    "Solved {} constraints in {} pass(es)",
                    constraints.len(),
                    iteration
                );
                return SolveReport {
                    converged: true,
                    iterations: iteration,
                    unsatisfied: Vec::new(),
                };
            }
        }

        let unsatisfied: Vec<ConstraintId> = constraints
            .iter()
            .filter(|c| !c.satisfied)
            .map(|c| c.id)
            .collect();
        tracing::warn!(
            "Constraint solver did not converge after {} iterations ({} unsatisfied)",
            self.max_iterations,
            unsatisfied.len()
        );
        SolveReport {
            converged: false,
            iterations: self.max_iterations,
            unsatisfied,
        }
    }

    /// Apply one constraint; a missing endpoint leaves it unsatisfied
    fn apply_constraint(&self, parts: &mut BTreeMap<PartId, Part>, constraint: &mut Constraint) -> bool {
        let Some(father) = parts.get(&constraint.part1).cloned() else {
            constraint.satisfied = false;
            return false;
        };
        let Some(target) = parts.get_mut(&constraint.part2) else {
            constraint.satisfied = false;
            return false;
        };

        constraint.satisfied = self.step.apply(constraint.kind(), &father, target);
        constraint.satisfied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::part::{Parameters, params};
    use crate::types::{Axis, Transform};

    fn part(index: u32, transform: Transform, parameters: Parameters) -> (PartId, Part) {
        let id = PartId::new(index);
        let mut part = Part::new(id, format!("p{}", index), "gear", parameters);
        part.transform = transform;
        (id, part)
    }

    fn constraint(index: u32, kind: ConstraintKind, a: u32, b: u32) -> Constraint {
        Constraint::new(ConstraintId::new(index), kind, PartId::new(a), PartId::new(b))
    }

    #[test]
    fn test_closed_form_effects() {
        let mut parts: BTreeMap<_, _> = [
            part(1, Transform::new(1.0, 2.0, 3.0, 0.0, 0.0, 0.0), Parameters::new()),
            part(2, Transform::from_position(9.0, 9.0, 9.0), Parameters::new()),
            part(3, Transform::from_position(9.0, 9.0, 9.0), Parameters::new()),
            part(4, Transform::default(), Parameters::new()),
        ]
        .into_iter()
        .collect();
        let mut constraints = vec![
            constraint(1, ConstraintKind::Coincident, 1, 2),
            constraint(2, ConstraintKind::Concentric, 1, 3),
            constraint(3, ConstraintKind::distance(-4.0, Axis::Y), 1, 4),
        ];

        let report = ConstraintSolver::default().solve_report(&mut parts, &mut constraints);
        assert!(report.converged);
        assert_eq!(report.iterations, 1);

        assert_eq!(parts[&PartId::new(2)].transform.position(), glam::Vec3::new(1.0, 2.0, 3.0));
        let concentric = parts[&PartId::new(3)].transform;
        assert_eq!((concentric.x, concentric.y, concentric.z), (1.0, 2.0, 9.0));
        assert_eq!(parts[&PartId::new(4)].transform.y, -2.0);
        assert!(constraints.iter().all(|c| c.satisfied));
    }

    #[test]
    fn test_gear_mesh_distance() {
        let mut parts: BTreeMap<_, _> = [
            part(1, Transform::default(), params([("pitch_diameter", 40.0)])),
            part(2, Transform::from_position(0.0, 5.0, 0.0), params([("pitch_diameter", 60.0)])),
            part(3, Transform::default(), Parameters::new()),
        ]
        .into_iter()
        .collect();
        let mut constraints = vec![
            constraint(1, ConstraintKind::GearMesh, 1, 2),
            constraint(2, ConstraintKind::GearMesh, 2, 3),
        ];

        assert!(ConstraintSolver::default().solve(&mut parts, &mut constraints));
        assert_eq!(parts[&PartId::new(2)].transform.x, 50.0);
        assert_eq!(parts[&PartId::new(2)].transform.y, 5.0);
        // Missing pitch diameter defaults to 40
        assert_eq!(parts[&PartId::new(3)].transform.x, 50.0 + 30.0 + 20.0);
    }

    #[test]
    fn test_reserved_kinds_exhaust_budget() {
        let mut parts: BTreeMap<_, _> = [
            part(1, Transform::default(), Parameters::new()),
            part(2, Transform::from_position(3.0, 0.0, 0.0), Parameters::new()),
        ]
        .into_iter()
        .collect();
        let mut constraints = vec![
            constraint(1, ConstraintKind::Fixed, 1, 2),
            constraint(2, ConstraintKind::Parallel, 1, 2),
        ];

        let solver = ConstraintSolver::new(&SolverConfig {
            max_iterations: 7,
            ..SolverConfig::default()
        });
        let report = solver.solve_report(&mut parts, &mut constraints);
        assert!(!report.converged);
        assert_eq!(report.iterations, 7);
        assert_eq!(report.unsatisfied, vec![ConstraintId::new(2)]);
        assert!(constraints[0].satisfied);
        assert_eq!(parts[&PartId::new(2)].transform.x, 3.0);
    }

    #[test]
    fn test_missing_part_is_unsatisfied() {
        let mut parts: BTreeMap<_, _> = [part(1, Transform::default(), Parameters::new())]
            .into_iter()
            .collect();
        let mut constraints = vec![constraint(1, ConstraintKind::Coincident, 1, 9)];
        assert!(!ConstraintSolver::default().solve(&mut parts, &mut constraints));
        assert!(!constraints[0].satisfied);
    }

    #[derive(Debug)]
    struct PullTowards;

    impl ConstraintStep for PullTowards {
        fn apply(&self, _kind: &ConstraintKind, father: &Part, target: &mut Part) -> bool {
            // Halve the gap each pass
            target.transform.x += (father.transform.x - target.transform.x) / 2.0;
            (father.transform.x - target.transform.x).abs() < 0.01
        }
    }

    #[test]
    fn test_pluggable_relaxation_step() {
        let mut parts: BTreeMap<_, _> = [
            part(1, Transform::default(), Parameters::new()),
            part(2, Transform::from_position(8.0, 0.0, 0.0), Parameters::new()),
        ]
        .into_iter()
        .collect();
        let mut constraints = vec![constraint(1, ConstraintKind::Tangent, 1, 2)];

        let solver = ConstraintSolver::default().with_step(PullTowards);
        let report = solver.solve_report(&mut parts, &mut constraints);
        assert!(report.converged);
        assert!(report.iterations > 1);
    }
}
