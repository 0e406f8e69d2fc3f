//! Constraint types between two parts

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AssemblyError;
use crate::part::Parameters;
use crate::types::{Axis, ConstraintId, PartId};

/// Closed set of relation tags, as written in assembly documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintType {
    Fixed,
    Coincident,
    Concentric,
    Parallel,
    Perpendicular,
    Tangent,
    Distance,
    Angle,
    GearMesh,
}

impl ConstraintType {
    /// Tag used in documents
    pub fn as_str(&self) -> &'static str {
        match self {
            ConstraintType::Fixed => "fixed",
            ConstraintType::Coincident => "coincident",
            ConstraintType::Concentric => "concentric",
            ConstraintType::Parallel => "parallel",
            ConstraintType::Perpendicular => "perpendicular",
            ConstraintType::Tangent => "tangent",
            ConstraintType::Distance => "distance",
            ConstraintType::Angle => "angle",
            ConstraintType::GearMesh => "gear_mesh",
        }
    }

    /// All constraint types
    pub fn all() -> &'static [ConstraintType] {
        &[
            ConstraintType::Fixed,
            ConstraintType::Coincident,
            ConstraintType::Concentric,
            ConstraintType::Parallel,
            ConstraintType::Perpendicular,
            ConstraintType::Tangent,
            ConstraintType::Distance,
            ConstraintType::Angle,
            ConstraintType::GearMesh,
        ]
    }
}

impl fmt::Display for ConstraintType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConstraintType {
    type Err = AssemblyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConstraintType::all()
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| AssemblyError::UnknownConstraintType(s.to_string()))
    }
}

/// A constraint relation together with its payload
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConstraintKind {
    /// Anchors the first part; never moves anything
    Fixed,
    /// Second part takes the position of the first
    Coincident,
    /// Second part shares the first part's Z axis
    Concentric,
    /// Second part offset from the first along one axis
    Distance { distance: f32, axis: Axis },
    /// Second part placed at the meshing distance along X
    GearMesh,
    Parallel,
    Perpendicular,
    Tangent,
    Angle { angle: f32 },
}

impl ConstraintKind {
    /// Offset used when a distance constraint omits it
    pub const DEFAULT_DISTANCE: f32 = 10.0;

    pub fn distance(distance: f32, axis: Axis) -> Self {
        ConstraintKind::Distance { distance, axis }
    }

    /// Kind of the given type with default payload
    pub fn from_type(constraint_type: ConstraintType) -> Self {
        match constraint_type {
            ConstraintType::Fixed => ConstraintKind::Fixed,
            ConstraintType::Coincident => ConstraintKind::Coincident,
            ConstraintType::Concentric => ConstraintKind::Concentric,
            ConstraintType::Parallel => ConstraintKind::Parallel,
            ConstraintType::Perpendicular => ConstraintKind::Perpendicular,
            ConstraintType::Tangent => ConstraintKind::Tangent,
            ConstraintType::Distance => ConstraintKind::Distance {
                distance: Self::DEFAULT_DISTANCE,
                axis: Axis::Z,
            },
            ConstraintType::Angle => ConstraintKind::Angle { angle: 0.0 },
            ConstraintType::GearMesh => ConstraintKind::GearMesh,
        }
    }

    pub fn constraint_type(&self) -> ConstraintType {
        match self {
            ConstraintKind::Fixed => ConstraintType::Fixed,
            ConstraintKind::Coincident => ConstraintType::Coincident,
            ConstraintKind::Concentric => ConstraintType::Concentric,
            ConstraintKind::Distance { .. } => ConstraintType::Distance,
            ConstraintKind::GearMesh => ConstraintType::GearMesh,
            ConstraintKind::Parallel => ConstraintType::Parallel,
            ConstraintKind::Perpendicular => ConstraintType::Perpendicular,
            ConstraintKind::Tangent => ConstraintType::Tangent,
            ConstraintKind::Angle { .. } => ConstraintType::Angle,
        }
    }

    /// Payload rendered as a document parameter map
    pub fn to_parameters(&self) -> Parameters {
        let mut parameters = Parameters::new();
        match self {
            ConstraintKind::Distance { distance, axis } => {
                parameters.insert("distance".into(), decimal(*distance));
                parameters.insert("axis".into(), Value::from(axis.as_str()));
            }
            ConstraintKind::Angle { angle } => {
                parameters.insert("angle".into(), decimal(*angle));
            }
            _ => {}
        }
        parameters
    }

    /// Rebuild the payload from a document parameter map
    ///
    /// Missing keys take their defaults; present keys of the wrong shape are rejected.
    pub fn from_parameters(
        constraint_type: ConstraintType,
        parameters: &Parameters,
    ) -> Result<Self, AssemblyError> {
        let number = |key: &str, default: f32| -> Result<f32, AssemblyError> {
            match parameters.get(key) {
                None => Ok(default),
                Some(value) => value.as_f64().map(|v| v as f32).ok_or_else(|| {
                    AssemblyError::MalformedDocument(format!(
                        "{} parameter '{}' is not a number: {}",
                        constraint_type, key, value
                    ))
                }),
            }
        };

        Ok(match Self::from_type(constraint_type) {
            ConstraintKind::Distance { distance, axis } => {
                let axis = match parameters.get("axis") {
                    None => axis,
                    Some(Value::String(raw)) => raw
                        .parse()
                        .map_err(AssemblyError::MalformedDocument)?,
                    Some(other) => {
                        return Err(AssemblyError::MalformedDocument(format!(
                            "distance parameter 'axis' is not a string: {}",
                            other
                        )));
                    }
                };
                ConstraintKind::Distance {
                    distance: number("distance", distance)?,
                    axis,
                }
            }
            ConstraintKind::Angle { angle } => ConstraintKind::Angle {
                angle: number("angle", angle)?,
            },
            kind => kind,
        })
    }
}

/// Widen through the shortest decimal form so `0.1` stays `0.1` in documents
fn decimal(value: f32) -> Value {
    value.to_string().parse::<f64>().map_or(Value::Null, Value::from)
}

impl From<ConstraintType> for ConstraintKind {
    fn from(constraint_type: ConstraintType) -> Self {
        Self::from_type(constraint_type)
    }
}

/// A typed binary relation between two parts of one assembly
///
/// The document parameter map is kept as given; `kind` is the typed view the
/// solver reads from it.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub id: ConstraintId,
    kind: ConstraintKind,
    parameters: Parameters,
    /// Reference part (read only during solving)
    pub part1: PartId,
    /// Part positioned by the constraint
    pub part2: PartId,
    pub satisfied: bool,
}

impl Constraint {
    pub fn new(id: ConstraintId, kind: ConstraintKind, part1: PartId, part2: PartId) -> Self {
        Self {
            id,
            kind,
            parameters: kind.to_parameters(),
            part1,
            part2,
            satisfied: false,
        }
    }

    /// Build from a document parameter map, keeping every key
    pub fn with_parameters(
        id: ConstraintId,
        constraint_type: ConstraintType,
        parameters: Parameters,
        part1: PartId,
        part2: PartId,
    ) -> Result<Self, AssemblyError> {
        let kind = ConstraintKind::from_parameters(constraint_type, &parameters)?;
        Ok(Self {
            id,
            kind,
            parameters,
            part1,
            part2,
            satisfied: false,
        })
    }

    pub fn kind(&self) -> &ConstraintKind {
        &self.kind
    }

    /// Parameter map as written to documents
    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn constraint_type(&self) -> ConstraintType {
        self.kind.constraint_type()
    }

    /// Check whether either endpoint is the given part
    pub fn references_part(&self, part_id: PartId) -> bool {
        self.part1 == part_id || self.part2 == part_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::part::params;

    #[test]
    fn test_type_tags() {
        for t in ConstraintType::all() {
            assert_eq!(t.as_str().parse::<ConstraintType>().unwrap(), *t);
            assert_eq!(serde_json::to_value(t).unwrap(), t.as_str());
        }
        assert_eq!(
            "weld".parse::<ConstraintType>(),
            Err(AssemblyError::UnknownConstraintType("weld".into()))
        );
    }

    #[test]
    fn test_distance_defaults() {
        let kind =
            ConstraintKind::from_parameters(ConstraintType::Distance, &Parameters::new()).unwrap();
        assert_eq!(kind, ConstraintKind::distance(10.0, Axis::Z));
    }

    #[test]
    fn test_distance_parameters() {
        let mut p = params([("distance", -25.0)]);
        p.insert("axis".into(), Value::from("x"));
        let kind = ConstraintKind::from_parameters(ConstraintType::Distance, &p).unwrap();
        assert_eq!(kind, ConstraintKind::distance(-25.0, Axis::X));
        assert_eq!(kind.to_parameters(), p);
    }

    #[test]
    fn test_rejects_bad_payload() {
        let mut p = Parameters::new();
        p.insert("axis".into(), Value::from("w"));
        assert!(matches!(
            ConstraintKind::from_parameters(ConstraintType::Distance, &p),
            Err(AssemblyError::MalformedDocument(_))
        ));

        let mut p = Parameters::new();
        p.insert("angle".into(), Value::from("ninety"));
        assert!(ConstraintKind::from_parameters(ConstraintType::Angle, &p).is_err());
    }

    #[test]
    fn test_parameters_kept_verbatim() {
        let mut p = params([("distance", 0.1), ("tolerance", 0.05)]);
        p.insert("axis".into(), Value::from("x"));
        p.insert("note".into(), Value::from("keep"));
        let constraint = Constraint::with_parameters(
            ConstraintId::new(1),
            ConstraintType::Distance,
            p.clone(),
            PartId::new(1),
            PartId::new(2),
        )
        .unwrap();

        assert_eq!(constraint.parameters(), &p);
        assert_eq!(constraint.kind(), &ConstraintKind::distance(0.1, Axis::X));
    }

    #[test]
    fn test_decimal_payload_not_perturbed() {
        let parameters = ConstraintKind::distance(0.1, Axis::Y).to_parameters();
        assert_eq!(parameters["distance"], Value::from(0.1));
    }

    #[test]
    fn test_payload_free_kinds_have_no_parameters() {
        assert!(ConstraintKind::GearMesh.to_parameters().is_empty());
        assert!(ConstraintKind::Fixed.to_parameters().is_empty());
    }
}
