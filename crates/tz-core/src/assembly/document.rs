//! Assembly document persistence (JSON)
//!
//! Loading is all-or-nothing: a document with malformed ids, duplicate ids,
//! unknown constraint types or constraints naming absent parts is rejected
//! instead of being partially reconstructed.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AssemblyError;
use crate::part::{DEFAULT_PART_COLOR, Parameters, Part};
use crate::types::{ConstraintId, PartId, Transform};

use super::{Assembly, AssemblyMetadata, Constraint, ConstraintType};

/// On-disk form of an assembly
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssemblyDocument {
    #[serde(default = "default_assembly_name")]
    pub name: String,
    #[serde(default)]
    pub metadata: AssemblyMetadata,
    #[serde(default)]
    pub parts: Vec<PartRecord>,
    #[serde(default)]
    pub constraints: Vec<ConstraintRecord>,
}

fn default_assembly_name() -> String {
    "Loaded Assembly".to_string()
}

/// On-disk form of a part; the id is validated on conversion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartRecord {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub part_type: String,
    pub parameters: Parameters,
    #[serde(default)]
    pub transform: Transform,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub visible: Option<bool>,
    #[serde(default)]
    pub stl_path: Option<String>,
}

/// On-disk form of a constraint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstraintRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub constraint_type: String,
    pub part1: String,
    pub part2: String,
    #[serde(default)]
    pub parameters: Parameters,
    #[serde(default)]
    pub satisfied: bool,
}

impl From<&Part> for PartRecord {
    fn from(part: &Part) -> Self {
        Self {
            id: part.id.to_string(),
            name: part.name.clone(),
            part_type: part.part_type.clone(),
            parameters: part.parameters.clone(),
            transform: part.transform,
            color: Some(part.color.clone()),
            visible: Some(part.visible),
            stl_path: part.stl_path.clone(),
        }
    }
}

impl TryFrom<PartRecord> for Part {
    type Error = AssemblyError;

    fn try_from(record: PartRecord) -> Result<Self, Self::Error> {
        Ok(Part {
            id: record.id.parse()?,
            name: record.name,
            part_type: record.part_type,
            parameters: record.parameters,
            transform: record.transform,
            color: record.color.unwrap_or_else(|| DEFAULT_PART_COLOR.to_string()),
            visible: record.visible.unwrap_or(true),
            stl_path: record.stl_path,
        })
    }
}

impl From<&Constraint> for ConstraintRecord {
    fn from(constraint: &Constraint) -> Self {
        Self {
            id: constraint.id.to_string(),
            constraint_type: constraint.constraint_type().as_str().to_string(),
            part1: constraint.part1.to_string(),
            part2: constraint.part2.to_string(),
            parameters: constraint.parameters().clone(),
            satisfied: constraint.satisfied,
        }
    }
}

impl TryFrom<ConstraintRecord> for Constraint {
    type Error = AssemblyError;

    fn try_from(record: ConstraintRecord) -> Result<Self, Self::Error> {
        let constraint_type: ConstraintType = record.constraint_type.parse()?;
        let mut constraint = Constraint::with_parameters(
            record.id.parse::<ConstraintId>()?,
            constraint_type,
            record.parameters,
            record.part1.parse::<PartId>()?,
            record.part2.parse::<PartId>()?,
        )?;
        constraint.satisfied = record.satisfied;
        Ok(constraint)
    }
}

impl From<&Assembly> for AssemblyDocument {
    fn from(assembly: &Assembly) -> Self {
        Self {
            name: assembly.name.clone(),
            metadata: assembly.metadata.clone(),
            parts: assembly.parts_iter().map(PartRecord::from).collect(),
            constraints: assembly.constraints.iter().map(ConstraintRecord::from).collect(),
        }
    }
}

impl TryFrom<AssemblyDocument> for Assembly {
    type Error = AssemblyError;

    fn try_from(document: AssemblyDocument) -> Result<Self, Self::Error> {
        let mut assembly = Assembly::new(document.name);
        assembly.metadata = document.metadata;

        let mut parts = BTreeMap::new();
        let mut part_order = Vec::with_capacity(document.parts.len());
        for record in document.parts {
            let raw_id = record.id.clone();
            let part = Part::try_from(record)?;
            part_order.push(part.id);
            if parts.insert(part.id, part).is_some() {
                return Err(AssemblyError::DuplicateId(raw_id));
            }
        }

        let mut seen = HashSet::new();
        let mut constraints = Vec::new();
        for record in document.constraints {
            let constraint = Constraint::try_from(record)?;
            if !seen.insert(constraint.id) {
                return Err(AssemblyError::DuplicateId(constraint.id.to_string()));
            }
            for part in [constraint.part1, constraint.part2] {
                if !parts.contains_key(&part) {
                    return Err(AssemblyError::DanglingReference {
                        constraint: constraint.id,
                        part,
                    });
                }
            }
            constraints.push(constraint);
        }

        // The top suffix would leave nothing to allocate after loading
        for id in parts.keys() {
            if !assembly.part_ids.observe(id.index()) {
                return Err(no_room_after(id));
            }
        }
        for constraint in &constraints {
            if !assembly.constraint_ids.observe(constraint.id.index()) {
                return Err(no_room_after(&constraint.id));
            }
        }
        assembly.parts = parts;
        assembly.part_order = part_order;
        assembly.constraints = constraints;
        Ok(assembly)
    }
}

fn no_room_after(id: &impl std::fmt::Display) -> AssemblyError {
    AssemblyError::MalformedDocument(format!("id {} leaves no room for new ids", id))
}

impl Assembly {
    /// Serialize to a pretty-printed JSON document
    pub fn to_json(&self) -> Result<String, AssemblyError> {
        serde_json::to_string_pretty(&AssemblyDocument::from(self))
            .map_err(|e| AssemblyError::Serialize(e.to_string()))
    }

    /// Parse a JSON document
    pub fn from_json(json: &str) -> Result<Self, AssemblyError> {
        let document: AssemblyDocument = serde_json::from_str(json)
            .map_err(|e| AssemblyError::MalformedDocument(e.to_string()))?;
        Assembly::try_from(document)
    }

    /// Save the assembly to a JSON file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), AssemblyError> {
        let path = path.as_ref();
        let json = self.to_json()?;
        std::fs::write(path, json).map_err(|e| AssemblyError::Io(e.to_string()))?;
        tracing::info!(
            "Saved assembly '{}' ({} parts, {} constraints) to {:?}",
            self.name,
            self.parts.len(),
            self.constraints.len(),
            path
        );
        Ok(())
    }

    /// Load an assembly from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AssemblyError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| AssemblyError::Io(e.to_string()))?;
        let assembly = Self::from_json(&json)?;
        tracing::info!(
            "Loaded assembly '{}' ({} parts, {} constraints) from {:?}",
            assembly.name,
            assembly.parts.len(),
            assembly.constraints.len(),
            path
        );
        Ok(assembly)
    }
}
