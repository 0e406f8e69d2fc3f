//! Error types for the assembly and simulation core

use thiserror::Error;

use crate::types::{ConstraintId, IdParseError, PartId};

/// Errors raised while editing, validating or persisting an assembly
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AssemblyError {
    #[error("Part not found: {0}")]
    PartNotFound(PartId),

    #[error("Constraint {constraint} references missing part {part}")]
    DanglingReference { constraint: ConstraintId, part: PartId },

    #[error(transparent)]
    MalformedId(#[from] IdParseError),

    #[error("Duplicate id in document: {0}")]
    DuplicateId(String),

    #[error("No free '{0}' ids left")]
    IdsExhausted(&'static str),

    #[error("Unknown constraint type: {0}")]
    UnknownConstraintType(String),

    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialize(String),
}

/// Errors raised by the kinematic chain and gear mesh
#[derive(Debug, Clone, PartialEq, Error)]
pub enum KinematicsError {
    #[error("Invalid gear '{gear}': tooth count must be positive")]
    InvalidGear { gear: String },

    #[error("Invalid joint limits: lower {lower} > upper {upper}")]
    InvalidLimits { lower: f32, upper: f32 },

    #[error("Link not found: {0}")]
    LinkNotFound(String),

    #[error("Joint not found: {0}")]
    JointNotFound(String),

    #[error("Joint {0} would close a cycle in the chain")]
    Cycle(String),

    #[error("No free '{0}' ids left")]
    IdsExhausted(&'static str),
}

/// Errors raised by the motion player
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MotionError {
    #[error("Keyframe time must be finite and non-negative, got {0}")]
    InvalidTime(f32),
}
