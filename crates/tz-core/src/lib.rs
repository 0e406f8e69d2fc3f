//! Tezniti Core Data Structures
//!
//! This crate contains the positioning and simulation core:
//! - Assembly: Parts placed by typed constraints, resolved by the solver
//! - AssemblyBuilder: Pre-wired assemblies from short text descriptions
//! - KinematicChain: Links and joints with bounded joint positions
//! - GearMesh: Rotation and speed propagation between meshing gears
//! - MotionPlayer: Keyframe playback and gear rotation sweeps

pub mod assembly;
pub mod config;
pub mod error;
pub mod gear;
pub mod kinematics;
pub mod motion;
pub mod part;
pub mod simulator;
pub mod types;

pub use assembly::*;
pub use config::*;
pub use error::*;
pub use gear::*;
pub use kinematics::*;
pub use motion::*;
pub use part::*;
pub use simulator::*;
pub use types::*;
