//! Simulation configuration module
//!
//! This module holds tunables for the constraint solver, the assembly
//! builder templates and motion playback.

mod manager;

pub use manager::{ConfigError, ConfigManager, SharedConfig, create_shared_config};

use serde::{Deserialize, Serialize};

/// Constraint solver settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SolverConfig {
    /// Maximum number of full passes over the constraint list
    pub max_iterations: usize,
    /// Pitch diameter assumed for gears without one
    pub default_pitch_diameter: f32,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            default_pitch_diameter: 40.0,
        }
    }
}

/// Assembly builder template settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BuilderConfig {
    /// Gear count when the description names none
    pub default_gear_count: usize,
    /// Upper bound on the gear count
    pub max_gears: usize,
    /// Gear module (pitch diameter = teeth * module)
    pub gear_module: f32,
    /// Tooth count of the first gear
    pub base_teeth: u32,
    /// Extra teeth per following gear
    pub teeth_step: u32,
    /// Initial spacing along X before solving
    pub gear_spacing: f32,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            default_gear_count: 2,
            max_gears: 5,
            gear_module: 2.0,
            base_teeth: 20,
            teeth_step: 8,
            gear_spacing: 50.0,
        }
    }
}

/// Playback and sweep settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlaybackConfig {
    /// Initial time scale of a motion player
    pub speed: f32,
    /// Steps of a gear rotation sweep
    pub rotation_steps: usize,
    /// Frames kept in a rotation report
    pub preview_frames: usize,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            speed: 1.0,
            rotation_steps: 100,
            preview_frames: 10,
        }
    }
}

/// Complete simulation configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SimConfig {
    /// Configuration format version
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub solver: SolverConfig,
    #[serde(default)]
    pub builder: BuilderConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
}

impl SimConfig {
    /// Current configuration version
    pub const CURRENT_VERSION: u32 = 1;

    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            ..Default::default()
        }
    }
}
