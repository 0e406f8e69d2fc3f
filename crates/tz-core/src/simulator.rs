//! Gear train simulator built on the motion player

use std::collections::BTreeMap;
use std::sync::Arc;

use glam::Vec3;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::config::PlaybackConfig;
use crate::error::KinematicsError;
use crate::gear::GearRatio;
use crate::kinematics::JointType;
use crate::motion::{GearFrame, MotionPlayer};

/// Shared simulator type for multi-threaded hosts
pub type SharedSimulator = Arc<RwLock<KinematicSimulator>>;

/// One gear of a train
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GearSpec {
    pub id: String,
    pub teeth: u32,
}

impl GearSpec {
    pub fn new(id: impl Into<String>, teeth: u32) -> Self {
        Self {
            id: id.into(),
            teeth,
        }
    }
}

/// Result of a rotation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RotationReport {
    pub input_rpm: f32,
    /// Speeds of the driver and its direct partners
    pub output_speeds: BTreeMap<String, f32>,
    pub duration: f32,
    /// Leading frames of the sweep
    pub frames: Vec<GearFrame>,
}

/// Sets up gear trains and runs rotation sweeps
#[derive(Debug, Default)]
pub struct KinematicSimulator {
    player: MotionPlayer,
    config: PlaybackConfig,
}

impl KinematicSimulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: PlaybackConfig) -> Self {
        Self {
            player: MotionPlayer::default().with_config(&config),
            config,
        }
    }

    pub fn player(&self) -> &MotionPlayer {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut MotionPlayer {
        &mut self.player
    }

    /// Add one link per gear and mesh consecutive gears
    ///
    /// Tooth counts are checked before anything is added.
    pub fn setup_gear_train(&mut self, gears: &[GearSpec]) -> Result<(), KinematicsError> {
        if let Some(gear) = gears.iter().find(|g| g.teeth == 0) {
            return Err(KinematicsError::InvalidGear {
                gear: gear.id.clone(),
            });
        }

        let links = gears
            .iter()
            .map(|g| self.player.chain_mut().add_link(g.id.clone(), 1.0))
            .collect::<Result<Vec<_>, _>>()?;

        for (specs, pair) in gears.windows(2).zip(links.windows(2)) {
            self.player
                .chain_mut()
                .add_joint(JointType::GearPair, Some(pair[0]), pair[1], Vec3::Z)?;
            self.player.gear_mesh_mut().add_pair(
                specs[0].id.clone(),
                specs[0].teeth,
                specs[1].id.clone(),
                specs[1].teeth,
            )?;
        }

        tracing::info!("Gear train set up with {} gears", gears.len());
        Ok(())
    }

    /// Run the driver at `rpm` for `duration` seconds
    pub fn simulate_rotation(&mut self, driver: &str, rpm: f32, duration: f32) -> RotationReport {
        let output_speeds = self.player.gear_mesh().calculate_output_speed(driver, rpm);
        let revolutions = rpm / 60.0 * duration;

        let mut frames = self
            .player
            .simulate_gear_rotation(driver, revolutions, self.config.rotation_steps);
        frames.truncate(self.config.preview_frames);

        tracing::debug!(
            "Rotated {} at {} rpm for {}s ({} revolutions)",
            driver,
            rpm,
            duration,
            revolutions
        );
        RotationReport {
            input_rpm: rpm,
            output_speeds,
            duration,
            frames,
        }
    }

    pub fn gear_ratios(&self) -> Vec<GearRatio> {
        self.player.gear_mesh().gear_ratios()
    }
}

/// Create a new shared simulator
pub fn create_shared_simulator(simulator: KinematicSimulator) -> SharedSimulator {
    Arc::new(RwLock::new(simulator))
}

#[cfg(test)]
mod tests {
    use std::f32::consts::PI;

    use approx::assert_relative_eq;

    use super::*;

    fn train() -> Vec<GearSpec> {
        vec![
            GearSpec::new("gear_driver", 20),
            GearSpec::new("gear_driven", 40),
            GearSpec::new("gear_output", 30),
        ]
    }

    #[test]
    fn test_setup_gear_train() {
        let mut sim = KinematicSimulator::new();
        sim.setup_gear_train(&train()).unwrap();

        let chain = sim.player().chain();
        assert_eq!(chain.link_count(), 3);
        assert_eq!(chain.joint_count(), 2);
        assert!(chain.joints().all(|j| j.joint_type == JointType::GearPair));
        assert!(chain.validate().is_ok());

        let ratios = sim.gear_ratios();
        assert_eq!(ratios.len(), 2);
        assert_eq!(ratios[0].ratio, 0.5);
        assert_relative_eq!(ratios[1].ratio, 40.0 / 30.0);
    }

    #[test]
    fn test_zero_teeth_leaves_sim_untouched() {
        let mut sim = KinematicSimulator::new();
        let result = sim.setup_gear_train(&[GearSpec::new("a", 20), GearSpec::new("b", 0)]);
        assert_eq!(result, Err(KinematicsError::InvalidGear { gear: "b".into() }));
        assert_eq!(sim.player().chain().link_count(), 0);
    }

    #[test]
    fn test_simulate_rotation() {
        let mut sim = KinematicSimulator::new();
        sim.setup_gear_train(&train()).unwrap();

        let report = sim.simulate_rotation("gear_driver", 100.0, 1.0);
        assert_eq!(report.input_rpm, 100.0);
        assert_relative_eq!(report.output_speeds["gear_driven"], -50.0);
        assert!(!report.output_speeds.contains_key("gear_output"));
        assert_eq!(report.frames.len(), 10);

        // 100 rpm for 1 s is 5/3 turns over 100 steps
        let per_step = 2.0 * PI * (100.0 / 60.0) / 100.0;
        assert_relative_eq!(report.frames[0].angles["gear_driver"], per_step, epsilon = 1e-5);
        assert_relative_eq!(
            report.frames[9].angles["gear_driven"],
            -10.0 * per_step * 0.5,
            epsilon = 1e-5
        );
    }

    #[test]
    fn test_config_limits_preview() {
        let mut sim = KinematicSimulator::with_config(PlaybackConfig {
            rotation_steps: 4,
            preview_frames: 10,
            ..PlaybackConfig::default()
        });
        sim.setup_gear_train(&train()[..2]).unwrap();
        assert_eq!(sim.simulate_rotation("gear_driver", 60.0, 1.0).frames.len(), 4);
    }

    #[test]
    fn test_shared_simulator() {
        let shared = create_shared_simulator(KinematicSimulator::new());
        shared.write().setup_gear_train(&train()).unwrap();
        assert_eq!(shared.read().gear_ratios().len(), 2);
    }
}
