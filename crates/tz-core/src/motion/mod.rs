//! Keyframe playback over a kinematic chain and gear mesh
//!
//! The player is driven externally: a host calls [`MotionPlayer::step`] once
//! per tick. Playback state is bookkeeping for the host; `step` advances the
//! clock in every state.

mod observer;

pub use observer::*;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::PlaybackConfig;
use crate::error::MotionError;
use crate::gear::GearMesh;
use crate::kinematics::KinematicChain;
use crate::types::JointId;

/// Joint positions keyed by joint id string
pub type JointPositions = BTreeMap<String, f32>;

/// Joint targets at a point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionKeyframe {
    time: f32,
    #[serde(rename = "positions")]
    joint_positions: JointPositions,
}

impl MotionKeyframe {
    /// Create a keyframe; the time must be finite and non-negative
    pub fn new(time: f32, joint_positions: JointPositions) -> Result<Self, MotionError> {
        if !time.is_finite() || time < 0.0 {
            return Err(MotionError::InvalidTime(time));
        }
        Ok(Self {
            time,
            joint_positions,
        })
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn joint_positions(&self) -> &JointPositions {
        &self.joint_positions
    }
}

/// Playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// One sample of a gear rotation sweep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GearFrame {
    pub step: usize,
    /// `step / steps`, in `[0, 1)`
    pub time: f32,
    pub angles: BTreeMap<String, f32>,
}

/// Serializable view of a player
#[derive(Debug, Serialize)]
pub struct MotionSnapshot<'a> {
    pub chain: &'a KinematicChain,
    pub keyframes: &'a [MotionKeyframe],
    pub duration: f32,
}

/// Keyframe player owning a kinematic chain and a gear mesh
#[derive(Debug)]
pub struct MotionPlayer {
    chain: KinematicChain,
    gear_mesh: GearMesh,
    keyframes: Vec<MotionKeyframe>,
    current_time: f32,
    state: PlaybackState,
    looping: bool,
    speed: f32,
    observers: ObserverRegistry,
}

impl Default for MotionPlayer {
    fn default() -> Self {
        Self::new(KinematicChain::default(), GearMesh::default())
    }
}

impl MotionPlayer {
    pub fn new(chain: KinematicChain, gear_mesh: GearMesh) -> Self {
        Self {
            chain,
            gear_mesh,
            keyframes: Vec::new(),
            current_time: 0.0,
            state: PlaybackState::Stopped,
            looping: false,
            speed: 1.0,
            observers: ObserverRegistry::new(),
        }
    }

    /// Apply playback settings
    pub fn with_config(mut self, config: &PlaybackConfig) -> Self {
        self.speed = config.speed;
        self
    }

    pub fn chain(&self) -> &KinematicChain {
        &self.chain
    }

    pub fn chain_mut(&mut self) -> &mut KinematicChain {
        &mut self.chain
    }

    pub fn gear_mesh(&self) -> &GearMesh {
        &self.gear_mesh
    }

    pub fn gear_mesh_mut(&mut self) -> &mut GearMesh {
        &mut self.gear_mesh
    }

    // ============== Keyframes ==============

    /// Insert a keyframe, keeping keyframes sorted by time
    ///
    /// A keyframe at an existing time goes after the ones already there.
    pub fn add_keyframe<K: Into<String>>(
        &mut self,
        time: f32,
        positions: impl IntoIterator<Item = (K, f32)>,
    ) -> Result<(), MotionError> {
        let positions = positions.into_iter().map(|(k, v)| (k.into(), v)).collect();
        let keyframe = MotionKeyframe::new(time, positions)?;
        let index = self.keyframes.partition_point(|k| k.time <= time);
        self.keyframes.insert(index, keyframe);
        Ok(())
    }

    /// Remove all keyframes and rewind
    pub fn clear_keyframes(&mut self) {
        self.keyframes.clear();
        self.current_time = 0.0;
    }

    pub fn keyframes(&self) -> &[MotionKeyframe] {
        &self.keyframes
    }

    /// Time of the last keyframe, or 0 without keyframes
    pub fn duration(&self) -> f32 {
        self.keyframes.last().map_or(0.0, |k| k.time)
    }

    /// Positions at a time, linearly interpolated between keyframes
    ///
    /// Clamps to the first/last keyframe outside their range. Between two
    /// keyframes every joint named by either is interpolated; a joint missing
    /// from one side counts as 0 there.
    pub fn get_interpolated_positions(&self, time: f32) -> JointPositions {
        let (Some(first), Some(last)) = (self.keyframes.first(), self.keyframes.last()) else {
            return JointPositions::new();
        };
        if time <= first.time {
            return first.joint_positions.clone();
        }
        if time >= last.time {
            return last.joint_positions.clone();
        }

        let Some((k1, k2)) = self.keyframes.windows(2).find_map(|pair| match pair {
            [k1, k2] if k1.time <= time && time <= k2.time => Some((k1, k2)),
            _ => None,
        }) else {
            return JointPositions::new();
        };

        let span = k2.time - k1.time;
        let f = if span > 0.0 { (time - k1.time) / span } else { 1.0 };

        let mut positions = JointPositions::new();
        for key in k1.joint_positions.keys().chain(k2.joint_positions.keys()) {
            let p1 = k1.joint_positions.get(key).copied().unwrap_or(0.0);
            let p2 = k2.joint_positions.get(key).copied().unwrap_or(0.0);
            positions.insert(key.clone(), p1 + f * (p2 - p1));
        }
        positions
    }

    // ============== Playback ==============

    /// Start playing from time zero
    pub fn play(&mut self, looping: bool) {
        self.state = PlaybackState::Playing;
        self.looping = looping;
        self.current_time = 0.0;
    }

    /// Stop advancing, keeping the current time
    pub fn pause(&mut self) {
        self.state = PlaybackState::Paused;
    }

    /// Stop and rewind
    pub fn stop(&mut self) {
        self.state = PlaybackState::Stopped;
        self.current_time = 0.0;
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn current_time(&self) -> f32 {
        self.current_time
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed;
    }

    /// Advance the clock, pose the chain and notify observers
    ///
    /// Keys that name a joint of the chain (`joint_<n>`) are written through
    /// [`KinematicChain::set_joint_position`] and therefore clamped; other
    /// keys are only reported. An advance that would make the clock
    /// non-finite is dropped and the step repeats the current time.
    pub fn step(&mut self, delta_time: f32) -> JointPositions {
        let advanced = self.current_time + delta_time * self.speed;
        if advanced.is_finite() {
            self.current_time = advanced;
        } else {
            tracing::warn!(
                "Ignoring step of {}s at speed {}: clock would become {}",
                delta_time,
                self.speed,
                advanced
            );
        }

        let duration = self.duration();
        if self.looping && duration > 0.0 {
            self.current_time = self.current_time.rem_euclid(duration);
        }

        let positions = self.get_interpolated_positions(self.current_time);
        for (key, value) in &positions {
            if let Ok(joint) = key.parse::<JointId>() {
                self.chain.set_joint_position(joint, *value);
            }
        }
        tracing::trace!(time = self.current_time, joints = positions.len(), "motion step");

        self.observers.notify_all(self.current_time, &positions);
        positions
    }

    /// Sweep the driver gear through `revolutions` turns in `steps` increments
    ///
    /// Each frame holds the absolute angles after step `i`
    /// (`2π · revolutions · (i + 1) / steps`). The playback clock is untouched.
    pub fn simulate_gear_rotation(
        &mut self,
        driver_gear: &str,
        revolutions: f32,
        steps: usize,
    ) -> Vec<GearFrame> {
        if steps == 0 {
            return Vec::new();
        }
        let angle_per_step = std::f32::consts::TAU * revolutions / steps as f32;

        (0..steps)
            .map(|i| GearFrame {
                step: i,
                time: i as f32 / steps as f32,
                angles: self
                    .gear_mesh
                    .rotate_gear(driver_gear, angle_per_step * (i + 1) as f32),
            })
            .collect()
    }

    // ============== Observers ==============

    /// Subscribe an observer to step results
    pub fn register_observer<O: MotionObserver + 'static>(&mut self, observer: O) {
        self.observers.register(observer);
    }

    /// Remove an observer by name
    pub fn unregister_observer(&mut self, name: &str) -> Option<Box<dyn MotionObserver>> {
        self.observers.unregister(name)
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Serializable view of chain, keyframes and duration
    pub fn snapshot(&self) -> MotionSnapshot<'_> {
        MotionSnapshot {
            chain: &self.chain,
            keyframes: &self.keyframes,
            duration: self.duration(),
        }
    }
}
