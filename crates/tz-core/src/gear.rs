//! Gear mesh rotation and speed propagation
//!
//! Gears are named by free-form string ids. Propagation only reaches gears
//! that share a pair with the driving gear; a gear two meshes away is not
//! moved by the same call.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::KinematicsError;

/// Two meshing gears and their last known angles (rad)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GearPair {
    pub gear1: String,
    pub teeth1: u32,
    pub gear2: String,
    pub teeth2: u32,
    /// `teeth1 / teeth2`
    pub ratio: f32,
    pub angle1: f32,
    pub angle2: f32,
}

impl GearPair {
    /// Partner of `gear` in this pair and the factor mapping the driver's
    /// motion onto it (sign included)
    fn partner_of(&self, gear: &str) -> Option<(&str, f32)> {
        if self.gear1 == gear {
            Some((self.gear2.as_str(), -self.ratio))
        } else if self.gear2 == gear {
            Some((self.gear1.as_str(), -1.0 / self.ratio))
        } else {
            None
        }
    }
}

/// Ratio summary of one pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GearRatio {
    pub gear1: String,
    pub gear2: String,
    pub ratio: f32,
}

/// Set of meshing gear pairs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GearMesh {
    pairs: Vec<GearPair>,
}

impl GearMesh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a meshing pair with both angles at zero
    pub fn add_pair(
        &mut self,
        gear1: impl Into<String>,
        teeth1: u32,
        gear2: impl Into<String>,
        teeth2: u32,
    ) -> Result<(), KinematicsError> {
        let (gear1, gear2) = (gear1.into(), gear2.into());
        if teeth1 == 0 {
            return Err(KinematicsError::InvalidGear { gear: gear1 });
        }
        if teeth2 == 0 {
            return Err(KinematicsError::InvalidGear { gear: gear2 });
        }

        let ratio = teeth1 as f32 / teeth2 as f32;
        tracing::debug!("Meshed {} ({}T) with {} ({}T), ratio {}", gear1, teeth1, gear2, teeth2, ratio);
        self.pairs.push(GearPair {
            gear1,
            teeth1,
            gear2,
            teeth2,
            ratio,
            angle1: 0.0,
            angle2: 0.0,
        });
        Ok(())
    }

    /// Set a gear to an absolute angle and counter-rotate its direct partners
    ///
    /// Returns the driver's angle and every partner's new angle. Pairs are
    /// updated independently from the same driving angle.
    pub fn rotate_gear(&mut self, gear: &str, angle: f32) -> BTreeMap<String, f32> {
        let mut affected = BTreeMap::from([(gear.to_string(), angle)]);

        for pair in &mut self.pairs {
            let Some((partner, factor)) = pair.partner_of(gear) else {
                continue;
            };
            let partner_angle = angle * factor;
            affected.insert(partner.to_string(), partner_angle);

            if pair.gear1 == gear {
                pair.angle1 = angle;
                pair.angle2 = partner_angle;
            } else {
                pair.angle2 = angle;
                pair.angle1 = partner_angle;
            }
        }

        affected
    }

    /// Speeds of the driver and its direct partners for an input speed
    pub fn calculate_output_speed(&self, gear: &str, rpm: f32) -> BTreeMap<String, f32> {
        let mut speeds = BTreeMap::from([(gear.to_string(), rpm)]);
        for (partner, factor) in self.pairs.iter().filter_map(|p| p.partner_of(gear)) {
            speeds.insert(partner.to_string(), rpm * factor);
        }
        speeds
    }

    /// Stored angle of a gear from the first pair containing it, else 0
    pub fn get_gear_angle(&self, gear: &str) -> f32 {
        self.pairs
            .iter()
            .find_map(|p| {
                if p.gear1 == gear {
                    Some(p.angle1)
                } else if p.gear2 == gear {
                    Some(p.angle2)
                } else {
                    None
                }
            })
            .unwrap_or(0.0)
    }

    pub fn gear_ratios(&self) -> Vec<GearRatio> {
        self.pairs
            .iter()
            .map(|p| GearRatio {
                gear1: p.gear1.clone(),
                gear2: p.gear2.clone(),
                ratio: p.ratio,
            })
            .collect()
    }

    pub fn pairs(&self) -> &[GearPair] {
        &self.pairs
    }

    /// Zero every stored angle
    pub fn reset(&mut self) {
        for pair in &mut self.pairs {
            pair.angle1 = 0.0;
            pair.angle2 = 0.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::{FRAC_PI_2, PI};

    use approx::assert_relative_eq;

    use super::*;

    fn train() -> GearMesh {
        let mut mesh = GearMesh::new();
        mesh.add_pair("driver", 20, "idler", 40).unwrap();
        mesh.add_pair("idler", 40, "output", 30).unwrap();
        mesh
    }

    #[test]
    fn test_rotate_driver_side() {
        let mut mesh = GearMesh::new();
        mesh.add_pair("g1", 20, "g2", 40).unwrap();
        let angles = mesh.rotate_gear("g1", PI);

        assert_eq!(angles["g1"], PI);
        assert_relative_eq!(angles["g2"], -FRAC_PI_2);
        assert_eq!(mesh.pairs()[0].angle1, PI);
        assert_relative_eq!(mesh.get_gear_angle("g2"), -FRAC_PI_2);
    }

    #[test]
    fn test_rotate_driven_side() {
        let mut mesh = GearMesh::new();
        mesh.add_pair("g1", 20, "g2", 40).unwrap();
        let angles = mesh.rotate_gear("g2", PI);
        assert_relative_eq!(angles["g1"], -2.0 * PI);
        assert_eq!(mesh.get_gear_angle("g2"), PI);
    }

    #[test]
    fn test_direct_pairs_only() {
        let mut mesh = train();
        let angles = mesh.rotate_gear("driver", 1.0);
        assert_eq!(angles.len(), 2);
        assert!(!angles.contains_key("output"));
        assert_eq!(mesh.get_gear_angle("output"), 0.0);

        // Middle gear drives both neighbours
        let angles = mesh.rotate_gear("idler", 1.0);
        assert_relative_eq!(angles["driver"], -2.0);
        assert_relative_eq!(angles["output"], -40.0 / 30.0, epsilon = 1e-6);
        assert_eq!(mesh.get_gear_angle("unknown"), 0.0);
    }

    #[test]
    fn test_output_speed() {
        let mesh = train();
        let speeds = mesh.calculate_output_speed("driver", 100.0);
        assert_eq!(speeds["driver"], 100.0);
        assert_relative_eq!(speeds["idler"], -50.0);
        assert_eq!(speeds.len(), 2);

        let speeds = mesh.calculate_output_speed("output", 60.0);
        assert_relative_eq!(speeds["idler"], -45.0, epsilon = 1e-4);
        assert_eq!(mesh.calculate_output_speed("none", 10.0).len(), 1);
    }

    #[test]
    fn test_zero_teeth_rejected() {
        let mut mesh = GearMesh::new();
        assert_eq!(
            mesh.add_pair("a", 0, "b", 10),
            Err(KinematicsError::InvalidGear { gear: "a".into() })
        );
        assert_eq!(
            mesh.add_pair("a", 10, "b", 0),
            Err(KinematicsError::InvalidGear { gear: "b".into() })
        );
        assert!(mesh.pairs().is_empty());
    }

    #[test]
    fn test_ratios_and_reset() {
        let mut mesh = train();
        let ratios = mesh.gear_ratios();
        assert_eq!(ratios[0].ratio, 0.5);
        assert_eq!(ratios[1].gear2, "output");

        mesh.rotate_gear("idler", 3.0);
        mesh.reset();
        assert!(mesh.pairs().iter().all(|p| p.angle1 == 0.0 && p.angle2 == 0.0));
    }
}
