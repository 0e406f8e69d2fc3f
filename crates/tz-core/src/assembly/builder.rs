//! Template assemblies built from free-text descriptions

use std::fmt;
use std::str::FromStr;

use crate::config::{BuilderConfig, SolverConfig};
use crate::error::AssemblyError;
use crate::part::params;
use crate::types::{PartId, Transform};

use super::{Assembly, ConstraintKind};

/// Face width of generated gears
const GEAR_FACE_WIDTH: f64 = 20.0;

/// Known assembly layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssemblyTemplate {
    GearTrain,
    BearingAssembly,
    ShaftAssembly,
    Generic,
}

impl AssemblyTemplate {
    /// Template name
    pub fn name(&self) -> &'static str {
        match self {
            AssemblyTemplate::GearTrain => "gear_train",
            AssemblyTemplate::BearingAssembly => "bearing_assembly",
            AssemblyTemplate::ShaftAssembly => "shaft_assembly",
            AssemblyTemplate::Generic => "generic",
        }
    }

    /// Look up a template by name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "gear_train" => Some(AssemblyTemplate::GearTrain),
            "bearing_assembly" => Some(AssemblyTemplate::BearingAssembly),
            "shaft_assembly" => Some(AssemblyTemplate::ShaftAssembly),
            "generic" => Some(AssemblyTemplate::Generic),
            _ => None,
        }
    }

    /// Pick a template from keywords in a description
    ///
    /// Gears win over bearings, bearings over shafts.
    pub fn detect(description: &str) -> Self {
        let text = description.to_lowercase();
        let mentions = |keywords: &[&str]| keywords.iter().any(|k| text.contains(k));

        if mentions(&["ترس", "gear"]) {
            AssemblyTemplate::GearTrain
        } else if mentions(&["رومان", "bearing"]) {
            AssemblyTemplate::BearingAssembly
        } else if mentions(&["عمود", "shaft"]) {
            AssemblyTemplate::ShaftAssembly
        } else {
            AssemblyTemplate::Generic
        }
    }
}

impl fmt::Display for AssemblyTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AssemblyTemplate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| format!("Unknown assembly template: {}", s))
    }
}

/// Value of a decimal digit, ASCII or Arabic-Indic
fn digit_value(c: char) -> Option<u32> {
    match c {
        '0'..='9' => c.to_digit(10),
        '\u{0660}'..='\u{0669}' => Some(c as u32 - 0x0660),
        '\u{06F0}'..='\u{06F9}' => Some(c as u32 - 0x06F0),
        _ => None,
    }
}

/// First run of decimal digits in the text, saturating on overflow
pub fn first_integer(text: &str) -> Option<usize> {
    let mut value: Option<usize> = None;
    for c in text.chars() {
        match (digit_value(c), value) {
            (Some(d), current) => {
                let current = current.unwrap_or(0);
                value = Some(current.saturating_mul(10).saturating_add(d as usize));
            }
            (None, Some(_)) => break,
            (None, None) => {}
        }
    }
    value
}

/// Builds template assemblies from descriptions
#[derive(Debug, Clone, Default)]
pub struct AssemblyBuilder {
    config: BuilderConfig,
    solver: SolverConfig,
}

impl AssemblyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: BuilderConfig) -> Self {
        self.config = config;
        self
    }

    /// Solver settings for the generated assemblies
    pub fn with_solver_config(mut self, solver: SolverConfig) -> Self {
        self.solver = solver;
        self
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    /// Build the template matching the description's keywords
    pub fn build_from_text(&self, description: &str) -> Assembly {
        let template = AssemblyTemplate::detect(description);
        tracing::debug!("Description routed to template '{}'", template);
        self.build_template(template, description)
    }

    /// Build a specific template; only the gear train reads the description
    pub fn build_template(&self, template: AssemblyTemplate, description: &str) -> Assembly {
        let name = match template {
            AssemblyTemplate::GearTrain => "Gear Train Assembly",
            AssemblyTemplate::BearingAssembly => "Bearing Assembly",
            AssemblyTemplate::ShaftAssembly => "Shaft Assembly",
            AssemblyTemplate::Generic => "Custom Assembly",
        };
        let mut assembly = Assembly::new(name).with_solver_config(&self.solver);

        let populated = match template {
            AssemblyTemplate::GearTrain => self.add_gear_train(&mut assembly, description),
            AssemblyTemplate::BearingAssembly => self.add_bearing_assembly(&mut assembly),
            AssemblyTemplate::ShaftAssembly => self.add_shaft_assembly(&mut assembly),
            AssemblyTemplate::Generic => self.add_generic(&mut assembly),
        };
        if let Err(e) = populated {
            tracing::warn!("Template '{}' left incomplete: {}", template, e);
        }
        assembly.solve_constraints();

        tracing::info!(
            "Built '{}' from template '{}' ({} parts, {} constraints)",
            assembly.name,
            template,
            assembly.part_count(),
            assembly.constraints().len()
        );
        assembly
    }

    /// Number of gears requested by a description
    pub fn gear_count(&self, description: &str) -> usize {
        first_integer(description)
            .unwrap_or(self.config.default_gear_count)
            .min(self.config.max_gears)
    }

    fn add_gear_train(
        &self,
        assembly: &mut Assembly,
        description: &str,
    ) -> Result<(), AssemblyError> {
        let module = self.config.gear_module as f64;

        let gears = (0..self.gear_count(description))
            .map(|i| {
                let teeth = self.config.base_teeth + self.config.teeth_step * i as u32;
                assembly.add_part(
                    format!("Gear {}", i + 1),
                    "gear",
                    params([
                        ("teeth", teeth as f64),
                        ("module", module),
                        ("face_width", GEAR_FACE_WIDTH),
                        ("pitch_diameter", teeth as f64 * module),
                    ]),
                    Some(Transform::from_position(
                        self.config.gear_spacing * i as f32,
                        0.0,
                        0.0,
                    )),
                    None,
                )
            })
            .collect::<Result<Vec<PartId>, _>>()?;

        for pair in gears.windows(2) {
            assembly.add_constraint(ConstraintKind::GearMesh, pair[0], pair[1])?;
        }
        Ok(())
    }

    fn add_bearing_assembly(&self, assembly: &mut Assembly) -> Result<(), AssemblyError> {
        let shaft = assembly.add_part(
            "Shaft",
            "shaft",
            params([("diameter", 25.0), ("length", 100.0)]),
            None,
            None,
        )?;

        for (index, x) in [(1, 10.0), (2, 75.0)] {
            let bearing = assembly.add_part(
                format!("Bearing {}", index),
                "bearing",
                params([
                    ("outer_diameter", 50.0),
                    ("inner_diameter", 25.0),
                    ("width", 15.0),
                ]),
                Some(Transform::from_position(x, 0.0, 0.0)),
                None,
            )?;
            assembly.add_constraint(ConstraintKind::Concentric, shaft, bearing)?;
        }
        Ok(())
    }

    fn add_shaft_assembly(&self, assembly: &mut Assembly) -> Result<(), AssemblyError> {
        let shaft = assembly.add_part(
            "Main Shaft",
            "shaft",
            params([("diameter", 30.0), ("length", 150.0)]),
            None,
            None,
        )?;
        let gear = assembly.add_part(
            "Drive Gear",
            "gear",
            params([
                ("teeth", 32.0),
                ("module", self.config.gear_module as f64),
                ("bore_diameter", 30.0),
            ]),
            Some(Transform::from_position(50.0, 0.0, 0.0)),
            None,
        )?;
        assembly.add_constraint(ConstraintKind::Concentric, shaft, gear)?;
        Ok(())
    }

    fn add_generic(&self, assembly: &mut Assembly) -> Result<(), AssemblyError> {
        assembly.add_part(
            "Base",
            "plate",
            params([("length", 100.0), ("width", 100.0), ("thickness", 10.0)]),
            None,
            None,
        )?;
        Ok(())
    }
}

/// Build an assembly from a description with default settings
pub fn build_from_text(description: &str) -> Assembly {
    AssemblyBuilder::new().build_from_text(description)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::ConstraintType;

    fn count_type(assembly: &Assembly, constraint_type: ConstraintType) -> usize {
        assembly
            .constraints()
            .iter()
            .filter(|c| c.constraint_type() == constraint_type)
            .count()
    }

    #[test]
    fn test_first_integer() {
        assert_eq!(first_integer("3 gears meshed"), Some(3));
        assert_eq!(first_integer("train of 12 then 4"), Some(12));
        assert_eq!(first_integer("٤ تروس"), Some(4));
        assert_eq!(first_integer("۳ ترس"), Some(3));
        assert_eq!(first_integer("no digits"), None);
        assert_eq!(first_integer("99999999999999999999999999"), Some(usize::MAX));
    }

    #[test]
    fn test_detect_keywords() {
        assert_eq!(AssemblyTemplate::detect("Two GEARS"), AssemblyTemplate::GearTrain);
        assert_eq!(AssemblyTemplate::detect("ترسين متعشقين"), AssemblyTemplate::GearTrain);
        assert_eq!(
            AssemblyTemplate::detect("bearing on a shaft"),
            AssemblyTemplate::BearingAssembly
        );
        assert_eq!(AssemblyTemplate::detect("رومان بلي"), AssemblyTemplate::BearingAssembly);
        assert_eq!(AssemblyTemplate::detect("عمود"), AssemblyTemplate::ShaftAssembly);
        assert_eq!(AssemblyTemplate::detect("a bracket"), AssemblyTemplate::Generic);
    }

    #[test]
    fn test_template_names() {
        for template in [
            AssemblyTemplate::GearTrain,
            AssemblyTemplate::BearingAssembly,
            AssemblyTemplate::ShaftAssembly,
            AssemblyTemplate::Generic,
        ] {
            assert_eq!(template.name().parse::<AssemblyTemplate>(), Ok(template));
        }
        assert!(AssemblyTemplate::from_name("gearbox").is_none());
    }

    #[test]
    fn test_gear_train_layout() {
        let assembly = build_from_text("3 gears meshed");
        let gears = assembly.get_all_parts();
        assert_eq!(gears.len(), 3);
        assert!(gears.iter().all(|p| p.part_type == "gear"));
        assert_eq!(count_type(&assembly, ConstraintType::GearMesh), 2);

        let teeth: Vec<_> = gears.iter().map(|p| p.param_f32("teeth").unwrap()).collect();
        assert_eq!(teeth, [20.0, 28.0, 36.0]);
        // Radii 20, 28, 36 chained from the first gear at the origin
        let xs: Vec<_> = gears.iter().map(|p| p.transform.x).collect();
        assert_eq!(xs, [0.0, 48.0, 112.0]);
        assert!(assembly.constraints().iter().all(|c| c.satisfied));
    }

    #[test]
    fn test_gear_count_bounds() {
        let builder = AssemblyBuilder::new();
        assert_eq!(builder.gear_count("some gears"), 2);
        assert_eq!(builder.gear_count("40 gears"), 5);
        assert_eq!(builder.build_from_text("0 gears").part_count(), 0);
        assert_eq!(builder.build_from_text("1 gear").constraints().len(), 0);

        let small = AssemblyBuilder::new().with_config(BuilderConfig {
            max_gears: 3,
            ..BuilderConfig::default()
        });
        assert_eq!(small.build_from_text("9 gears").part_count(), 3);
    }

    #[test]
    fn test_bearing_and_shaft_templates() {
        let bearing = build_from_text("bearing assembly");
        assert_eq!(bearing.name, "Bearing Assembly");
        assert_eq!(bearing.part_count(), 3);
        assert_eq!(count_type(&bearing, ConstraintType::Concentric), 2);
        // Concentric pulls X/Y onto the shaft axis
        assert!(bearing.get_all_parts().iter().all(|p| p.transform.x == 0.0));

        let shaft = build_from_text("a shaft");
        assert_eq!(shaft.part_count(), 2);
        assert_eq!(count_type(&shaft, ConstraintType::Concentric), 1);
        assert_eq!(shaft.get_all_parts()[1].param_f32("bore_diameter"), Some(30.0));
    }

    #[test]
    fn test_generic_fallback() {
        let assembly = build_from_text("mounting bracket");
        assert_eq!(assembly.name, "Custom Assembly");
        let parts = assembly.get_all_parts();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].part_type, "plate");
        assert_eq!(parts[0].param_f32("thickness"), Some(10.0));
        assert!(assembly.constraints().is_empty());
    }
}
