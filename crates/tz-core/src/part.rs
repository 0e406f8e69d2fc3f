//! Part definitions

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::{PartId, Transform};

/// Free-form numeric/text parameters of a part (e.g. `teeth`, `pitch_diameter`)
pub type Parameters = Map<String, Value>;

/// Fallback colour for part types without an entry in the colour table
pub const DEFAULT_PART_COLOR: &str = "#808080";

/// A placed instance of a parametric mechanical shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    pub id: PartId,
    pub name: String,
    /// Open type tag understood by the geometry generator (gear, bearing, ...)
    #[serde(rename = "type")]
    pub part_type: String,
    pub parameters: Parameters,
    #[serde(default)]
    pub transform: Transform,
    /// Display colour as `#RRGGBB`
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default = "default_visible")]
    pub visible: bool,
    /// Externally generated mesh, if any
    #[serde(default)]
    pub stl_path: Option<String>,
}

fn default_color() -> String {
    DEFAULT_PART_COLOR.to_string()
}

fn default_visible() -> bool {
    true
}

impl Part {
    /// Create a new part at the origin with the default colour for its type
    pub fn new(
        id: PartId,
        name: impl Into<String>,
        part_type: impl Into<String>,
        parameters: Parameters,
    ) -> Self {
        let part_type = part_type.into();
        Self {
            id,
            name: name.into(),
            color: default_color_for(&part_type).to_string(),
            part_type,
            parameters,
            transform: Transform::default(),
            visible: true,
            stl_path: None,
        }
    }

    /// Read a numeric parameter
    pub fn param_f32(&self, key: &str) -> Option<f32> {
        self.parameters.get(key).and_then(Value::as_f64).map(|v| v as f32)
    }

    /// Read a numeric parameter, falling back to `default` when absent
    pub fn param_or(&self, key: &str, default: f32) -> f32 {
        self.param_f32(key).unwrap_or(default)
    }
}

/// Default display colour for a part type
pub fn default_color_for(part_type: &str) -> &'static str {
    match part_type {
        "gear" | "helical_gear" => "#FFD700",
        "bearing" => "#C0C0C0",
        "bolt" | "nut" => "#404040",
        "shaft" => "#808080",
        "housing" => "#4169E1",
        "plate" => "#228B22",
        _ => DEFAULT_PART_COLOR,
    }
}

/// Build a parameter map from `(key, number)` pairs
pub fn params<const N: usize>(entries: [(&str, f64); N]) -> Parameters {
    entries
        .into_iter()
        .map(|(key, value)| (key.to_string(), Value::from(value)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_colors() {
        assert_eq!(default_color_for("gear"), "#FFD700");
        assert_eq!(default_color_for("helical_gear"), "#FFD700");
        assert_eq!(default_color_for("housing"), "#4169E1");
        assert_eq!(default_color_for("spring"), DEFAULT_PART_COLOR);
    }

    #[test]
    fn test_numeric_params() {
        let mut p = params([("teeth", 24.0), ("pitch_diameter", 48.0)]);
        p.insert("material".into(), Value::from("steel"));
        let part = Part::new(PartId::new(1), "Gear", "gear", p);
        assert_eq!(part.param_f32("pitch_diameter"), Some(48.0));
        assert_eq!(part.param_f32("material"), None);
        assert_eq!(part.param_or("module", 2.0), 2.0);
        assert_eq!(part.color, "#FFD700");
    }

    #[test]
    fn test_document_field_names() {
        let part = Part::new(PartId::new(3), "Shaft", "shaft", Parameters::new());
        let value = serde_json::to_value(&part).unwrap();
        assert_eq!(value["id"], "part_3");
        assert_eq!(value["type"], "shaft");
        assert_eq!(value["visible"], true);
        assert!(value["stl_path"].is_null());
        assert_eq!(value["transform"]["rz"], 0.0);
    }
}
