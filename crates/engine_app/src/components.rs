//! Component types used by the demo scene.

use engine_component::ComponentData;
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// World-space position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub value: Vec3,
}

impl ComponentData for Position {
    fn component_name() -> &'static str {
        "position"
    }
}

/// Linear velocity in world units per second.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    pub linear: Vec3,
}

impl ComponentData for Velocity {
    fn component_name() -> &'static str {
        "velocity"
    }
}

/// Time left before the entity stops moving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lifetime {
    pub remaining_ms: u64,
}

impl ComponentData for Lifetime {
    fn component_name() -> &'static str {
        "lifetime"
    }
}

#[cfg(test)]
mod tests {
    use engine_component::Component;

    use super::*;

    #[test]
    fn test_vec3_fields_survive_component_conversion() {
        let pos = Position {
            value: Vec3::new(1.0, -2.0, 3.5),
        };
        let component = Component::from_value(&pos).unwrap();
        assert!(component.get("value").is_some());
        let back: Position = component.to_value().unwrap();
        assert_eq!(back, pos);
    }
}
