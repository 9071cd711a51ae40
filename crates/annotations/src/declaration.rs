use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// GLSL type tokens that may carry a `// ts(...)` annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UniformKind {
    Bool,
    Int,
    Float,
    Vec2,
    Vec3,
}

impl UniformKind {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "bool" => Some(Self::Bool),
            "int" => Some(Self::Int),
            "float" => Some(Self::Float),
            "vec2" => Some(Self::Vec2),
            "vec3" => Some(Self::Vec3),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Vec2 => "vec2",
            Self::Vec3 => "vec3",
        }
    }
}

impl fmt::Display for UniformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attribute map parsed from an annotation literal.
///
/// Only `value`, `min`, `max` and `step` carry meaning here; every other key
/// is forwarded untouched to the control configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParsedConfig(Map<String, Value>);

impl ParsedConfig {
    pub fn new(attributes: Map<String, Value>) -> Self {
        Self(attributes)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn value(&self) -> Option<&Value> {
        self.get("value")
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }

    pub fn min(&self) -> Option<f64> {
        self.number("min")
    }

    pub fn max(&self) -> Option<f64> {
        self.number("max")
    }

    pub fn step(&self) -> Option<f64> {
        self.number("step")
    }

    /// Every attribute except `value`.
    pub fn control_params(&self) -> Map<String, Value> {
        self.0
            .iter()
            .filter(|(key, _)| key.as_str() != "value")
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One annotated uniform, in source order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniformDeclaration {
    #[serde(rename = "type")]
    pub kind: UniformKind,
    pub name: String,
    pub config: ParsedConfig,
    /// 1-based line in the fragment source.
    pub line: usize,
}
