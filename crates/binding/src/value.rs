//! The value model shared by the panel, the local cache and the engine.
//!
//! Every annotated uniform resolves to exactly one [`TweakKind`]. The kind
//! owns the three conversions the binding needs (initial control value,
//! control configuration, and control value to engine write), so the panel,
//! the cache and the engine cannot disagree about how a kind is represented.
use std::fmt;

use annotations::{ParsedConfig, UniformDeclaration, UniformKind};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Value as it is written into an engine uniform slot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum UniformWrite {
    Bool(bool),
    Int(i32),
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Color3([f32; 3]),
}

impl fmt::Display for UniformWrite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Vec2([x, y]) => write!(f, "({x}, {y})"),
            Self::Vec3([x, y, z]) => write!(f, "({x}, {y}, {z})"),
            Self::Color3([r, g, b]) => write!(f, "rgb({r}, {g}, {b})"),
        }
    }
}

/// Value as it is shown and edited in a panel control.
///
/// Colors use 0-255 channels; `a` is carried for the picker but never written
/// to the uniform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ControlValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Color {
        r: f64,
        g: f64,
        b: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        a: Option<f64>,
    },
    Vec3 {
        x: f64,
        y: f64,
        z: f64,
    },
    Vec2 {
        x: f64,
        y: f64,
    },
}

/// How an annotated uniform is edited and written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TweakKind {
    Toggle,
    Integer,
    Scalar,
    Point2,
    Point3,
    Color,
}

impl TweakKind {
    /// `vec3` declarations whose value carries `r`, `g` and `b` become colors;
    /// every other type maps one to one.
    pub fn resolve(declaration: &UniformDeclaration) -> Self {
        match declaration.kind {
            UniformKind::Bool => Self::Toggle,
            UniformKind::Int => Self::Integer,
            UniformKind::Float => Self::Scalar,
            UniformKind::Vec2 => Self::Point2,
            UniformKind::Vec3 if is_color_shaped(declaration.config.value()) => Self::Color,
            UniformKind::Vec3 => Self::Point3,
        }
    }

    pub fn uniform_kind(self) -> UniformKind {
        match self {
            Self::Toggle => UniformKind::Bool,
            Self::Integer => UniformKind::Int,
            Self::Scalar => UniformKind::Float,
            Self::Point2 => UniformKind::Vec2,
            Self::Point3 | Self::Color => UniformKind::Vec3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Toggle => "toggle",
            Self::Integer => "integer",
            Self::Scalar => "scalar",
            Self::Point2 => "point2",
            Self::Point3 => "point3",
            Self::Color => "color",
        }
    }

    /// Converts an edited control value into the engine write for this kind.
    ///
    /// Returns `None` when the value does not have this kind's shape.
    pub fn to_write(self, value: &ControlValue) -> Option<UniformWrite> {
        let write = match (self, value) {
            (Self::Toggle, ControlValue::Bool(v)) => UniformWrite::Bool(*v),
            (Self::Integer, ControlValue::Int(v)) => UniformWrite::Int(saturate_i32(*v)),
            (Self::Integer, ControlValue::Float(v)) => {
                UniformWrite::Int(saturate_i32(round_half_up(*v) as i64))
            }
            (Self::Scalar, ControlValue::Float(v)) => UniformWrite::Float(*v as f32),
            (Self::Scalar, ControlValue::Int(v)) => UniformWrite::Float(*v as f32),
            (Self::Point2, ControlValue::Vec2 { x, y }) => {
                UniformWrite::Vec2([*x as f32, *y as f32])
            }
            (Self::Point3, ControlValue::Vec3 { x, y, z }) => {
                UniformWrite::Vec3([*x as f32, *y as f32, *z as f32])
            }
            (Self::Color, ControlValue::Color { r, g, b, .. }) => UniformWrite::Color3([
                (*r / 255.0) as f32,
                (*g / 255.0) as f32,
                (*b / 255.0) as f32,
            ]),
            _ => return None,
        };
        Some(write)
    }

    pub fn accepts(self, value: &ControlValue) -> bool {
        self.to_write(value).is_some()
    }

    /// Reads a hand-written literal as a control value of this kind.
    pub fn value_from_json(self, value: &Value) -> Option<ControlValue> {
        match self {
            Self::Toggle => value.as_bool().map(ControlValue::Bool),
            Self::Integer => value
                .as_f64()
                .map(|v| ControlValue::Int(round_half_up(v) as i64)),
            Self::Scalar => value.as_f64().map(ControlValue::Float),
            Self::Point2 => Some(ControlValue::Vec2 {
                x: component(value, "x")?,
                y: component(value, "y")?,
            }),
            Self::Point3 => Some(ControlValue::Vec3 {
                x: component(value, "x")?,
                y: component(value, "y")?,
                z: component(value, "z")?,
            }),
            Self::Color => Some(ControlValue::Color {
                r: component(value, "r")?,
                g: component(value, "g")?,
                b: component(value, "b")?,
                a: value.get("a").and_then(Value::as_f64),
            }),
        }
    }

    /// Initial control value for an annotation's `value` attribute.
    ///
    /// Toggles follow truthiness; an absent or ill-shaped value falls back to
    /// zero for the kind.
    pub fn initial_value(self, config: &ParsedConfig) -> ControlValue {
        if self == Self::Toggle {
            return ControlValue::Bool(config.value().is_some_and(is_truthy));
        }
        match config.value() {
            Some(raw) => self.value_from_json(raw).unwrap_or_else(|| {
                tracing::warn!(
                    kind = self.as_str(),
                    value = %raw,
                    "annotation value does not match uniform type; using zero"
                );
                self.zero()
            }),
            None => self.zero(),
        }
    }

    /// Control configuration: the annotation attributes minus `value`, with
    /// integer steps rounded and defaulted to 1.
    pub fn control_params(self, config: &ParsedConfig) -> Map<String, Value> {
        let mut params = config.control_params();
        if self == Self::Integer {
            let step = round_half_up(config.step().unwrap_or(1.0)) as i64;
            params.insert("step".into(), Value::from(step));
        }
        params
    }

    fn zero(self) -> ControlValue {
        match self {
            Self::Toggle => ControlValue::Bool(false),
            Self::Integer => ControlValue::Int(0),
            Self::Scalar => ControlValue::Float(0.0),
            Self::Point2 => ControlValue::Vec2 { x: 0.0, y: 0.0 },
            Self::Point3 => ControlValue::Vec3 {
                x: 0.0,
                y: 0.0,
                z: 0.0,
            },
            Self::Color => ControlValue::Color {
                r: 0.0,
                g: 0.0,
                b: 0.0,
                a: None,
            },
        }
    }
}

impl fmt::Display for TweakKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rounds half-way cases towards positive infinity (`2.5 -> 3`, `-2.5 -> -2`).
pub fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

fn saturate_i32(value: i64) -> i32 {
    value.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

fn component(value: &Value, key: &str) -> Option<f64> {
    value.get(key).and_then(Value::as_f64)
}

fn is_color_shaped(value: Option<&Value>) -> bool {
    value.is_some_and(|v| ["r", "g", "b"].iter().all(|key| component(v, key).is_some()))
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(v) => *v,
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0 && !v.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
