use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Construction options for a tweakable shader.
///
/// Keys other than the shader sources, `timeUniform` and `uniforms` are kept
/// in `material` and handed to the engine unchanged (e.g. `needAlphaBlending`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ShaderOptions {
    pub vertex_shader: Option<String>,
    pub fragment_shader: Option<String>,
    pub time_uniform: Option<TimeUniform>,
    /// Ignored: the uniform list is always derived from the shader.
    pub uniforms: Option<Vec<String>>,
    #[serde(flatten)]
    pub material: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeUniform {
    pub name: String,
}

impl ShaderOptions {
    pub fn new(vertex_shader: impl Into<String>, fragment_shader: impl Into<String>) -> Self {
        Self {
            vertex_shader: Some(vertex_shader.into()),
            fragment_shader: Some(fragment_shader.into()),
            ..Self::default()
        }
    }

    pub fn with_time_uniform(mut self, name: impl Into<String>) -> Self {
        self.time_uniform = Some(TimeUniform { name: name.into() });
        self
    }

    pub fn with_material_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.material.insert(key.into(), value.into());
        self
    }

    /// Name of the frame-counter uniform, if one with a non-empty name is set.
    pub fn time_uniform_name(&self) -> Option<&str> {
        self.time_uniform
            .as_ref()
            .map(|time| time.name.trim())
            .filter(|name| !name.is_empty())
    }
}
