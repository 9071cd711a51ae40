use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use binding::{ShaderOptions, TimeUniform};
use serde::Deserialize;
use serde_json::{Map, Value};

/// On-disk description of a tweakable shader, e.g.
///
/// ```toml
/// name = "shader-material"
/// vertex = "shader.vert"
/// fragment = "shader.frag"
///
/// [time_uniform]
/// name = "uTime"
///
/// [material]
/// needAlphaBlending = true
/// ```
///
/// Shader paths are resolved relative to the project file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectFile {
    pub name: String,
    pub vertex: PathBuf,
    pub fragment: PathBuf,
    #[serde(default)]
    pub time_uniform: Option<TimeUniform>,
    #[serde(default)]
    pub material: toml::Table,
}

#[derive(Debug, Clone)]
pub struct LoadedProject {
    pub name: String,
    pub fragment_path: PathBuf,
    pub options: ShaderOptions,
}

impl ProjectFile {
    pub fn load(path: &Path) -> Result<LoadedProject> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read project file at {}", path.display()))?;
        let project: ProjectFile = toml::from_str(&contents)
            .with_context(|| format!("failed to parse project file at {}", path.display()))?;
        if project.name.trim().is_empty() {
            bail!("project name in {} must not be empty", path.display());
        }

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        let vertex_path = base.join(&project.vertex);
        let fragment_path = base.join(&project.fragment);
        let vertex = fs::read_to_string(&vertex_path).with_context(|| {
            format!("failed to read vertex shader at {}", vertex_path.display())
        })?;
        let fragment = fs::read_to_string(&fragment_path).with_context(|| {
            format!(
                "failed to read fragment shader at {}",
                fragment_path.display()
            )
        })?;

        let material = material_options(project.material)
            .with_context(|| format!("invalid [material] table in {}", path.display()))?;

        Ok(LoadedProject {
            name: project.name,
            fragment_path,
            options: ShaderOptions {
                vertex_shader: Some(vertex),
                fragment_shader: Some(fragment),
                time_uniform: project.time_uniform,
                uniforms: None,
                material,
            },
        })
    }
}

fn material_options(table: toml::Table) -> Result<Map<String, Value>> {
    match serde_json::to_value(table)? {
        Value::Object(map) => Ok(map),
        _ => bail!("expected a table"),
    }
}
