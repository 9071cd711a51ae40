//! Capabilities the binding needs from a rendering engine.
//!
//! The engine compiles a vertex/fragment pair, wraps it in a material that
//! exposes a fixed list of uniform names, accepts typed uniform writes, and
//! calls registered hooks once before each frame of a scene.
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::{Map, Value};
use thiserror::Error;

use crate::value::UniformWrite;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SceneId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialHandle(pub u64);

/// Registration key for a shader program.
///
/// Each binding instance gets its own id, so several instances can hold
/// programs at the same time without overwriting each other.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProgramId(String);

impl ProgramId {
    pub fn unique(instance: &str) -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        let n = NEXT.fetch_add(1, Ordering::Relaxed);
        Self(format!("{instance}#{n}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Uniform list and pass-through options for material creation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaterialDescriptor {
    pub uniforms: Vec<String>,
    pub options: Map<String, Value>,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("program '{0}' is already registered")]
    ProgramExists(String),
    #[error("unknown program handle {0:?}")]
    UnknownProgram(ProgramHandle),
    #[error("{0}")]
    Backend(String),
}

/// Typed uniform writes against a material.
pub trait UniformTarget {
    fn set_bool(&mut self, material: MaterialHandle, name: &str, value: bool);
    fn set_int(&mut self, material: MaterialHandle, name: &str, value: i32);
    fn set_float(&mut self, material: MaterialHandle, name: &str, value: f32);
    fn set_vec2(&mut self, material: MaterialHandle, name: &str, value: [f32; 2]);
    fn set_vec3(&mut self, material: MaterialHandle, name: &str, value: [f32; 3]);
    fn set_color3(&mut self, material: MaterialHandle, name: &str, value: [f32; 3]);

    /// Dispatches a write to the matching typed setter.
    fn apply(&mut self, material: MaterialHandle, name: &str, write: &UniformWrite) {
        match *write {
            UniformWrite::Bool(v) => self.set_bool(material, name, v),
            UniformWrite::Int(v) => self.set_int(material, name, v),
            UniformWrite::Float(v) => self.set_float(material, name, v),
            UniformWrite::Vec2(v) => self.set_vec2(material, name, v),
            UniformWrite::Vec3(v) => self.set_vec3(material, name, v),
            UniformWrite::Color3(v) => self.set_color3(material, name, v),
        }
    }
}

/// Called once per rendered frame with the engine's uniform table.
pub type FrameHook = Box<dyn FnMut(&mut dyn UniformTarget)>;

pub trait RenderEngine: UniformTarget {
    fn register_program(
        &mut self,
        id: &ProgramId,
        vertex: &str,
        fragment: &str,
    ) -> Result<ProgramHandle, EngineError>;

    fn create_material(
        &mut self,
        name: &str,
        scene: SceneId,
        program: ProgramHandle,
        descriptor: MaterialDescriptor,
    ) -> Result<MaterialHandle, EngineError>;

    /// Registers a hook that runs before every frame of `scene` for as long as
    /// the engine keeps the scene alive.
    fn on_before_render(&mut self, scene: SceneId, hook: FrameHook);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn program_ids_are_unique_per_call() {
        let a = ProgramId::unique("shader");
        let b = ProgramId::unique("shader");
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("shader#"));
    }
}
