//! Wires annotated uniforms to panel controls and engine uniform slots.
//!
//! Types:
//!
//! - `ShaderBinding` owns one instance's panel section, local value cache and
//!   material, and exposes teardown via `dispose`.
//! - `BuiltShader` pairs the material handle callers attach to renderables
//!   with the binding that controls it.
//! - `UniformValue` is a cache entry mirroring what was last written to the
//!   engine for one uniform.
//!
//! Functions:
//!
//! - `ShaderBinding::build` extracts declarations, registers the program and
//!   material, creates one control per declaration, pushes initial values,
//!   installs the optional frame-counter hook and attaches change listeners.
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

use annotations::{extract, ExtractError, UniformDeclaration};
use thiserror::Error;

use crate::engine::{
    EngineError, FrameHook, MaterialDescriptor, MaterialHandle, ProgramId, RenderEngine, SceneId,
    UniformTarget,
};
use crate::options::ShaderOptions;
use crate::panel::{ChangeEvent, ControlId, ControlSpec, GuiPanel, SectionId};
use crate::value::{TweakKind, UniformWrite};

/// Transform uniforms every material exposes regardless of annotations.
pub const DEFAULT_UNIFORMS: [&str; 5] = [
    "world",
    "worldView",
    "worldViewProjection",
    "view",
    "projection",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

#[derive(Debug, Error)]
pub enum BindingError {
    #[error("missing {0} shader source")]
    MissingShaderSource(ShaderStage),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("uniform '{0}' collides with another uniform of the material")]
    DuplicateUniform(String),

    #[error("render engine rejected shader '{name}': {source}")]
    Engine {
        name: String,
        #[source]
        source: EngineError,
    },
}

/// Where a cached uniform's value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    Control(TweakKind),
    FrameCounter,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UniformValue {
    pub name: String,
    pub source: ValueSource,
    pub current: UniformWrite,
}

#[derive(Debug, Default)]
struct UniformCache {
    order: Vec<String>,
    entries: HashMap<String, UniformValue>,
}

impl UniformCache {
    fn insert(&mut self, entry: UniformValue) {
        if !self.entries.contains_key(&entry.name) {
            self.order.push(entry.name.clone());
        }
        self.entries.insert(entry.name.clone(), entry);
    }

    fn get(&self, name: &str) -> Option<&UniformValue> {
        self.entries.get(name)
    }

    fn get_mut(&mut self, name: &str) -> Option<&mut UniformValue> {
        self.entries.get_mut(name)
    }

    fn values(&self) -> Vec<UniformValue> {
        self.order
            .iter()
            .filter_map(|name| self.entries.get(name).cloned())
            .collect()
    }
}

type SharedCache = Rc<RefCell<UniformCache>>;

pub struct BuiltShader {
    pub material: MaterialHandle,
    pub binding: ShaderBinding,
}

pub struct ShaderBinding {
    name: String,
    program: ProgramId,
    material: MaterialHandle,
    uniforms: Vec<String>,
    declarations: Vec<UniformDeclaration>,
    section: Option<SectionId>,
    controls: Vec<(String, ControlId)>,
    cache: SharedCache,
    panel: Rc<RefCell<dyn GuiPanel>>,
    section_disposed: bool,
    panel_disposed: bool,
}

impl ShaderBinding {
    /// Builds a tweakable shader instance.
    ///
    /// Declaration errors and engine registration failures abort before any
    /// control exists. A control the panel refuses to create is logged and
    /// skipped; its uniform is still written.
    pub fn build<E, P>(
        name: &str,
        scene: SceneId,
        options: ShaderOptions,
        engine: &Rc<RefCell<E>>,
        panel: &Rc<RefCell<P>>,
    ) -> Result<BuiltShader, BindingError>
    where
        E: RenderEngine + 'static,
        P: GuiPanel + 'static,
    {
        let engine: Rc<RefCell<dyn RenderEngine>> = engine.clone();
        let panel: Rc<RefCell<dyn GuiPanel>> = panel.clone();

        if options.uniforms.is_some() {
            tracing::warn!(shader = %name, "explicit uniform list is ignored; uniforms are derived from the shader");
        }
        let vertex = require_source(options.vertex_shader.as_deref(), ShaderStage::Vertex)?;
        let fragment = require_source(options.fragment_shader.as_deref(), ShaderStage::Fragment)?;
        let time_uniform = options.time_uniform_name().map(str::to_string);

        let declarations = extract(fragment)?;
        let uniforms = uniform_names(&declarations, time_uniform.as_deref())?;

        let program = ProgramId::unique(name);
        let material = {
            let mut engine = engine.borrow_mut();
            let handle = engine
                .register_program(&program, vertex, fragment)
                .map_err(|source| BindingError::Engine {
                    name: name.to_string(),
                    source,
                })?;
            engine
                .create_material(
                    name,
                    scene,
                    handle,
                    MaterialDescriptor {
                        uniforms: uniforms.clone(),
                        options: options.material.clone(),
                    },
                )
                .map_err(|source| BindingError::Engine {
                    name: name.to_string(),
                    source,
                })?
        };
        tracing::debug!(shader = %name, program = %program, uniforms = uniforms.len(), "registered shader material");

        let specs: Vec<ControlSpec> = declarations.iter().map(control_spec).collect();

        let (section, controls) = create_controls(name, &specs, &mut *panel.borrow_mut());

        let cache: SharedCache = Rc::default();
        {
            let mut engine = engine.borrow_mut();
            let mut cache = cache.borrow_mut();
            for spec in &specs {
                let Some(write) = spec.kind.to_write(&spec.initial) else {
                    continue;
                };
                engine.apply(material, &spec.key, &write);
                cache.insert(UniformValue {
                    name: spec.key.clone(),
                    source: ValueSource::Control(spec.kind),
                    current: write,
                });
            }
        }

        if let Some(time_name) = time_uniform {
            cache.borrow_mut().insert(UniformValue {
                name: time_name.clone(),
                source: ValueSource::FrameCounter,
                current: UniformWrite::Float(0.0),
            });
            let hook = frame_counter_hook(material, time_name, Rc::clone(&cache));
            engine.borrow_mut().on_before_render(scene, hook);
        }

        {
            let mut panel = panel.borrow_mut();
            for (key, control) in &controls {
                let cache = Rc::clone(&cache);
                let engine = Rc::clone(&engine);
                let shader = name.to_string();
                let listener = Box::new(move |event: &ChangeEvent| {
                    apply_change(&shader, material, &cache, &engine, event)
                });
                if let Err(err) = panel.on_change(*control, listener) {
                    tracing::warn!(shader = %name, uniform = %key, error = %err, "failed to attach change listener");
                }
            }
        }

        tracing::info!(
            shader = %name,
            declared = declarations.len(),
            controls = controls.len(),
            "tweakable shader ready"
        );

        Ok(BuiltShader {
            material,
            binding: ShaderBinding {
                name: name.to_string(),
                program,
                material,
                uniforms,
                declarations,
                section,
                controls,
                cache,
                panel,
                section_disposed: false,
                panel_disposed: false,
            },
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn program(&self) -> &ProgramId {
        &self.program
    }

    pub fn material(&self) -> MaterialHandle {
        self.material
    }

    /// Full uniform list handed to the material, defaults first.
    pub fn uniform_names(&self) -> &[String] {
        &self.uniforms
    }

    pub fn declarations(&self) -> &[UniformDeclaration] {
        &self.declarations
    }

    pub fn section(&self) -> Option<SectionId> {
        self.section
    }

    pub fn controls(&self) -> &[(String, ControlId)] {
        &self.controls
    }

    pub fn control(&self, key: &str) -> Option<ControlId> {
        self.controls
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, id)| *id)
    }

    /// Last value written to the engine for `name`.
    pub fn value(&self, name: &str) -> Option<UniformWrite> {
        self.cache.borrow().get(name).map(|entry| entry.current)
    }

    /// Cache entries in declaration order, frame counter last.
    pub fn values(&self) -> Vec<UniformValue> {
        self.cache.borrow().values()
    }

    /// True once this instance's controls have been torn down.
    pub fn is_disposed(&self) -> bool {
        self.section_disposed || self.panel_disposed
    }

    /// Tears down the GUI: the whole shared panel when `dispose_all` is set,
    /// otherwise only this instance's section.
    ///
    /// Each mode runs at most once per binding, so `dispose(true)` after
    /// `dispose(false)` still disposes the shared panel.
    pub fn dispose(&mut self, dispose_all: bool) {
        if self.panel_disposed || (!dispose_all && self.section_disposed) {
            return;
        }
        let Ok(mut panel) = self.panel.try_borrow_mut() else {
            tracing::error!(shader = %self.name, "panel is busy; dispose skipped");
            return;
        };
        if dispose_all {
            panel.dispose();
            self.panel_disposed = true;
        } else if let Some(section) = self.section {
            panel.dispose_section(section);
        }
        self.section_disposed = true;
        tracing::debug!(shader = %self.name, dispose_all, "disposed shader controls");
    }
}

fn require_source(source: Option<&str>, stage: ShaderStage) -> Result<&str, BindingError> {
    match source {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(BindingError::MissingShaderSource(stage)),
    }
}

/// Default transform uniforms, then declared names, then the time uniform.
fn uniform_names(
    declarations: &[UniformDeclaration],
    time_uniform: Option<&str>,
) -> Result<Vec<String>, BindingError> {
    let mut seen: HashSet<&str> = DEFAULT_UNIFORMS.iter().copied().collect();
    let mut names: Vec<String> = DEFAULT_UNIFORMS.iter().map(|s| s.to_string()).collect();
    let extra = declarations
        .iter()
        .map(|decl| decl.name.as_str())
        .chain(time_uniform);
    for name in extra {
        if !seen.insert(name) {
            return Err(BindingError::DuplicateUniform(name.to_string()));
        }
        names.push(name.to_string());
    }
    Ok(names)
}

fn control_spec(declaration: &UniformDeclaration) -> ControlSpec {
    let kind = TweakKind::resolve(declaration);
    ControlSpec {
        key: declaration.name.clone(),
        kind,
        initial: kind.initial_value(&declaration.config),
        params: kind.control_params(&declaration.config),
    }
}

fn create_controls(
    name: &str,
    specs: &[ControlSpec],
    panel: &mut dyn GuiPanel,
) -> (Option<SectionId>, Vec<(String, ControlId)>) {
    let section = match panel.add_section(name) {
        Ok(section) => section,
        Err(err) => {
            tracing::warn!(shader = %name, error = %err, "failed to create panel section; uniforms will not be editable");
            return (None, Vec::new());
        }
    };

    let mut controls = Vec::with_capacity(specs.len());
    for spec in specs {
        match panel.add_control(section, spec.clone()) {
            Ok(control) => controls.push((spec.key.clone(), control)),
            Err(err) => {
                tracing::warn!(shader = %name, uniform = %spec.key, error = %err, "failed to create control");
            }
        }
    }
    (Some(section), controls)
}

fn frame_counter_hook(material: MaterialHandle, name: String, cache: SharedCache) -> FrameHook {
    let mut frame: u64 = 0;
    Box::new(move |target: &mut dyn UniformTarget| {
        let write = UniformWrite::Float(frame as f32);
        target.apply(material, &name, &write);
        if let Ok(mut cache) = cache.try_borrow_mut() {
            if let Some(entry) = cache.get_mut(&name) {
                entry.current = write;
            }
        }
        frame = frame.wrapping_add(1);
    })
}

fn apply_change(
    shader: &str,
    material: MaterialHandle,
    cache: &RefCell<UniformCache>,
    engine: &RefCell<dyn RenderEngine>,
    event: &ChangeEvent,
) {
    let mut cache = cache.borrow_mut();
    let Some(entry) = cache.get_mut(&event.key) else {
        tracing::debug!(shader, uniform = %event.key, "change for untracked uniform ignored");
        return;
    };
    let ValueSource::Control(kind) = entry.source else {
        tracing::debug!(shader, uniform = %event.key, "frame counter is not editable");
        return;
    };
    let Some(write) = kind.to_write(&event.value) else {
        tracing::warn!(shader, uniform = %event.key, kind = %kind, value = ?event.value, "edited value does not match uniform type");
        return;
    };

    entry.current = write;
    match engine.try_borrow_mut() {
        Ok(mut engine) => engine.apply(material, &event.key, &write),
        Err(_) => {
            tracing::error!(shader, uniform = %event.key, "render engine busy; uniform update dropped")
        }
    }
}
