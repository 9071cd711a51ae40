//! Binds annotated shader uniforms to a live parameter panel.
//!
//! [`ShaderBinding::build`] reads the `ts(...)` annotations from a fragment
//! shader, registers the program with a [`RenderEngine`], creates one panel
//! control per annotated uniform and keeps the panel, a local value cache and
//! the engine's uniform slots in step on every edit. An optional frame
//! counter uniform is advanced once per rendered frame.
//!
//! Everything runs on the rendering thread: shared state lives in
//! `Rc<RefCell<_>>`, so bindings are neither `Send` nor `Sync`.
mod controller;
mod engine;
pub mod headless;
mod options;
mod panel;
mod value;

pub use controller::{
    BindingError, BuiltShader, ShaderBinding, ShaderStage, UniformValue, ValueSource,
    DEFAULT_UNIFORMS,
};
pub use engine::{
    EngineError, FrameHook, MaterialDescriptor, MaterialHandle, ProgramHandle, ProgramId,
    RenderEngine, SceneId, UniformTarget,
};
pub use headless::{HeadlessEngine, MemoryPanel};
pub use options::{ShaderOptions, TimeUniform};
pub use panel::{
    ChangeEvent, ChangeListener, ControlId, ControlSpec, GuiPanel, PanelError, SectionId,
};
pub use value::{round_half_up, ControlValue, TweakKind, UniformWrite};
