//! In-memory implementations of [`RenderEngine`] and [`GuiPanel`].
//!
//! `HeadlessEngine` records programs, materials and every uniform write, and
//! runs frame hooks on demand. `MemoryPanel` keeps controls and their current
//! values and lets callers play the part of the user through
//! [`MemoryPanel::edit`]. The CLI simulation and the tests drive bindings
//! through these.
use std::collections::{HashMap, HashSet};

use crate::engine::{
    EngineError, FrameHook, MaterialDescriptor, MaterialHandle, ProgramHandle, ProgramId,
    RenderEngine, SceneId, UniformTarget,
};
use crate::panel::{
    ChangeEvent, ChangeListener, ControlId, ControlSpec, GuiPanel, PanelError, SectionId,
};
use crate::value::{ControlValue, UniformWrite};

#[derive(Debug, Clone, PartialEq)]
pub struct ProgramRecord {
    pub id: ProgramId,
    pub vertex: String,
    pub fragment: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MaterialRecord {
    pub name: String,
    pub scene: SceneId,
    pub program: ProgramHandle,
    pub descriptor: MaterialDescriptor,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UniformRecord {
    pub material: MaterialHandle,
    pub name: String,
    pub value: UniformWrite,
}

#[derive(Debug, Default)]
struct UniformTable {
    values: HashMap<(MaterialHandle, String), UniformWrite>,
    log: Vec<UniformRecord>,
}

impl UniformTable {
    fn write(&mut self, material: MaterialHandle, name: &str, value: UniformWrite) {
        self.values.insert((material, name.to_string()), value);
        self.log.push(UniformRecord {
            material,
            name: name.to_string(),
            value,
        });
    }
}

impl UniformTarget for UniformTable {
    fn set_bool(&mut self, material: MaterialHandle, name: &str, value: bool) {
        self.write(material, name, UniformWrite::Bool(value));
    }

    fn set_int(&mut self, material: MaterialHandle, name: &str, value: i32) {
        self.write(material, name, UniformWrite::Int(value));
    }

    fn set_float(&mut self, material: MaterialHandle, name: &str, value: f32) {
        self.write(material, name, UniformWrite::Float(value));
    }

    fn set_vec2(&mut self, material: MaterialHandle, name: &str, value: [f32; 2]) {
        self.write(material, name, UniformWrite::Vec2(value));
    }

    fn set_vec3(&mut self, material: MaterialHandle, name: &str, value: [f32; 3]) {
        self.write(material, name, UniformWrite::Vec3(value));
    }

    fn set_color3(&mut self, material: MaterialHandle, name: &str, value: [f32; 3]) {
        self.write(material, name, UniformWrite::Color3(value));
    }
}

/// Render engine that draws nothing and remembers everything.
#[derive(Default)]
pub struct HeadlessEngine {
    next_handle: u64,
    registered: HashSet<ProgramId>,
    programs: HashMap<ProgramHandle, ProgramRecord>,
    materials: HashMap<MaterialHandle, MaterialRecord>,
    table: UniformTable,
    hooks: Vec<(SceneId, FrameHook)>,
    frames: HashMap<SceneId, u64>,
}

impl HeadlessEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_handle(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    /// Runs every before-render hook registered for `scene` once.
    pub fn render_frame(&mut self, scene: SceneId) {
        for (hook_scene, hook) in self.hooks.iter_mut() {
            if *hook_scene == scene {
                hook(&mut self.table as &mut dyn UniformTarget);
            }
        }
        *self.frames.entry(scene).or_insert(0) += 1;
    }

    pub fn frames_rendered(&self, scene: SceneId) -> u64 {
        self.frames.get(&scene).copied().unwrap_or(0)
    }

    pub fn uniform(&self, material: MaterialHandle, name: &str) -> Option<UniformWrite> {
        self.table
            .values
            .get(&(material, name.to_string()))
            .copied()
    }

    /// Every write in the order the engine received it.
    pub fn writes(&self) -> &[UniformRecord] {
        &self.table.log
    }

    pub fn writes_to(&self, material: MaterialHandle, name: &str) -> Vec<UniformWrite> {
        self.table
            .log
            .iter()
            .filter(|record| record.material == material && record.name == name)
            .map(|record| record.value)
            .collect()
    }

    pub fn program(&self, handle: ProgramHandle) -> Option<&ProgramRecord> {
        self.programs.get(&handle)
    }

    pub fn program_count(&self) -> usize {
        self.programs.len()
    }

    pub fn material(&self, handle: MaterialHandle) -> Option<&MaterialRecord> {
        self.materials.get(&handle)
    }

    pub fn hook_count(&self, scene: SceneId) -> usize {
        self.hooks.iter().filter(|(s, _)| *s == scene).count()
    }
}

impl UniformTarget for HeadlessEngine {
    fn set_bool(&mut self, material: MaterialHandle, name: &str, value: bool) {
        self.table.set_bool(material, name, value);
    }

    fn set_int(&mut self, material: MaterialHandle, name: &str, value: i32) {
        self.table.set_int(material, name, value);
    }

    fn set_float(&mut self, material: MaterialHandle, name: &str, value: f32) {
        self.table.set_float(material, name, value);
    }

    fn set_vec2(&mut self, material: MaterialHandle, name: &str, value: [f32; 2]) {
        self.table.set_vec2(material, name, value);
    }

    fn set_vec3(&mut self, material: MaterialHandle, name: &str, value: [f32; 3]) {
        self.table.set_vec3(material, name, value);
    }

    fn set_color3(&mut self, material: MaterialHandle, name: &str, value: [f32; 3]) {
        self.table.set_color3(material, name, value);
    }
}

impl RenderEngine for HeadlessEngine {
    fn register_program(
        &mut self,
        id: &ProgramId,
        vertex: &str,
        fragment: &str,
    ) -> Result<ProgramHandle, EngineError> {
        if !self.registered.insert(id.clone()) {
            return Err(EngineError::ProgramExists(id.to_string()));
        }
        let handle = ProgramHandle(self.next_handle());
        self.programs.insert(
            handle,
            ProgramRecord {
                id: id.clone(),
                vertex: vertex.to_string(),
                fragment: fragment.to_string(),
            },
        );
        Ok(handle)
    }

    fn create_material(
        &mut self,
        name: &str,
        scene: SceneId,
        program: ProgramHandle,
        descriptor: MaterialDescriptor,
    ) -> Result<MaterialHandle, EngineError> {
        if !self.programs.contains_key(&program) {
            return Err(EngineError::UnknownProgram(program));
        }
        let handle = MaterialHandle(self.next_handle());
        self.materials.insert(
            handle,
            MaterialRecord {
                name: name.to_string(),
                scene,
                program,
                descriptor,
            },
        );
        Ok(handle)
    }

    fn on_before_render(&mut self, scene: SceneId, hook: FrameHook) {
        self.hooks.push((scene, hook));
    }
}

struct SectionRecord {
    id: SectionId,
    title: String,
    controls: Vec<ControlId>,
}

struct ControlRecord {
    section: SectionId,
    spec: ControlSpec,
    value: ControlValue,
    listeners: Vec<ChangeListener>,
}

/// Parameter panel kept entirely in memory.
#[derive(Default)]
pub struct MemoryPanel {
    next_id: u64,
    sections: Vec<SectionRecord>,
    controls: HashMap<ControlId, ControlRecord>,
    disposed: bool,
}

impl MemoryPanel {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Sets a control's value as a user would and notifies its listeners.
    pub fn edit(&mut self, control: ControlId, value: ControlValue) -> Result<(), PanelError> {
        if self.disposed {
            return Err(PanelError::Disposed);
        }
        let record = self
            .controls
            .get_mut(&control)
            .ok_or(PanelError::UnknownControl(control))?;
        if !record.spec.kind.accepts(&value) {
            return Err(PanelError::InvalidBinding {
                key: record.spec.key.clone(),
                reason: format!("{value:?} is not a {} value", record.spec.kind),
            });
        }

        record.value = value.clone();
        let event = ChangeEvent {
            control,
            key: record.spec.key.clone(),
            value,
        };
        for listener in record.listeners.iter_mut() {
            listener(&event);
        }
        Ok(())
    }

    /// First live control bound to `key` in a section titled `title`.
    pub fn find(&self, title: &str, key: &str) -> Option<ControlId> {
        self.sections
            .iter()
            .filter(|section| section.title == title)
            .flat_map(|section| section.controls.iter())
            .copied()
            .find(|id| {
                self.controls
                    .get(id)
                    .is_some_and(|record| record.spec.key == key)
            })
    }

    pub fn spec(&self, control: ControlId) -> Option<&ControlSpec> {
        self.controls.get(&control).map(|record| &record.spec)
    }

    pub fn value(&self, control: ControlId) -> Option<&ControlValue> {
        self.controls.get(&control).map(|record| &record.value)
    }

    pub fn section_of(&self, control: ControlId) -> Option<SectionId> {
        self.controls.get(&control).map(|record| record.section)
    }

    pub fn section_titles(&self) -> Vec<&str> {
        self.sections
            .iter()
            .map(|section| section.title.as_str())
            .collect()
    }

    /// Live controls of a section, in creation order.
    pub fn controls_in(&self, section: SectionId) -> Vec<ControlId> {
        self.sections
            .iter()
            .find(|record| record.id == section)
            .map(|record| record.controls.clone())
            .unwrap_or_default()
    }

    pub fn control_count(&self) -> usize {
        self.controls.len()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}

impl GuiPanel for MemoryPanel {
    fn add_section(&mut self, title: &str) -> Result<SectionId, PanelError> {
        if self.disposed {
            return Err(PanelError::Disposed);
        }
        let id = SectionId(self.next_id());
        self.sections.push(SectionRecord {
            id,
            title: title.to_string(),
            controls: Vec::new(),
        });
        Ok(id)
    }

    fn add_control(
        &mut self,
        section: SectionId,
        spec: ControlSpec,
    ) -> Result<ControlId, PanelError> {
        if self.disposed {
            return Err(PanelError::Disposed);
        }
        if !self.sections.iter().any(|record| record.id == section) {
            return Err(PanelError::UnknownSection(section));
        }
        if !spec.kind.accepts(&spec.initial) {
            return Err(PanelError::InvalidBinding {
                key: spec.key.clone(),
                reason: format!("initial value {:?} is not a {} value", spec.initial, spec.kind),
            });
        }

        let id = ControlId(self.next_id());
        if let Some(record) = self.sections.iter_mut().find(|record| record.id == section) {
            record.controls.push(id);
        }
        self.controls.insert(
            id,
            ControlRecord {
                section,
                value: spec.initial.clone(),
                spec,
                listeners: Vec::new(),
            },
        );
        Ok(id)
    }

    fn on_change(&mut self, control: ControlId, listener: ChangeListener) -> Result<(), PanelError> {
        let record = self
            .controls
            .get_mut(&control)
            .ok_or(PanelError::UnknownControl(control))?;
        record.listeners.push(listener);
        Ok(())
    }

    fn dispose_section(&mut self, section: SectionId) {
        let Some(index) = self.sections.iter().position(|record| record.id == section) else {
            return;
        };
        let record = self.sections.remove(index);
        for control in record.controls {
            self.controls.remove(&control);
        }
    }

    fn dispose(&mut self) {
        self.sections.clear();
        self.controls.clear();
        self.disposed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::TweakKind;
    use serde_json::Map;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn scalar(key: &str, initial: f64) -> ControlSpec {
        ControlSpec {
            key: key.into(),
            kind: TweakKind::Scalar,
            initial: ControlValue::Float(initial),
            params: Map::new(),
        }
    }

    #[test]
    fn duplicate_program_ids_are_rejected() {
        let mut engine = HeadlessEngine::new();
        let id = ProgramId::unique("dup");
        engine.register_program(&id, "v", "f").unwrap();
        assert!(matches!(
            engine.register_program(&id, "v", "f"),
            Err(EngineError::ProgramExists(_))
        ));
    }

    #[test]
    fn hooks_only_run_for_their_scene() {
        let mut engine = HeadlessEngine::new();
        let calls = Rc::new(RefCell::new(0));
        let seen = Rc::clone(&calls);
        engine.on_before_render(
            SceneId(1),
            Box::new(move |_target: &mut dyn UniformTarget| *seen.borrow_mut() += 1),
        );
        engine.render_frame(SceneId(2));
        engine.render_frame(SceneId(1));
        assert_eq!(*calls.borrow(), 1);
        assert_eq!(engine.frames_rendered(SceneId(1)), 1);
    }

    #[test]
    fn edit_notifies_listeners_with_key_and_value() {
        let mut panel = MemoryPanel::new();
        let section = panel.add_section("demo").unwrap();
        let control = panel.add_control(section, scalar("gain", 0.0)).unwrap();
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        panel
            .on_change(
                control,
                Box::new(move |event: &ChangeEvent| sink.borrow_mut().push(event.clone())),
            )
            .unwrap();

        panel.edit(control, ControlValue::Float(0.25)).unwrap();
        assert_eq!(panel.value(control), Some(&ControlValue::Float(0.25)));
        let events = events.borrow();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].key, "gain");
    }

    #[test]
    fn rejects_control_with_mismatched_initial_value() {
        let mut panel = MemoryPanel::new();
        let section = panel.add_section("demo").unwrap();
        let mut spec = scalar("gain", 0.0);
        spec.initial = ControlValue::Bool(true);
        assert!(matches!(
            panel.add_control(section, spec),
            Err(PanelError::InvalidBinding { .. })
        ));
    }

    #[test]
    fn disposing_a_section_keeps_the_others() {
        let mut panel = MemoryPanel::new();
        let a = panel.add_section("a").unwrap();
        let b = panel.add_section("b").unwrap();
        let in_a = panel.add_control(a, scalar("x", 0.0)).unwrap();
        let in_b = panel.add_control(b, scalar("x", 0.0)).unwrap();

        panel.dispose_section(a);
        assert!(matches!(
            panel.edit(in_a, ControlValue::Float(1.0)),
            Err(PanelError::UnknownControl(_))
        ));
        assert!(panel.edit(in_b, ControlValue::Float(1.0)).is_ok());
        assert_eq!(panel.find("b", "x"), Some(in_b));

        panel.dispose();
        assert!(matches!(
            panel.add_section("c"),
            Err(PanelError::Disposed)
        ));
    }
}
