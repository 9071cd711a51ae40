use std::cell::RefCell;
use std::rc::Rc;

use binding::{
    ChangeListener, ControlId, ControlSpec, ControlValue, GuiPanel, HeadlessEngine, MemoryPanel,
    PanelError, SceneId, SectionId, ShaderBinding, ShaderOptions, TweakKind, UniformWrite,
};

const VERTEX: &str = r#"precision highp float;
attribute vec3 position;
uniform mat4 worldViewProjection;

void main() {
    vec4 p = vec4(position, 1.);
    gl_Position = worldViewProjection * p;
}"#;

const FRAGMENT: &str = r#"precision highp float;
uniform vec3 color; // ts({ value: {r: 0, g: 255, b: 214, a: 0.5} })
uniform float brightness; // ts({ value: 1.0, min: 0, max:1.0, step: 0.1 })
uniform float uTime;
void main() {
    gl_FragColor = vec4(color, brightness * (sin(uTime * 0.05)+1.) - 1.);
}"#;

const SCENE: SceneId = SceneId(7);

fn collaborators() -> (Rc<RefCell<HeadlessEngine>>, Rc<RefCell<MemoryPanel>>) {
    (
        Rc::new(RefCell::new(HeadlessEngine::new())),
        Rc::new(RefCell::new(MemoryPanel::new())),
    )
}

fn demo_options() -> ShaderOptions {
    ShaderOptions::new(VERTEX, FRAGMENT)
        .with_time_uniform("uTime")
        .with_material_option("needAlphaBlending", true)
}

#[test]
fn brightness_control_and_frame_counter() {
    let (engine, panel) = collaborators();
    let built =
        ShaderBinding::build("shader-material", SCENE, demo_options(), &engine, &panel).unwrap();

    let panel_ref = panel.borrow();
    let brightness = panel_ref
        .find("shader-material", "brightness")
        .expect("brightness control");
    let spec = panel_ref.spec(brightness).unwrap();
    assert_eq!(spec.kind, TweakKind::Scalar);
    assert_eq!(spec.initial, ControlValue::Float(1.0));
    assert_eq!(spec.min(), Some(0.0));
    assert_eq!(spec.max(), Some(1.0));
    assert_eq!(spec.step(), Some(0.1));
    assert!(panel_ref.find("shader-material", "uTime").is_none());
    drop(panel_ref);

    for _ in 0..4 {
        engine.borrow_mut().render_frame(SCENE);
    }
    let engine = engine.borrow();
    assert_eq!(
        engine.writes_to(built.material, "uTime"),
        vec![
            UniformWrite::Float(0.0),
            UniformWrite::Float(1.0),
            UniformWrite::Float(2.0),
            UniformWrite::Float(3.0),
        ]
    );
    assert_eq!(built.binding.value("uTime"), Some(UniformWrite::Float(3.0)));
    assert_eq!(
        engine.uniform(built.material, "brightness"),
        Some(UniformWrite::Float(1.0))
    );
}

#[test]
fn color_round_trip_through_panel() {
    let (engine, panel) = collaborators();
    let built =
        ShaderBinding::build("shader-material", SCENE, demo_options(), &engine, &panel).unwrap();

    assert_eq!(
        engine.borrow().uniform(built.material, "color"),
        Some(UniformWrite::Color3([0.0, 1.0, (214.0_f64 / 255.0) as f32]))
    );

    let control = built.binding.control("color").unwrap();
    panel
        .borrow_mut()
        .edit(
            control,
            ControlValue::Color {
                r: 255.0,
                g: 0.0,
                b: 0.0,
                a: None,
            },
        )
        .unwrap();

    assert_eq!(
        engine.borrow().uniform(built.material, "color"),
        Some(UniformWrite::Color3([1.0, 0.0, 0.0]))
    );
    assert_eq!(
        built.binding.value("color"),
        Some(UniformWrite::Color3([1.0, 0.0, 0.0]))
    );
}

#[test]
fn repeated_edits_are_idempotent() {
    let (engine, panel) = collaborators();
    let built =
        ShaderBinding::build("shader-material", SCENE, demo_options(), &engine, &panel).unwrap();
    let control = built.binding.control("brightness").unwrap();
    let controls_before = panel.borrow().control_count();

    for _ in 0..2 {
        panel
            .borrow_mut()
            .edit(control, ControlValue::Float(0.3))
            .unwrap();
    }

    assert_eq!(panel.borrow().control_count(), controls_before);
    assert_eq!(
        engine.borrow().uniform(built.material, "brightness"),
        Some(UniformWrite::Float(0.3))
    );
    assert_eq!(
        built.binding.value("brightness"),
        Some(UniformWrite::Float(0.3))
    );
}

#[test]
fn integer_annotation_rounds_value_and_step() {
    let (engine, panel) = collaborators();
    let fragment = "uniform int octaves; // ts({ value: 3.7, min: 1, max: 8, step: 0.6 })";
    let built = ShaderBinding::build(
        "noise",
        SCENE,
        ShaderOptions::new(VERTEX, fragment),
        &engine,
        &panel,
    )
    .unwrap();

    let control = built.binding.control("octaves").unwrap();
    let panel = panel.borrow();
    let spec = panel.spec(control).unwrap();
    assert_eq!(spec.initial, ControlValue::Int(4));
    assert_eq!(spec.step(), Some(1.0));
    assert_eq!(spec.min(), Some(1.0));
    assert_eq!(
        engine.borrow().uniform(built.material, "octaves"),
        Some(UniformWrite::Int(4))
    );
}

#[test]
fn two_instances_share_a_panel_independently() {
    let (engine, panel) = collaborators();
    let mut first =
        ShaderBinding::build("first", SCENE, demo_options(), &engine, &panel).unwrap();
    let second = ShaderBinding::build(
        "second",
        SCENE,
        ShaderOptions::new(VERTEX, "uniform vec2 offset; // ts({ value: {x: 0.5, y: -1} })"),
        &engine,
        &panel,
    )
    .unwrap();

    assert_ne!(first.binding.program(), second.binding.program());
    assert_ne!(first.material, second.material);
    assert_eq!(panel.borrow().section_titles(), ["first", "second"]);

    first.binding.dispose(false);

    let stale = first.binding.control("brightness").unwrap();
    assert!(panel
        .borrow_mut()
        .edit(stale, ControlValue::Float(0.0))
        .is_err());

    let live = second.binding.control("offset").unwrap();
    panel
        .borrow_mut()
        .edit(live, ControlValue::Vec2 { x: 2.0, y: 3.0 })
        .unwrap();
    assert_eq!(
        engine.borrow().uniform(second.material, "offset"),
        Some(UniformWrite::Vec2([2.0, 3.0]))
    );
    assert_eq!(panel.borrow().section_titles(), ["second"]);
}

#[test]
fn dispose_all_tears_down_every_section() {
    let (engine, panel) = collaborators();
    let mut first =
        ShaderBinding::build("first", SCENE, demo_options(), &engine, &panel).unwrap();
    let second = ShaderBinding::build("second", SCENE, demo_options(), &engine, &panel).unwrap();

    first.binding.dispose(true);

    let panel = panel.borrow();
    assert!(panel.is_disposed());
    assert_eq!(panel.control_count(), 0);
    assert!(second.binding.control("color").is_some());
}

/// Panel that refuses selected keys, or every section, and otherwise defers
/// to a `MemoryPanel`.
#[derive(Default)]
struct RefusingPanel {
    inner: MemoryPanel,
    refused_keys: Vec<&'static str>,
    refuse_sections: bool,
}

impl GuiPanel for RefusingPanel {
    fn add_section(&mut self, title: &str) -> Result<SectionId, PanelError> {
        if self.refuse_sections {
            return Err(PanelError::Disposed);
        }
        self.inner.add_section(title)
    }

    fn add_control(
        &mut self,
        section: SectionId,
        spec: ControlSpec,
    ) -> Result<ControlId, PanelError> {
        if self.refused_keys.iter().any(|key| *key == spec.key) {
            return Err(PanelError::InvalidBinding {
                key: spec.key,
                reason: "refused".into(),
            });
        }
        self.inner.add_control(section, spec)
    }

    fn on_change(
        &mut self,
        control: ControlId,
        listener: ChangeListener,
    ) -> Result<(), PanelError> {
        self.inner.on_change(control, listener)
    }

    fn dispose_section(&mut self, section: SectionId) {
        self.inner.dispose_section(section);
    }

    fn dispose(&mut self) {
        self.inner.dispose();
    }
}

const TWO_SCALARS: &str =
    "uniform float a; // ts({ value: 1 })\nuniform float b; // ts({ value: 5 })";

#[test]
fn refused_control_is_skipped_and_the_rest_stay_live() {
    let engine = Rc::new(RefCell::new(HeadlessEngine::new()));
    let panel = Rc::new(RefCell::new(RefusingPanel {
        refused_keys: vec!["a"],
        ..RefusingPanel::default()
    }));
    let built = ShaderBinding::build(
        "partial",
        SCENE,
        ShaderOptions::new(VERTEX, TWO_SCALARS),
        &engine,
        &panel,
    )
    .unwrap();

    assert_eq!(
        engine.borrow().uniform(built.material, "a"),
        Some(UniformWrite::Float(1.0))
    );
    assert_eq!(
        engine.borrow().uniform(built.material, "b"),
        Some(UniformWrite::Float(5.0))
    );
    assert!(built.binding.control("a").is_none());
    assert_eq!(built.binding.controls().len(), 1);
    assert_eq!(panel.borrow().inner.control_count(), 1);

    let b = built.binding.control("b").unwrap();
    assert_eq!(panel.borrow().inner.section_of(b), built.binding.section());
    panel
        .borrow_mut()
        .inner
        .edit(b, ControlValue::Float(2.5))
        .unwrap();
    assert_eq!(
        engine.borrow().uniform(built.material, "b"),
        Some(UniformWrite::Float(2.5))
    );
    assert_eq!(built.binding.value("a"), Some(UniformWrite::Float(1.0)));
}

#[test]
fn refused_section_still_builds_without_controls() {
    let engine = Rc::new(RefCell::new(HeadlessEngine::new()));
    let panel = Rc::new(RefCell::new(RefusingPanel {
        refuse_sections: true,
        ..RefusingPanel::default()
    }));
    let built = ShaderBinding::build(
        "headless-only",
        SCENE,
        ShaderOptions::new(VERTEX, TWO_SCALARS).with_time_uniform("uTime"),
        &engine,
        &panel,
    )
    .unwrap();

    assert!(built.binding.section().is_none());
    assert!(built.binding.controls().is_empty());
    assert_eq!(panel.borrow().inner.control_count(), 0);
    assert_eq!(
        engine.borrow().uniform(built.material, "b"),
        Some(UniformWrite::Float(5.0))
    );
    assert_eq!(engine.borrow().hook_count(SCENE), 1);
    engine.borrow_mut().render_frame(SCENE);
    assert_eq!(built.binding.value("uTime"), Some(UniformWrite::Float(0.0)));
}
