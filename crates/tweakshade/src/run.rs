use std::cell::RefCell;
use std::fs;
use std::rc::Rc;

use annotations::{extract, UniformDeclaration};
use anyhow::{anyhow, bail, Context, Result};
use binding::{
    ControlValue, HeadlessEngine, MemoryPanel, SceneId, ShaderBinding, TweakKind, UniformValue,
    UniformWrite, ValueSource,
};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing_subscriber::EnvFilter;

use crate::cli::{Assignment, InspectArgs, SimulateArgs};
use crate::project::ProjectFile;

const SIMULATED_SCENE: SceneId = SceneId(1);

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[derive(Debug, Serialize)]
struct DeclarationRow<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    ty: &'static str,
    line: usize,
    kind: TweakKind,
    initial: ControlValue,
    params: Map<String, Value>,
}

impl<'a> DeclarationRow<'a> {
    fn new(declaration: &'a UniformDeclaration) -> Self {
        let kind = TweakKind::resolve(declaration);
        Self {
            name: &declaration.name,
            ty: declaration.kind.as_str(),
            line: declaration.line,
            kind,
            initial: kind.initial_value(&declaration.config),
            params: kind.control_params(&declaration.config),
        }
    }
}

pub fn inspect(args: InspectArgs) -> Result<()> {
    let source = fs::read_to_string(&args.fragment)
        .with_context(|| format!("failed to read fragment shader {}", args.fragment.display()))?;
    let declarations = extract(&source)
        .with_context(|| format!("failed to scan {}", args.fragment.display()))?;
    tracing::debug!(
        path = %args.fragment.display(),
        uniforms = declarations.len(),
        "extracted annotated uniforms"
    );

    let rows: Vec<DeclarationRow<'_>> = declarations.iter().map(DeclarationRow::new).collect();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if rows.is_empty() {
        println!(
            "No annotated uniforms found in {}",
            args.fragment.display()
        );
        return Ok(());
    }

    println!("Annotated uniforms in {}:", args.fragment.display());
    for row in &rows {
        let initial = serde_json::to_string(&row.initial)?;
        let params = if row.params.is_empty() {
            String::new()
        } else {
            format!(" params={}", Value::Object(row.params.clone()))
        };
        println!(
            "  {:<20} {:<6} line={:<4} kind={:<7} initial={initial}{params}",
            row.name,
            row.ty,
            row.line,
            row.kind.as_str(),
        );
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct UniformRow {
    name: String,
    source: &'static str,
    value: UniformWrite,
}

impl From<UniformValue> for UniformRow {
    fn from(entry: UniformValue) -> Self {
        let source = match entry.source {
            ValueSource::Control(kind) => kind.as_str(),
            ValueSource::FrameCounter => "frames",
        };
        Self {
            name: entry.name,
            source,
            value: entry.current,
        }
    }
}

pub fn simulate(args: SimulateArgs) -> Result<()> {
    let project = ProjectFile::load(&args.project)?;
    let engine = Rc::new(RefCell::new(HeadlessEngine::new()));
    let panel = Rc::new(RefCell::new(MemoryPanel::new()));

    let built = ShaderBinding::build(
        &project.name,
        SIMULATED_SCENE,
        project.options,
        &engine,
        &panel,
    )
    .with_context(|| {
        format!(
            "failed to build shader '{}' from {}",
            project.name,
            project.fragment_path.display()
        )
    })?;
    tracing::info!(
        shader = %project.name,
        controls = built.binding.controls().len(),
        edits = args.edits.len(),
        frames = args.frames,
        "simulating shader"
    );

    for edit in &args.edits {
        apply_edit(&built.binding, &panel, edit)?;
    }
    for _ in 0..args.frames {
        engine.borrow_mut().render_frame(SIMULATED_SCENE);
    }

    let rows: Vec<UniformRow> = built
        .binding
        .values()
        .into_iter()
        .map(UniformRow::from)
        .collect();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!(
        "Uniforms of '{}' after {} frame(s):",
        project.name,
        engine.borrow().frames_rendered(SIMULATED_SCENE)
    );
    for row in rows {
        println!("  {:<20} {:<7} {}", row.name, row.source, row.value);
    }
    Ok(())
}

fn apply_edit(
    binding: &ShaderBinding,
    panel: &Rc<RefCell<MemoryPanel>>,
    edit: &Assignment,
) -> Result<()> {
    let control = binding
        .control(&edit.name)
        .ok_or_else(|| anyhow!("'{}' is not an annotated uniform of this shader", edit.name))?;
    let kind = panel
        .borrow()
        .spec(control)
        .map(|spec| spec.kind)
        .ok_or_else(|| anyhow!("control for '{}' is no longer live", edit.name))?;

    let literal = annotations::literal::parse(&edit.literal)
        .with_context(|| format!("invalid value for '{}'", edit.name))?;
    let Some(value) = kind.value_from_json(&literal) else {
        bail!(
            "value {} does not fit the {} control of '{}'",
            edit.literal,
            kind,
            edit.name
        );
    };

    tracing::debug!(uniform = %edit.name, ?value, "applying edit");
    panel
        .borrow_mut()
        .edit(control, value)
        .with_context(|| format!("panel rejected edit of '{}'", edit.name))?;
    Ok(())
}
