use std::fs;
use std::path::Path;
use std::process::Command;

use serde_json::Value;
use tempfile::TempDir;

const VERTEX: &str = "precision highp float;\nattribute vec3 position;\nuniform mat4 worldViewProjection;\nvoid main() { gl_Position = worldViewProjection * vec4(position, 1.); }\n";

const FRAGMENT: &str = r#"precision highp float;
uniform vec3 color; // ts({ value: {r: 0, g: 255, b: 214, a: 0.5} })
uniform float brightness; // ts({ value: 1.0, min: 0, max:1.0, step: 0.1 })
uniform int octaves; // ts({ value: 2.6, step: 0.6 })
uniform float uTime;
void main() {
    gl_FragColor = vec4(color, brightness * (sin(uTime * 0.05)+1.) - 1.);
}
"#;

fn write_project(root: &Path, fragment: &str) -> std::path::PathBuf {
    fs::create_dir_all(root.join("glsl")).unwrap();
    fs::write(root.join("glsl/shader.vert"), VERTEX).unwrap();
    fs::write(root.join("glsl/shader.frag"), fragment).unwrap();
    let project = root.join("shader.toml");
    fs::write(
        &project,
        r#"name = "shader-material"
vertex = "glsl/shader.vert"
fragment = "glsl/shader.frag"

[time_uniform]
name = "uTime"

[material]
needAlphaBlending = true
"#,
    )
    .unwrap();
    project
}

fn tweakshade() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_tweakshade"));
    command.env("RUST_LOG", "warn");
    command
}

fn find<'a>(rows: &'a Value, name: &str) -> &'a Value {
    rows.as_array()
        .unwrap()
        .iter()
        .find(|row| row["name"] == name)
        .unwrap_or_else(|| panic!("no row for {name}"))
}

#[test]
fn inspect_lists_annotated_uniforms_as_json() {
    let root = TempDir::new().unwrap();
    let project = write_project(root.path(), FRAGMENT);
    let fragment = project.parent().unwrap().join("glsl/shader.frag");

    let output = tweakshade()
        .args(["inspect", "--json"])
        .arg(&fragment)
        .output()
        .expect("failed to run tweakshade inspect");
    assert!(output.status.success());

    let rows: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(rows.as_array().unwrap().len(), 3);
    let color = find(&rows, "color");
    assert_eq!(color["type"], "vec3");
    assert_eq!(color["kind"], "color");
    assert_eq!(color["line"], 2);
    let octaves = find(&rows, "octaves");
    assert_eq!(octaves["initial"], 3);
    assert_eq!(octaves["params"]["step"], 1);
}

#[test]
fn inspect_reports_malformed_annotation() {
    let root = TempDir::new().unwrap();
    let fragment = root.path().join("broken.frag");
    fs::write(&fragment, "uniform float a; // ts({value: )\n").unwrap();

    let output = tweakshade()
        .arg("inspect")
        .arg(&fragment)
        .output()
        .expect("failed to run tweakshade inspect");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("'a'"), "stderr was: {stderr}");
}

#[test]
fn simulate_applies_edits_and_counts_frames() {
    let root = TempDir::new().unwrap();
    let project = write_project(root.path(), FRAGMENT);

    let output = tweakshade()
        .arg("simulate")
        .arg(&project)
        .args([
            "--frames",
            "3",
            "--set",
            "color={r: 255, g: 0, b: 0}",
            "--set",
            "brightness=0.5",
            "--json",
        ])
        .output()
        .expect("failed to run tweakshade simulate");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let rows: Value = serde_json::from_slice(&output.stdout).unwrap();
    let color = find(&rows, "color");
    assert_eq!(color["value"]["type"], "color3");
    assert_eq!(color["value"]["value"], serde_json::json!([1.0, 0.0, 0.0]));
    assert_eq!(find(&rows, "brightness")["value"]["value"], 0.5);
    let time = find(&rows, "uTime");
    assert_eq!(time["source"], "frames");
    assert_eq!(time["value"]["value"], 2.0);
}

#[test]
fn simulate_rejects_edit_of_unknown_uniform() {
    let root = TempDir::new().unwrap();
    let project = write_project(root.path(), FRAGMENT);

    let status = tweakshade()
        .arg("simulate")
        .arg(&project)
        .args(["--set", "uTime=4"])
        .status()
        .expect("failed to run tweakshade simulate");
    assert!(!status.success());
}
