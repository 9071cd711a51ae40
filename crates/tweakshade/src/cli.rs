use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "tweakshade",
    author,
    version,
    about = "Inspect and exercise ts() uniform annotations in GLSL shaders"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the annotated uniforms of a fragment shader.
    Inspect(InspectArgs),
    /// Build a headless binding from a project file, apply edits and render frames.
    Simulate(SimulateArgs),
}

#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// Fragment shader to scan.
    #[arg(value_name = "FRAGMENT")]
    pub fragment: PathBuf,

    /// Emit declarations as JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct SimulateArgs {
    /// Project TOML naming the shader sources and options.
    #[arg(value_name = "PROJECT")]
    pub project: PathBuf,

    /// Number of frames to render after applying edits.
    #[arg(long, value_name = "N", default_value_t = 1)]
    pub frames: u32,

    /// Edit a control before rendering, e.g. `--set brightness=0.5` or
    /// `--set 'color={r: 255, g: 0, b: 0}'`. May be repeated.
    #[arg(long = "set", value_name = "NAME=LITERAL", value_parser = parse_assignment)]
    pub edits: Vec<Assignment>,

    /// Print the final uniform table as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub name: String,
    pub literal: String,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_assignment(value: &str) -> Result<Assignment, String> {
    let (name, literal) = value
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=LITERAL, got '{value}'"))?;
    let name = name.trim();
    let literal = literal.trim();
    if name.is_empty() {
        return Err("uniform name must not be empty".into());
    }
    if !name.chars().all(|ch| ch.is_alphanumeric() || ch == '_') {
        return Err(format!("'{name}' is not a valid uniform name"));
    }
    if literal.is_empty() {
        return Err(format!("missing value for '{name}'"));
    }
    Ok(Assignment {
        name: name.to_string(),
        literal: literal.to_string(),
    })
}
