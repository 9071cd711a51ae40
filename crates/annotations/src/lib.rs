//! Discovers GUI-tweakable uniforms in fragment shader source.
//!
//! Shader authors mark a uniform as tweakable by appending a `ts(...)`
//! comment holding a plain data literal:
//!
//! ```glsl
//! uniform float brightness; // ts({ value: 1.0, min: 0, max: 1.0, step: 0.1 })
//! ```
//!
//! [`extract`] returns the annotated declarations in source order; the
//! [`literal`] module provides the safe literal parser used for the comment
//! payload and for any other hand-written values (such as CLI edits).
mod declaration;
mod extract;
pub mod literal;

pub use declaration::{ParsedConfig, UniformDeclaration, UniformKind};
pub use extract::{extract, ExtractError};
pub use literal::LiteralError;
