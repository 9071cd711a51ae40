//! Scans fragment shader source for annotated uniform declarations.
//!
//! A declaration is recognised on any line matching
//! `uniform <type> <name>[;] // ts(<literal>)`; the literal runs up to the last
//! closing parenthesis on the line. Uniforms without the annotation are left
//! alone, as is everything else in the shader.
use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use crate::declaration::{ParsedConfig, UniformDeclaration, UniformKind};
use crate::literal::{self, LiteralError};

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("invalid ts() config for uniform '{name}' on line {line}: {source}")]
    ConfigParse {
        name: String,
        line: usize,
        #[source]
        source: LiteralError,
    },

    #[error("uniform '{name}' on line {line} has unsupported type '{ty}'; expected bool, int, float, vec2 or vec3")]
    UnsupportedUniformType {
        name: String,
        line: usize,
        ty: String,
    },

    #[error("uniform '{name}' on line {line} is already annotated earlier in the shader")]
    DuplicateUniform { name: String, line: usize },
}

impl ExtractError {
    pub fn uniform(&self) -> &str {
        match self {
            Self::ConfigParse { name, .. }
            | Self::UnsupportedUniformType { name, .. }
            | Self::DuplicateUniform { name, .. } => name,
        }
    }

    pub fn line(&self) -> usize {
        match self {
            Self::ConfigParse { line, .. }
            | Self::UnsupportedUniformType { line, .. }
            | Self::DuplicateUniform { line, .. } => *line,
        }
    }
}

fn annotation_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"uniform\s+(\w+)\s+(\w+)\s*;?\s*//\s*ts\((.+)\)")
            .expect("annotation pattern must compile")
    })
}

/// Extracts every annotated uniform from `source`, preserving source order.
///
/// Fails on the first malformed literal, unknown type or repeated name; no
/// partial result is returned.
pub fn extract(source: &str) -> Result<Vec<UniformDeclaration>, ExtractError> {
    let pattern = annotation_pattern();
    let mut declarations = Vec::new();
    let mut seen = HashSet::new();

    for (index, text) in source.lines().enumerate() {
        let Some(captures) = pattern.captures(text) else {
            continue;
        };
        let line = index + 1;
        let ty = &captures[1];
        let name = captures[2].to_string();
        let raw_config = &captures[3];

        let kind = UniformKind::from_token(ty).ok_or_else(|| {
            ExtractError::UnsupportedUniformType {
                name: name.clone(),
                line,
                ty: ty.to_string(),
            }
        })?;

        let attributes =
            literal::parse_object(raw_config).map_err(|source| ExtractError::ConfigParse {
                name: name.clone(),
                line,
                source,
            })?;

        if !seen.insert(name.clone()) {
            return Err(ExtractError::DuplicateUniform { name, line });
        }

        tracing::trace!(uniform = %name, kind = %kind, line, "found annotated uniform");
        declarations.push(UniformDeclaration {
            kind,
            name,
            config: ParsedConfig::new(attributes),
            line,
        });
    }

    Ok(declarations)
}
