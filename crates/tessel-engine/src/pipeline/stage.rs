use std::collections::BTreeMap;

use crate::error::{Error, Result};

const MAX_INCLUDE_DEPTH: usize = 8;

/// The kind of resource a shader stage addresses by name.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ResourceKind {
    UniformBuffer,
    SampledImage,
}

/// A named resource a stage reads, at the slot it addresses it with.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct StageRef {
    pub name: String,
    pub kind: ResourceKind,
    pub slot: u32,
}

/// Shader source plus the declared resource interface of one stage.
///
/// The source is opaque to the engine; it is handed to the backend compiler
/// after `#include` substitution. The interface is declared by the caller and
/// checked against the pipeline bindings at construction.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ShaderStage {
    pub source: String,
    pub entry_point: String,
    pub refs: Vec<StageRef>,
}

impl ShaderStage {
    pub fn new(source: impl Into<String>, entry_point: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            entry_point: entry_point.into(),
            refs: Vec::new(),
        }
    }

    /// Declares that the stage reads the uniform block `name` at `slot`.
    pub fn uniform_block(mut self, name: impl Into<String>, slot: u32) -> Self {
        self.refs.push(StageRef {
            name: name.into(),
            kind: ResourceKind::UniformBuffer,
            slot,
        });
        self
    }

    /// Declares that the stage samples the image `name` at `slot`.
    pub fn sampled(mut self, name: impl Into<String>, slot: u32) -> Self {
        self.refs.push(StageRef {
            name: name.into(),
            kind: ResourceKind::SampledImage,
            slot,
        });
        self
    }

    /// Returns the source with every `#include "name"` line replaced.
    pub fn resolve_source(&self, includes: &BTreeMap<String, String>) -> Result<String> {
        expand(&self.source, includes, 0)
    }
}

fn include_name(line: &str) -> Option<&str> {
    let rest = line.trim().strip_prefix("#include")?;
    let rest = rest.trim();
    rest.strip_prefix('"')?.strip_suffix('"')
}

fn expand(source: &str, includes: &BTreeMap<String, String>, depth: usize) -> Result<String> {
    if depth > MAX_INCLUDE_DEPTH {
        return Err(Error::BindingError(
            "shader includes nest too deeply (cycle?)".into(),
        ));
    }

    let mut out = String::with_capacity(source.len());
    for line in source.lines() {
        match include_name(line) {
            Some(name) => {
                let text = includes.get(name).ok_or_else(|| {
                    Error::BindingError(format!("shader include {name:?} is not defined"))
                })?;
                // Expanded text is already newline-terminated.
                out.push_str(&expand(text, includes, depth + 1)?);
            }
            None => {
                out.push_str(line);
                out.push('\n');
            }
        }
    }
    Ok(out)
}
