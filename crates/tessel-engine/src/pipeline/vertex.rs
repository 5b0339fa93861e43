//! Vertex buffer layouts described by compact format strings.
//!
//! A format is a whitespace-separated list of tokens `<count><type>`:
//!
//! | token  | meaning                                   |
//! |--------|-------------------------------------------|
//! | `3f`   | 3 x `f32`                                  |
//! | `2i`   | 2 x `i32`                                  |
//! | `4u`   | 4 x `u32`                                  |
//! | `4nu1` | 4 x `u8`, normalized to `0..1`             |
//! | `4x`   | 4 bytes of padding (no attribute)          |
//!
//! The count defaults to 1. `"3f 3f 2f"` is a position/normal/texcoord vertex
//! with a 32-byte stride.

use crate::error::{Error, Result};
use crate::resource::BufferId;

/// Component type of one vertex attribute.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ScalarKind {
    F32,
    I32,
    U32,
    Unorm8,
}

impl ScalarKind {
    pub fn size(self) -> u64 {
        match self {
            ScalarKind::F32 | ScalarKind::I32 | ScalarKind::U32 => 4,
            ScalarKind::Unorm8 => 1,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct VertexAttribute {
    pub kind: ScalarKind,
    pub components: u32,
    /// Byte offset inside one vertex.
    pub offset: u64,
    /// Shader input location.
    pub location: u32,
}

impl VertexAttribute {
    pub fn size(&self) -> u64 {
        self.kind.size() * self.components as u64
    }
}

/// Whether a buffer advances per vertex or per instance.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum StepMode {
    #[default]
    Vertex,
    Instance,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct VertexLayout {
    pub stride: u64,
    pub attributes: Vec<VertexAttribute>,
    pub step: StepMode,
}

enum Token {
    Attribute { kind: ScalarKind, components: u32 },
    Padding(u64),
}

fn parse_token(token: &str) -> Result<Token> {
    let digits = token.chars().take_while(|c| c.is_ascii_digit()).count();
    let (count, ty) = token.split_at(digits);
    let count = if count.is_empty() {
        1
    } else {
        count
            .parse::<u32>()
            .map_err(|_| Error::BindingError(format!("bad count in vertex format token {token:?}")))?
    };
    if count == 0 {
        return Err(Error::BindingError(format!(
            "zero count in vertex format token {token:?}"
        )));
    }

    let kind = match ty {
        "x" => return Ok(Token::Padding(count as u64)),
        "f" | "f4" => ScalarKind::F32,
        "i" | "i4" => ScalarKind::I32,
        "u" | "u4" => ScalarKind::U32,
        "nu1" => ScalarKind::Unorm8,
        _ => {
            return Err(Error::BindingError(format!(
                "unknown vertex format token {token:?}"
            )));
        }
    };

    let valid = match kind {
        ScalarKind::Unorm8 => count == 2 || count == 4,
        _ => (1..=4).contains(&count),
    };
    if !valid {
        return Err(Error::BindingError(format!(
            "unsupported component count in vertex format token {token:?}"
        )));
    }
    Ok(Token::Attribute {
        kind,
        components: count,
    })
}

/// Size in bytes of one vertex described by `format`.
pub fn format_size(format: &str) -> Result<u64> {
    let mut size = 0;
    for token in format.split_whitespace() {
        size += match parse_token(token)? {
            Token::Attribute { kind, components } => kind.size() * components as u64,
            Token::Padding(n) => n,
        };
    }
    Ok(size)
}

impl VertexLayout {
    /// Parses `format` and assigns one shader location per attribute token.
    pub fn parse(format: &str, locations: &[u32]) -> Result<Self> {
        let mut attributes = Vec::new();
        let mut offset = 0;
        let mut locs = locations.iter();

        for token in format.split_whitespace() {
            match parse_token(token)? {
                Token::Padding(n) => offset += n,
                Token::Attribute { kind, components } => {
                    let Some(&location) = locs.next() else {
                        return Err(Error::BindingError(format!(
                            "vertex format {format:?} has more attributes than the {} locations given",
                            locations.len()
                        )));
                    };
                    let attr = VertexAttribute {
                        kind,
                        components,
                        offset,
                        location,
                    };
                    offset += attr.size();
                    attributes.push(attr);
                }
            }
        }

        if locs.next().is_some() {
            return Err(Error::BindingError(format!(
                "vertex format {format:?} has fewer attributes than the {} locations given",
                locations.len()
            )));
        }
        if offset == 0 {
            return Err(Error::BindingError("empty vertex format".into()));
        }

        Ok(Self {
            stride: offset,
            attributes,
            step: StepMode::Vertex,
        })
    }

    pub fn per_instance(mut self) -> Self {
        self.step = StepMode::Instance;
        self
    }
}

/// A vertex buffer bound to a pipeline with its layout.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct VertexBinding {
    pub buffer: BufferId,
    pub layout: VertexLayout,
}

impl VertexBinding {
    pub fn new(buffer: BufferId, format: &str, locations: &[u32]) -> Result<Self> {
        Ok(Self {
            buffer,
            layout: VertexLayout::parse(format, locations)?,
        })
    }

    pub fn per_instance(mut self) -> Self {
        self.layout = self.layout.per_instance();
        self
    }
}
