use crate::backend::Backend;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::resource::{BufferDesc, BufferId};

use super::std140::{std140_offsets, UniformKind, UniformValue, UniformWriter};

/// A uniform buffer rewritten once per frame from a fixed member layout.
#[derive(Debug)]
pub struct UniformStream {
    buffer: BufferId,
    layout: Vec<UniformKind>,
    size: usize,
    writer: UniformWriter,
}

impl UniformStream {
    /// Allocates a uniform buffer sized for `layout`.
    pub fn new<B: Backend>(ctx: &mut Context<B>, layout: &[UniformKind]) -> Result<Self> {
        let (_, size) = std140_offsets(layout);
        let buffer = ctx.create_buffer(BufferDesc::uniform(size as u64))?;
        Ok(Self {
            buffer,
            layout: layout.to_vec(),
            size,
            writer: UniformWriter::new(),
        })
    }

    pub fn buffer(&self) -> BufferId {
        self.buffer
    }

    /// Block size in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Packs `values` and writes them to the buffer.
    ///
    /// Values must follow the layout the stream was created with.
    pub fn update<B: Backend>(&mut self, ctx: &mut Context<B>, values: &[UniformValue]) -> Result<()> {
        let matches = values.len() == self.layout.len()
            && values.iter().zip(&self.layout).all(|(v, k)| v.kind() == *k);
        if !matches {
            return Err(Error::BindingError(format!(
                "uniform values do not match the stream layout {:?}",
                self.layout
            )));
        }

        self.writer.reset();
        for value in values {
            self.writer.push(value.clone());
        }
        let bytes = self.writer.finish();
        if bytes.len() != self.size {
            return Err(Error::SizeMismatch {
                expected: self.size,
                actual: bytes.len(),
            });
        }
        ctx.write_buffer(self.buffer, 0, bytes)
    }
}
