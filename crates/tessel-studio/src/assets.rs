//! Asset loading for the demo scenes.

use std::path::Path;

use anyhow::{Context as _, Result};

/// Decoded RGBA8 pixels, rows top to bottom.
pub struct Texture {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

pub fn load_texture(path: &Path) -> Result<Texture> {
    let img = image::open(path)
        .with_context(|| format!("failed to decode texture {}", path.display()))?
        .to_rgba8();
    let (width, height) = img.dimensions();
    log::debug!("loaded texture {} ({width}x{height})", path.display());
    Ok(Texture {
        width,
        height,
        pixels: img.into_raw(),
    })
}

/// Reads a raw interleaved vertex blob. The layout is the caller's contract.
pub fn load_vertices(path: &Path) -> Result<Vec<u8>> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read vertex data {}", path.display()))?;
    anyhow::ensure!(!bytes.is_empty(), "vertex data {} is empty", path.display());
    log::debug!("loaded {} bytes of vertex data from {}", bytes.len(), path.display());
    Ok(bytes)
}

/// Writes RGBA8 pixels as a PNG file.
pub fn save_png(path: &Path, width: u32, height: u32, pixels: Vec<u8>) -> Result<()> {
    let img = image::RgbaImage::from_raw(width, height, pixels)
        .context("pixel buffer does not match the image size")?;
    img.save(path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    log::info!("wrote {}", path.display());
    Ok(())
}

/// Fresh per-process directory for test assets.
#[cfg(test)]
pub(crate) fn scratch_dir(tag: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("tessel-studio-{tag}-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}
