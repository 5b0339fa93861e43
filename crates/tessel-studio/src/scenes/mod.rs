//! Demo scenes.
//!
//! Every scene is generic over the backend so the same code runs in the
//! window, headless on the GPU, and against the capture backend.

mod envmap;
mod grass;
mod life;
mod model;
mod normal;

use std::path::Path;

use anyhow::Result;
use clap::ValueEnum;
use tessel_engine::backend::Backend;
use tessel_engine::frame::FrameParams;
use tessel_engine::resource::ImageId;
use tessel_engine::Context;

pub use envmap::Envmap;
pub use grass::Grass;
pub use life::Life;
pub use model::Model;
pub use normal::NormalMapping;

/// Shared by the fullscreen passes.
pub(crate) const FULLSCREEN_WGSL: &str = include_str!("../shaders/fullscreen.wgsl");
/// Panorama lookups shared by the environment-lit scenes.
pub(crate) const PANORAMA_WGSL: &str = include_str!("../shaders/panorama.wgsl");

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
pub enum SceneKind {
    /// Cellular automaton, ping-ponged between two images.
    Life,
    /// Instanced procedural grass with MSAA.
    Grass,
    /// Textured flat-shaded model; needs `model.bin` and `texture.png`.
    Model,
    /// Normal-mapped plate with MSAA; needs `plate.bin`, `diffuse.png`,
    /// `roughness.png` and `normal.png`.
    Normal,
    /// Reflective blob over a panorama; needs `blob.bin` and `forest.png`.
    Envmap,
}

/// What a scene needs to know at setup.
#[derive(Debug, Clone, Copy)]
pub struct SceneEnv<'a> {
    pub size: (u32, u32),
    pub assets: &'a Path,
}

pub trait Scene: Sized {
    fn setup<B: Backend>(ctx: &mut Context<B>, env: &SceneEnv<'_>) -> Result<Self>;

    /// Records one frame's work into an open frame and leaves the result in
    /// `screen`.
    fn draw<B: Backend>(
        &mut self,
        ctx: &mut Context<B>,
        params: &FrameParams,
        screen: ImageId,
    ) -> tessel_engine::Result<()>;
}

/// The scene picked on the command line.
pub enum AnyScene {
    Life(Life),
    Grass(Grass),
    Model(Model),
    Normal(NormalMapping),
    Envmap(Envmap),
}

impl AnyScene {
    pub fn setup<B: Backend>(
        kind: SceneKind,
        ctx: &mut Context<B>,
        env: &SceneEnv<'_>,
    ) -> Result<Self> {
        log::info!("setting up {kind:?} at {}x{}", env.size.0, env.size.1);
        Ok(match kind {
            SceneKind::Life => AnyScene::Life(Life::setup(ctx, env)?),
            SceneKind::Grass => AnyScene::Grass(Grass::setup(ctx, env)?),
            SceneKind::Model => AnyScene::Model(Model::setup(ctx, env)?),
            SceneKind::Normal => AnyScene::Normal(NormalMapping::setup(ctx, env)?),
            SceneKind::Envmap => AnyScene::Envmap(Envmap::setup(ctx, env)?),
        })
    }

    pub fn draw<B: Backend>(
        &mut self,
        ctx: &mut Context<B>,
        params: &FrameParams,
        screen: ImageId,
    ) -> tessel_engine::Result<()> {
        match self {
            AnyScene::Life(s) => s.draw(ctx, params, screen),
            AnyScene::Grass(s) => s.draw(ctx, params, screen),
            AnyScene::Model(s) => s.draw(ctx, params, screen),
            AnyScene::Normal(s) => s.draw(ctx, params, screen),
            AnyScene::Envmap(s) => s.draw(ctx, params, screen),
        }
    }

    /// One complete frame: begin, draw, end.
    pub fn frame<B: Backend>(
        &mut self,
        ctx: &mut Context<B>,
        params: &FrameParams,
        screen: ImageId,
    ) -> tessel_engine::Result<()> {
        ctx.begin_frame()?;
        self.draw(ctx, params, screen)?;
        let stats = ctx.end_frame()?;
        if params.frame_index % 600 == 0 {
            log::debug!("frame {}: {stats:?}", params.frame_index);
        }
        Ok(())
    }
}
