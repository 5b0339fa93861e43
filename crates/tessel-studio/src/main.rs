mod assets;
mod scenes;

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::Parser;
use tessel_engine::backend::{Backend, WgpuBackend};
use tessel_engine::core::{App, AppControl, FrameCtx, SetupCtx};
use tessel_engine::device::{Gpu, GpuInit};
use tessel_engine::frame::{FrameLoop, HeadlessSource};
use tessel_engine::input::Key;
use tessel_engine::logging::{init_logging, LoggingConfig};
use tessel_engine::resource::{ImageDesc, ImageFormat, ImageId};
use tessel_engine::window::{Runtime, RuntimeConfig};
use tessel_engine::Context;

use scenes::{AnyScene, SceneEnv, SceneKind};

#[derive(Parser, Debug, Clone)]
#[command(name = "tessel-studio")]
#[command(about = "Demo scenes for the tessel frame orchestrator", long_about = None)]
struct Cli {
    #[arg(long, value_enum, default_value = "life")]
    scene: SceneKind,

    /// Drawable size as WIDTHxHEIGHT.
    #[arg(long, default_value = "1024x1024", value_parser = parse_size)]
    size: (u32, u32),

    /// Present without waiting for vertical blank.
    #[arg(long)]
    no_vsync: bool,

    /// Render this many frames without a window and write the last one to --output.
    #[arg(long, value_name = "FRAMES")]
    headless_frames: Option<u64>,

    #[arg(long, default_value = "frame.png")]
    output: PathBuf,

    /// Directory holding the scene assets (`model.bin`, `texture.png`, ...).
    #[arg(long, default_value = "assets")]
    assets: PathBuf,

    /// Engine debug logging.
    #[arg(short, long)]
    verbose: bool,
}

fn parse_size(s: &str) -> std::result::Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {s:?}"))?;
    let w: u32 = w.trim().parse().map_err(|e| format!("bad width {w:?}: {e}"))?;
    let h: u32 = h.trim().parse().map_err(|e| format!("bad height {h:?}: {e}"))?;
    if w == 0 || h == 0 {
        return Err("size must be non-zero".into());
    }
    Ok((w, h))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(if cli.verbose {
        LoggingConfig::verbose()
    } else {
        LoggingConfig::default()
    });

    match cli.headless_frames {
        Some(frames) => run_headless(&cli, frames),
        None => run_windowed(&cli),
    }
}

/// Renders `frames` frames offscreen and saves the final screen image.
fn run_headless(cli: &Cli, frames: u64) -> Result<()> {
    let gpu = pollster::block_on(Gpu::new_headless(GpuInit::default()))?;
    let mut ctx = Context::new(WgpuBackend::new(gpu));

    let (w, h) = cli.size;
    let screen = ctx.create_image(ImageDesc::new(w, h, ImageFormat::Rgba8Unorm))?;
    let env = SceneEnv {
        size: cli.size,
        assets: &cli.assets,
    };
    let mut scene = AnyScene::setup(cli.scene, &mut ctx, &env)?;

    let mut source = HeadlessSource::new(cli.size, frames);
    let rendered = FrameLoop::run(&mut ctx, &mut source, |ctx, params| {
        scene.frame(ctx, params, screen)?;
        Ok(())
    })?;
    log::info!("rendered {rendered} frames headless");

    let pixels = ctx.read(screen)?;
    assets::save_png(&cli.output, w, h, pixels)
}

fn run_windowed(cli: &Cli) -> Result<()> {
    let config = RuntimeConfig {
        title: format!("tessel studio: {:?}", cli.scene),
        size: cli.size,
        vsync: !cli.no_vsync,
    };
    let app = Studio {
        kind: cli.scene,
        assets: cli.assets.clone(),
        state: None,
    };
    Runtime::run(config, GpuInit::default(), app)
}

struct Studio {
    kind: SceneKind,
    assets: PathBuf,
    state: Option<(AnyScene, ImageId)>,
}

impl App for Studio {
    fn setup(&mut self, setup: &mut SetupCtx<'_, '_>) -> Result<()> {
        let backend = setup.ctx.backend();
        let format = backend
            .surface_format()
            .context("window has no display surface")?;
        let size = backend.surface_size().unwrap_or_else(|| setup.size());

        let screen = setup
            .ctx
            .create_image(ImageDesc::presentable(size.0, size.1, format))?;
        let env = SceneEnv {
            size,
            assets: &self.assets,
        };
        let scene = AnyScene::setup(self.kind, &mut *setup.ctx, &env)?;
        self.state = Some((scene, screen));
        Ok(())
    }

    fn on_frame(&mut self, frame: &mut FrameCtx<'_, '_>) -> Result<AppControl> {
        if frame.input_frame.key_pressed(Key::Escape) {
            return Ok(AppControl::Exit);
        }
        let Some((scene, screen)) = self.state.as_mut() else {
            return Ok(AppControl::Exit);
        };

        let params = frame.params();
        scene.frame(&mut *frame.ctx, &params, *screen)?;

        if params.frame_index % 120 == 0 && params.frame_index > 0 {
            let fps = 1.0 / params.dt.max(f32::EPSILON);
            frame
                .runtime
                .set_title(format!("tessel studio: {:?} ({fps:.0} fps)", self.kind));
        }
        Ok(AppControl::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_parse_with_either_separator() {
        assert_eq!(parse_size("640x480"), Ok((640, 480)));
        assert_eq!(parse_size("32X16"), Ok((32, 16)));
        assert!(parse_size("640").is_err());
        assert!(parse_size("0x10").is_err());
    }

    #[test]
    fn cli_defaults() {
        let cli = Cli::try_parse_from(["tessel-studio"]).unwrap();
        assert_eq!(cli.scene, SceneKind::Life);
        assert_eq!(cli.size, (1024, 1024));
        assert!(!cli.no_vsync);
        assert_eq!(cli.headless_frames, None);
    }

    #[test]
    fn cli_headless_flags() {
        let cli = Cli::try_parse_from([
            "tessel-studio",
            "--scene",
            "grass",
            "--size",
            "256x128",
            "--headless-frames",
            "3",
            "--output",
            "out.png",
        ])
        .unwrap();
        assert_eq!(cli.scene, SceneKind::Grass);
        assert_eq!(cli.size, (256, 128));
        assert_eq!(cli.headless_frames, Some(3));
        assert_eq!(cli.output, PathBuf::from("out.png"));
    }

    #[test]
    fn cli_accepts_every_scene_name() {
        for (name, kind) in [
            ("life", SceneKind::Life),
            ("grass", SceneKind::Grass),
            ("model", SceneKind::Model),
            ("normal", SceneKind::Normal),
            ("envmap", SceneKind::Envmap),
        ] {
            let cli = Cli::try_parse_from(["tessel-studio", "--scene", name]).unwrap();
            assert_eq!(cli.scene, kind);
        }
    }
}
