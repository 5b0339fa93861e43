use anyhow::Result;
use glam::IVec2;
use tessel_engine::backend::Backend;
use tessel_engine::frame::FrameParams;
use tessel_engine::pipeline::{Binding, Filter, Pipeline, PipelineDesc, ShaderStage};
use tessel_engine::resource::{ImageDesc, ImageFormat, ImageId, Region};
use tessel_engine::uniform::{UniformKind, UniformStream};
use tessel_engine::Context;

use super::{Scene, SceneEnv, FULLSCREEN_WGSL};

const SHADER: &str = include_str!("../shaders/life.wgsl");

const SEED: u64 = 0x5eed_1234;

/// Side of the square read around the pointer.
const LENS_SRC: u32 = 40;
/// Side of the square it is magnified into.
const LENS_DST: u32 = 200;

/// Conway's game of life on the GPU.
///
/// `state` is never cleared; each frame copies it to `previous`, runs one
/// generation from `previous` into `state`, and shows it. Holding the left
/// button magnifies the area under the pointer.
pub struct Life {
    state: ImageId,
    previous: ImageId,
    size: (u32, u32),
    step: Pipeline,
}

impl Scene for Life {
    fn setup<B: Backend>(ctx: &mut Context<B>, env: &SceneEnv<'_>) -> Result<Self> {
        let (w, h) = env.size;
        let state = ctx.create_image(ImageDesc::new(w, h, ImageFormat::Rgba8Unorm))?;
        let previous = ctx.create_image(ImageDesc::new(w, h, ImageFormat::Rgba8Unorm))?;

        let mut params = UniformStream::new(ctx, &[UniformKind::IVec2])?;
        params.update(ctx, &[IVec2::new(w as i32, h as i32).into()])?;

        let step = ctx.create_pipeline(
            &PipelineDesc::new(
                "life step",
                ShaderStage::new(SHADER, "vs_main"),
                ShaderStage::new(SHADER, "fs_main")
                    .uniform_block("Params", 0)
                    .sampled("State", 0),
                [state],
            )
            .include("fullscreen", FULLSCREEN_WGSL)
            .binding(Binding::uniform_buffer("Params", 0, params.buffer()))
            .binding(Binding::sampled_image("State", 0, previous))
            .vertex_count(3),
        )?;

        ctx.write(state, &random_cells(w, h, SEED))?;

        Ok(Self {
            state,
            previous,
            size: (w, h),
            step,
        })
    }

    fn draw<B: Backend>(
        &mut self,
        ctx: &mut Context<B>,
        params: &FrameParams,
        screen: ImageId,
    ) -> tessel_engine::Result<()> {
        ctx.blit_region(self.state, Some(self.previous), None, None, Filter::Nearest)?;
        self.step.render(ctx)?;
        ctx.blit_region(self.state, Some(screen), None, None, Filter::Nearest)?;

        if params.mouse_down {
            if let Some((src, dst)) = lens_regions(self.size, params.mouse.x, params.mouse.y) {
                ctx.blit_region(self.state, Some(screen), Some(src), Some(dst), Filter::Nearest)?;
            }
        }
        Ok(())
    }
}

/// Source and destination of the magnifier, clamped inside the image.
/// `None` when the image is smaller than the lens.
fn lens_regions(size: (u32, u32), x: f32, y: f32) -> Option<(Region, Region)> {
    let (w, h) = size;
    if w < LENS_DST || h < LENS_DST {
        return None;
    }
    let px = (x.max(0.0) as u32).min(w - 1);
    let py = (y.max(0.0) as u32).min(h - 1);

    let place = |center: u32, side: u32, limit: u32| center.saturating_sub(side / 2).min(limit - side);
    let src = Region::new(
        place(px, LENS_SRC, w),
        place(py, LENS_SRC, h),
        LENS_SRC,
        LENS_SRC,
    );
    let dst = Region::new(
        place(px, LENS_DST, w),
        place(py, LENS_DST, h),
        LENS_DST,
        LENS_DST,
    );
    Some((src, dst))
}

/// Roughly half the cells alive, deterministic for a given seed.
fn random_cells(width: u32, height: u32, seed: u64) -> Vec<u8> {
    let mut state = seed | 1;
    let mut out = Vec::with_capacity(width as usize * height as usize * 4);
    for _ in 0..width as usize * height as usize {
        // xorshift64*
        state ^= state >> 12;
        state ^= state << 25;
        state ^= state >> 27;
        let r = state.wrapping_mul(0x2545_f491_4f6c_dd1d);
        let v = if r >> 63 == 1 { 255 } else { 0 };
        out.extend_from_slice(&[v, v, v, 255]);
    }
    out
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use glam::Vec2;
    use tessel_engine::backend::CaptureBackend;
    use tessel_engine::frame::{FrameLoop, HeadlessSource};

    use super::*;

    #[test]
    fn state_is_carried_across_frames_and_shown() {
        let mut ctx = Context::new(CaptureBackend::new());
        let screen = ctx
            .create_image(ImageDesc::new(32, 32, ImageFormat::Rgba8Unorm))
            .unwrap();
        let env = SceneEnv {
            size: (32, 32),
            assets: Path::new("."),
        };
        let mut life = Life::setup(&mut ctx, &env).unwrap();

        let mut source = HeadlessSource::new((32, 32), 3).with_pointer(Vec2::new(5.0, 5.0), true);
        let frames = FrameLoop::run(&mut ctx, &mut source, |ctx, params| {
            ctx.begin_frame()?;
            life.draw(ctx, params, screen)?;
            ctx.end_frame()?;
            Ok(())
        })
        .unwrap();
        assert_eq!(frames, 3);

        // One generation per frame; the capture backend does not rasterize, so
        // the state keeps its seed pattern.
        let draws: Vec<u64> = ctx.backend().draws().map(|(_, prims)| prims).collect();
        assert_eq!(draws, vec![1, 1, 1]);
        assert_eq!(ctx.read(screen).unwrap(), random_cells(32, 32, SEED));
        assert_eq!(ctx.read(life.previous).unwrap(), random_cells(32, 32, SEED));
    }

    #[test]
    fn lens_is_clamped_to_the_image() {
        let (src, dst) = lens_regions((256, 256), 2.0, 250.0).unwrap();
        assert_eq!(src, Region::new(0, 216, 40, 40));
        assert_eq!(dst, Region::new(0, 56, 200, 200));
        assert!(src.fits_within(256, 256));
        assert!(dst.fits_within(256, 256));
    }

    #[test]
    fn lens_needs_room() {
        assert!(lens_regions((128, 512), 10.0, 10.0).is_none());
    }

    #[test]
    fn random_cells_are_opaque_black_or_white() {
        let cells = random_cells(16, 16, 7);
        assert_eq!(cells.len(), 16 * 16 * 4);
        assert!(cells.chunks(4).all(|p| p[3] == 255 && (p[0] == 0 || p[0] == 255)));
        assert!(cells.chunks(4).any(|p| p[0] == 255));
        assert!(cells.chunks(4).any(|p| p[0] == 0));
    }
}
