use anyhow::{Context as _, Result};
use glam::Vec3;
use tessel_engine::backend::Backend;
use tessel_engine::frame::FrameParams;
use tessel_engine::pipeline::{
    Binding, CullFace, Pipeline, PipelineDesc, ShaderStage, VertexBinding,
};
use tessel_engine::resource::{BufferUsage, ImageDesc, ImageFormat, ImageId};
use tessel_engine::uniform::{Camera, UniformKind, UniformStream};
use tessel_engine::Context;

use crate::assets;

use super::{Scene, SceneEnv, FULLSCREEN_WGSL, PANORAMA_WGSL};

const SHADER: &str = include_str!("../shaders/envmap.wgsl");
const VERTEX_FORMAT: &str = "3f 3f";
const ORBIT_RADIUS: f32 = 5.0;
const ORBIT_HEIGHT: f32 = 2.5;

/// `camera`, `camera_position`, `ray_basis`.
const COMMON_LAYOUT: [UniformKind; 3] = [UniformKind::Mat4, UniformKind::Vec3, UniformKind::Mat3];

/// A mirror-like blob reflecting a panorama, orbited by the camera.
///
/// Single-sampled, so the color target is blitted straight to the screen.
pub struct Envmap {
    color: ImageId,
    depth: ImageId,
    aspect: f32,
    common: UniformStream,
    background: Pipeline,
    blob: Pipeline,
}

fn orbit(time: f32) -> Vec3 {
    let t = time * 0.5;
    Vec3::new(t.sin() * ORBIT_RADIUS, t.cos() * ORBIT_RADIUS, ORBIT_HEIGHT)
}

impl Scene for Envmap {
    fn setup<B: Backend>(ctx: &mut Context<B>, env: &SceneEnv<'_>) -> Result<Self> {
        let panorama = assets::load_texture(&env.assets.join("forest.png"))?;
        let vertices = assets::load_vertices(&env.assets.join("blob.bin"))?;

        let (w, h) = env.size;
        let color = ctx.create_image(ImageDesc::new(w, h, ImageFormat::Rgba8Unorm).texture(false))?;
        let depth = ctx.create_image(ImageDesc::new(w, h, ImageFormat::Depth24Plus).texture(false))?;

        let panorama = ctx.create_image_with_data(
            ImageDesc::new(panorama.width, panorama.height, ImageFormat::Rgba8Unorm),
            &panorama.pixels,
        )?;
        let vertex_buffer = ctx.create_buffer_with_data(BufferUsage::Vertex, &vertices)?;
        let common = UniformStream::new(ctx, &COMMON_LAYOUT)?;

        let background = ctx.create_pipeline(
            &PipelineDesc::new(
                "envmap background",
                ShaderStage::new(SHADER, "vs_background"),
                ShaderStage::new(SHADER, "fs_background")
                    .uniform_block("Common", 0)
                    .sampled("Texture", 0),
                [color],
            )
            .include("fullscreen", FULLSCREEN_WGSL)
            .include("panorama", PANORAMA_WGSL)
            .binding(Binding::uniform_buffer("Common", 0, common.buffer()))
            .binding(Binding::sampled_image("Texture", 0, panorama))
            .vertex_count(3),
        )?;

        let blob = ctx
            .create_pipeline(
                &PipelineDesc::new(
                    "envmap blob",
                    ShaderStage::new(SHADER, "vs_blob").uniform_block("Common", 0),
                    ShaderStage::new(SHADER, "fs_blob")
                        .uniform_block("Common", 0)
                        .sampled("Texture", 0),
                    [color, depth],
                )
                .include("fullscreen", FULLSCREEN_WGSL)
                .include("panorama", PANORAMA_WGSL)
                .binding(Binding::uniform_buffer("Common", 0, common.buffer()))
                .binding(Binding::sampled_image("Texture", 0, panorama))
                .vertex_buffer(VertexBinding::new(vertex_buffer, VERTEX_FORMAT, &[0, 1])?)
                .cull_face(CullFace::Back),
            )
            .context("blob.bin must hold whole `3f 3f` vertices")?;

        Ok(Self {
            color,
            depth,
            aspect: w as f32 / h.max(1) as f32,
            common,
            background,
            blob,
        })
    }

    fn draw<B: Backend>(
        &mut self,
        ctx: &mut Context<B>,
        params: &FrameParams,
        screen: ImageId,
    ) -> tessel_engine::Result<()> {
        ctx.clear(self.color)?;
        ctx.clear(self.depth)?;

        let eye = orbit(params.time);
        let camera = Camera::new(eye, Vec3::ZERO).fov(45.0).aspect(self.aspect);
        self.common.update(
            ctx,
            &[camera.matrix().into(), eye.into(), camera.ray_basis().into()],
        )?;

        self.background.render(ctx)?;
        self.blob.render(ctx)?;
        ctx.blit(self.color, Some(screen))
    }
}

#[cfg(test)]
mod tests {
    use tessel_engine::backend::{CaptureBackend, Command};
    use tessel_engine::frame::{FrameLoop, HeadlessSource};

    use super::*;

    /// Two triangles, position and normal per vertex.
    fn blob() -> Vec<u8> {
        let vertices: [[f32; 6]; 6] = [
            [0.0, 0.0, 1.0, 0.0, 0.0, 1.0],
            [1.0, 0.0, 0.0, 1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, -1.0, 0.0, 0.0, -1.0],
            [0.0, 1.0, 0.0, 0.0, 1.0, 0.0],
            [1.0, 0.0, 0.0, 1.0, 0.0, 0.0],
        ];
        vertices.iter().flatten().flat_map(|v| v.to_ne_bytes()).collect()
    }

    #[test]
    fn camera_orbits_at_a_fixed_height() {
        for time in [0.0, 1.0, 7.5] {
            let eye = orbit(time);
            assert_eq!(eye.z, ORBIT_HEIGHT);
            assert!((eye.truncate().length() - ORBIT_RADIUS).abs() < 1e-4);
        }
        assert_eq!(orbit(0.0), Vec3::new(0.0, ORBIT_RADIUS, ORBIT_HEIGHT));
    }

    #[test]
    fn frames_blit_the_single_sampled_target_to_the_screen() {
        let dir = assets::scratch_dir("envmap");
        assets::save_png(&dir.join("forest.png"), 8, 4, [40, 90, 30, 255].repeat(32)).unwrap();
        std::fs::write(dir.join("blob.bin"), blob()).unwrap();

        let mut ctx = Context::new(CaptureBackend::new());
        let screen = ctx
            .create_image(ImageDesc::new(32, 32, ImageFormat::Rgba8Unorm))
            .unwrap();
        let env = SceneEnv {
            size: (32, 32),
            assets: &dir,
        };
        let mut scene = Envmap::setup(&mut ctx, &env).unwrap();
        assert_eq!(scene.blob.vertex_count(), 6);
        assert_eq!(ctx.image_info(scene.depth).unwrap().desc.samples, 1);
        ctx.backend_mut().take_commands();

        let mut source = HeadlessSource::new((32, 32), 3).with_dt(0.25);
        let frames = FrameLoop::run(&mut ctx, &mut source, |ctx, params| {
            ctx.begin_frame()?;
            scene.draw(ctx, params, screen)?;
            ctx.end_frame()?;
            Ok(())
        })
        .unwrap();
        assert_eq!(frames, 3);

        let draws: Vec<u64> = ctx.backend().draws().map(|(_, prims)| prims).collect();
        assert_eq!(draws, vec![1, 2, 1, 2, 1, 2]);
        let blits: Vec<bool> = ctx
            .backend()
            .commands()
            .iter()
            .filter_map(|c| match c {
                Command::Blit { plan, .. } => Some(plan.resolve || plan.dst != screen),
                _ => None,
            })
            .collect();
        assert_eq!(blits, vec![false, false, false]);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
