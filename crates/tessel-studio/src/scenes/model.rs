use anyhow::{Context as _, Result};
use glam::Vec3;
use tessel_engine::backend::Backend;
use tessel_engine::frame::FrameParams;
use tessel_engine::pipeline::{
    Binding, CullFace, Filter, Pipeline, PipelineDesc, ShaderStage, VertexBinding,
};
use tessel_engine::resource::{BufferUsage, ImageDesc, ImageFormat, ImageId};
use tessel_engine::uniform::{Camera, UniformKind, UniformStream};
use tessel_engine::Context;

use crate::assets;

use super::{Scene, SceneEnv, FULLSCREEN_WGSL};

const SHADER: &str = include_str!("../shaders/model.wgsl");
const VERTEX_FORMAT: &str = "3f 3f 2f";
const SAMPLES: u32 = 4;
const LIGHT: Vec3 = Vec3::new(3.0, 4.0, 30.0);

/// `camera`, `inv_camera`, `camera_position`, `light_position`.
const COMMON_LAYOUT: [UniformKind; 4] = [
    UniformKind::Mat4,
    UniformKind::Mat4,
    UniformKind::Vec3,
    UniformKind::Vec3,
];

/// A textured model over a sky gradient, both drawn into one MSAA target.
pub struct Model {
    color: ImageId,
    depth: ImageId,
    output: ImageId,
    aspect: f32,
    common: UniformStream,
    background: Pipeline,
    model: Pipeline,
}

impl Scene for Model {
    fn setup<B: Backend>(ctx: &mut Context<B>, env: &SceneEnv<'_>) -> Result<Self> {
        let texture = assets::load_texture(&env.assets.join("texture.png"))?;
        let vertices = assets::load_vertices(&env.assets.join("model.bin"))?;

        let (w, h) = env.size;
        let color = ctx.create_image(
            ImageDesc::new(w, h, ImageFormat::Rgba8Unorm)
                .samples(SAMPLES)
                .texture(false),
        )?;
        let depth = ctx.create_image(
            ImageDesc::new(w, h, ImageFormat::Depth24Plus)
                .samples(SAMPLES)
                .texture(false),
        )?;
        let output = ctx.create_image(ImageDesc::new(w, h, ImageFormat::Rgba8Unorm).texture(false))?;

        let texture = ctx.create_image_with_data(
            ImageDesc::new(texture.width, texture.height, ImageFormat::Rgba8Unorm),
            &texture.pixels,
        )?;
        let vertex_buffer = ctx.create_buffer_with_data(BufferUsage::Vertex, &vertices)?;
        let common = UniformStream::new(ctx, &COMMON_LAYOUT)?;

        let background = ctx.create_pipeline(
            &PipelineDesc::new(
                "model background",
                ShaderStage::new(SHADER, "vs_background"),
                ShaderStage::new(SHADER, "fs_background").uniform_block("Common", 0),
                [color],
            )
            .include("fullscreen", FULLSCREEN_WGSL)
            .binding(Binding::uniform_buffer("Common", 0, common.buffer()))
            .vertex_count(3),
        )?;

        let model = ctx
            .create_pipeline(
                &PipelineDesc::new(
                    "model",
                    ShaderStage::new(SHADER, "vs_model").uniform_block("Common", 0),
                    ShaderStage::new(SHADER, "fs_model")
                        .uniform_block("Common", 0)
                        .sampled("Texture", 0),
                    [color, depth],
                )
                .include("fullscreen", FULLSCREEN_WGSL)
                .binding(Binding::uniform_buffer("Common", 0, common.buffer()))
                .binding(Binding::sampled_image("Texture", 0, texture))
                .vertex_buffer(VertexBinding::new(vertex_buffer, VERTEX_FORMAT, &[0, 1, 2])?)
                .cull_face(CullFace::Back),
            )
            .context("model.bin must hold whole `3f 3f 2f` vertices")?;

        Ok(Self {
            color,
            depth,
            output,
            aspect: w as f32 / h.max(1) as f32,
            common,
            background,
            model,
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

        let t = params.time * 0.1;
        let eye = Vec3::new(t.cos() * 10.0, t.sin() * 10.0, 3.0);
        let matrix = Camera::new(eye, Vec3::ZERO)
            .fov(45.0)
            .aspect(self.aspect)
            .matrix();
        self.common.update(
            ctx,
            &[
                matrix.into(),
                matrix.inverse().into(),
                eye.into(),
                LIGHT.into(),
            ],
        )?;

        self.background.render(ctx)?;
        self.model.render(ctx)?;
        ctx.blit(self.color, Some(self.output))?;
        ctx.blit_region(self.output, Some(screen), None, None, Filter::Nearest)
    }
}
