use anyhow::{Context as _, Result};
use glam::{Vec2, Vec3};
use tessel_engine::backend::Backend;
use tessel_engine::frame::FrameParams;
use tessel_engine::pipeline::{
    Binding, CullFace, Filter, Pipeline, PipelineDesc, ShaderStage, VertexBinding,
};
use tessel_engine::resource::{BufferUsage, ImageDesc, ImageFormat, ImageId};
use tessel_engine::uniform::{Camera, UniformKind, UniformStream};
use tessel_engine::Context;

use crate::assets;

use super::{Scene, SceneEnv, FULLSCREEN_WGSL, PANORAMA_WGSL};

const SHADER: &str = include_str!("../shaders/normal.wgsl");
/// Position, normal, uv, tangent.
const VERTEX_FORMAT: &str = "3f 3f 2f 3f";
const SAMPLES: u32 = 4;

/// `camera`, `camera_position`, `light_position`, `ray_basis`: 144 bytes.
const COMMON_LAYOUT: [UniformKind; 4] = [
    UniformKind::Mat4,
    UniformKind::Vec3,
    UniformKind::Vec3,
    UniformKind::Mat3,
];

/// A normal-mapped plate lit by a light that follows the pointer.
pub struct NormalMapping {
    color: ImageId,
    depth: ImageId,
    output: ImageId,
    aspect: f32,
    common: UniformStream,
    background: Pipeline,
    plate: Pipeline,
}

fn upload<B: Backend>(ctx: &mut Context<B>, env: &SceneEnv<'_>, name: &str) -> Result<ImageId> {
    let texture = assets::load_texture(&env.assets.join(name))?;
    let image = ctx.create_image_with_data(
        ImageDesc::new(texture.width, texture.height, ImageFormat::Rgba8Unorm),
        &texture.pixels,
    )?;
    Ok(image)
}

/// Pointer offset from the window center, in `-0.5..0.5` with y up.
fn pointer_offset(params: &FrameParams) -> Vec2 {
    let (w, h) = params.size;
    Vec2::new(
        params.mouse.x / w.max(1) as f32 - 0.5,
        0.5 - params.mouse.y / h.max(1) as f32,
    )
}

impl Scene for NormalMapping {
    fn setup<B: Backend>(ctx: &mut Context<B>, env: &SceneEnv<'_>) -> Result<Self> {
        let diffuse = upload(ctx, env, "diffuse.png")?;
        let roughness = upload(ctx, env, "roughness.png")?;
        let normals = upload(ctx, env, "normal.png")?;
        let vertices = assets::load_vertices(&env.assets.join("plate.bin"))?;

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

        let vertex_buffer = ctx.create_buffer_with_data(BufferUsage::Vertex, &vertices)?;
        let common = UniformStream::new(ctx, &COMMON_LAYOUT)?;

        let background = ctx.create_pipeline(
            &PipelineDesc::new(
                "normal mapping background",
                ShaderStage::new(SHADER, "vs_background"),
                ShaderStage::new(SHADER, "fs_background")
                    .uniform_block("Common", 0)
                    .sampled("DiffuseTexture", 0),
                [color],
            )
            .include("fullscreen", FULLSCREEN_WGSL)
            .include("panorama", PANORAMA_WGSL)
            .binding(Binding::uniform_buffer("Common", 0, common.buffer()))
            .binding(Binding::sampled_image("DiffuseTexture", 0, diffuse))
            .vertex_count(3),
        )?;

        let plate = ctx
            .create_pipeline(
                &PipelineDesc::new(
                    "normal mapped plate",
                    ShaderStage::new(SHADER, "vs_plate").uniform_block("Common", 0),
                    ShaderStage::new(SHADER, "fs_plate")
                        .uniform_block("Common", 0)
                        .sampled("DiffuseTexture", 0)
                        .sampled("RoughnessTexture", 1)
                        .sampled("NormalTexture", 2),
                    [color, depth],
                )
                .include("fullscreen", FULLSCREEN_WGSL)
                .include("panorama", PANORAMA_WGSL)
                .binding(Binding::uniform_buffer("Common", 0, common.buffer()))
                .binding(Binding::sampled_image("DiffuseTexture", 0, diffuse))
                .binding(Binding::sampled_image("RoughnessTexture", 1, roughness))
                .binding(Binding::sampled_image("NormalTexture", 2, normals))
                .vertex_buffer(VertexBinding::new(vertex_buffer, VERTEX_FORMAT, &[0, 1, 2, 3])?)
                .cull_face(CullFace::Back),
            )
            .context("plate.bin must hold whole `3f 3f 2f 3f` vertices")?;

        Ok(Self {
            color,
            depth,
            output,
            aspect: w as f32 / h.max(1) as f32,
            common,
            background,
            plate,
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

        let offset = pointer_offset(params) * 2.0;
        let eye = offset.extend(3.0);
        let light = offset.extend(1.0);
        let camera = Camera::new(eye, Vec3::ZERO)
            .up(Vec3::Y)
            .fov(45.0)
            .aspect(self.aspect);
        self.common.update(
            ctx,
            &[
                camera.matrix().into(),
                eye.into(),
                light.into(),
                camera.ray_basis().into(),
            ],
        )?;

        self.background.render(ctx)?;
        self.plate.render(ctx)?;
        ctx.blit(self.color, Some(self.output))?;
        ctx.blit_region(self.output, Some(screen), None, None, Filter::Nearest)
    }
}

#[cfg(test)]
mod tests {
    use tessel_engine::backend::{CaptureBackend, Command};
    use tessel_engine::frame::{FrameLoop, HeadlessSource};

    use super::*;

    /// One triangle facing +z.
    fn plate() -> Vec<u8> {
        let vertices: [[f32; 11]; 3] = [
            [-1.0, -1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0],
            [1.0, -1.0, 0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.5, 1.0, 1.0, 0.0, 0.0],
        ];
        vertices.iter().flatten().flat_map(|v| v.to_ne_bytes()).collect()
    }

    fn write_assets(dir: &std::path::Path) {
        for name in ["diffuse.png", "roughness.png", "normal.png"] {
            assets::save_png(&dir.join(name), 4, 4, [128, 128, 255, 255].repeat(16)).unwrap();
        }
        std::fs::write(dir.join("plate.bin"), plate()).unwrap();
    }

    #[test]
    fn uniform_block_is_144_bytes() {
        let (_, size) = tessel_engine::uniform::std140_offsets(&COMMON_LAYOUT);
        assert_eq!(size, 144);
    }

    #[test]
    fn pointer_offset_is_centered_with_y_up() {
        let mut params = FrameParams::new((200, 100));
        params.mouse = Vec2::new(150.0, 25.0);
        assert_eq!(pointer_offset(&params), Vec2::new(0.25, 0.25));
    }

    #[test]
    fn frames_resolve_the_msaa_target_to_the_screen() {
        let dir = assets::scratch_dir("normal");
        write_assets(&dir);

        let mut ctx = Context::new(CaptureBackend::new());
        let screen = ctx
            .create_image(ImageDesc::new(32, 32, ImageFormat::Rgba8Unorm))
            .unwrap();
        let env = SceneEnv {
            size: (32, 32),
            assets: &dir,
        };
        let mut scene = NormalMapping::setup(&mut ctx, &env).unwrap();
        assert_eq!(scene.common.size(), 144);
        assert_eq!(scene.plate.vertex_count(), 3);
        ctx.backend_mut().take_commands();

        let mut source = HeadlessSource::new((32, 32), 2).with_pointer(Vec2::new(24.0, 8.0), false);
        let frames = FrameLoop::run(&mut ctx, &mut source, |ctx, params| {
            ctx.begin_frame()?;
            scene.draw(ctx, params, screen)?;
            ctx.end_frame()?;
            Ok(())
        })
        .unwrap();
        assert_eq!(frames, 2);

        let draws: Vec<u64> = ctx.backend().draws().map(|(_, prims)| prims).collect();
        assert_eq!(draws, vec![1, 1, 1, 1]);
        let resolves = ctx
            .backend()
            .commands()
            .iter()
            .filter(|c| matches!(c, Command::Blit { plan, .. } if plan.resolve))
            .count();
        assert_eq!(resolves, 2);
        assert!(
            ctx.backend()
                .commands()
                .iter()
                .any(|c| matches!(c, Command::Blit { plan, .. } if plan.dst == screen))
        );

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_textures_are_named() {
        let mut ctx = Context::new(CaptureBackend::new());
        let env = SceneEnv {
            size: (16, 16),
            assets: std::path::Path::new("no-such-assets-dir"),
        };
        let err = match NormalMapping::setup(&mut ctx, &env) {
            Err(err) => err,
            Ok(_) => panic!("normal mapping loaded without assets"),
        };
        assert!(format!("{err:#}").contains("diffuse.png"));
    }
}
