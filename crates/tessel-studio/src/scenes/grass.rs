use anyhow::Result;
use glam::Vec3;
use tessel_engine::backend::Backend;
use tessel_engine::frame::FrameParams;
use tessel_engine::pipeline::{Binding, Filter, Pipeline, PipelineDesc, ShaderStage, Topology};
use tessel_engine::resource::{ImageDesc, ImageFormat, ImageId};
use tessel_engine::uniform::{Camera, UniformKind, UniformStream};
use tessel_engine::Context;

use super::{Scene, SceneEnv};

const SHADER: &str = include_str!("../shaders/grass.wgsl");

/// Blades per side of the field.
const FIELD: u32 = 200;
const SAMPLES: u32 = 4;
/// Vertices in one blade strip.
const BLADE_VERTICES: u32 = 15;

/// A field of instanced grass blades orbited by the camera.
pub struct Grass {
    color: ImageId,
    depth: ImageId,
    /// Resolve target; the color image itself when not multisampled.
    output: ImageId,
    camera: UniformStream,
    blades: Pipeline,
}

impl Scene for Grass {
    fn setup<B: Backend>(ctx: &mut Context<B>, env: &SceneEnv<'_>) -> Result<Self> {
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
        let output = if SAMPLES == 1 {
            color
        } else {
            ctx.create_image(ImageDesc::new(w, h, ImageFormat::Rgba8Unorm))?
        };

        let camera = UniformStream::new(ctx, &[UniformKind::Mat4])?;
        let blades = ctx.create_pipeline(
            &PipelineDesc::new(
                "grass",
                ShaderStage::new(SHADER, "vs_main").uniform_block("Camera", 0),
                ShaderStage::new(SHADER, "fs_main"),
                [color, depth],
            )
            .include("N", format!("const N: i32 = {FIELD};"))
            .include("grass", blade_mesh())
            .binding(Binding::uniform_buffer("Camera", 0, camera.buffer()))
            .topology(Topology::TriangleStrip)
            .vertex_count(BLADE_VERTICES)
            .instance_count(FIELD * FIELD),
        )?;

        Ok(Self {
            color,
            depth,
            output,
            camera,
            blades,
        })
    }

    fn draw<B: Backend>(
        &mut self,
        ctx: &mut Context<B>,
        params: &FrameParams,
        screen: ImageId,
    ) -> tessel_engine::Result<()> {
        let t = params.time * 0.2;
        let eye = Vec3::new(t.cos() * 12.0, t.sin() * 12.0, 4.0);
        let camera = Camera::new(eye, Vec3::ZERO)
            .fov(45.0)
            .aspect(params.aspect());
        self.camera.update(ctx, &[camera.matrix().into()])?;

        ctx.clear(self.color)?;
        ctx.clear(self.depth)?;
        self.blades.render(ctx)?;
        if self.output != self.color {
            ctx.blit(self.color, Some(self.output))?;
        }
        ctx.blit_region(self.output, Some(screen), None, None, Filter::Nearest)
    }
}

/// WGSL constant holding one blade as a 15-vertex triangle strip.
fn blade_mesh() -> String {
    let mut verts = Vec::with_capacity(BLADE_VERTICES as usize);
    for i in 0..7 {
        let u = i as f32 / 7.0;
        let v = (u * u * (std::f32::consts::PI - 1.0) + 1.0).sin();
        verts.push([-v * 0.03, u * u * 0.2, u]);
        verts.push([v * 0.03, u * u * 0.2, u]);
    }
    verts.push([0.0, 0.2, 1.0]);

    let body = verts
        .iter()
        .map(|[x, y, z]| format!("vec3<f32>({x:.8}, {y:.8}, {z:.8})"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("const GRASS = array<vec3<f32>, {}>({body});", verts.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blade_mesh_has_one_entry_per_vertex() {
        let mesh = blade_mesh();
        assert!(mesh.starts_with("const GRASS = array<vec3<f32>, 15>("));
        assert_eq!(mesh.matches("vec3<f32>(").count(), BLADE_VERTICES as usize);
        assert!(mesh.ends_with("vec3<f32>(0.00000000, 0.20000000, 1.00000000));"));
    }
}
