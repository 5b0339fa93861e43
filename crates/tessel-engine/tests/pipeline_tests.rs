use glam::{Mat4, Vec3};
use tessel_engine::backend::{CaptureBackend, Command};
use tessel_engine::pipeline::{Binding, PipelineDesc, ShaderStage, Topology, VertexBinding};
use tessel_engine::resource::{BufferUsage, ContentState, ImageDesc, ImageFormat, ImageId};
use tessel_engine::uniform::{UniformKind, UniformStream};
use tessel_engine::{Context, Error};

fn target(ctx: &mut Context<CaptureBackend>) -> ImageId {
    ctx.create_image(ImageDesc::new(16, 16, ImageFormat::Rgba8Unorm).texture(false))
        .unwrap()
}

fn stages() -> (ShaderStage, ShaderStage) {
    (
        ShaderStage::new("vertex source", "vs_main"),
        ShaderStage::new("fragment source", "fs_main"),
    )
}

#[test]
fn primitive_count_is_derived_from_the_vertex_buffer() {
    let mut ctx = Context::new(CaptureBackend::new());
    let color = target(&mut ctx);
    // 30 vertices of one vec3 each.
    let vertices = ctx
        .create_buffer_with_data(BufferUsage::Vertex, &[0; 360])
        .unwrap();
    let (vs, fs) = stages();
    let desc = PipelineDesc::new("triangles", vs, fs, vec![color])
        .vertex_buffer(VertexBinding::new(vertices, "3f", &[0]).unwrap())
        .topology(Topology::Triangles);

    let derived = ctx.create_pipeline(&desc).unwrap();
    let explicit = ctx.create_pipeline(&desc.clone().vertex_count(9)).unwrap();
    assert_eq!(derived.vertex_count(), 30);

    ctx.begin_frame().unwrap();
    derived.render(&mut ctx).unwrap();
    ctx.render(&explicit).unwrap();
    let stats = ctx.end_frame().unwrap();

    let primitives: Vec<u64> = ctx.backend().draws().map(|(_, p)| p).collect();
    assert_eq!(primitives, vec![10u64, 3]);
    assert_eq!(stats.draws, 2);
    assert_eq!(stats.primitives, 13);
    assert_eq!(ctx.image_info(color).unwrap().content, ContentState::Written);
}

#[test]
fn instanced_strips_multiply_primitives() {
    let mut ctx = Context::new(CaptureBackend::new());
    let color = target(&mut ctx);
    let (vs, fs) = stages();
    let pipeline = ctx
        .create_pipeline(
            &PipelineDesc::new("strip", vs, fs, vec![color])
                .topology(Topology::TriangleStrip)
                .vertex_count(15)
                .instance_count(100),
        )
        .unwrap();

    assert_eq!(pipeline.primitives_per_draw(), 1300);
}

#[test]
fn missing_vertex_count_is_a_binding_error() {
    let mut ctx = Context::new(CaptureBackend::new());
    let color = target(&mut ctx);
    let (vs, fs) = stages();

    let err = ctx
        .create_pipeline(&PipelineDesc::new("no count", vs, fs, vec![color]))
        .unwrap_err();
    assert!(matches!(err, Error::BindingError(_)));
}

#[test]
fn unbound_sampled_image_fails_at_construction() {
    let mut ctx = Context::new(CaptureBackend::new());
    let color = target(&mut ctx);
    let (vs, fs) = stages();
    let desc = PipelineDesc::new("textured", vs, fs.sampled("Texture", 0), vec![color])
        .vertex_count(3);

    let err = ctx.create_pipeline(&desc).unwrap_err();
    assert!(matches!(err, Error::BindingError(_)));
    assert!(
        !ctx
            .backend()
            .commands()
            .iter()
            .any(|c| matches!(c, Command::CreatePipeline { .. }))
    );
}

#[test]
fn bound_sampled_image_resolves() {
    let mut ctx = Context::new(CaptureBackend::new());
    let color = target(&mut ctx);
    let texture = ctx
        .create_image_with_data(ImageDesc::new(2, 2, ImageFormat::Rgba8Unorm), &[255; 16])
        .unwrap();
    let (vs, fs) = stages();
    let desc = PipelineDesc::new("textured", vs, fs.sampled("Texture", 0), vec![color])
        .binding(Binding::sampled_image("Texture", 0, texture))
        .vertex_count(3);

    let pipeline = ctx.create_pipeline(&desc).unwrap();

    let resolved = ctx.backend().pipeline(pipeline.id()).unwrap();
    assert_eq!(resolved.sampled.len(), 1);
    assert_eq!(resolved.sampled[0].image, texture);
}

#[test]
fn shader_includes_must_be_defined() {
    let mut ctx = Context::new(CaptureBackend::new());
    let color = target(&mut ctx);
    let desc = PipelineDesc::new(
        "includes",
        ShaderStage::new("#include \"fullscreen\"\nfn vs_main() {}", "vs_main"),
        ShaderStage::new("fn fs_main() {}", "fs_main"),
        vec![color],
    )
    .vertex_count(3);

    assert!(matches!(ctx.create_pipeline(&desc), Err(Error::BindingError(_))));
    ctx.create_pipeline(&desc.include("fullscreen", "// shared"))
        .unwrap();
}

#[test]
fn uniform_update_is_ordered_before_the_draw() {
    let mut ctx = Context::new(CaptureBackend::new());
    let color = target(&mut ctx);
    let mut stream = UniformStream::new(&mut ctx, &[UniformKind::Mat4, UniformKind::Vec3]).unwrap();
    assert_eq!(stream.size(), 80);

    let (vs, fs) = stages();
    let pipeline = ctx
        .create_pipeline(
            &PipelineDesc::new("lit", vs.uniform_block("Camera", 0), fs, vec![color])
                .binding(Binding::uniform_buffer("Camera", 0, stream.buffer()))
                .vertex_count(3),
        )
        .unwrap();
    ctx.backend_mut().take_commands();

    ctx.begin_frame().unwrap();
    stream
        .update(&mut ctx, &[Mat4::IDENTITY.into(), Vec3::new(1.0, 2.0, 3.0).into()])
        .unwrap();
    ctx.render(&pipeline).unwrap();
    stream
        .update(&mut ctx, &[Mat4::IDENTITY.into(), Vec3::new(4.0, 5.0, 6.0).into()])
        .unwrap();
    ctx.render(&pipeline).unwrap();
    ctx.end_frame().unwrap();

    let order: Vec<&str> = ctx
        .backend()
        .commands()
        .iter()
        .filter_map(|c| match c {
            Command::WriteBuffer { offset: 0, len: 80, .. } => Some("uniforms"),
            Command::Draw { .. } => Some("draw"),
            _ => None,
        })
        .collect();
    assert_eq!(order, ["uniforms", "draw", "uniforms", "draw"]);

    let bytes = ctx.backend().buffer_bytes(stream.buffer()).unwrap();
    let x = f32::from_ne_bytes(bytes[64..68].try_into().unwrap());
    assert_eq!(x, 4.0);
}

#[test]
fn uniform_values_must_follow_the_layout() {
    let mut ctx = Context::new(CaptureBackend::new());
    let mut stream = UniformStream::new(&mut ctx, &[UniformKind::Mat4, UniformKind::Vec3]).unwrap();

    let err = stream
        .update(&mut ctx, &[Vec3::ONE.into(), Mat4::IDENTITY.into()])
        .unwrap_err();
    assert!(matches!(err, Error::BindingError(_)));
}
