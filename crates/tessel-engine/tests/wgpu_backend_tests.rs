use tessel_engine::backend::WgpuBackend;
use tessel_engine::device::{Gpu, GpuInit};
use tessel_engine::pipeline::{PipelineDesc, ShaderStage};
use tessel_engine::resource::{ImageDesc, ImageFormat, ImageId};
use tessel_engine::{Context, Error};

const TRIANGLE: &str = r#"
@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> @builtin(position) vec4<f32> {
    let x = f32(i32(index) - 1);
    let y = f32(i32(index & 1u) * 2 - 1);
    return vec4<f32>(x, y, 0.0, 1.0);
}

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(1.0, 0.0, 0.0, 1.0);
}
"#;

/// Headless context, or `None` on machines without a usable adapter.
fn headless() -> Option<(Context<WgpuBackend<'static>>, ImageId)> {
    let gpu = match pollster::block_on(Gpu::new_headless(GpuInit::default())) {
        Ok(gpu) => gpu,
        Err(err) => {
            eprintln!("skipping: {err:#}");
            return None;
        }
    };
    let mut ctx = Context::new(WgpuBackend::new(gpu));
    let target = ctx
        .create_image(ImageDesc::new(16, 16, ImageFormat::Rgba8Unorm).texture(false))
        .unwrap();
    Some((ctx, target))
}

#[test]
fn invalid_wgsl_is_a_backend_error() {
    let Some((mut ctx, target)) = headless() else {
        return;
    };
    let desc = PipelineDesc::new(
        "broken",
        ShaderStage::new("this is not wgsl", "vs_main"),
        ShaderStage::new(TRIANGLE, "fs_main"),
        vec![target],
    )
    .vertex_count(3);

    let err = ctx.create_pipeline(&desc).unwrap_err();
    assert!(matches!(err, Error::Backend(_)), "{err:?}");
}

#[test]
fn valid_wgsl_still_builds_after_a_failure() {
    let Some((mut ctx, target)) = headless() else {
        return;
    };
    let broken = PipelineDesc::new(
        "broken",
        ShaderStage::new(TRIANGLE, "vs_main"),
        ShaderStage::new("fn fs_main( {", "fs_main"),
        vec![target],
    )
    .vertex_count(3);
    assert!(matches!(ctx.create_pipeline(&broken), Err(Error::Backend(_))));

    let valid = PipelineDesc::new(
        "triangle",
        ShaderStage::new(TRIANGLE, "vs_main"),
        ShaderStage::new(TRIANGLE, "fs_main"),
        vec![target],
    )
    .vertex_count(3);
    let pipeline = ctx.create_pipeline(&valid).unwrap();

    ctx.begin_frame().unwrap();
    ctx.render(&pipeline).unwrap();
    let stats = ctx.end_frame().unwrap();
    assert_eq!(stats.draws, 1);
}
