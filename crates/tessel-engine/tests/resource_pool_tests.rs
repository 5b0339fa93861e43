use tessel_engine::backend::CaptureBackend;
use tessel_engine::resource::{
    BufferDesc, ContentState, ImageDesc, ImageFormat, PoolLimits, Region,
};
use tessel_engine::{Context, Error};

fn capture() -> Context<CaptureBackend> {
    Context::new(CaptureBackend::new())
}

fn gradient(w: u32, h: u32) -> Vec<u8> {
    (0..w * h * 4).map(|i| (i % 251) as u8).collect()
}

#[test]
fn write_then_read_returns_the_same_bytes() {
    let mut ctx = capture();
    let img = ctx
        .create_image(ImageDesc::new(8, 4, ImageFormat::Rgba8Unorm))
        .unwrap();
    let data = gradient(8, 4);

    ctx.write(img, &data).unwrap();

    assert_eq!(ctx.read(img).unwrap(), data);
    assert_eq!(ctx.image_info(img).unwrap().content, ContentState::Written);
}

#[test]
fn write_with_the_wrong_length_is_a_size_mismatch() {
    let mut ctx = capture();
    let img = ctx
        .create_image(ImageDesc::new(8, 4, ImageFormat::Rgba8Unorm))
        .unwrap();

    let err = ctx.write(img, &[0; 127]).unwrap_err();
    assert_eq!(
        err,
        Error::SizeMismatch {
            expected: 128,
            actual: 127
        }
    );
    assert_eq!(ctx.image_info(img).unwrap().content, ContentState::Undefined);
}

#[test]
fn region_write_outside_the_image_is_out_of_bounds() {
    let mut ctx = capture();
    let img = ctx
        .create_image(ImageDesc::new(8, 8, ImageFormat::Rgba8Unorm))
        .unwrap();

    let err = ctx
        .write_region(img, &[0; 4 * 4 * 4], Region::new(6, 6, 4, 4))
        .unwrap_err();
    assert!(matches!(err, Error::OutOfBounds { width: 8, height: 8, .. }));
}

#[test]
fn region_write_changes_only_the_region() {
    let mut ctx = capture();
    let img = ctx
        .create_image(ImageDesc::new(4, 4, ImageFormat::R8Unorm))
        .unwrap();
    ctx.write(img, &[1; 16]).unwrap();

    ctx.write_region(img, &[9; 4], Region::new(1, 1, 2, 2)).unwrap();

    let bytes = ctx.read(img).unwrap();
    #[rustfmt::skip]
    let expected = [
        1, 1, 1, 1,
        1, 9, 9, 1,
        1, 9, 9, 1,
        1, 1, 1, 1,
    ];
    assert_eq!(bytes, expected);
    assert_eq!(ctx.read_region(img, Region::new(1, 1, 2, 2)).unwrap(), vec![9; 4]);
}

#[test]
fn clear_is_idempotent() {
    let mut ctx = capture();
    let img = ctx
        .create_image(ImageDesc::new(4, 4, ImageFormat::Rgba8Unorm))
        .unwrap();
    ctx.write(img, &gradient(4, 4)).unwrap();

    ctx.begin_frame().unwrap();
    ctx.clear(img).unwrap();
    ctx.end_frame().unwrap();
    let once = ctx.read(img).unwrap();

    ctx.begin_frame().unwrap();
    ctx.clear(img).unwrap();
    ctx.clear(img).unwrap();
    ctx.end_frame().unwrap();
    let twice = ctx.read(img).unwrap();

    assert_eq!(once, vec![0; 64]);
    assert_eq!(once, twice);
    assert_eq!(ctx.image_info(img).unwrap().content, ContentState::Cleared);
}

#[test]
fn blit_copies_bytes_exactly() {
    let mut ctx = capture();
    let src = ctx
        .create_image(ImageDesc::new(64, 64, ImageFormat::Rgba8Unorm))
        .unwrap();
    let dst = ctx
        .create_image(ImageDesc::new(64, 64, ImageFormat::Rgba8Unorm))
        .unwrap();
    ctx.write(src, &vec![0; 64 * 64 * 4]).unwrap();
    let red: Vec<u8> = [255, 0, 0, 255].repeat(64 * 64);

    ctx.begin_frame().unwrap();
    ctx.clear(src).unwrap();
    ctx.write(src, &red).unwrap();
    ctx.blit(src, Some(dst)).unwrap();
    let stats = ctx.end_frame().unwrap();

    assert_eq!(ctx.read(dst).unwrap(), red);
    assert_eq!(ctx.image_info(dst).unwrap().content, ContentState::Written);
    assert_eq!(stats.blits, 1);
    assert_eq!(stats.clears, 1);
}

#[test]
fn blit_without_destination_needs_a_presentable_image() {
    let mut ctx = capture();
    let src = ctx
        .create_image(ImageDesc::new(4, 4, ImageFormat::Rgba8Unorm))
        .unwrap();

    ctx.begin_frame().unwrap();
    assert!(matches!(ctx.blit(src, None), Err(Error::InvalidBlit(_))));
}

#[test]
fn presentable_image_is_shown_and_then_undefined() {
    let mut ctx = Context::new(CaptureBackend::new().with_surface(ImageFormat::Rgba8Unorm, 2, 2));
    let screen = ctx
        .create_image(ImageDesc::presentable(2, 2, ImageFormat::Rgba8Unorm))
        .unwrap();
    let src = ctx
        .create_image(ImageDesc::new(2, 2, ImageFormat::Rgba8Unorm))
        .unwrap();
    let data = gradient(2, 2);
    ctx.write(src, &data).unwrap();

    ctx.begin_frame().unwrap();
    ctx.blit(src, None).unwrap();
    ctx.end_frame().unwrap();
    assert_eq!(ctx.image_info(screen).unwrap().content, ContentState::Written);

    ctx.present().unwrap();

    assert_eq!(ctx.backend().presented(), Some(data.as_slice()));
    assert_eq!(ctx.image_info(screen).unwrap().content, ContentState::Undefined);
    assert_eq!(ctx.presentable(), Some(screen));
}

#[test]
fn presentable_image_must_match_the_surface() {
    let mut ctx = Context::new(CaptureBackend::new().with_surface(ImageFormat::Bgra8Unorm, 2, 2));

    let wrong_format = ctx.create_image(ImageDesc::presentable(2, 2, ImageFormat::Rgba8Unorm));
    assert!(matches!(wrong_format, Err(Error::InvalidFormat(_))));

    ctx.create_image(ImageDesc::presentable(2, 2, ImageFormat::Bgra8Unorm))
        .unwrap();
    let second = ctx.create_image(ImageDesc::presentable(2, 2, ImageFormat::Bgra8Unorm));
    assert!(matches!(second, Err(Error::InvalidFormat(_))));
}

#[test]
fn presentable_image_is_write_only() {
    let mut ctx = Context::new(CaptureBackend::new().with_surface(ImageFormat::Rgba8Unorm, 2, 2));
    let screen = ctx
        .create_image(ImageDesc::presentable(2, 2, ImageFormat::Rgba8Unorm))
        .unwrap();

    assert!(matches!(ctx.write(screen, &[0; 16]), Err(Error::InvalidFormat(_))));
    assert!(matches!(ctx.read(screen), Err(Error::InvalidFormat(_))));
}

#[test]
fn memory_budget_is_enforced() {
    let limits = PoolLimits {
        memory_budget: Some(1024),
        ..PoolLimits::default()
    };
    let mut ctx = Context::new(CaptureBackend::new().with_limits(limits));

    ctx.create_image(ImageDesc::new(16, 8, ImageFormat::Rgba8Unorm))
        .unwrap();
    assert_eq!(ctx.pool().allocated_bytes(), 512);

    let err = ctx
        .create_image(ImageDesc::new(16, 16, ImageFormat::Rgba8Unorm))
        .unwrap_err();
    assert!(matches!(err, Error::CapacityExceeded(_)));

    ctx.create_buffer(BufferDesc::uniform(512)).unwrap();
    assert!(matches!(
        ctx.create_buffer(BufferDesc::uniform(1)),
        Err(Error::CapacityExceeded(_))
    ));
}

#[test]
fn oversized_images_are_rejected() {
    let mut ctx = capture();
    let err = ctx
        .create_image(ImageDesc::new(8193, 1, ImageFormat::R8Unorm))
        .unwrap_err();
    assert!(matches!(err, Error::CapacityExceeded(_)));
}

#[test]
fn unsupported_formats_and_sample_counts_are_invalid() {
    let mut ctx = Context::new(
        CaptureBackend::new()
            .without_format(ImageFormat::Depth24PlusStencil8)
            .with_sample_counts(&[1]),
    );

    let depth = ctx.create_image(
        ImageDesc::new(4, 4, ImageFormat::Depth24PlusStencil8).texture(false),
    );
    assert!(matches!(depth, Err(Error::InvalidFormat(_))));

    let msaa = ctx.create_image(
        ImageDesc::new(4, 4, ImageFormat::Rgba8Unorm)
            .samples(4)
            .texture(false),
    );
    assert!(matches!(msaa, Err(Error::InvalidFormat(_))));
}

#[test]
fn multisampled_color_resolves_into_a_single_sampled_image() {
    let mut ctx = capture();
    let msaa = ctx
        .create_image(
            ImageDesc::new(4, 4, ImageFormat::Rgba8Unorm)
                .samples(4)
                .texture(false),
        )
        .unwrap();
    let out = ctx
        .create_image(ImageDesc::new(4, 4, ImageFormat::Rgba8Unorm))
        .unwrap();
    let small = ctx
        .create_image(ImageDesc::new(2, 2, ImageFormat::Rgba8Unorm))
        .unwrap();

    ctx.begin_frame().unwrap();
    ctx.clear(msaa).unwrap();
    assert!(matches!(ctx.blit(msaa, Some(small)), Err(Error::InvalidBlit(_))));
    ctx.blit(msaa, Some(out)).unwrap();
    ctx.end_frame().unwrap();

    assert_eq!(ctx.read(out).unwrap(), vec![0; 64]);
    assert!(matches!(ctx.read(msaa), Err(Error::InvalidFormat(_))));
}
