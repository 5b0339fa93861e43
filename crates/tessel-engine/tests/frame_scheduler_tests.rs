use std::cell::Cell;
use std::rc::Rc;

use tessel_engine::backend::{CaptureBackend, Command};
use tessel_engine::frame::{FrameLoop, FrameParams, FrameSource, FrameState, HeadlessSource, Poll};
use tessel_engine::resource::{ImageDesc, ImageFormat};
use tessel_engine::{Context, Error};

fn capture() -> Context<CaptureBackend> {
    Context::new(CaptureBackend::new())
}

#[test]
fn begin_twice_is_rejected() {
    let mut ctx = capture();
    assert_eq!(ctx.begin_frame().unwrap(), 0);
    assert_eq!(ctx.begin_frame().unwrap_err(), Error::FrameAlreadyOpen);
    assert_eq!(ctx.frame_state(), FrameState::Open);
}

#[test]
fn end_without_begin_is_rejected() {
    let mut ctx = capture();
    assert_eq!(ctx.end_frame().unwrap_err(), Error::NoFrameOpen);
    assert_eq!(ctx.frame_state(), FrameState::Idle);
}

#[test]
fn frame_operations_need_an_open_frame() {
    let mut ctx = capture();
    let a = ctx
        .create_image(ImageDesc::new(4, 4, ImageFormat::Rgba8Unorm))
        .unwrap();
    let b = ctx
        .create_image(ImageDesc::new(4, 4, ImageFormat::Rgba8Unorm))
        .unwrap();

    assert_eq!(ctx.clear(a).unwrap_err(), Error::NoFrameOpen);
    assert_eq!(ctx.blit(a, Some(b)).unwrap_err(), Error::NoFrameOpen);
}

#[test]
fn readback_and_present_need_an_idle_scheduler() {
    let mut ctx = capture();
    let img = ctx
        .create_image(ImageDesc::new(4, 4, ImageFormat::Rgba8Unorm))
        .unwrap();

    ctx.begin_frame().unwrap();
    assert_eq!(ctx.read(img).unwrap_err(), Error::FrameAlreadyOpen);
    assert_eq!(ctx.present().unwrap_err(), Error::FrameAlreadyOpen);
    ctx.end_frame().unwrap();

    ctx.read(img).unwrap();
    ctx.present().unwrap();
}

#[test]
fn writes_are_legal_outside_frames() {
    let mut ctx = capture();
    let img = ctx
        .create_image(ImageDesc::new(2, 2, ImageFormat::R8Unorm))
        .unwrap();

    ctx.write(img, &[1, 2, 3, 4]).unwrap();
    ctx.begin_frame().unwrap();
    ctx.write(img, &[5, 6, 7, 8]).unwrap();
    let stats = ctx.end_frame().unwrap();

    assert_eq!(stats.image_writes, 1);
    assert_eq!(ctx.read(img).unwrap(), vec![5, 6, 7, 8]);
}

#[test]
fn frame_indices_increase_and_stats_reset() {
    let mut ctx = capture();
    let img = ctx
        .create_image(ImageDesc::new(2, 2, ImageFormat::Rgba8Unorm))
        .unwrap();

    ctx.begin_frame().unwrap();
    ctx.clear(img).unwrap();
    let first = ctx.end_frame().unwrap();

    assert_eq!(ctx.begin_frame().unwrap(), 1);
    let second = ctx.end_frame().unwrap();

    assert_eq!(first.frame_index, 0);
    assert_eq!(first.clears, 1);
    assert_eq!(second.frame_index, 1);
    assert_eq!(second.clears, 0);
}

#[test]
fn backend_sees_commands_in_call_order() {
    let mut ctx = capture();
    let a = ctx
        .create_image(ImageDesc::new(2, 2, ImageFormat::Rgba8Unorm))
        .unwrap();
    let b = ctx
        .create_image(ImageDesc::new(2, 2, ImageFormat::Rgba8Unorm))
        .unwrap();
    ctx.backend_mut().take_commands();

    ctx.begin_frame().unwrap();
    ctx.clear(b).unwrap();
    ctx.clear(a).unwrap();
    ctx.blit(a, Some(b)).unwrap();
    ctx.end_frame().unwrap();
    ctx.present().unwrap();

    let kinds: Vec<&str> = ctx
        .backend()
        .commands()
        .iter()
        .map(|c| match c {
            Command::BeginFrame => "begin",
            Command::Clear(id) if *id == a => "clear a",
            Command::Clear(_) => "clear b",
            Command::Blit { .. } => "blit",
            Command::EndFrame => "end",
            Command::Present => "present",
            _ => "other",
        })
        .collect();
    assert_eq!(kinds, ["begin", "clear b", "clear a", "blit", "end", "present"]);
}

#[test]
fn frame_loop_runs_the_requested_number_of_frames() {
    let mut ctx = capture();
    let mut source = HeadlessSource::new((8, 8), 5).with_dt(0.5);
    let mut times = Vec::new();

    let frames = FrameLoop::run(&mut ctx, &mut source, |ctx, params| {
        times.push(params.time);
        ctx.begin_frame()?;
        ctx.end_frame()?;
        Ok(())
    })
    .unwrap();

    assert_eq!(frames, 5);
    assert_eq!(times, vec![0.0f32, 0.5, 1.0, 1.5, 2.0]);
    let presents = ctx
        .backend()
        .commands()
        .iter()
        .filter(|c| **c == Command::Present)
        .count();
    assert_eq!(presents, 5);
}

#[test]
fn frame_loop_rejects_a_frame_left_open() {
    let mut ctx = capture();
    let mut source = HeadlessSource::new((8, 8), 3);

    let result = FrameLoop::run(&mut ctx, &mut source, |ctx, _| {
        ctx.begin_frame()?;
        Ok(())
    });

    assert!(result.is_err());
    assert!(ctx.frame_open());
    assert!(!ctx.backend().commands().contains(&Command::Present));
}

/// Source whose quit flag can be raised from inside a frame.
struct FlagSource {
    quit: Rc<Cell<bool>>,
    polls: u32,
    yields: u32,
}

impl FrameSource for FlagSource {
    fn poll(&mut self) -> Poll {
        self.polls += 1;
        if self.quit.get() {
            Poll::Quit
        } else {
            Poll::Continue
        }
    }

    fn params(&mut self) -> FrameParams {
        FrameParams::new((8, 8))
    }

    fn yield_now(&mut self) {
        self.yields += 1;
    }
}

#[test]
fn quit_is_observed_only_at_the_top_of_an_iteration() {
    let mut ctx = capture();
    let quit = Rc::new(Cell::new(false));
    let mut source = FlagSource {
        quit: quit.clone(),
        polls: 0,
        yields: 0,
    };

    let frames = FrameLoop::run(&mut ctx, &mut source, |ctx, _| {
        ctx.begin_frame()?;
        quit.set(true);
        ctx.end_frame()?;
        Ok(())
    })
    .unwrap();

    assert_eq!(frames, 1);
    assert_eq!(source.polls, 2);
    assert_eq!(source.yields, 1);
    assert_eq!(ctx.backend().commands().last(), Some(&Command::Present));
}
