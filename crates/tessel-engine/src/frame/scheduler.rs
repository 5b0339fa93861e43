use crate::error::{Error, Result};

/// Scheduler state. Frames never nest.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum FrameState {
    #[default]
    Idle,
    Open,
}

/// Commands issued during one frame.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub struct FrameStats {
    pub frame_index: u64,
    pub clears: u32,
    pub image_writes: u32,
    pub buffer_writes: u32,
    pub draws: u32,
    pub blits: u32,
    /// Primitives assembled across all draws, instances included.
    pub primitives: u64,
}

/// `Idle -> Open -> Idle` state machine with per-frame counters.
///
/// Commands are never reordered or deferred here; the scheduler only decides
/// whether a command is legal in the current state.
#[derive(Debug, Default)]
pub struct FrameScheduler {
    state: FrameState,
    next_index: u64,
    stats: FrameStats,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == FrameState::Open
    }

    /// Number of frames begun so far.
    pub fn frames_begun(&self) -> u64 {
        self.next_index
    }

    /// Counters of the open frame, or of the last finished one.
    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    pub fn begin(&mut self) -> Result<u64> {
        if self.is_open() {
            return Err(Error::FrameAlreadyOpen);
        }
        let index = self.next_index;
        self.next_index += 1;
        self.state = FrameState::Open;
        self.stats = FrameStats {
            frame_index: index,
            ..FrameStats::default()
        };
        log::trace!("frame {index}: begin");
        Ok(index)
    }

    pub fn end(&mut self) -> Result<FrameStats> {
        self.require_open()?;
        self.state = FrameState::Idle;
        let s = self.stats;
        log::trace!(
            "frame {}: end (clears={} writes={}+{} draws={} blits={} primitives={})",
            s.frame_index,
            s.clears,
            s.image_writes,
            s.buffer_writes,
            s.draws,
            s.blits,
            s.primitives
        );
        Ok(s)
    }

    pub fn require_open(&self) -> Result<()> {
        match self.state {
            FrameState::Open => Ok(()),
            FrameState::Idle => Err(Error::NoFrameOpen),
        }
    }

    pub fn require_idle(&self) -> Result<()> {
        match self.state {
            FrameState::Idle => Ok(()),
            FrameState::Open => Err(Error::FrameAlreadyOpen),
        }
    }

    pub(crate) fn record_clear(&mut self) {
        self.stats.clears += 1;
    }

    pub(crate) fn record_blit(&mut self) {
        self.stats.blits += 1;
    }

    pub(crate) fn record_draw(&mut self, primitives: u64) {
        self.stats.draws += 1;
        self.stats.primitives += primitives;
    }

    /// Writes are legal outside frames; only in-frame writes are counted.
    pub(crate) fn record_image_write(&mut self) {
        if self.is_open() {
            self.stats.image_writes += 1;
        }
    }

    pub(crate) fn record_buffer_write(&mut self) {
        if self.is_open() {
            self.stats.buffer_writes += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_twice_fails() {
        let mut s = FrameScheduler::new();
        assert_eq!(s.begin(), Ok(0));
        assert_eq!(s.begin(), Err(Error::FrameAlreadyOpen));
        assert!(s.is_open());
    }

    #[test]
    fn end_without_begin_fails() {
        let mut s = FrameScheduler::new();
        assert_eq!(s.end(), Err(Error::NoFrameOpen));
        s.begin().unwrap();
        s.end().unwrap();
        assert_eq!(s.end(), Err(Error::NoFrameOpen));
    }

    #[test]
    fn stats_reset_each_frame() {
        let mut s = FrameScheduler::new();
        s.begin().unwrap();
        s.record_clear();
        s.record_draw(12);
        s.record_draw(4);
        let first = s.end().unwrap();
        assert_eq!(first.draws, 2);
        assert_eq!(first.primitives, 16);

        s.record_buffer_write();
        assert_eq!(s.begin(), Ok(1));
        let second = s.end().unwrap();
        assert_eq!(second, FrameStats { frame_index: 1, ..FrameStats::default() });
    }
}
