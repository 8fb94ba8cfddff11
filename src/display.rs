//! Display sinks: where composed frames go.
//!
//! The sequencer writes every pixel of a frame and then flushes once per tick. A
//! failing write or flush skips that tick; the sequencer decides when repeated
//! failures become fatal.

pub mod terminal;

pub use terminal::TerminalSink;

use crate::error::{LedseqError, Result};
use crate::frame::{Frame, Rgb};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Default grid geometry (17×7).
pub const DEFAULT_WIDTH: usize = 17;
pub const DEFAULT_HEIGHT: usize = 7;

/// Pixel-addressed output device.
pub trait DisplaySink: Send {
    /// Grid size as `(width, height)`
    fn dimensions(&self) -> (usize, usize);

    fn write_pixel(&mut self, x: usize, y: usize, color: Rgb) -> Result<()>;

    /// Present everything written since the previous flush.
    fn flush(&mut self) -> Result<()>;

    /// Write a whole frame and flush it.
    fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        for (x, y, color) in frame.pixels() {
            self.write_pixel(x, y, color)?;
        }
        self.flush()
    }
}

#[derive(Debug, Default)]
struct Recorded {
    frames: VecDeque<Frame>,
    flushed: u64,
    fail_next: u32,
    failing: bool,
}

/// In-memory sink. Keeps flushed frames for inspection through a [`MemorySinkHandle`].
#[derive(Debug)]
pub struct MemorySink {
    pending: Frame,
    retain: Option<usize>,
    shared: Arc<Mutex<Recorded>>,
}

/// Observer and fault injector for a [`MemorySink`] that has been handed off.
#[derive(Debug, Clone)]
pub struct MemorySinkHandle {
    shared: Arc<Mutex<Recorded>>,
}

impl MemorySink {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            pending: Frame::new(width, height),
            retain: None,
            shared: Arc::new(Mutex::new(Recorded::default())),
        }
    }

    /// Keep at most `count` frames; older frames are dropped.
    pub fn retain_last(mut self, count: usize) -> Self {
        self.retain = Some(count);
        self
    }

    pub fn handle(&self) -> MemorySinkHandle {
        MemorySinkHandle {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl DisplaySink for MemorySink {
    fn dimensions(&self) -> (usize, usize) {
        (self.pending.width(), self.pending.height())
    }

    fn write_pixel(&mut self, x: usize, y: usize, color: Rgb) -> Result<()> {
        if x >= self.pending.width() || y >= self.pending.height() {
            return Err(LedseqError::display_sink(format!(
                "pixel ({x}, {y}) is outside the {}x{} grid",
                self.pending.width(),
                self.pending.height()
            )));
        }
        self.pending.set(x as i32, y as i32, color);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        let mut recorded = self.shared.lock();
        if recorded.failing {
            return Err(LedseqError::display_sink("device unavailable"));
        }
        if recorded.fail_next > 0 {
            recorded.fail_next -= 1;
            return Err(LedseqError::display_sink("transient flush failure"));
        }
        recorded.frames.push_back(self.pending.clone());
        recorded.flushed += 1;
        if let Some(limit) = self.retain {
            while recorded.frames.len() > limit {
                recorded.frames.pop_front();
            }
        }
        Ok(())
    }
}

impl MemorySinkHandle {
    /// Frames currently retained, oldest first.
    pub fn frames(&self) -> Vec<Frame> {
        self.shared.lock().frames.iter().cloned().collect()
    }

    pub fn last_frame(&self) -> Option<Frame> {
        self.shared.lock().frames.back().cloned()
    }

    /// Number of successful flushes since creation.
    pub fn flush_count(&self) -> u64 {
        self.shared.lock().flushed
    }

    /// Make the next `count` flushes fail.
    pub fn fail_next(&self, count: u32) {
        self.shared.lock().fail_next = count;
    }

    /// Make every flush fail until cleared.
    pub fn set_failing(&self, failing: bool) {
        self.shared.lock().failing = failing;
    }
}
