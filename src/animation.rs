//! The animation lifecycle contract and the built-in text animations.
//!
//! The sequencer drives every animation through the same calls:
//!
//! 1. `on_enter` exactly once when it becomes active (starts background text
//!    acquisition, never blocks)
//! 2. `update(dt)` then `render(frame)` once per tick
//! 3. `handle_input` for actions while it is the active entry
//! 4. `on_exit` exactly once, which stops background work within the teardown grace
//!    period
//!
//! `update` and `render` never perform I/O; text is read from the latest published
//! snapshot of the animation's [`TextSource`](crate::source::TextSource).

pub mod fade;
pub mod pulsing;
pub mod scrolling;
pub mod static_text;
pub mod text;
pub mod typewriter;

pub use fade::FadeText;
pub use pulsing::PulsingText;
pub use scrolling::ScrollingText;
pub use static_text::StaticText;
pub use text::{ColorMode, TextContent, TextStyle};
pub use typewriter::TypewriterText;

use crate::error::Result;
use crate::frame::Frame;
use crate::input::Action;
use crate::status::StatusSender;
use async_trait::async_trait;
use std::time::Duration;

#[async_trait]
pub trait Animation: Send {
    fn name(&self) -> &str;

    fn on_enter(&mut self);

    fn update(&mut self, dt: Duration);

    fn render(&self, frame: &mut Frame);

    /// Returns true when the action was consumed.
    fn handle_input(&mut self, _action: &Action) -> bool {
        false
    }

    async fn on_exit(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Shared inputs for constructing animations.
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub width: usize,
    pub height: usize,
    pub events: StatusSender,
    pub teardown_grace: Duration,
}

impl BuildContext {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            events: StatusSender::disabled(),
            teardown_grace: Duration::from_millis(500),
        }
    }

    pub fn with_events(mut self, events: StatusSender) -> Self {
        self.events = events;
        self
    }

    pub fn with_teardown_grace(mut self, grace: Duration) -> Self {
        self.teardown_grace = grace;
        self
    }
}
