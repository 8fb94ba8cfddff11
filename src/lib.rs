//! # ledseq - Animation Sequencer for Small Pixel Grids
//!
//! Plays a configured run list of text animations on a small RGB pixel grid (17×7 by
//! default), with transitions between entries, button input, and live text pulled
//! from files, stdin, HTTP endpoints or shell commands.
//!
//! ## Architecture
//!
//! - [`config`] - Run-file loading and validated animation options
//! - [`registry`] - Name-keyed animation constructors
//! - [`animation`] - The animation lifecycle contract and built-in text animations
//! - [`source`] - Text sources that refresh concurrently with rendering
//! - [`sequencer`] - The frame loop and transition state machine
//! - [`input`] - Button events coalesced into actions
//! - [`display`] - Display sinks (terminal simulator, in-memory)
//! - [`status`] - Structured status events
//! - [`error`] - Centralized error types

// Core modules
pub mod error;
pub mod frame;
pub mod status;

// Configuration and construction
pub mod config;
pub mod registry;

// Content
pub mod animation;
pub mod font;
pub mod source;

// Playback
pub mod display;
pub mod input;
pub mod sequencer;

// Re-export commonly used types for convenience
pub use error::{LedseqError, Result};

// Public API surface for external usage
pub use animation::{Animation, BuildContext};
pub use config::{AnimationSpec, RunFile, SequenceOptions};
pub use display::{DisplaySink, MemorySink};
pub use frame::{Frame, Rgb};
pub use input::{Action, ButtonEvent, ButtonId};
pub use registry::AnimationRegistry;
pub use sequencer::{RunSummary, Sequencer, SequencerCommand};
pub use status::{StatusEvent, StatusSender};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build a sequencer from a loaded run file and play it to completion.
///
/// Configuration errors are returned before any frame is rendered.
pub async fn start(
    registry: AnimationRegistry,
    run_file: RunFile,
    sink: Box<dyn DisplaySink>,
    input: mpsc::UnboundedReceiver<ButtonEvent>,
    stop: CancellationToken,
    events: StatusSender,
) -> Result<RunSummary> {
    let sequencer = Sequencer::new(registry, run_file.entries, run_file.options, sink, events)?;
    sequencer.run(input, stop).await
}
