//! The sequencer: run list, frame loop, and the transition state machine.
//!
//! ```text
//! Idle ──start──▶ Playing(i) ──expired/command──▶ Transitioning(i→j) ──progress=1──▶ Playing(j)
//!                     │                                                              │
//!                     └──────────────── last entry, no loop ──────────────▶ Idle ◀───┘
//! ```
//!
//! Each tick updates and renders the live animations (outgoing before incoming),
//! blends them during a transition, pushes the composed frame to the display sink and
//! then advances clocks. Entry durations include the transition into them, so the sum
//! of entry durations equals the playback time of one pass.

pub mod state;
pub mod transition;

pub use state::{ActiveEntry, Phase, PlayState, TransitionState};
pub use transition::{TransitionKind, WipeDirection};

use crate::animation::BuildContext;
use crate::config::{AnimationConfig, AnimationSpec, SequenceOptions};
use crate::display::DisplaySink;
use crate::error::{LedseqError, Result};
use crate::frame::{Frame, Rgb};
use crate::input::{Action, Bindings, ButtonEvent, InputBroker, InputTiming};
use crate::registry::AnimationRegistry;
use crate::status::{StatusEvent, StatusSender};
use log::{debug, error, info, warn};
use rand::seq::SliceRandom;
use std::mem;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Half-period of the pause indicator blink (1 Hz)
const PAUSE_BLINK: Duration = Duration::from_millis(500);

/// Sequence-level commands, issued through input bindings or directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SequencerCommand {
    Advance,
    Previous,
    JumpTo(usize),
    TogglePause,
    Stop,
}

/// Counters reported when playback ends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub frames_rendered: u64,
    pub entries_started: u64,
    /// Ticks whose frame the display sink rejected
    pub ticks_skipped: u64,
}

pub struct Sequencer {
    registry: AnimationRegistry,
    entries: Vec<AnimationSpec>,
    options: SequenceOptions,
    sink: Box<dyn DisplaySink>,
    events: StatusSender,
    bindings: Bindings,
    input_timing: InputTiming,
    ctx: BuildContext,
    state: PlayState,
    started: bool,
    paused: bool,
    pause_clock: Duration,
    stop_requested: bool,
    frame: Frame,
    scratch: Frame,
    last_frame: Frame,
    sink_failures: u32,
    summary: RunSummary,
}

impl Sequencer {
    /// Validate every entry and prepare playback. Nothing starts until
    /// [`start`](Self::start) or [`run`](Self::run).
    pub fn new(
        registry: AnimationRegistry,
        mut entries: Vec<AnimationSpec>,
        options: SequenceOptions,
        sink: Box<dyn DisplaySink>,
        events: StatusSender,
    ) -> Result<Self> {
        if entries.is_empty() {
            return Err(LedseqError::config("run list is empty"));
        }
        if options.frame_interval.is_zero() {
            return Err(LedseqError::config("frame_interval must be greater than zero"));
        }
        let (width, height) = sink.dimensions();
        if width == 0 || height == 0 {
            return Err(LedseqError::config(format!(
                "display reports an empty {width}x{height} grid"
            )));
        }

        let ctx = BuildContext::new(width, height)
            .with_events(events.clone())
            .with_teardown_grace(options.teardown_grace);

        // Construct and discard every entry so a bad run list fails before playback
        for (index, spec) in entries.iter().enumerate() {
            if spec.duration == Some(Duration::ZERO) {
                return Err(LedseqError::invalid_option(
                    "duration",
                    format!("entry #{index} '{}' must last longer than zero", spec.display_name()),
                ));
            }
            if let Err(err) = registry.create(&spec.type_name, &AnimationConfig::from_spec(spec), &ctx) {
                error!("entry #{index} '{}' is invalid: {err}", spec.display_name());
                return Err(err);
            }
        }

        if options.shuffle {
            entries.shuffle(&mut rand::thread_rng());
            debug!("run list shuffled");
        }

        Ok(Self {
            registry,
            entries,
            options,
            sink,
            events,
            bindings: Bindings::default(),
            input_timing: InputTiming::default(),
            ctx,
            state: PlayState::Idle,
            started: false,
            paused: false,
            pause_clock: Duration::ZERO,
            stop_requested: false,
            frame: Frame::new(width, height),
            scratch: Frame::new(width, height),
            last_frame: Frame::new(width, height),
            sink_failures: 0,
            summary: RunSummary::default(),
        })
    }

    pub fn with_bindings(mut self, bindings: Bindings) -> Self {
        self.bindings = bindings;
        self
    }

    pub fn with_input_timing(mut self, timing: InputTiming) -> Self {
        self.input_timing = timing;
        self
    }

    pub fn entries(&self) -> &[AnimationSpec] {
        &self.entries
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, PlayState::Idle)
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn stop_requested(&self) -> bool {
        self.stop_requested
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    /// Enter the first entry. Subsequent calls do nothing.
    pub fn start(&mut self) -> Result<()> {
        if self.started {
            return Ok(());
        }
        self.started = true;
        let first = self.enter(0)?;
        self.state = PlayState::Playing(first);
        Ok(())
    }

    /// Advance playback by `dt` and push one frame.
    pub async fn tick(&mut self, dt: Duration) -> Result<()> {
        if self.paused && !self.is_idle() {
            return self.present_paused(dt);
        }

        match mem::replace(&mut self.state, PlayState::Idle) {
            PlayState::Idle => Ok(()),
            PlayState::Playing(mut entry) => {
                entry.animation.update(dt);
                self.frame.clear();
                entry.animation.render(&mut self.frame);
                entry.remaining = entry.remaining.saturating_sub(dt);
                let expired = entry.remaining.is_zero();
                let index = entry.index;
                self.state = PlayState::Playing(entry);

                self.present()?;
                if expired {
                    self.move_to(self.next_index(index)).await?;
                }
                Ok(())
            }
            PlayState::Transitioning(mut transition) => {
                transition.outgoing.animation.update(dt);
                self.frame.clear();
                transition.outgoing.animation.render(&mut self.frame);
                transition.incoming.animation.update(dt);
                self.scratch.clear();
                transition.incoming.animation.render(&mut self.scratch);

                transition.elapsed = (transition.elapsed + dt).min(transition.duration);
                transition.incoming.remaining = transition.incoming.remaining.saturating_sub(dt);
                transition
                    .kind
                    .blend(&mut self.frame, &self.scratch, transition.progress());
                let complete = transition.is_complete();
                self.state = PlayState::Transitioning(transition);

                self.present()?;
                if complete {
                    self.finish_transition().await?;
                }
                Ok(())
            }
        }
    }

    /// Route an action to the active animation, then to the sequencer bindings.
    pub async fn dispatch(&mut self, action: Action) -> Result<()> {
        let consumed = match &mut self.state {
            PlayState::Idle => false,
            PlayState::Playing(entry) => entry.animation.handle_input(&action),
            PlayState::Transitioning(transition) => {
                transition.incoming.animation.handle_input(&action)
            }
        };
        if consumed {
            debug!("{action} consumed by the active animation");
            return Ok(());
        }
        match self.bindings.lookup(&action) {
            Some(command) => self.command(command).await,
            None => Ok(()),
        }
    }

    /// Apply a sequence-level command. Only `Stop` is honored during a transition.
    pub async fn command(&mut self, command: SequencerCommand) -> Result<()> {
        if command == SequencerCommand::Stop {
            info!("stop requested");
            self.stop_requested = true;
            return Ok(());
        }
        let current = match &self.state {
            PlayState::Playing(entry) => entry.index,
            PlayState::Transitioning(_) => {
                debug!("ignoring {command:?} during a transition");
                return Ok(());
            }
            PlayState::Idle => return Ok(()),
        };

        let target = match command {
            SequencerCommand::TogglePause => {
                self.set_paused(!self.paused);
                return Ok(());
            }
            SequencerCommand::Advance => self.next_index(current),
            SequencerCommand::Previous => {
                Some((current + self.entries.len() - 1) % self.entries.len())
            }
            SequencerCommand::JumpTo(index) if index < self.entries.len() => Some(index),
            SequencerCommand::JumpTo(index) => {
                warn!(
                    "cannot jump to entry {index}; the run list has {} entries",
                    self.entries.len()
                );
                return Ok(());
            }
            SequencerCommand::Stop => return Ok(()),
        };
        self.set_paused(false);
        self.move_to(target).await
    }

    /// Tear down whatever is live: outgoing before incoming during a transition.
    pub async fn shutdown(&mut self) {
        match mem::replace(&mut self.state, PlayState::Idle) {
            PlayState::Idle => {}
            PlayState::Playing(entry) => exit_entry(&self.events, entry).await,
            PlayState::Transitioning(transition) => {
                exit_entry(&self.events, transition.outgoing).await;
                exit_entry(&self.events, transition.incoming).await;
            }
        }
    }

    /// Play until the run list completes, a `Stop` command arrives, or `stop` fires.
    ///
    /// Live animations are always torn down before this returns.
    pub async fn run(
        mut self,
        mut input: mpsc::UnboundedReceiver<ButtonEvent>,
        stop: CancellationToken,
    ) -> Result<RunSummary> {
        let outcome = self.play(&mut input, &stop).await;
        self.shutdown().await;
        info!(
            "playback ended: {} frames, {} entries started, {} ticks skipped",
            self.summary.frames_rendered, self.summary.entries_started, self.summary.ticks_skipped
        );
        outcome.map(|_| self.summary.clone())
    }

    async fn play(
        &mut self,
        input: &mut mpsc::UnboundedReceiver<ButtonEvent>,
        stop: &CancellationToken,
    ) -> Result<()> {
        let mut broker = InputBroker::new(self.input_timing);
        self.start()?;

        let mut ticker = tokio::time::interval(self.options.frame_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_tick: Option<Instant> = None;
        let mut input_open = true;

        loop {
            tokio::select! {
                biased;
                _ = stop.cancelled() => {
                    info!("stop signal received");
                    return Ok(());
                }
                event = input.recv(), if input_open => match event {
                    Some(event) => {
                        for action in broker.process_event(event) {
                            self.dispatch(action).await?;
                        }
                    }
                    None => input_open = false,
                },
                _ = ticker.tick() => {
                    let now = Instant::now();
                    let dt = last_tick.map_or(self.options.frame_interval, |prev| now - prev);
                    last_tick = Some(now);
                    for action in broker.poll(now) {
                        self.dispatch(action).await?;
                    }
                    self.tick(dt).await?;
                    if self.is_idle() {
                        return Ok(());
                    }
                }
            }
            if self.stop_requested {
                return Ok(());
            }
        }
    }

    fn next_index(&self, index: usize) -> Option<usize> {
        if index + 1 < self.entries.len() {
            Some(index + 1)
        } else if self.options.looping {
            Some(0)
        } else {
            None
        }
    }

    fn duration_of(&self, index: usize) -> Duration {
        self.entries[index]
            .duration
            .unwrap_or(self.options.default_duration)
    }

    fn enter(&mut self, index: usize) -> Result<ActiveEntry> {
        let spec = &self.entries[index];
        let config = AnimationConfig::from_spec(spec);
        let mut animation = self.registry.create(&spec.type_name, &config, &self.ctx)?;
        animation.on_enter();

        let name = animation.name().to_string();
        info!("entry #{index} '{name}' started");
        self.summary.entries_started += 1;
        self.events.emit(StatusEvent::EntryStarted { index, name });
        Ok(ActiveEntry {
            index,
            animation,
            remaining: self.duration_of(index),
        })
    }

    /// Leave the playing entry for `target`, or finish the sequence when `None`.
    async fn move_to(&mut self, target: Option<usize>) -> Result<()> {
        let outgoing = match mem::replace(&mut self.state, PlayState::Idle) {
            PlayState::Playing(entry) => entry,
            other => {
                self.state = other;
                return Ok(());
            }
        };

        let Some(to) = target else {
            exit_entry(&self.events, outgoing).await;
            info!("sequence finished");
            self.events.emit(StatusEvent::SequenceFinished);
            return Ok(());
        };

        if self.options.is_cut() {
            exit_entry(&self.events, outgoing).await;
            let incoming = self.enter(to)?;
            self.state = PlayState::Playing(incoming);
            return Ok(());
        }

        let incoming = match self.enter(to) {
            Ok(entry) => entry,
            Err(err) => {
                exit_entry(&self.events, outgoing).await;
                return Err(err);
            }
        };
        let kind = self.options.transition;
        debug!("transition {} -> {} ({kind})", outgoing.index, to);
        self.events.emit(StatusEvent::TransitionStarted {
            from: outgoing.index,
            to,
            kind: kind.to_string(),
        });
        self.state = PlayState::Transitioning(TransitionState {
            kind,
            duration: self.options.transition_duration,
            elapsed: Duration::ZERO,
            outgoing,
            incoming,
        });
        Ok(())
    }

    async fn finish_transition(&mut self) -> Result<()> {
        let transition = match mem::replace(&mut self.state, PlayState::Idle) {
            PlayState::Transitioning(transition) => transition,
            other => {
                self.state = other;
                return Ok(());
            }
        };
        exit_entry(&self.events, transition.outgoing).await;
        let incoming = transition.incoming;
        let index = incoming.index;
        let expired = incoming.remaining.is_zero();
        self.state = PlayState::Playing(incoming);
        if expired {
            self.move_to(self.next_index(index)).await?;
        }
        Ok(())
    }

    fn set_paused(&mut self, paused: bool) {
        if self.paused == paused {
            return;
        }
        self.paused = paused;
        self.pause_clock = Duration::ZERO;
        if paused {
            info!("playback paused");
            self.events.emit(StatusEvent::Paused);
        } else {
            info!("playback resumed");
            self.events.emit(StatusEvent::Resumed);
        }
    }

    /// Re-show the last frame with the top-left pixel blinking red.
    fn present_paused(&mut self, dt: Duration) -> Result<()> {
        self.frame.clone_from(&self.last_frame);
        let blink_on = (self.pause_clock.as_millis() / PAUSE_BLINK.as_millis()) % 2 == 0;
        if blink_on {
            self.frame.set(0, 0, Rgb::RED);
        }
        self.pause_clock += dt;
        self.present()
    }

    fn present(&mut self) -> Result<()> {
        match self.sink.write_frame(&self.frame) {
            Ok(()) => {
                self.sink_failures = 0;
                self.summary.frames_rendered += 1;
            }
            Err(err) => {
                self.sink_failures += 1;
                self.summary.ticks_skipped += 1;
                warn!("display sink failed ({} in a row): {err}", self.sink_failures);
                self.events.emit(StatusEvent::DisplaySinkFailed {
                    consecutive: self.sink_failures,
                    error: err.to_string(),
                });
                if self.sink_failures > self.options.sink_failure_threshold {
                    error!("display sink failed {} times in a row; giving up", self.sink_failures);
                    return Err(LedseqError::display_sink(format!(
                        "{} consecutive failures, last: {err}",
                        self.sink_failures
                    )));
                }
                return Ok(());
            }
        }
        if !self.paused {
            self.last_frame.clone_from(&self.frame);
        }
        Ok(())
    }
}

/// Run `on_exit` for an entry and report the outcome.
async fn exit_entry(events: &StatusSender, mut entry: ActiveEntry) {
    let index = entry.index;
    let name = entry.name().to_string();
    match entry.animation.on_exit().await {
        Ok(()) => {}
        Err(LedseqError::TeardownTimeout { name: source }) => {
            warn!("entry #{index} '{name}': source '{source}' did not stop in time");
            events.emit(StatusEvent::TeardownTimedOut { name: source });
        }
        Err(err) => warn!("entry #{index} '{name}' failed to exit cleanly: {err}"),
    }
    debug!("entry #{index} '{name}' finished");
    events.emit(StatusEvent::EntryFinished { index, name });
}
