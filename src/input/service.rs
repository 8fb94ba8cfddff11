//! Input broker.
//!
//! Turns raw button edges into logical [`Action`]s (debounced, with combinations and
//! long presses) and maps unconsumed actions to sequencer commands through a
//! replaceable [`Bindings`] table.

use crate::input::raw::{ButtonEvent, ButtonId, Coalesced, PressCoalescer};
use crate::sequencer::SequencerCommand;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

/// Logical input actions delivered to animations and the sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Primary,
    Secondary,
    ToggleA,
    ToggleB,
    /// Two buttons pressed within the coincidence window, stored in ascending order
    Combo(ButtonId, ButtonId),
    LongPress(ButtonId),
}

impl Action {
    /// The single-press action for a button.
    pub fn for_button(button: ButtonId) -> Self {
        match button {
            ButtonId::A => Action::Primary,
            ButtonId::B => Action::Secondary,
            ButtonId::X => Action::ToggleA,
            ButtonId::Y => Action::ToggleB,
        }
    }

    /// A combination with its buttons in canonical order.
    pub fn combo(a: ButtonId, b: ButtonId) -> Self {
        if a <= b {
            Action::Combo(a, b)
        } else {
            Action::Combo(b, a)
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Primary => f.write_str("primary"),
            Action::Secondary => f.write_str("secondary"),
            Action::ToggleA => f.write_str("toggle-a"),
            Action::ToggleB => f.write_str("toggle-b"),
            Action::Combo(a, b) => write!(f, "combo({a}+{b})"),
            Action::LongPress(button) => write!(f, "long-press({button})"),
        }
    }
}

/// Timing parameters of the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputTiming {
    pub coincidence_window: Duration,
    pub debounce: Duration,
    pub hold: Duration,
}

impl Default for InputTiming {
    fn default() -> Self {
        Self {
            coincidence_window: Duration::from_millis(80),
            debounce: Duration::from_millis(30),
            hold: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Held {
    since: Instant,
    /// Already produced its action (combination or long press); release is silent
    consumed: bool,
}

#[derive(Debug, Default, Clone, Copy)]
struct ButtonState {
    held: Option<Held>,
    last_release: Option<Instant>,
    /// A bounce press was swallowed; its release must be swallowed too
    bouncing: bool,
}

/// Debouncing, combination-detecting state machine over raw button edges.
#[derive(Debug)]
pub struct InputBroker {
    timing: InputTiming,
    coalescer: PressCoalescer,
    buttons: HashMap<ButtonId, ButtonState>,
}

impl InputBroker {
    pub fn new(timing: InputTiming) -> Self {
        Self {
            timing,
            coalescer: PressCoalescer::new(timing.coincidence_window),
            buttons: HashMap::new(),
        }
    }

    pub fn timing(&self) -> InputTiming {
        self.timing
    }

    /// Feed one raw edge and return the actions it completes.
    pub fn process_event(&mut self, event: ButtonEvent) -> Vec<Action> {
        let mut actions = self.poll(event.at);
        if event.pressed {
            self.on_press(event.button, event.at, &mut actions);
        } else {
            self.on_release(event.button, event.at, &mut actions);
        }
        actions
    }

    /// Emit time-driven actions: deferred taps and long presses.
    pub fn poll(&mut self, now: Instant) -> Vec<Action> {
        let mut actions = Vec::new();
        if let Some(button) = self.coalescer.flush_if_stale(now) {
            actions.push(Action::for_button(button));
        }
        for button in ButtonId::ALL {
            let Some(state) = self.buttons.get_mut(&button) else {
                continue;
            };
            if let Some(held) = state.held.as_mut() {
                if !held.consumed && now.duration_since(held.since) >= self.timing.hold {
                    held.consumed = true;
                    self.coalescer.forget(button);
                    actions.push(Action::LongPress(button));
                }
            }
        }
        actions
    }

    fn on_press(&mut self, button: ButtonId, now: Instant, actions: &mut Vec<Action>) {
        let debounce = self.timing.debounce;
        let state = self.buttons.entry(button).or_default();
        if state.held.is_some() {
            return;
        }
        if let Some(released) = state.last_release {
            if now.duration_since(released) < debounce {
                state.bouncing = true;
                return;
            }
        }
        state.held = Some(Held {
            since: now,
            consumed: false,
        });

        match self.coalescer.push(button, now) {
            Coalesced::Combination(first, second) => {
                for b in [first, second] {
                    if let Some(held) = self.buttons.get_mut(&b).and_then(|s| s.held.as_mut()) {
                        held.consumed = true;
                    }
                }
                actions.push(Action::combo(first, second));
            }
            Coalesced::Opened { flushed_tap } => {
                if let Some(tap) = flushed_tap {
                    actions.push(Action::for_button(tap));
                }
            }
        }
    }

    fn on_release(&mut self, button: ButtonId, now: Instant, actions: &mut Vec<Action>) {
        let state = self.buttons.entry(button).or_default();
        if state.bouncing {
            state.bouncing = false;
            state.last_release = Some(now);
            return;
        }
        let Some(held) = state.held.take() else {
            return;
        };
        state.last_release = Some(now);
        if held.consumed {
            return;
        }
        if !self.coalescer.release(button, now) {
            actions.push(Action::for_button(button));
        }
    }
}

impl Default for InputBroker {
    fn default() -> Self {
        Self::new(InputTiming::default())
    }
}

/// Sequencer-level defaults for actions the active animation did not consume.
#[derive(Debug, Clone, PartialEq)]
pub struct Bindings {
    map: HashMap<Action, SequencerCommand>,
}

impl Bindings {
    pub fn empty() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    pub fn bind(mut self, action: Action, command: SequencerCommand) -> Self {
        self.map.insert(normalize(action), command);
        self
    }

    pub fn unbind(mut self, action: Action) -> Self {
        self.map.remove(&normalize(action));
        self
    }

    pub fn lookup(&self, action: &Action) -> Option<SequencerCommand> {
        self.map.get(&normalize(*action)).copied()
    }
}

impl Default for Bindings {
    fn default() -> Self {
        Self::empty()
            .bind(Action::Primary, SequencerCommand::Advance)
            .bind(Action::Secondary, SequencerCommand::TogglePause)
            .bind(Action::combo(ButtonId::A, ButtonId::B), SequencerCommand::Previous)
            .bind(Action::LongPress(ButtonId::A), SequencerCommand::JumpTo(0))
    }
}

fn normalize(action: Action) -> Action {
    match action {
        Action::Combo(a, b) => Action::combo(a, b),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn press(button: ButtonId, at: Instant) -> ButtonEvent {
        ButtonEvent::press(button, at)
    }

    fn release(button: ButtonId, at: Instant) -> ButtonEvent {
        ButtonEvent::release(button, at)
    }

    #[test]
    fn tap_emits_one_action_after_window() {
        let mut broker = InputBroker::default();
        let t0 = Instant::now();

        assert!(broker.process_event(press(ButtonId::A, t0)).is_empty());
        assert!(broker.process_event(release(ButtonId::A, t0 + ms(20))).is_empty());
        assert_eq!(broker.poll(t0 + ms(80)), vec![Action::Primary]);
        assert!(broker.poll(t0 + ms(500)).is_empty());
    }

    #[test]
    fn slow_release_emits_immediately() {
        let mut broker = InputBroker::default();
        let t0 = Instant::now();

        broker.process_event(press(ButtonId::X, t0));
        assert_eq!(
            broker.process_event(release(ButtonId::X, t0 + ms(200))),
            vec![Action::ToggleA]
        );
    }

    #[test]
    fn rapid_presses_form_a_combination() {
        let mut broker = InputBroker::default();
        let t0 = Instant::now();

        assert!(broker.process_event(press(ButtonId::B, t0)).is_empty());
        assert_eq!(
            broker.process_event(press(ButtonId::A, t0 + ms(30))),
            vec![Action::Combo(ButtonId::A, ButtonId::B)]
        );
        assert!(broker.process_event(release(ButtonId::A, t0 + ms(90))).is_empty());
        assert!(broker.process_event(release(ButtonId::B, t0 + ms(95))).is_empty());
        assert!(broker.poll(t0 + ms(2000)).is_empty());
    }

    #[test]
    fn tap_followed_quickly_by_second_button_is_a_combination() {
        let mut broker = InputBroker::default();
        let t0 = Instant::now();

        broker.process_event(press(ButtonId::A, t0));
        broker.process_event(release(ButtonId::A, t0 + ms(10)));
        assert_eq!(
            broker.process_event(press(ButtonId::B, t0 + ms(60))),
            vec![Action::Combo(ButtonId::A, ButtonId::B)]
        );
        assert!(broker.process_event(release(ButtonId::B, t0 + ms(70))).is_empty());
        assert!(broker.poll(t0 + ms(300)).is_empty());
    }

    #[test]
    fn presses_outside_window_stay_separate() {
        let mut broker = InputBroker::default();
        let t0 = Instant::now();

        broker.process_event(press(ButtonId::A, t0));
        broker.process_event(release(ButtonId::A, t0 + ms(10)));
        let actions = broker.process_event(press(ButtonId::B, t0 + ms(150)));
        assert_eq!(actions, vec![Action::Primary]);
        broker.process_event(release(ButtonId::B, t0 + ms(160)));
        assert_eq!(broker.poll(t0 + ms(300)), vec![Action::Secondary]);
    }

    #[test]
    fn bounce_after_release_is_ignored() {
        let mut broker = InputBroker::default();
        let t0 = Instant::now();

        broker.process_event(press(ButtonId::Y, t0));
        assert_eq!(
            broker.process_event(release(ButtonId::Y, t0 + ms(100))),
            vec![Action::ToggleB]
        );
        assert!(broker.process_event(press(ButtonId::Y, t0 + ms(110))).is_empty());
        assert!(broker.process_event(release(ButtonId::Y, t0 + ms(115))).is_empty());
        assert!(broker.poll(t0 + ms(400)).is_empty());
    }

    #[test]
    fn hold_yields_single_long_press() {
        let mut broker = InputBroker::default();
        let t0 = Instant::now();

        broker.process_event(press(ButtonId::A, t0));
        assert!(broker.poll(t0 + ms(900)).is_empty());
        assert_eq!(
            broker.poll(t0 + ms(1000)),
            vec![Action::LongPress(ButtonId::A)]
        );
        assert!(broker.poll(t0 + ms(3000)).is_empty());
        assert!(broker.process_event(release(ButtonId::A, t0 + ms(3100))).is_empty());
    }

    #[test]
    fn repeated_press_while_held_is_ignored() {
        let mut broker = InputBroker::default();
        let t0 = Instant::now();

        broker.process_event(press(ButtonId::B, t0));
        assert!(broker.process_event(press(ButtonId::B, t0 + ms(200))).is_empty());
        assert_eq!(
            broker.process_event(release(ButtonId::B, t0 + ms(300))),
            vec![Action::Secondary]
        );
    }

    #[test]
    fn default_bindings() {
        let bindings = Bindings::default();
        assert_eq!(bindings.lookup(&Action::Primary), Some(SequencerCommand::Advance));
        assert_eq!(
            bindings.lookup(&Action::Combo(ButtonId::B, ButtonId::A)),
            Some(SequencerCommand::Previous)
        );
        assert_eq!(
            bindings.lookup(&Action::LongPress(ButtonId::A)),
            Some(SequencerCommand::JumpTo(0))
        );
        assert_eq!(bindings.lookup(&Action::ToggleA), None);

        let rebound = bindings.unbind(Action::Primary);
        assert_eq!(rebound.lookup(&Action::Primary), None);
    }
}
