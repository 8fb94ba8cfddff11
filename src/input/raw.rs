//! Raw button events and press coalescing.
//!
//! Hardware (or the keyboard simulator) reports presses and releases with timestamps.
//! The [`PressCoalescer`] keeps the most recent press open for a short coincidence
//! window so that a second button arriving inside it can be merged into a combination.

use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

/// Default coincidence window for combination presses.
pub const DEFAULT_COINCIDENCE_WINDOW_MS: u64 = 80;

/// Physical buttons on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ButtonId {
    A,
    B,
    X,
    Y,
}

impl ButtonId {
    pub const ALL: [ButtonId; 4] = [ButtonId::A, ButtonId::B, ButtonId::X, ButtonId::Y];
}

impl fmt::Display for ButtonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ButtonId::A => "A",
            ButtonId::B => "B",
            ButtonId::X => "X",
            ButtonId::Y => "Y",
        };
        f.write_str(name)
    }
}

/// One edge reported by the input source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonEvent {
    pub button: ButtonId,
    pub pressed: bool,
    pub at: Instant,
}

impl ButtonEvent {
    pub fn press(button: ButtonId, at: Instant) -> Self {
        Self {
            button,
            pressed: true,
            at,
        }
    }

    pub fn release(button: ButtonId, at: Instant) -> Self {
        Self {
            button,
            pressed: false,
            at,
        }
    }
}

/// What happened to the previously open press when a new one arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coalesced {
    /// The new press coincides with the open one; both belong to a combination
    Combination(ButtonId, ButtonId),
    /// The open press (if any) was closed; a released one must now be emitted
    Opened { flushed_tap: Option<ButtonId> },
}

#[derive(Debug, Clone, Copy)]
struct OpenPress {
    button: ButtonId,
    at: Instant,
    released: bool,
}

/// Tracks the single most recent press during its coincidence window.
#[derive(Debug, Clone)]
pub struct PressCoalescer {
    window: Duration,
    open: Option<OpenPress>,
}

impl PressCoalescer {
    pub fn new(window: Duration) -> Self {
        Self { window, open: None }
    }

    pub fn with_default_window() -> Self {
        Self::new(Duration::from_millis(DEFAULT_COINCIDENCE_WINDOW_MS))
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Register a press, merging it with the open press when both fall in one window.
    pub fn push(&mut self, button: ButtonId, now: Instant) -> Coalesced {
        match self.open {
            Some(open) if open.button != button && now.duration_since(open.at) <= self.window => {
                self.open = None;
                Coalesced::Combination(open.button, button)
            }
            _ => {
                let flushed_tap = self.open.take().filter(|o| o.released).map(|o| o.button);
                self.open = Some(OpenPress {
                    button,
                    at: now,
                    released: false,
                });
                Coalesced::Opened { flushed_tap }
            }
        }
    }

    /// Note a release. Returns true when the press is still inside its window and the
    /// caller must defer the single action until [`flush_if_stale`](Self::flush_if_stale).
    pub fn release(&mut self, button: ButtonId, now: Instant) -> bool {
        match self.open.as_mut() {
            Some(open) if open.button == button => {
                if now.duration_since(open.at) < self.window {
                    open.released = true;
                    true
                } else {
                    self.open = None;
                    false
                }
            }
            _ => false,
        }
    }

    /// Close the open press once its window has passed. Returns the button when it was
    /// a completed tap whose single action is now due.
    pub fn flush_if_stale(&mut self, now: Instant) -> Option<ButtonId> {
        let open = self.open?;
        if now.duration_since(open.at) < self.window {
            return None;
        }
        self.open = None;
        open.released.then_some(open.button)
    }

    /// Forget the open press if it belongs to `button`.
    pub fn forget(&mut self, button: ButtonId) {
        if self.open.map(|o| o.button) == Some(button) {
            self.open = None;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn second_button_inside_window_combines() {
        let mut coalescer = PressCoalescer::new(ms(80));
        let t0 = Instant::now();

        assert_eq!(
            coalescer.push(ButtonId::A, t0),
            Coalesced::Opened { flushed_tap: None }
        );
        assert_eq!(
            coalescer.push(ButtonId::B, t0 + ms(40)),
            Coalesced::Combination(ButtonId::A, ButtonId::B)
        );
        assert!(coalescer.is_empty());
    }

    #[test]
    fn second_button_after_window_opens_new_press() {
        let mut coalescer = PressCoalescer::new(ms(80));
        let t0 = Instant::now();

        coalescer.push(ButtonId::A, t0);
        assert!(coalescer.release(ButtonId::A, t0 + ms(20)));
        assert_eq!(
            coalescer.push(ButtonId::B, t0 + ms(120)),
            Coalesced::Opened {
                flushed_tap: Some(ButtonId::A)
            }
        );
    }

    #[test]
    fn released_tap_flushes_after_window() {
        let mut coalescer = PressCoalescer::new(ms(80));
        let t0 = Instant::now();

        coalescer.push(ButtonId::X, t0);
        coalescer.release(ButtonId::X, t0 + ms(10));
        assert_eq!(coalescer.flush_if_stale(t0 + ms(50)), None);
        assert_eq!(coalescer.flush_if_stale(t0 + ms(80)), Some(ButtonId::X));
        assert!(coalescer.is_empty());
    }

    #[test]
    fn held_press_closes_without_a_tap() {
        let mut coalescer = PressCoalescer::new(ms(80));
        let t0 = Instant::now();

        coalescer.push(ButtonId::Y, t0);
        assert_eq!(coalescer.flush_if_stale(t0 + ms(100)), None);
        assert!(coalescer.is_empty());
        assert!(!coalescer.release(ButtonId::Y, t0 + ms(150)));
    }
}
